use lazy_static::lazy_static;
use std::sync::Arc;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::{Client, NoTls};
use wvw_rating_processor::database::db::DbClient;

pub struct TestDatabase {
    pub connection_string: String,
    _container: Container<'static, Postgres>
}

impl TestDatabase {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        lazy_static! {
            static ref DOCKER: Arc<Cli> = Arc::new(Cli::default());
        }

        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);

        let connection_string = format!(
            "host=localhost port={} user=postgres password=postgres dbname=postgres",
            port
        );

        // The processor creates its own tables
        DbClient::connect(&connection_string).await?.ensure_schema().await?;

        Ok(TestDatabase {
            connection_string,
            _container: container
        })
    }

    pub async fn get_client(&self) -> Result<Client, Box<dyn std::error::Error>> {
        let (client, connection) = tokio_postgres::connect(&self.connection_string, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("Database connection error: {}", e);
            }
        });

        Ok(client)
    }

    /// Two sessions of three Weavers and one Druid, plus a roster of two.
    pub async fn seed_test_data(&self) -> Result<(), Box<dyn std::error::Error>> {
        let client = self.get_client().await?;

        client
            .batch_execute(
                "INSERT INTO player_performances (timestamp, account_name, profession, fight_time, target_dps, healing_per_sec)
                 VALUES
                 ('2025-01-02 20:00:00', 'player1.1000', 'Weaver', 600, 1000, 0),
                 ('2025-01-02 20:00:00', 'player2.1000', 'Weaver', 600, 2000, 0),
                 ('2025-01-02 20:00:00', 'player3.1000', 'Weaver', 600, 3000, 0),
                 ('2025-01-02 20:00:00', 'healer.2000', 'Druid', 600, 0, 900),
                 ('2025-01-03 20:00:00', 'player1.1000', 'Weaver', 450, 3000, 0),
                 ('2025-01-03 20:00:00', 'player2.1000', 'Weaver', 450, 2000, 0),
                 ('2025-01-03 20:00:00', 'player3.1000', 'Weaver', 450, 1000, 0);

                 INSERT INTO roster_members (account_name) VALUES ('player1.1000'), ('player2.1000');"
            )
            .await?;

        Ok(())
    }

    pub async fn count(&self, table: &str) -> Result<i64, Box<dyn std::error::Error>> {
        let client = self.get_client().await?;
        let row = client
            .query_one(format!("SELECT COUNT(*) FROM {}", table).as_str(), &[])
            .await?;

        Ok(row.get(0))
    }
}
