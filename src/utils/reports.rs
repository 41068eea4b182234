use comfy_table::{presets::ASCII_FULL, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::model::{
    rating_history::PlayerSeries,
    rating_tracker::PlayerProfile,
    recalculation::RatingDelta,
    structures::{rating_state::RatingState, recalc_state::RecalcSummary, track::Track}
};

fn base_table(header: Vec<Cell>, right_aligned_from: usize) -> Table {
    let mut table = Table::new();
    let columns = header.len();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    for i in right_aligned_from..columns {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    table
}

pub fn leaderboard(states: &[RatingState]) -> Table {
    let mut table = base_table(
        vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Account").add_attribute(Attribute::Bold),
            Cell::new("Profession"),
            Cell::new("Track"),
            Cell::new("Composite").fg(Color::Cyan),
            Cell::new("Rating"),
            Cell::new("RD"),
            Cell::new("Games"),
            Cell::new("Avg rank %"),
            Cell::new("Avg stat (z for groups)"),
        ],
        4
    );

    for (i, state) in states.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&state.key.account_name).add_attribute(Attribute::Bold),
            Cell::new(&state.key.profession),
            Cell::new(state.key.track),
            Cell::new(format!("{:.1}", state.composite_score)).fg(Color::Cyan),
            Cell::new(format!("{:.1}", state.rating)),
            Cell::new(format!("{:.1}", state.rd)),
            Cell::new(state.games_played),
            Cell::new(format!("{:.1}", state.average_rank)),
            Cell::new(average_stat(state)),
        ]);
    }

    table
}

fn average_stat(state: &RatingState) -> String {
    match state.key.track {
        Track::Group => format!("{:+.2} z", state.average_stat_value),
        Track::Metric(_) => format!("{:.2}", state.average_stat_value)
    }
}

pub fn profile(profile: &PlayerProfile, series: &PlayerSeries) -> Table {
    let mut table = base_table(
        vec![
            Cell::new("Profession").add_attribute(Attribute::Bold),
            Cell::new("Track"),
            Cell::new("Rating").fg(Color::Cyan),
            Cell::new("RD"),
            Cell::new("Games"),
            Cell::new("Track rank"),
            Cell::new("Sessions shown"),
        ],
        2
    );

    for state in &profile.tracks {
        let shown = series
            .series
            .get(&state.key.track)
            .map_or(0, |entries| entries.iter().filter(|e| e.key == state.key).count());

        table.add_row(vec![
            Cell::new(&state.key.profession).add_attribute(Attribute::Bold),
            Cell::new(state.key.track),
            Cell::new(format!("{:.1}", state.rating)).fg(Color::Cyan),
            Cell::new(format!("{:.1}", state.rd)),
            Cell::new(state.games_played),
            Cell::new(state.leaderboard_rank),
            Cell::new(shown),
        ]);
    }

    table
}

pub fn deltas(deltas: &[RatingDelta]) -> Table {
    let mut table = base_table(
        vec![
            Cell::new("Account").add_attribute(Attribute::Bold),
            Cell::new("Profession"),
            Cell::new("Track"),
            Cell::new("Before"),
            Cell::new("After"),
            Cell::new("Delta").add_attribute(Attribute::Bold),
        ],
        3
    );

    for delta in deltas {
        let color = if delta.delta >= 0.0 { Color::Green } else { Color::Red };

        table.add_row(vec![
            Cell::new(&delta.key.account_name).add_attribute(Attribute::Bold),
            Cell::new(&delta.key.profession),
            Cell::new(delta.key.track),
            Cell::new(format!("{:.1}", delta.before)),
            Cell::new(format!("{:.1}", delta.after)),
            Cell::new(format!("{:+.1}", delta.delta)).fg(color),
        ]);
    }

    table
}

pub fn summary(summary: &RecalcSummary, tracks: usize, history_entries: usize) -> Table {
    let mut table = base_table(vec![Cell::new("Replay").add_attribute(Attribute::Bold), Cell::new("")], 1);

    table.add_row(vec![
        Cell::new("Sessions processed"),
        Cell::new(format!("{}/{}", summary.sessions_processed, summary.sessions_total)),
    ]);
    table.add_row(vec![Cell::new("Track updates"), Cell::new(summary.track_updates)]);
    table.add_row(vec![Cell::new("Skipped (no signal)"), Cell::new(summary.skipped_pairs)]);
    table.add_row(vec![Cell::new("Tracks"), Cell::new(tracks)]);
    table.add_row(vec![Cell::new("History entries"), Cell::new(history_entries)]);

    table
}
