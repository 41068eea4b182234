pub mod group_config;
pub mod metric_category;
pub mod performance;
pub mod rating_state;
pub mod recalc_state;
pub mod track;
