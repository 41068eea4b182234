pub mod composite;
pub mod constants;
pub mod date_filter;
pub mod glicko;
pub mod group;
pub mod normalizer;
pub mod rating_history;
pub mod rating_tracker;
pub mod recalculation;
pub mod session_log;
pub mod store;
pub mod structures;
