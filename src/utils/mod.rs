pub mod progress_utils;
pub mod reports;
pub mod test_utils;
