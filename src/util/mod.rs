pub mod report;
pub mod status_log;
