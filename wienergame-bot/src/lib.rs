pub mod bot;
pub mod config;
pub mod report;
pub mod storage;
