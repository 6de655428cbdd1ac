pub mod book;
pub mod client;
pub mod config;
pub mod error;
pub mod exam;
pub mod fetch;
pub mod types;
pub mod workbook;
