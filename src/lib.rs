pub mod analysis;
pub mod api_connection;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod recommend;
pub mod scoring;
