pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod forecast;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod publish;
pub mod stats;
