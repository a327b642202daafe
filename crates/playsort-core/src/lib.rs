pub mod config;
pub mod error;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod rules;
pub mod storage;
