pub mod auth;
pub mod client;
pub mod token;
pub mod types;

pub use auth::ClientSecrets;
pub use client::YoutubeClient;
pub use token::{TokenFile, TokenFileProvider};
