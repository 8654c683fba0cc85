pub mod auth;
pub mod client;
pub mod config;

pub use auth::{AuthError, ServiceAccountKey, TokenSource};
pub use client::GoogleSheetsSource;
pub use config::SheetsConfig;
