//! Luminate journaling API: account registration, session tokens, and the
//! per-user records behind them.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod records;
pub mod validate;

pub use config::Config;
pub use error::{AppError, Result};
