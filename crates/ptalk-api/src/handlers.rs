//! HTTP request handlers.

pub mod health;
pub mod status;
pub mod upload;
