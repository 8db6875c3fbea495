//! gemrelay - Key-hiding relay for generative language endpoints
//!
//! This library provides the configuration, error mapping and HTTP relay
//! that forward frontend payloads to Gemini and Imagen models while keeping
//! the API key server-side.

pub mod config;
pub mod error;
pub mod relay;

pub use config::Config;
pub use error::{Error, Result};
