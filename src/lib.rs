//! SCOPE auth - magic-link callback handling
//!
//! This library recovers PKCE artifacts from auth callbacks that may have
//! been rewritten by email security scanners, completes the code exchange
//! against the hosted auth service, and serves the callback endpoint.

pub mod auth;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Error, Result};
