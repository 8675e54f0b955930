//! # edison-core
//!
//! Core types, traits, configuration, and error handling for Edison.

pub mod activity;
pub mod config;
pub mod credentials;
pub mod error;
pub mod message;
pub mod state;
pub mod traits;
