//! # edison-channels
//!
//! Protocol adapters that implement the `edison-core` session traits.

pub mod whatsapp;
