//! Core business logic for futo-media.

pub mod services;

pub use services::*;
