//! Common utilities and shared types for futo-media.
//!
//! This crate provides foundational components used across all futo-media crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Image references**: Normalization of stored image references via [`image_ref`]
//! - **Media storage**: Remote image-hosting client via [`MediaStorage`]
//!
//! # Example
//!
//! ```no_run
//! use futo_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     println!("Serving at {}", config.server.url);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod image_ref;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use image_ref::{normalize_image_ref, resolve_image_url};
pub use storage::{CloudMediaStorage, MediaStorage, MediaStorageService, NoopMediaStorage, RemoteImage};
