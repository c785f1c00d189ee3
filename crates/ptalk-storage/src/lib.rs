//! Media persistence for the PixelTalk pipeline.
//!
//! Generated images and videos go to Cloudflare R2 when configured, with a
//! local-disk fallback served from the application's media route.

pub mod client;
pub mod error;
pub mod resolver;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use resolver::{MediaLocation, MediaStore, MediaStoreConfig, StoredMedia};
