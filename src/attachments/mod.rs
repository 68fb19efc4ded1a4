//! Attachment storage backends.
//!
//! The note service talks to attachments through [`AttachmentStore`]:
//! `resolve` turns an uploaded file into a stable reference, `release`
//! deletes the resource behind a reference. The backend is picked by
//! `ATTACHMENT_BACKEND` at startup.

mod local;
mod memory;

pub use local::{LocalStore, PUBLIC_PREFIX};
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;

use crate::config::{AttachmentBackend, Config};

pub const ACCEPTED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Hard cap on a single uploaded attachment (5 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unsupported attachment type '{0}'")]
    UnsupportedType(String),
    #[error("attachment exceeds the 5 MiB limit ({0} bytes)")]
    TooLarge(usize),
    #[error("unknown attachment reference '{0}'")]
    UnknownReference(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the uploaded file itself was rejected, as opposed to a
    /// storage failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::TooLarge(_))
    }
}

/// A file pulled out of a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Upload {
    fn validate(&self) -> Result<()> {
        if !ACCEPTED_TYPES.contains(&self.content_type.as_str()) {
            return Err(Error::UnsupportedType(self.content_type.clone()));
        }
        if self.bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(Error::TooLarge(self.bytes.len()));
        }
        Ok(())
    }

    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Validates the upload and stores it, returning a reference that stays
    /// valid beyond the request.
    async fn resolve(&self, upload: Upload) -> Result<String>;

    /// Deletes the stored resource behind a previously issued reference.
    async fn release(&self, reference: &str) -> Result<()>;
}

pub async fn from_config(config: &Config) -> Result<Arc<dyn AttachmentStore>> {
    Ok(match config.attachment_backend {
        AttachmentBackend::Local => Arc::new(LocalStore::new(&config.upload_dir).await?),
        AttachmentBackend::Memory => Arc::new(MemoryStore::new()),
    })
}
