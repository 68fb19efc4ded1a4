use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use uuid::Uuid;

use super::{AttachmentStore, Error, Result, Upload};

/// Keeps attachment bytes in process memory. Meant for tests and ephemeral
/// deployments; references do not survive a restart.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(reference)
    }
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn resolve(&self, upload: Upload) -> Result<String> {
        upload.validate()?;

        let reference = format!("memory://{}.{}", Uuid::now_v7(), upload.extension());
        self.blobs.lock().unwrap().insert(reference.clone(), upload.bytes);
        Ok(reference)
    }

    async fn release(&self, reference: &str) -> Result<()> {
        self.blobs
            .lock()
            .unwrap()
            .remove(reference)
            .map(|_| ())
            .ok_or_else(|| Error::UnknownReference(reference.into()))
    }
}
