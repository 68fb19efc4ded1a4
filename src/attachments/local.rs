use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use super::{AttachmentStore, Error, Result, Upload};

/// References issued by this store live under this URL prefix; the app
/// serves the directory read-only at the same prefix.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Stores attachments as flat files in a local directory.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl AttachmentStore for LocalStore {
    async fn resolve(&self, upload: Upload) -> Result<String> {
        upload.validate()?;

        let name = format!("{}.{}", Uuid::now_v7(), upload.extension());
        let path = self.dir.join(&name);
        fs::write(&path, &upload.bytes).await?;

        tracing::debug!(
            file = %path.display(),
            original = upload.file_name.as_deref().unwrap_or("-"),
            size = upload.bytes.len(),
            "stored attachment"
        );
        Ok(format!("{PUBLIC_PREFIX}/{name}"))
    }

    async fn release(&self, reference: &str) -> Result<()> {
        let name = reference
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| Error::UnknownReference(reference.into()))?;

        // issued names are flat; anything with separators never came from here
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(Error::UnknownReference(reference.into()));
        }

        fs::remove_file(self.dir.join(name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::png;
    use super::*;

    #[tokio::test]
    async fn resolve_writes_file_and_release_removes_it() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await?;

        let reference = store.resolve(png(vec![1, 2, 3])).await?;
        assert!(reference.starts_with("/uploads/"));
        assert!(reference.ends_with(".png"));

        let name = reference.strip_prefix("/uploads/").unwrap();
        let on_disk = fs::read(dir.path().join(name)).await?;
        assert_eq!(on_disk, vec![1, 2, 3]);

        store.release(&reference).await?;
        assert!(!dir.path().join(name).exists());
        Ok(())
    }

    #[tokio::test]
    async fn release_rejects_foreign_references() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await?;

        for reference in ["memory://abc.png", "/uploads/../etc/passwd", "/elsewhere/a.png"] {
            let err = store.release(reference).await.unwrap_err();
            assert!(matches!(err, Error::UnknownReference(_)));
        }
        Ok(())
    }
}
