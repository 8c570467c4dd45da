use crate::core::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

/// Local filesystem storage. Relative paths resolve against `base_path`,
/// absolute paths are used as given.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        tracing::trace!("Reading {}", full_path.display());
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy());

        storage.write_file("nested/out/file.zip", b"PK").await.unwrap();

        assert_eq!(storage.read_file("nested/out/file.zip").await.unwrap(), b"PK");
        assert!(dir.path().join("nested/out/file.zip").exists());
    }

    #[tokio::test]
    async fn test_absolute_paths_ignore_base() {
        let dir = TempDir::new().unwrap();
        let absolute = dir.path().join("calls.csv");
        std::fs::write(&absolute, "CALL_ID\n1\n").unwrap();

        let storage = LocalStorage::new("/does/not/matter");
        let data = storage.read_file(&absolute.to_string_lossy()).await.unwrap();

        assert_eq!(data, b"CALL_ID\n1\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let storage = LocalStorage::default();
        let err = storage.read_file("no-such-file.csv").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::FormatterError::IoError(_)));
    }
}
