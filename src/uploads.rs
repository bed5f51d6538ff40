//! On-disk storage for raw uploaded files.
//!
//! Each accepted upload is written under a random hex name that keeps
//! the original extension, so client filenames never reach the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

/// A file saved into the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedUpload {
    /// Generated file name (`{hex}{.ext}`).
    pub stored_name: String,
    /// Full path of the saved file.
    pub path: PathBuf,
    /// Number of bytes written.
    pub size: u64,
}

/// Directory that receives uploaded files.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Creates the directory if it does not exist.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under a fresh random name derived from `original_name`.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<SavedUpload> {
        let stored_name = stored_name_for(original_name);
        let path = self.root.join(&stored_name);
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), size = bytes.len(), "upload saved");
        Ok(SavedUpload {
            stored_name,
            path,
            size: bytes.len() as u64,
        })
    }
}

/// 16 random hex characters followed by the original (lowercased) extension.
fn stored_name_for(original_name: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}{ext}", &hex[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_keeps_extension() {
        let name = stored_name_for("Quarterly Report.XLSX");
        assert_eq!(name.len(), 16 + ".xlsx".len());
        assert!(name.ends_with(".xlsx"));
        assert!(name[..16].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn stored_names_are_random() {
        assert_ne!(stored_name_for("a.csv"), stored_name_for("a.csv"));
    }

    #[test]
    fn save_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::create(dir.path().join("uploads")).unwrap();
        let saved = uploads.save("../../etc/passwd.csv", b"a,b\n1,2\n").unwrap();

        assert_eq!(saved.size, 8);
        assert_eq!(saved.path.parent(), Some(uploads.root()));
        assert_eq!(fs::read(&saved.path).unwrap(), b"a,b\n1,2\n");
    }
}
