//! Per-user upload store
//!
//! Raw uploads live under `<uploads_dir>/<user>/<document_id>` where the
//! document id is the sanitized original filename with a UUID spliced in
//! before the extension. User ids are validated upstream; document ids are
//! re-checked here before they touch a path.

use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::auth::UserId;
use crate::error::{DocentError, Result};

/// A stored upload as reported by the listing endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredFile {
    /// Document id (also the on-disk filename)
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

/// Filesystem-backed store for raw uploads, partitioned per user.
#[derive(Debug, Clone)]
pub struct FileStore {
    uploads_dir: PathBuf,
}

impl FileStore {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }

    fn user_dir(&self, user: &UserId) -> PathBuf {
        self.uploads_dir.join(user.as_str())
    }

    /// Persist an upload and return its document id.
    pub async fn save(&self, user: &UserId, filename: &str, data: &[u8]) -> Result<String> {
        let sanitized = sanitize_filename(filename);
        if sanitized.is_empty() {
            return Err(DocentError::File(format!(
                "Filename '{filename}' has no usable characters"
            )));
        }

        let document_id = match sanitized.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem}-{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => format!("{sanitized}-{}", Uuid::new_v4()),
        };

        let dir = self.user_dir(user);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            DocentError::File(format!(
                "Failed to create upload directory {}: {e}",
                dir.display()
            ))
        })?;

        let path = dir.join(&document_id);
        tokio::fs::write(&path, data).await.map_err(|e| {
            DocentError::File(format!("Failed to write {}: {e}", path.display()))
        })?;

        Ok(document_id)
    }

    /// Absolute path of a stored document, rejecting ids that could walk
    /// outside the user's directory.
    pub fn path(&self, user: &UserId, document_id: &str) -> Result<PathBuf> {
        if !is_safe_document_id(document_id) {
            return Err(DocentError::File(format!(
                "Invalid document id: {document_id}"
            )));
        }
        Ok(self.user_dir(user).join(document_id))
    }

    /// Whether a stored document exists for this user.
    pub async fn exists(&self, user: &UserId, document_id: &str) -> bool {
        match self.path(user, document_id) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Remove one stored document. Missing files are not an error.
    pub async fn delete(&self, user: &UserId, document_id: &str) -> Result<()> {
        let path = self.path(user, document_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DocentError::File(format!(
                "Failed to delete {}: {e}",
                path.display()
            ))),
        }
    }

    /// Remove every upload belonging to this user.
    pub async fn delete_user(&self, user: &UserId) -> Result<()> {
        let dir = self.user_dir(user);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DocentError::File(format!(
                "Failed to delete {}: {e}",
                dir.display()
            ))),
        }
    }

    /// List this user's uploads. A user with no folder has no uploads.
    pub async fn list(&self, user: &UserId) -> Result<Vec<StoredFile>> {
        let dir = self.user_dir(user);

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DocentError::File(format!(
                    "Failed to list {}: {e}",
                    dir.display()
                )));
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            DocentError::File(format!("Failed to read entry in {}: {e}", dir.display()))
        })? {
            let metadata = entry.metadata().await.map_err(|e| {
                DocentError::File(format!("Failed to stat {:?}: {e}", entry.file_name()))
            })?;
            if metadata.is_file() {
                files.push(StoredFile {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    size: metadata.len(),
                });
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

/// Reduce a client-supplied filename to a safe path component: keep
/// alphanumerics, dots, underscores and hyphens, map whitespace to
/// underscores, drop everything else, and strip leading dots.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

fn is_safe_document_id(document_id: &str) -> bool {
    !document_id.is_empty()
        && !document_id.starts_with('.')
        && document_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::try_from(id).unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("my notes.txt"), "my_notes.txt");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("weird$chars%.md"), "weirdchars.md");
        assert_eq!(sanitize_filename("///"), "");
    }

    #[test]
    fn test_is_safe_document_id() {
        assert!(is_safe_document_id("notes-abc123.txt"));
        assert!(!is_safe_document_id(""));
        assert!(!is_safe_document_id("../escape.txt"));
        assert!(!is_safe_document_id("a/b.txt"));
        assert!(!is_safe_document_id(".dotfile"));
    }

    #[tokio::test]
    async fn test_save_and_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        let alice = user("alice");

        let document_id = store
            .save(&alice, "report.txt", b"hello world")
            .await
            .unwrap();

        assert!(document_id.starts_with("report-"));
        assert!(document_id.ends_with(".txt"));
        assert!(store.exists(&alice, &document_id).await);
        assert!(!store.exists(&user("bob"), &document_id).await);
    }

    #[tokio::test]
    async fn test_save_preserves_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        let alice = user("alice");

        let document_id = store.save(&alice, "data.csv", b"a,b,c\n1,2,3").await.unwrap();
        let path = store.path(&alice, &document_id).unwrap();
        let content = tokio::fs::read(&path).await.unwrap();
        assert_eq!(content, b"a,b,c\n1,2,3");
    }

    #[tokio::test]
    async fn test_list_returns_name_and_size() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        let alice = user("alice");

        let id1 = store.save(&alice, "one.txt", b"12345").await.unwrap();
        let id2 = store.save(&alice, "two.txt", b"123").await.unwrap();

        let files = store.list(&alice).await.unwrap();
        assert_eq!(files.len(), 2);

        let by_name = |name: &str| files.iter().find(|f| f.name == name).cloned();
        assert_eq!(by_name(&id1).unwrap().size, 5);
        assert_eq!(by_name(&id2).unwrap().size, 3);
    }

    #[tokio::test]
    async fn test_list_unknown_user_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        assert!(store.list(&user("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_removes_everything() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        let alice = user("alice");
        let bob = user("bob");

        let alice_doc = store.save(&alice, "a.txt", b"a").await.unwrap();
        let bob_doc = store.save(&bob, "b.txt", b"b").await.unwrap();

        store.delete_user(&alice).await.unwrap();

        assert!(!store.exists(&alice, &alice_doc).await);
        assert!(store.exists(&bob, &bob_doc).await);
        assert!(store.list(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_twice_is_ok() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        let alice = user("alice");

        store.delete_user(&alice).await.unwrap();
        store.delete_user(&alice).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_single_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        let alice = user("alice");

        let document_id = store.save(&alice, "gone.txt", b"bye").await.unwrap();
        store.delete(&alice, &document_id).await.unwrap();
        assert!(!store.exists(&alice, &document_id).await);

        // Deleting again is not an error
        store.delete(&alice, &document_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_path_rejects_traversal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        let alice = user("alice");

        assert!(store.path(&alice, "../other/file.txt").is_err());
        assert!(store.path(&alice, "").is_err());
        assert!(!store.exists(&alice, "../other/file.txt").await);
    }
}
