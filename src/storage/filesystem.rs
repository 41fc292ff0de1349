//! Filesystem bucket backend
//!
//! Each bucket is a directory tree rooted at its configured `root_path`.
//! Object keys map to paths relative to that root; `resolve` is the single
//! choke point that joins and normalizes key paths and rejects anything
//! that would escape the bucket root.

use super::StorageError;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// One object in a listing: key, size, mtime, and content checksum.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    /// Bucket-root-relative key, forward-slash separated
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// Quoted MD5 hex digest, e.g. `"d41d8cd98f00b204e9800998ecf8427e"`
    pub etag: String,
}

/// Async-safe path existence check (avoids blocking the Tokio runtime)
async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Quoted MD5 hex digest of a byte slice.
pub fn content_etag(data: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Md5::digest(data)))
}

/// A single bucket's filesystem root.
#[derive(Debug, Clone)]
pub struct FsBucket {
    root: PathBuf,
}

impl FsBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to an absolute path under the bucket root.
    ///
    /// The join is normalized lexically: `.` components are dropped and `..`
    /// pops the previously pushed component. Any attempt to pop past the
    /// bucket root, or a key smuggling in an absolute path component, is
    /// rejected. Every I/O operation goes through this.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut resolved = self.root.clone();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if resolved == self.root || !resolved.pop() {
                        return Err(StorageError::OutsideRoot(key.to_string()));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::OutsideRoot(key.to_string()));
                }
            }
        }
        debug_assert!(resolved.starts_with(&self.root));
        Ok(resolved)
    }

    /// Whether a key resolves to an existing path (file or directory).
    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        Ok(path_exists(&path).await)
    }

    /// Read the full content of a regular file.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        if !path_exists(&path).await {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let meta = fs::metadata(&path).await?;
        if !meta.is_file() {
            return Err(StorageError::NotAFile(key.to_string()));
        }
        Ok(fs::read(&path).await?)
    }

    /// Write object data, creating parent directories as needed.
    ///
    /// The write is atomic (temp file in the target directory, then rename),
    /// so a failed upload never leaves a truncated object behind. Returns the
    /// quoted MD5 ETag of the written content.
    pub async fn write(&self, key: &str, data: &[u8]) -> Result<String, StorageError> {
        let path = self.resolve(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::Other(format!("key has no parent directory: {}", key)))?
            .to_path_buf();
        fs::create_dir_all(&parent).await?;

        let etag = content_etag(data);
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut tmp = NamedTempFile::new_in(&parent)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Other(format!("spawn_blocking join failed: {}", e)))??;

        Ok(etag)
    }

    /// Create the directory a trailing-slash key denotes. Idempotent.
    pub async fn make_dir(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        fs::create_dir_all(&path).await?;
        Ok(())
    }

    /// Delete a key. A trailing-slash key removes the whole directory
    /// subtree; otherwise a single regular file is removed.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if !path_exists(&path).await {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if key.ends_with('/') {
            fs::remove_dir_all(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }

    /// Recursively enumerate every regular file under `prefix`, keyed by
    /// bucket-root-relative path. A nonexistent prefix yields an empty
    /// listing. Keys are sorted.
    pub async fn list_recursive(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        let root = self.root.clone();
        let start = self.resolve(prefix)?;
        tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            if start.is_dir() {
                walk_files(&start, &root, &mut entries)?;
            }
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(entries)
        })
        .await
        .map_err(|e| StorageError::Other(format!("spawn_blocking join failed: {}", e)))?
    }

    /// Enumerate only the immediate children of `prefix`: files become
    /// object entries, subdirectories become common prefixes (relative path
    /// plus trailing slash). Both lists are sorted.
    pub async fn list_shallow(
        &self,
        prefix: &str,
    ) -> Result<(Vec<ObjectEntry>, Vec<String>), StorageError> {
        let root = self.root.clone();
        let start = self.resolve(prefix)?;
        tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            let mut prefixes = Vec::new();
            if start.is_dir() {
                for dirent in std::fs::read_dir(&start)? {
                    let dirent = dirent?;
                    let path = dirent.path();
                    let rel = relative_key(&path, &root);
                    if dirent.file_type()?.is_dir() {
                        prefixes.push(format!("{}/", rel));
                    } else {
                        entries.push(object_entry(&path, rel)?);
                    }
                }
            }
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            prefixes.sort();
            Ok((entries, prefixes))
        })
        .await
        .map_err(|e| StorageError::Other(format!("spawn_blocking join failed: {}", e)))?
    }
}

/// Bucket-root-relative key for a path, forward-slash separated.
fn relative_key(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build an ObjectEntry for a regular file: size and mtime from metadata,
/// ETag from the full content.
fn object_entry(path: &Path, key: String) -> Result<ObjectEntry, StorageError> {
    let meta = std::fs::metadata(path)?;
    let last_modified = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let data = std::fs::read(path)?;
    Ok(ObjectEntry {
        key,
        size: meta.len(),
        last_modified,
        etag: content_etag(&data),
    })
}

/// Depth-first walk collecting every regular file under `dir`.
fn walk_files(dir: &Path, root: &Path, out: &mut Vec<ObjectEntry>) -> Result<(), StorageError> {
    for dirent in std::fs::read_dir(dir)? {
        let dirent = dirent?;
        let path = dirent.path();
        if dirent.file_type()?.is_dir() {
            walk_files(&path, root, out)?;
        } else {
            let rel = relative_key(&path, root);
            out.push(object_entry(&path, rel)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bucket() -> (TempDir, FsBucket) {
        let dir = TempDir::new().unwrap();
        let bucket = FsBucket::new(dir.path());
        (dir, bucket)
    }

    #[test]
    fn test_resolve_plain_key() {
        let (dir, bucket) = bucket();
        let path = bucket.resolve("a/b/c.txt").unwrap();
        assert_eq!(path, dir.path().join("a/b/c.txt"));
    }

    #[test]
    fn test_resolve_normalizes_dot_and_dotdot() {
        let (dir, bucket) = bucket();
        let path = bucket.resolve("a/./b/../c.txt").unwrap();
        assert_eq!(path, dir.path().join("a/c.txt"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_dir, bucket) = bucket();
        assert!(matches!(
            bucket.resolve("../escape"),
            Err(StorageError::OutsideRoot(_))
        ));
        assert!(matches!(
            bucket.resolve("a/../../escape"),
            Err(StorageError::OutsideRoot(_))
        ));
        assert!(matches!(
            bucket.resolve("/etc/passwd"),
            Err(StorageError::OutsideRoot(_))
        ));
    }

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let (_dir, bucket) = bucket();
        let etag = bucket.write("nested/deep/file.bin", b"hello").await.unwrap();
        assert_eq!(etag, content_etag(b"hello"));

        let data = bucket.read("nested/deep/file.bin").await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn test_overwrite_updates_etag() {
        let (_dir, bucket) = bucket();
        let first = bucket.write("k", b"one").await.unwrap();
        let second = bucket.write("k", b"two").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(bucket.read("k").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_dir, bucket) = bucket();
        assert!(matches!(
            bucket.read("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_read_directory_is_not_a_file() {
        let (_dir, bucket) = bucket();
        bucket.make_dir("somedir/").await.unwrap();
        assert!(matches!(
            bucket.read("somedir").await,
            Err(StorageError::NotAFile(_))
        ));
    }

    #[tokio::test]
    async fn test_make_dir_idempotent() {
        let (_dir, bucket) = bucket();
        bucket.make_dir("d/e/").await.unwrap();
        bucket.make_dir("d/e/").await.unwrap();
        assert!(bucket.exists("d/e/").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_file_and_directory() {
        let (_dir, bucket) = bucket();
        bucket.write("d/one.txt", b"1").await.unwrap();
        bucket.write("d/sub/two.txt", b"2").await.unwrap();

        bucket.delete("d/one.txt").await.unwrap();
        assert!(!bucket.exists("d/one.txt").await.unwrap());
        assert!(bucket.exists("d/sub/two.txt").await.unwrap());

        bucket.delete("d/").await.unwrap();
        assert!(!bucket.exists("d/sub/two.txt").await.unwrap());
        assert!(!bucket.exists("d/").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (_dir, bucket) = bucket();
        assert!(matches!(
            bucket.delete("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_recursive_flat_keys() {
        let (_dir, bucket) = bucket();
        bucket.write("a/x", b"x").await.unwrap();
        bucket.write("a/y", b"y").await.unwrap();
        bucket.write("a/b/z", b"z").await.unwrap();

        let entries = bucket.list_recursive("").await.unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a/b/z", "a/x", "a/y"]);
        assert_eq!(entries[0].size, 1);
        assert_eq!(entries[0].etag, content_etag(b"z"));
    }

    #[tokio::test]
    async fn test_list_shallow_splits_dirs_and_files() {
        let (_dir, bucket) = bucket();
        bucket.write("a/x", b"x").await.unwrap();
        bucket.write("a/y", b"y").await.unwrap();
        bucket.write("a/b/z", b"z").await.unwrap();

        let (entries, prefixes) = bucket.list_shallow("a/").await.unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a/x", "a/y"]);
        assert_eq!(prefixes, vec!["a/b/"]);
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let (_dir, bucket) = bucket();
        assert!(bucket.list_recursive("nope/").await.unwrap().is_empty());
        let (entries, prefixes) = bucket.list_shallow("nope/").await.unwrap();
        assert!(entries.is_empty());
        assert!(prefixes.is_empty());
    }
}
