//! A [`RecordStore`] keeping one file per record.
//!
//! Keys are percent-encoded into file names, so every record lives directly
//! in the store directory as `<encoded key>.json`.

use async_trait::async_trait;
use formulate::{Error, RecordStore, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const EXTENSION: &str = ".json";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create, if needed) the store at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::storage(format!("{}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", encode_key(key), EXTENSION))
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_of(key);
        // Write next to the target and rename, so readers never see half a record.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)
            .await
            .map_err(|e| io_error(&staging, e))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|e| io_error(&path, e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_of(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))?;
        let mut records = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| io_error(&self.root, e))? {
            let file_name = entry.file_name();
            let Some(key) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(EXTENSION))
                .and_then(decode_key)
            else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            let bytes = fs::read(entry.path())
                .await
                .map_err(|e| io_error(&entry.path(), e))?;
            records.push((key, bytes));
        }
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }
}

fn io_error(path: &Path, e: std::io::Error) -> Error {
    Error::storage(format!("{}: {}", path.display(), e))
}

fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_encoding_is_reversible() {
        let key = "bundle/npv:1.0.0";
        let encoded = encode_key(key);
        assert_eq!(encoded, "bundle%2Fnpv%3A1.0.0");
        assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        assert_eq!(decode_key("bad%2"), None);
    }

    #[tokio::test]
    async fn records_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put("bundle/a:1", b"one".to_vec()).await.unwrap();
        store.put("bundle/a:2", b"two".to_vec()).await.unwrap();
        store.put("formula/a", b"def".to_vec()).await.unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("bundle/a:1").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(reopened.get("bundle/missing").await.unwrap(), None);

        let keys: Vec<String> = reopened
            .scan_prefix("bundle/")
            .await
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["bundle/a:1", "bundle/a:2"]);

        reopened.delete("bundle/a:1").await.unwrap();
        reopened.delete("bundle/a:1").await.unwrap();
        assert_eq!(reopened.scan_prefix("bundle/").await.unwrap().len(), 1);
    }
}
