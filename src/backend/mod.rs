//! Generic file-storage interface and its backends
//!
//! Callers that only need "store these bytes under a key" program against
//! `Storage`/`File`; the cluster client and the local filesystem both
//! implement it.

pub mod disk;
pub mod fdfs;

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Metadata pair, e.g. ("group", "group1").
pub type Kv = (String, String);

pub type Metadata = Vec<Kv>;

/// Look up `name` in metadata pairs; the last occurrence wins.
pub fn kv_get<'a>(kvs: &'a [Kv], name: &str) -> Option<&'a str> {
    kvs.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

pub trait File: Send {
    fn key(&self) -> String;

    fn exist(&self) -> Result<bool>;

    /// Write `blob` at `index`. Returns bytes written and the (possibly
    /// newly assigned) key.
    fn append(&mut self, blob: &[u8], index: u64, kvs: &[Kv]) -> Result<(u64, String)>;

    fn bytes(&self) -> Result<(Vec<u8>, String)>;

    fn delete(&self) -> Result<String>;

    fn meta(&self) -> Result<Metadata>;

    fn set_meta(&mut self, kvs: &[Kv]) -> Result<()>;
}

pub type FileIter<'a> = Box<dyn Iterator<Item = Result<Box<dyn File>>> + 'a>;

pub trait Storage: Send + Sync {
    fn file(&self, key: &str) -> Box<dyn File>;

    /// Files whose key starts with `prefix`, beginning after `last_key`.
    /// Every call starts a fresh walk.
    fn iter(&self, prefix: &str, last_key: &str) -> FileIter<'_>;

    fn store_file(&self, key: &str, blob: &[u8], kvs: &[Kv]) -> Result<String> {
        let mut f = self.file(key);
        let (_, key) = f.append(blob, 0, kvs)?;
        Ok(key)
    }
}

/// Build a backend by name from a flat string map ("fdfs" or "disk").
pub fn open_storage(kind: &str, config: &HashMap<String, String>) -> Result<Box<dyn Storage>> {
    match kind {
        "fdfs" => Ok(Box::new(fdfs::FdfsStorage::from_map(config)?)),
        "disk" => {
            let dir = config
                .get("dir")
                .filter(|d| !d.is_empty())
                .ok_or_else(|| Error::InvalidConfig("disk backend needs 'dir'".into()))?;
            Ok(Box::new(disk::DiskStorage::new(dir)))
        }
        other => Err(Error::InvalidConfig(format!("unknown storage backend '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_get() {
        let kvs = vec![
            ("group".to_string(), "g1".to_string()),
            ("ext".to_string(), "jpg".to_string()),
            ("group".to_string(), "g2".to_string()),
        ];
        assert_eq!(kv_get(&kvs, "group"), Some("g2"));
        assert_eq!(kv_get(&kvs, "ext"), Some("jpg"));
        assert_eq!(kv_get(&kvs, "missing"), None);
    }

    #[test]
    fn test_open_storage() {
        let mut map = HashMap::new();
        assert!(open_storage("disk", &map).is_err());
        map.insert("dir".to_string(), "/tmp".to_string());
        assert!(open_storage("disk", &map).is_ok());
        assert!(matches!(open_storage("oss", &map), Err(Error::InvalidConfig(_))));

        map.insert("host".to_string(), "127.0.0.1".to_string());
        assert!(open_storage("fdfs", &map).is_ok());
    }
}
