//! Local directory backend
//!
//! Keys are paths relative to the root, '/' separated. A leading '/' is
//! ignored.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::{File, FileIter, Kv, Metadata, Storage};
use crate::error::{Error, Result};

pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DiskStorage {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reject keys that would leave the root.
fn resolve(root: &Path, key: &str) -> Result<PathBuf> {
    let rel = Path::new(key.trim_start_matches('/'));
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(Error::InvalidArgument(format!("key escapes root: {:?}", key))),
        }
    }
    Ok(root.join(rel))
}

fn key_of(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

impl Storage for DiskStorage {
    fn file(&self, key: &str) -> Box<dyn File> {
        Box::new(DiskFile {
            root: self.root.clone(),
            key: key.trim_start_matches('/').to_string(),
        })
    }

    /// Depth-first walk in file-name order, so resuming after `last_key`
    /// continues where a previous walk stopped.
    fn iter(&self, prefix: &str, last_key: &str) -> FileIter<'_> {
        let prefix = prefix.trim_start_matches('/').to_string();
        let last = PathBuf::from(last_key.trim_start_matches('/'));
        let root = self.root.clone();
        let walk = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => return Some(Err(Error::from(std::io::Error::from(e)))),
                };
                if !entry.file_type().is_file() {
                    return None;
                }
                let key = key_of(&root, entry.path())?;
                // Path ordering is per component, matching the walk order
                if !key.starts_with(&prefix) || (!last.as_os_str().is_empty() && Path::new(&key) <= last.as_path()) {
                    return None;
                }
                Some(Ok(Box::new(DiskFile {
                    root: root.clone(),
                    key,
                }) as Box<dyn File>))
            });
        Box::new(walk)
    }
}

pub struct DiskFile {
    root: PathBuf,
    key: String,
}

impl DiskFile {
    pub fn path(&self) -> Result<PathBuf> {
        resolve(&self.root, &self.key)
    }
}

impl File for DiskFile {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn exist(&self) -> Result<bool> {
        Ok(self.path()?.is_file())
    }

    fn append(&mut self, blob: &[u8], index: u64, _kvs: &[Kv]) -> Result<(u64, String)> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new().write(true).create(true).truncate(false).open(&path)?;
        f.seek(SeekFrom::Start(index))?;
        f.write_all(blob)?;
        Ok((blob.len() as u64, self.key.clone()))
    }

    fn bytes(&self) -> Result<(Vec<u8>, String)> {
        Ok((fs::read(self.path()?)?, self.key.clone()))
    }

    fn delete(&self) -> Result<String> {
        fs::remove_file(self.path()?)?;
        Ok(self.key.clone())
    }

    fn meta(&self) -> Result<Metadata> {
        let md = fs::metadata(self.path()?)?;
        let mut meta = vec![("size".to_string(), md.len().to_string())];
        if let Ok(modified) = md.modified() {
            let ts: DateTime<Utc> = modified.into();
            meta.push(("modified".to_string(), ts.to_rfc3339()));
        }
        Ok(meta)
    }

    fn set_meta(&mut self, _kvs: &[Kv]) -> Result<()> {
        Ok(())
    }
}
