use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{kv_get, File, FileIter, Kv, Metadata, Storage};
use crate::client::Client;
use crate::config::{ClientConfig, Settings};
use crate::error::{Error, Result};

pub const GROUP_KEY: &str = "group";
pub const EXT_KEY: &str = "ext";

/// Builds the cluster client on first use and hands out the same one
/// afterwards.
pub struct Connector {
    host: String,
    port: u16,
    config: ClientConfig,
    client: Mutex<Option<Arc<Client>>>,
}

impl Connector {
    pub fn new(host: &str, port: u16, config: ClientConfig) -> Self {
        Connector {
            host: host.to_string(),
            port,
            config,
            client: Mutex::new(None),
        }
    }

    pub fn client(&self) -> Result<Arc<Client>> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = Arc::new(Client::new(&self.host, self.port, self.config.clone())?);
        *slot = Some(client.clone());
        Ok(client)
    }

    pub fn close(&self) {
        if let Some(client) = self.client.lock().take() {
            client.close();
        }
    }
}

pub struct FdfsStorage {
    connector: Arc<Connector>,
}

impl FdfsStorage {
    pub fn new(host: &str, port: u16, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(FdfsStorage {
            connector: Arc::new(Connector::new(host, port, config)),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        FdfsStorage::new(&settings.tracker.host, settings.tracker.port, settings.client_config()?)
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        FdfsStorage::from_settings(&Settings::from_map(map)?)
    }

    pub fn close(&self) {
        self.connector.close();
    }
}

impl Storage for FdfsStorage {
    fn file(&self, key: &str) -> Box<dyn File> {
        Box::new(FdfsFile {
            connector: self.connector.clone(),
            key: key.to_string(),
        })
    }

    // Listing is not part of the cluster protocol.
    fn iter(&self, _prefix: &str, _last_key: &str) -> FileIter<'_> {
        Box::new(std::iter::empty())
    }
}

/// A file id on the cluster. An empty key means "not uploaded yet".
pub struct FdfsFile {
    connector: Arc<Connector>,
    key: String,
}

impl File for FdfsFile {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn exist(&self) -> Result<bool> {
        Ok(false)
    }

    /// Without a key the blob is uploaded into the `group` metadata pair's
    /// group with the `ext` extension; with one it is appended.
    fn append(&mut self, blob: &[u8], _index: u64, kvs: &[Kv]) -> Result<(u64, String)> {
        let client = self.connector.client()?;
        if !self.key.is_empty() {
            client.append_file(blob, &self.key)?;
            return Ok((blob.len() as u64, self.key.clone()));
        }
        let group = kv_get(kvs, GROUP_KEY).unwrap_or_default();
        let ext = kv_get(kvs, EXT_KEY).unwrap_or_default();
        if group.is_empty() || ext.is_empty() {
            return Err(Error::InvalidArgument(
                "please set group and ext parameters".into(),
            ));
        }
        let key = client.upload_by_buffer(group, blob, ext)?;
        self.key = key.clone();
        Ok((blob.len() as u64, key))
    }

    fn bytes(&self) -> Result<(Vec<u8>, String)> {
        let client = self.connector.client()?;
        let blob = client.download_to_buffer(&self.key)?;
        Ok((blob, self.key.clone()))
    }

    fn delete(&self) -> Result<String> {
        let client = self.connector.client()?;
        client.delete_file(&self.key)?;
        Ok(self.key.clone())
    }

    fn meta(&self) -> Result<Metadata> {
        Ok(Metadata::new())
    }

    fn set_meta(&mut self, _kvs: &[Kv]) -> Result<()> {
        Ok(())
    }
}
