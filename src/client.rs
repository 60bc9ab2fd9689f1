//! Client facade: ask the tracker, then talk to the storage node it names

use log::debug;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::protocol_core::split_file_id;
use crate::registry::StorageRegistry;
use crate::tracker::TrackerClient;

/// Entry point for file operations against one tracker.
///
/// Owns the tracker connection pool and one storage pool per storage
/// endpoint the tracker routes to. Safe to share between threads.
pub struct Client {
    config: ClientConfig,
    tracker: TrackerClient,
    storages: StorageRegistry,
}

impl Client {
    pub fn new(tracker_host: &str, tracker_port: u16, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let tracker = TrackerClient::new(tracker_host, tracker_port, &config)?;
        Ok(Client {
            storages: StorageRegistry::new(&config),
            tracker,
            config,
        })
    }

    pub fn with_defaults(tracker_host: &str, tracker_port: u16) -> Result<Self> {
        Client::new(tracker_host, tracker_port, ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tracker(&self) -> &TrackerClient {
        &self.tracker
    }

    pub fn storages(&self) -> &StorageRegistry {
        &self.storages
    }

    pub fn upload_by_buffer(&self, group: &str, blob: &[u8], ext: &str) -> Result<String> {
        self.upload(group, blob, ext, false)
    }

    /// Upload a file that later accepts `append_file`.
    pub fn upload_appender_by_buffer(&self, group: &str, blob: &[u8], ext: &str) -> Result<String> {
        self.upload(group, blob, ext, true)
    }

    fn upload(&self, group: &str, blob: &[u8], ext: &str, appender: bool) -> Result<String> {
        let info = self.tracker.query_store(group)?;
        let storage = self.storages.get_or_create(&info.ip_addr, info.port)?;
        storage.upload(&info, blob, ext, appender)
    }

    /// Upload `blob` as a slave of the file `master_id`.
    pub fn upload_slave_by_buffer(&self, blob: &[u8], master_id: &str, prefix: &str, ext: &str) -> Result<String> {
        let (group, master) = split_file_id(master_id)?;
        let info = self.tracker.query_update(group, master)?;
        let storage = self.storages.get_or_create(&info.ip_addr, info.port)?;
        storage.upload_slave(blob, master, prefix, ext)
    }

    pub fn append_file(&self, blob: &[u8], appender_id: &str) -> Result<()> {
        let (group, name) = split_file_id(appender_id)?;
        let info = self.tracker.query_update(group, name)?;
        let storage = self.storages.get_or_create(&info.ip_addr, info.port)?;
        storage.append(blob, name)
    }

    pub fn delete_file(&self, file_id: &str) -> Result<()> {
        let (group, name) = split_file_id(file_id)?;
        let info = self.tracker.query_update(group, name)?;
        let storage = self.storages.get_or_create(&info.ip_addr, info.port)?;
        storage.delete(&info, name)?;
        debug!("deleted {}", file_id);
        Ok(())
    }

    pub fn download_to_buffer(&self, file_id: &str) -> Result<Vec<u8>> {
        self.download_to_buffer_by_offset(file_id, 0, 0)
    }

    /// `size` of zero reads to the end of the file.
    pub fn download_to_buffer_by_offset(&self, file_id: &str, offset: u64, size: u64) -> Result<Vec<u8>> {
        let (group, name) = split_file_id(file_id)?;
        let info = self.tracker.query_fetch(group, name)?;
        let storage = self.storages.get_or_create(&info.ip_addr, info.port)?;
        storage.download(&info, name, offset, size)
    }

    /// Close the tracker pool and every storage pool.
    pub fn close(&self) {
        self.tracker.close();
        self.storages.close();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}
