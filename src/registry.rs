//! One shared storage client per endpoint, created on first use

use log::debug;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::storage::StorageClient;

pub struct StorageRegistry {
    config: ClientConfig,
    clients: RwLock<HashMap<String, Arc<StorageClient>>>,
}

impl StorageRegistry {
    pub fn new(config: &ClientConfig) -> Self {
        StorageRegistry {
            config: config.clone(),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Shared client for `ip:port`. Concurrent first calls for the same
    /// endpoint all get the same instance.
    pub fn get_or_create(&self, ip: &str, port: u16) -> Result<Arc<StorageClient>> {
        let key = format!("{}:{}", ip, port);
        if let Some(client) = self.clients.read().get(&key) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write();
        match clients.entry(key) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(e) => {
                // pools dial lazily, so building under the lock costs no I/O
                let client = Arc::new(StorageClient::new(ip, port, &self.config)?);
                debug!("registered storage client {}", e.key());
                Ok(e.insert(client).clone())
            }
        }
    }

    pub fn get(&self, ip: &str, port: u16) -> Option<Arc<StorageClient>> {
        self.clients.read().get(&format!("{}:{}", ip, port)).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every pool and forget all endpoints.
    pub fn close(&self) {
        let clients: Vec<_> = self.clients.write().drain().map(|(_, c)| c).collect();
        for client in clients {
            client.close();
        }
    }
}
