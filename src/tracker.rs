//! Tracker queries: which storage node serves a group or a file

use log::debug;

use crate::config::ClientConfig;
use crate::error::{ProtocolError, Result};
use crate::net::exchange;
use crate::pool::ConnPool;
use crate::protocol::{cmd, GROUP_NAME_LEN, IP_ADDR_LEN, QUERY_FETCH_BODY_LEN, QUERY_STORE_BODY_LEN};
use crate::protocol_core::{build_header, put_fixed, read_u64, strip_fixed};

/// Storage endpoint as answered by a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageInfo {
    pub ip_addr: String,
    pub port: u16,
    pub group_name: String,
    pub store_path_index: u8,
}

impl StorageInfo {
    /// group_name(16) ip_addr(15) port(8) [store_path_index(1)]
    pub fn decode(b: &[u8]) -> Result<Self> {
        if b.len() != QUERY_STORE_BODY_LEN && b.len() != QUERY_FETCH_BODY_LEN {
            return Err(ProtocolError::BodyLength {
                got: b.len(),
                expected: QUERY_FETCH_BODY_LEN,
            }
            .into());
        }
        let ip_end = GROUP_NAME_LEN + IP_ADDR_LEN;
        let port = read_u64(&b[ip_end..ip_end + 8]);
        let port = u16::try_from(port).map_err(|_| ProtocolError::BadPort(port))?;
        Ok(StorageInfo {
            group_name: strip_fixed(&b[..GROUP_NAME_LEN]),
            ip_addr: strip_fixed(&b[GROUP_NAME_LEN..ip_end]),
            port,
            store_path_index: b.get(QUERY_FETCH_BODY_LEN).copied().unwrap_or(0),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip_addr, self.port)
    }
}

pub struct TrackerClient {
    host: String,
    port: u16,
    config: ClientConfig,
    pool: ConnPool,
}

impl TrackerClient {
    pub fn new(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        Ok(TrackerClient {
            host: host.to_string(),
            port,
            config: config.clone(),
            pool: ConnPool::tcp(host, port, config)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pool(&self) -> &ConnPool {
        &self.pool
    }

    /// Storage node to upload into `group`.
    pub fn query_store(&self, group: &str) -> Result<StorageInfo> {
        let mut head = build_header(cmd::TRACKER_QUERY_STORE_WITH_GROUP_ONE, GROUP_NAME_LEN as u64).to_vec();
        put_fixed(&mut head, group, GROUP_NAME_LEN);
        self.query(&head, QUERY_STORE_BODY_LEN)
    }

    /// Storage node allowed to modify `file` (append, slave upload, delete).
    pub fn query_update(&self, group: &str, file: &str) -> Result<StorageInfo> {
        self.query_file(cmd::TRACKER_QUERY_UPDATE, group, file)
    }

    /// Storage node to download `file` from.
    pub fn query_fetch(&self, group: &str, file: &str) -> Result<StorageInfo> {
        self.query_file(cmd::TRACKER_QUERY_FETCH_ONE, group, file)
    }

    fn query_file(&self, command: u8, group: &str, file: &str) -> Result<StorageInfo> {
        let mut head = build_header(command, (GROUP_NAME_LEN + file.len()) as u64).to_vec();
        put_fixed(&mut head, group, GROUP_NAME_LEN);
        head.extend_from_slice(file.as_bytes());
        self.query(&head, QUERY_FETCH_BODY_LEN)
    }

    fn query(&self, head: &[u8], expected: usize) -> Result<StorageInfo> {
        let mut conn = self.pool.acquire()?;
        let resp = exchange(&mut conn, head, &[], Some(expected as i64), self.config.io_timeout);
        conn.release().ok();
        let resp = resp?;
        if resp.len() != expected {
            return Err(ProtocolError::BodyLength {
                got: resp.len(),
                expected,
            }
            .into());
        }
        let info = StorageInfo::decode(&resp)?;
        debug!("tracker {} routed to {} ({})", self.addr(), info.addr(), info.group_name);
        Ok(info)
    }

    pub fn close(&self) {
        self.pool.close();
    }
}
