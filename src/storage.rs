//! Storage node operations over a per-endpoint connection pool

use log::debug;

use crate::config::ClientConfig;
use crate::error::{ProtocolError, Result};
use crate::net::exchange;
use crate::pool::ConnPool;
use crate::protocol::{
    cmd, EXT_NAME_LEN, GROUP_NAME_LEN, MAX_DOWNLOAD_RESP_LEN, MAX_UPLOAD_RESP_LEN, PREFIX_NAME_LEN,
};
use crate::protocol_core::{build_header, join_file_id, put_fixed, put_u64, strip_fixed};
use crate::tracker::StorageInfo;

pub struct StorageClient {
    host: String,
    port: u16,
    config: ClientConfig,
    pool: ConnPool,
}

impl StorageClient {
    pub fn new(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        Ok(StorageClient {
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

    fn call(&self, head: &[u8], body: &[u8], max_body_len: i64) -> Result<Vec<u8>> {
        let mut conn = self.pool.acquire()?;
        let resp = exchange(&mut conn, head, body, Some(max_body_len), self.config.io_timeout);
        conn.release().ok();
        resp
    }

    /// Upload `blob` into the group and store path picked by the tracker.
    /// Returns the new file id.
    pub fn upload(&self, info: &StorageInfo, blob: &[u8], ext: &str, appender: bool) -> Result<String> {
        let command = if appender {
            cmd::STORAGE_UPLOAD_APPENDER_FILE
        } else {
            cmd::STORAGE_UPLOAD_FILE
        };
        // store_path_index(1) file_size(8) ext(6)
        let fields = 1 + 8 + EXT_NAME_LEN;
        let mut head = build_header(command, (fields + blob.len()) as u64).to_vec();
        head.push(info.store_path_index);
        put_u64(&mut head, blob.len() as u64);
        put_fixed(&mut head, ext, EXT_NAME_LEN);

        let resp = self.call(&head, blob, MAX_UPLOAD_RESP_LEN)?;
        let file_id = parse_upload_answer(&resp)?;
        debug!("{}: uploaded {} bytes as {}", self.addr(), blob.len(), file_id);
        Ok(file_id)
    }

    /// Upload `blob` as a slave of `master`, named after it with `prefix`.
    pub fn upload_slave(&self, blob: &[u8], master: &str, prefix: &str, ext: &str) -> Result<String> {
        // master_len(8) file_size(8) prefix(16) ext(6) master(n)
        let fields = 8 + 8 + PREFIX_NAME_LEN + EXT_NAME_LEN + master.len();
        let mut head = build_header(cmd::STORAGE_UPLOAD_SLAVE_FILE, (fields + blob.len()) as u64).to_vec();
        put_u64(&mut head, master.len() as u64);
        put_u64(&mut head, blob.len() as u64);
        put_fixed(&mut head, prefix, PREFIX_NAME_LEN);
        put_fixed(&mut head, ext, EXT_NAME_LEN);
        head.extend_from_slice(master.as_bytes());

        let resp = self.call(&head, blob, MAX_UPLOAD_RESP_LEN)?;
        parse_upload_answer(&resp)
    }

    /// Append `blob` to an existing appender file.
    pub fn append(&self, blob: &[u8], file: &str) -> Result<()> {
        // name_len(8) file_size(8) name(n)
        let fields = 8 + 8 + file.len();
        let mut head = build_header(cmd::STORAGE_APPEND_FILE, (fields + blob.len()) as u64).to_vec();
        put_u64(&mut head, file.len() as u64);
        put_u64(&mut head, blob.len() as u64);
        head.extend_from_slice(file.as_bytes());

        self.call(&head, blob, MAX_UPLOAD_RESP_LEN)?;
        Ok(())
    }

    pub fn delete(&self, info: &StorageInfo, file: &str) -> Result<()> {
        let mut head = build_header(cmd::STORAGE_DELETE_FILE, (GROUP_NAME_LEN + file.len()) as u64).to_vec();
        put_fixed(&mut head, &info.group_name, GROUP_NAME_LEN);
        head.extend_from_slice(file.as_bytes());

        self.call(&head, &[], 0)?;
        Ok(())
    }

    /// Read `size` bytes from `offset`; a size of zero reads to the end.
    pub fn download(&self, info: &StorageInfo, file: &str, offset: u64, size: u64) -> Result<Vec<u8>> {
        // offset(8) size(8) group(16) name(n)
        let fields = 8 + 8 + GROUP_NAME_LEN + file.len();
        let mut head = build_header(cmd::STORAGE_DOWNLOAD_FILE, fields as u64).to_vec();
        put_u64(&mut head, offset);
        put_u64(&mut head, size);
        put_fixed(&mut head, &info.group_name, GROUP_NAME_LEN);
        head.extend_from_slice(file.as_bytes());

        self.call(&head, &[], MAX_DOWNLOAD_RESP_LEN)
    }

    pub fn close(&self) {
        self.pool.close();
    }
}

/// group_name(16) remote_file_name(n)
fn parse_upload_answer(resp: &[u8]) -> Result<String> {
    if resp.len() < GROUP_NAME_LEN {
        return Err(ProtocolError::ShortBody {
            got: resp.len(),
            min: GROUP_NAME_LEN,
        }
        .into());
    }
    let group = strip_fixed(&resp[..GROUP_NAME_LEN]);
    let name = String::from_utf8_lossy(&resp[GROUP_NAME_LEN..]);
    Ok(join_file_id(&group, &name))
}
