//! Shared protocol constants for the tracker/storage framed transport

// Frame header: body length (8, big-endian) | command (1) | status (1)
pub const HEADER_LEN: usize = 10;

// Fixed-width string fields, always null padded on the wire
pub const GROUP_NAME_LEN: usize = 16;
pub const PREFIX_NAME_LEN: usize = 16;
pub const EXT_NAME_LEN: usize = 6;
// ip field in tracker answers is 16 bytes on the server side, the last one is dropped
pub const IP_ADDR_LEN: usize = 15;

// group(16) + ip(15) + port(8) + store_path_index(1)
pub const QUERY_STORE_BODY_LEN: usize = GROUP_NAME_LEN + IP_ADDR_LEN + 8 + 1;
// group(16) + ip(15) + port(8)
pub const QUERY_FETCH_BODY_LEN: usize = GROUP_NAME_LEN + IP_ADDR_LEN + 8;

// Upload/append answers carry at most a group name and a remote file name
pub const MAX_UPLOAD_RESP_LEN: i64 = 130;
// Download ceiling (128MB) - protects against a hostile body length
pub const MAX_DOWNLOAD_RESP_LEN: i64 = 128 * 1024 * 1024;
// Diagnostic body that may follow an error status; longer ones are not read
pub const MAX_ERROR_BODY_LEN: i64 = 1024;

// Command ids (numeric values are fixed by the servers)
pub mod cmd {
    pub const RESP: u8 = 100;

    pub const TRACKER_QUERY_FETCH_ONE: u8 = 102;
    pub const TRACKER_QUERY_UPDATE: u8 = 103;
    pub const TRACKER_QUERY_STORE_WITH_GROUP_ONE: u8 = 104;

    pub const STORAGE_UPLOAD_FILE: u8 = 11;
    pub const STORAGE_DELETE_FILE: u8 = 12;
    pub const STORAGE_DOWNLOAD_FILE: u8 = 14;
    pub const STORAGE_UPLOAD_SLAVE_FILE: u8 = 21;
    pub const STORAGE_UPLOAD_APPENDER_FILE: u8 = 23;
    pub const STORAGE_APPEND_FILE: u8 = 24;
}

// Status bytes the servers answer with (errno values)
pub mod status {
    pub const OK: u8 = 0;
    pub const FILE_NOT_EXIST: u8 = 2;
    pub const INVALID_ARGUMENT: u8 = 22;
}

// Centralized timeout constants
pub mod timeouts {
    // How long acquire() waits for a slot before giving up (ms)
    pub const POOL_WAIT_MS: u64 = 3000;

    // Defaults used when no configuration says otherwise (secs)
    pub const CONNECT_SECS: u64 = 3;
    pub const IO_SECS: u64 = 3;
    pub const IDLE_SECS: u64 = 100;
}

// Default pool sizing
pub const DEFAULT_POOL_SIZE: usize = 3;
pub const DEFAULT_POOL_INIT_SIZE: usize = 3;
