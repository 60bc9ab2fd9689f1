//! Frame header codec and fixed-width field helpers
//!
//! Everything here is stateless and shared by the tracker and storage
//! clients as well as the test servers.

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::HEADER_LEN;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub body_len: i64,
    pub cmd: u8,
    pub status: u8,
}

/// Build frame header (10 bytes)
/// Format: LENGTH (8, big-endian) | CMD (1) | STATUS (1)
pub fn build_header(cmd: u8, body_len: u64) -> [u8; HEADER_LEN] {
    build_header_with_status(cmd, body_len, 0)
}

/// Same as `build_header` with an explicit status byte (servers answer with one).
pub fn build_header_with_status(cmd: u8, body_len: u64, status: u8) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..8].copy_from_slice(&body_len.to_be_bytes());
    header[8] = cmd;
    header[9] = status;
    header
}

/// Parse frame header. Only the length is validated; the status is left to
/// the caller.
pub fn parse_header(header: &[u8; HEADER_LEN]) -> Result<Header> {
    let mut len = [0u8; 8];
    len.copy_from_slice(&header[0..8]);
    let body_len = i64::from_be_bytes(len);
    if body_len < 0 {
        return Err(ProtocolError::NegativeLength(body_len).into());
    }
    Ok(Header {
        body_len,
        cmd: header[8],
        status: header[9],
    })
}

/// Append `s` to `buf` truncated or zero-padded to exactly `width` bytes.
pub fn put_fixed(buf: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (width - n), 0);
}

pub fn fixed(s: &str, width: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(width);
    put_fixed(&mut buf, s, width);
    buf
}

/// Decode a fixed-width field: everything before the first NUL.
pub fn strip_fixed(b: &[u8]) -> String {
    let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
    String::from_utf8_lossy(&b[..end]).into_owned()
}

pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn read_u64(b: &[u8]) -> u64 {
    let mut v = [0u8; 8];
    v.copy_from_slice(&b[..8]);
    u64::from_be_bytes(v)
}

/// Split "group/remote/name" on the first '/'.
pub fn split_file_id(file_id: &str) -> Result<(&str, &str)> {
    match file_id.split_once('/') {
        Some((group, name)) if !group.is_empty() && !name.is_empty() => Ok((group, name)),
        _ => Err(Error::InvalidArgument(format!("bad file id: {:?}", file_id))),
    }
}

pub fn join_file_id(group: &str, name: &str) -> String {
    format!("{}/{}", group, name.trim_start_matches('/'))
}

/// Text after the last '.', empty if there is none.
pub fn file_ext(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{cmd, EXT_NAME_LEN, GROUP_NAME_LEN};

    #[test]
    fn test_header_round_trip() {
        for (c, len) in [(cmd::STORAGE_UPLOAD_FILE, 0u64), (cmd::RESP, 12345), (255, i64::MAX as u64)] {
            let header = build_header(c, len);
            let parsed = parse_header(&header).unwrap();
            assert_eq!(parsed.cmd, c);
            assert_eq!(parsed.body_len as u64, len);
            assert_eq!(parsed.status, 0);
        }
    }

    #[test]
    fn test_header_layout() {
        let header = build_header(cmd::TRACKER_QUERY_STORE_WITH_GROUP_ONE, 16);
        assert_eq!(header, [0, 0, 0, 0, 0, 0, 0, 16, 104, 0]);
    }

    #[test]
    fn test_parse_header_negative_length() {
        let header = build_header(cmd::RESP, u64::MAX);
        let err = parse_header(&header).unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::NegativeLength(-1))));
    }

    #[test]
    fn test_parse_header_keeps_status() {
        let header = build_header_with_status(cmd::RESP, 0, 2);
        assert_eq!(parse_header(&header).unwrap().status, 2);
    }

    #[test]
    fn test_fixed_width_round_trip() {
        for s in ["", "g", "group1", "exactly16bytes!!"] {
            let f = fixed(s, GROUP_NAME_LEN);
            assert_eq!(f.len(), GROUP_NAME_LEN);
            assert_eq!(strip_fixed(&f), s);
        }
    }

    #[test]
    fn test_fixed_width_truncates() {
        let f = fixed("jpegxl", EXT_NAME_LEN);
        assert_eq!(&f, b"jpegxl");
        let f = fixed("toolongext", EXT_NAME_LEN);
        assert_eq!(&f, b"toolon");
        // deterministic
        assert_eq!(fixed("toolongext", EXT_NAME_LEN), f);
    }

    #[test]
    fn test_strip_fixed_stops_at_first_nul() {
        assert_eq!(strip_fixed(b"ab\0cd\0\0"), "ab");
        assert_eq!(strip_fixed(b"abc"), "abc");
    }

    #[test]
    fn test_split_file_id() {
        assert_eq!(split_file_id("g1/foo/bar.txt").unwrap(), ("g1", "foo/bar.txt"));
        assert!(matches!(split_file_id("noSlash"), Err(Error::InvalidArgument(_))));
        assert!(split_file_id("/name").is_err());
        assert!(split_file_id("group/").is_err());
    }

    #[test]
    fn test_join_file_id() {
        assert_eq!(join_file_id("group1", "M00/00/00/abc.txt"), "group1/M00/00/00/abc.txt");
        assert_eq!(join_file_id("group1", "/abc"), "group1/abc");
    }

    #[test]
    fn test_file_ext() {
        assert_eq!(file_ext("photo.jpg"), "jpg");
        assert_eq!(file_ext("archive.tar.gz"), "gz");
        assert_eq!(file_ext("README"), "");
    }

    #[test]
    fn test_u64_helpers() {
        let mut buf = Vec::new();
        put_u64(&mut buf, 23000);
        assert_eq!(buf.len(), 8);
        assert_eq!(read_u64(&buf), 23000);
    }
}
