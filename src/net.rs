use log::debug;
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::{Error, ProtocolError, Result, StatusCategory};
use crate::pool::PooledConn;
use crate::protocol::{HEADER_LEN, MAX_ERROR_BODY_LEN};
use crate::protocol_core::parse_header;

/// Write the request head (frame header plus fixed fields) and the body.
/// An empty body is not written.
pub fn send_request<W: Write>(stream: &mut W, head: &[u8], body: &[u8]) -> Result<()> {
    stream.write_all(head)?;
    if !body.is_empty() {
        stream.write_all(body)?;
    }
    stream.flush()?;
    Ok(())
}

fn read_exact<R: Read>(stream: &mut R, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read one response frame and return its body.
///
/// A nonzero status becomes `ProtocolError::Status`. With `max_body_len`
/// set, a larger declared length is rejected before any body byte is read.
/// A diagnostic body after an error status is consumed only while it fits
/// both `max_body_len` and `MAX_ERROR_BODY_LEN`; otherwise the answer is
/// `ProtocolError::OversizedStatus` and nothing more is read.
pub fn recv_response<R: Read>(stream: &mut R, max_body_len: Option<i64>) -> Result<Vec<u8>> {
    let mut hdr = [0u8; HEADER_LEN];
    stream.read_exact(&mut hdr)?;
    let header = parse_header(&hdr)?;
    if header.status != 0 {
        let category = StatusCategory::from_status(header.status);
        let cap = max_body_len.map_or(MAX_ERROR_BODY_LEN, |max| max.min(MAX_ERROR_BODY_LEN));
        if header.body_len > cap {
            return Err(ProtocolError::OversizedStatus {
                status: header.status,
                category,
                len: header.body_len,
                max: cap,
            }
            .into());
        }
        if header.body_len > 0 {
            // diagnostic only; consume it so the stream stays aligned
            let want = header.body_len as u64;
            if io::copy(&mut stream.by_ref().take(want), &mut io::sink())? != want {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short error body").into());
            }
        }
        return Err(ProtocolError::Status {
            status: header.status,
            category,
        }
        .into());
    }
    if let Some(max) = max_body_len {
        if header.body_len > max {
            return Err(ProtocolError::TooLarge {
                len: header.body_len,
                max,
            }
            .into());
        }
    }
    if header.body_len == 0 {
        return Ok(Vec::new());
    }
    read_exact(stream, header.body_len as usize)
}

/// One request/response round trip on a pooled connection, every socket
/// operation bounded by `timeout`. Unless the server cleanly answered with an
/// error status, a failed exchange leaves the connection unusable.
pub fn exchange(
    conn: &mut PooledConn<'_>,
    head: &[u8],
    body: &[u8],
    max_body_len: Option<i64>,
    timeout: Duration,
) -> Result<Vec<u8>> {
    conn.set_io_timeout(timeout)?;
    let res = match send_request(conn, head, body) {
        Ok(()) => recv_response(conn, max_body_len),
        Err(e) => Err(e),
    };
    let resp = match res {
        Ok(resp) => resp,
        Err(e) => {
            // only a fully consumed error answer leaves the stream framed
            if !matches!(e, Error::Protocol(ProtocolError::Status { .. })) {
                conn.mark_unusable();
            }
            return Err(e);
        }
    };
    debug!(
        "exchange cmd={} sent={} received={}",
        head.get(8).copied().unwrap_or_default(),
        head.len() + body.len(),
        resp.len()
    );
    Ok(resp)
}
