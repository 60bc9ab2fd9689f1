// In-process tracker + storage pair speaking the wire protocol, for tests.
#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fdfs::protocol::{
    cmd, status, EXT_NAME_LEN, GROUP_NAME_LEN, HEADER_LEN, IP_ADDR_LEN, MAX_DOWNLOAD_RESP_LEN,
    PREFIX_NAME_LEN,
};
use fdfs::protocol_core::{build_header_with_status, fixed, parse_header, put_u64, read_u64, strip_fixed};
use fdfs::ClientConfig;

pub const GROUP: &str = "group1";

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TrackerMode {
    Normal,
    // answers every query with a 30 byte body
    ShortBody,
    // declares an i64::MAX body and sends none of it
    HugeLength,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Normal,
    // download answers declare a body above the client ceiling
    HugeDownload,
    // delete answers "not found" with an endless diagnostic body
    HugeErrorBody,
}

pub struct MockCluster {
    pub tracker_port: u16,
    pub storage_port: u16,
    pub files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub tracker_conns: Arc<AtomicUsize>,
    pub storage_conns: Arc<AtomicUsize>,
}

impl MockCluster {
    pub fn start() -> Self {
        Self::start_with(TrackerMode::Normal, StorageMode::Normal)
    }

    pub fn start_with(tracker_mode: TrackerMode, storage_mode: StorageMode) -> Self {
        let files = Arc::new(Mutex::new(HashMap::new()));
        let tracker_conns = Arc::new(AtomicUsize::new(0));
        let storage_conns = Arc::new(AtomicUsize::new(0));

        let storage = TcpListener::bind("127.0.0.1:0").unwrap();
        let storage_port = storage.local_addr().unwrap().port();
        {
            let files = files.clone();
            let conns = storage_conns.clone();
            let counter = Arc::new(AtomicUsize::new(0));
            serve(storage, conns, move |s| {
                storage_conn(s, storage_mode, &files, &counter)
            });
        }

        let tracker = TcpListener::bind("127.0.0.1:0").unwrap();
        let tracker_port = tracker.local_addr().unwrap().port();
        serve(tracker, tracker_conns.clone(), move |s| {
            tracker_conn(s, tracker_mode, storage_port)
        });

        MockCluster {
            tracker_port,
            storage_port,
            files,
            tracker_conns,
            storage_conns,
        }
    }

    pub fn config() -> ClientConfig {
        ClientConfig {
            pool_size: 2,
            pool_init_size: 1,
            connect_timeout: Duration::from_secs(2),
            idle_time: Duration::from_secs(60),
            io_timeout: Duration::from_secs(2),
        }
    }

    pub fn client(&self) -> fdfs::Client {
        fdfs::Client::new("127.0.0.1", self.tracker_port, Self::config()).unwrap()
    }
}

fn serve<F>(listener: TcpListener, conns: Arc<AtomicUsize>, handler: F)
where
    F: Fn(&mut TcpStream) -> io::Result<()> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            conns.fetch_add(1, Ordering::SeqCst);
            let handler = handler.clone();
            thread::spawn(move || {
                // loop until the client hangs up
                while handler(&mut stream).is_ok() {}
            });
        }
    });
}

fn read_frame(s: &mut TcpStream) -> io::Result<(u8, Vec<u8>)> {
    let mut hdr = [0u8; HEADER_LEN];
    s.read_exact(&mut hdr)?;
    let h = parse_header(&hdr).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let mut body = vec![0u8; h.body_len as usize];
    s.read_exact(&mut body)?;
    Ok((h.cmd, body))
}

fn write_frame(s: &mut TcpStream, st: u8, body: &[u8]) -> io::Result<()> {
    s.write_all(&build_header_with_status(cmd::RESP, body.len() as u64, st))?;
    s.write_all(body)
}

fn tracker_conn(s: &mut TcpStream, mode: TrackerMode, storage_port: u16) -> io::Result<()> {
    let (c, body) = read_frame(s)?;
    if mode == TrackerMode::ShortBody {
        return write_frame(s, status::OK, &[0u8; 30]);
    }
    if mode == TrackerMode::HugeLength {
        return s.write_all(&build_header_with_status(cmd::RESP, i64::MAX as u64, status::OK));
    }
    let group = strip_fixed(&body[..GROUP_NAME_LEN]);
    let mut resp = fixed(&group, GROUP_NAME_LEN);
    resp.extend_from_slice(&fixed("127.0.0.1", IP_ADDR_LEN));
    put_u64(&mut resp, storage_port as u64);
    match c {
        cmd::TRACKER_QUERY_STORE_WITH_GROUP_ONE => {
            resp.push(0);
            write_frame(s, status::OK, &resp)
        }
        cmd::TRACKER_QUERY_FETCH_ONE | cmd::TRACKER_QUERY_UPDATE => write_frame(s, status::OK, &resp),
        _ => write_frame(s, status::INVALID_ARGUMENT, &[]),
    }
}

fn upload_answer(name: &str) -> Vec<u8> {
    let mut resp = fixed(GROUP, GROUP_NAME_LEN);
    resp.extend_from_slice(name.as_bytes());
    resp
}

fn storage_conn(
    s: &mut TcpStream,
    mode: StorageMode,
    files: &Mutex<HashMap<String, Vec<u8>>>,
    counter: &AtomicUsize,
) -> io::Result<()> {
    let (c, body) = read_frame(s)?;
    match c {
        cmd::STORAGE_UPLOAD_FILE | cmd::STORAGE_UPLOAD_APPENDER_FILE => {
            let size = read_u64(&body[1..9]) as usize;
            let ext = strip_fixed(&body[9..9 + EXT_NAME_LEN]);
            let data = body[9 + EXT_NAME_LEN..].to_vec();
            if data.len() != size {
                return write_frame(s, status::INVALID_ARGUMENT, &[]);
            }
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let name = format!("M00/00/00/file{:04}.{}", n, ext);
            files.lock().insert(name.clone(), data);
            write_frame(s, status::OK, &upload_answer(&name))
        }
        cmd::STORAGE_UPLOAD_SLAVE_FILE => {
            let master_len = read_u64(&body[0..8]) as usize;
            let mut at = 16;
            let prefix = strip_fixed(&body[at..at + PREFIX_NAME_LEN]);
            at += PREFIX_NAME_LEN;
            let ext = strip_fixed(&body[at..at + EXT_NAME_LEN]);
            at += EXT_NAME_LEN;
            let master = String::from_utf8_lossy(&body[at..at + master_len]).into_owned();
            let data = body[at + master_len..].to_vec();
            if !files.lock().contains_key(&master) {
                return write_frame(s, status::FILE_NOT_EXIST, &[]);
            }
            let stem = master.rsplit_once('.').map(|(a, _)| a).unwrap_or(&master);
            let name = format!("{}{}.{}", stem, prefix, ext);
            files.lock().insert(name.clone(), data);
            write_frame(s, status::OK, &upload_answer(&name))
        }
        cmd::STORAGE_APPEND_FILE => {
            let name_len = read_u64(&body[0..8]) as usize;
            let name = String::from_utf8_lossy(&body[16..16 + name_len]).into_owned();
            let data = &body[16 + name_len..];
            match files.lock().get_mut(&name) {
                Some(existing) => {
                    existing.extend_from_slice(data);
                    write_frame(s, status::OK, &[])
                }
                None => write_frame(s, status::FILE_NOT_EXIST, &[]),
            }
        }
        cmd::STORAGE_DELETE_FILE if mode == StorageMode::HugeErrorBody => {
            s.write_all(&build_header_with_status(cmd::RESP, 1 << 40, status::FILE_NOT_EXIST))?;
            // keep streaming until the client hangs up
            loop {
                s.write_all(&[b'x'; 1024])?;
                thread::sleep(Duration::from_millis(5));
            }
        }
        cmd::STORAGE_DELETE_FILE => {
            let name = String::from_utf8_lossy(&body[GROUP_NAME_LEN..]).into_owned();
            match files.lock().remove(&name) {
                Some(_) => write_frame(s, status::OK, &[]),
                None => write_frame(s, status::FILE_NOT_EXIST, &[]),
            }
        }
        cmd::STORAGE_DOWNLOAD_FILE => {
            if mode == StorageMode::HugeDownload {
                let len = MAX_DOWNLOAD_RESP_LEN as u64 + 1;
                return s.write_all(&build_header_with_status(cmd::RESP, len, status::OK));
            }
            let offset = read_u64(&body[0..8]) as usize;
            let size = read_u64(&body[8..16]) as usize;
            let name = String::from_utf8_lossy(&body[16 + GROUP_NAME_LEN..]).into_owned();
            let slice = files.lock().get(&name).map(|data| {
                let start = offset.min(data.len());
                let end = if size == 0 { data.len() } else { (start + size).min(data.len()) };
                data[start..end].to_vec()
            });
            match slice {
                Some(data) => write_frame(s, status::OK, &data),
                None => write_frame(s, status::FILE_NOT_EXIST, &[]),
            }
        }
        _ => write_frame(s, status::INVALID_ARGUMENT, &[]),
    }
}
