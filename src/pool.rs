//! Bounded blocking pool of TCP connections to one endpoint
//!
//! Slots travel through a bounded channel whose capacity equals the pool
//! size, so returning a slot never blocks. A slot may hold no socket: it
//! starts empty and is dialed on first use, and it is emptied again when its
//! connection expires or fails.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use log::{debug, warn};
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::config::ClientConfig;
use crate::error::{Error, Result, TimeoutKind};
use crate::protocol::timeouts;

/// Opens a new connection for the pool.
pub type Dialer = Box<dyn Fn() -> Result<TcpStream> + Send + Sync>;

/// Dialer for `host:port`, trying every resolved address within `timeout`.
pub fn tcp_dialer(host: &str, port: u16, timeout: Duration) -> Dialer {
    let addr = format!("{}:{}", host, port);
    Box::new(move || -> Result<TcpStream> {
        let mut last_err = None;
        for sa in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&sa, timeout) {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) if e.kind() == io::ErrorKind::TimedOut => Error::Timeout(TimeoutKind::Connect),
            Some(e) => Error::Io(e),
            None => Error::InvalidArgument(format!("{} resolved to no address", addr)),
        })
    })
}

struct Slot {
    stream: Option<TcpStream>,
    last_used: Instant,
}

impl Slot {
    fn empty() -> Self {
        Slot {
            stream: None,
            last_used: Instant::now(),
        }
    }
}

struct PoolState {
    // dropped on close; blocked acquirers watch the paired receiver
    shutdown: Option<Sender<()>>,
    // slots alive, idle or checked out
    slots: usize,
}

pub struct ConnPool {
    addr: String,
    max: usize,
    idle_time: Duration,
    wait: Duration,
    idle_tx: Sender<Slot>,
    idle_rx: Receiver<Slot>,
    shutdown_rx: Receiver<()>,
    state: Mutex<PoolState>,
    dial: Dialer,
}

impl ConnPool {
    /// `init` empty slots are created up front; at most `max` slots ever
    /// exist.
    pub fn new(addr: impl Into<String>, init: usize, max: usize, idle_time: Duration, dial: Dialer) -> Result<Self> {
        if max < 1 || init > max {
            return Err(Error::InvalidConfig(format!(
                "invalid pool capacity: init={} max={}",
                init, max
            )));
        }
        let (idle_tx, idle_rx) = channel::bounded(max);
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);
        for _ in 0..init {
            if idle_tx.try_send(Slot::empty()).is_err() {
                break;
            }
        }
        Ok(ConnPool {
            addr: addr.into(),
            max,
            idle_time,
            wait: Duration::from_millis(timeouts::POOL_WAIT_MS),
            idle_tx,
            idle_rx,
            shutdown_rx,
            state: Mutex::new(PoolState {
                shutdown: Some(shutdown_tx),
                slots: init,
            }),
            dial,
        })
    }

    /// Pool of plain TCP connections to `host:port` sized by `config`.
    pub fn tcp(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        ConnPool::new(
            format!("{}:{}", host, port),
            config.pool_init_size,
            config.pool_size,
            config.idle_time,
            tcp_dialer(host, port, config.connect_timeout),
        )
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Slots currently alive, idle or checked out.
    pub fn len(&self) -> usize {
        self.state.lock().slots
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn idle_len(&self) -> usize {
        self.idle_rx.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().shutdown.is_none()
    }

    /// Check out a connection, dialing if the slot holds none. Blocks for at
    /// most the fixed pool wait bound.
    pub fn acquire(&self) -> Result<PooledConn<'_>> {
        let mut slot = self.next_slot()?;

        if slot.stream.is_some() && slot.last_used.elapsed() > self.idle_time {
            debug!("{}: dropping connection idle for {:?}", self.addr, slot.last_used.elapsed());
            slot.stream = None;
        }
        if slot.stream.is_none() {
            match (self.dial)() {
                Ok(stream) => {
                    debug!("{}: dialed new connection", self.addr);
                    slot.stream = Some(stream);
                    slot.last_used = Instant::now();
                }
                Err(e) => {
                    slot.last_used = Instant::now();
                    let _ = self.put(slot, false);
                    return Err(e);
                }
            }
        }
        Ok(PooledConn {
            pool: self,
            slot: Some(slot),
            unusable: false,
        })
    }

    fn next_slot(&self) -> Result<Slot> {
        {
            let mut st = self.state.lock();
            if st.shutdown.is_none() {
                return Err(Error::PoolClosed);
            }
            if let Ok(slot) = self.idle_rx.try_recv() {
                return Ok(slot);
            }
            if st.slots < self.max {
                st.slots += 1;
                return Ok(Slot::empty());
            }
        }

        channel::select! {
            recv(self.idle_rx) -> slot => match slot {
                Ok(slot) => self.check_open(slot),
                Err(_) => Err(Error::PoolClosed),
            },
            recv(self.shutdown_rx) -> _ => Err(Error::PoolClosed),
            default(self.wait) => Err(Error::Timeout(TimeoutKind::PoolWait)),
        }
    }

    // A slot received while close() runs must not escape.
    fn check_open(&self, slot: Slot) -> Result<Slot> {
        let mut st = self.state.lock();
        if st.shutdown.is_none() {
            st.slots = st.slots.saturating_sub(1);
            drop(slot);
            return Err(Error::PoolClosed);
        }
        Ok(slot)
    }

    // Never blocks: slots never outnumber the channel capacity.
    fn put(&self, mut slot: Slot, unusable: bool) -> Result<()> {
        let mut st = self.state.lock();
        if st.shutdown.is_none() {
            st.slots = st.slots.saturating_sub(1);
            drop(slot);
            return Err(Error::PoolClosed);
        }
        if unusable && slot.stream.take().is_some() {
            warn!("{}: discarding broken connection", self.addr);
        }
        match self.idle_tx.try_send(slot) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                st.slots = st.slots.saturating_sub(1);
                warn!("{}: idle queue rejected a slot", self.addr);
                Ok(())
            }
        }
    }

    /// Close idle connections and refuse further acquires. Checked-out
    /// connections are closed when released. Idempotent.
    pub fn close(&self) {
        let mut st = self.state.lock();
        if st.shutdown.take().is_none() {
            return;
        }
        let mut closed = 0;
        while let Ok(slot) = self.idle_rx.try_recv() {
            drop(slot);
            closed += 1;
        }
        st.slots = st.slots.saturating_sub(closed);
        debug!("{}: pool closed, {} idle slots dropped", self.addr, closed);
    }
}

impl Drop for ConnPool {
    fn drop(&mut self) {
        self.close();
    }
}

/// A checked-out connection. Goes back to its pool on `release` or drop.
pub struct PooledConn<'a> {
    pool: &'a ConnPool,
    slot: Option<Slot>,
    unusable: bool,
}

impl<'a> PooledConn<'a> {
    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.slot
            .as_mut()
            .and_then(|s| s.stream.as_mut())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection already released"))
    }

    /// Read and write deadline for every following socket operation.
    pub fn set_io_timeout(&mut self, timeout: Duration) -> Result<()> {
        let stream = self.stream()?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// The socket will be closed instead of reused on release.
    pub fn mark_unusable(&mut self) {
        self.unusable = true;
    }

    pub fn is_unusable(&self) -> bool {
        self.unusable
    }

    /// Hand the connection back. Fails with `PoolClosed` if the pool was
    /// closed meanwhile, in which case the socket is closed.
    pub fn release(mut self) -> Result<()> {
        match self.slot.take() {
            Some(slot) => self.pool.put(slot, self.unusable),
            None => Ok(()),
        }
    }

    fn track<T>(&mut self, res: io::Result<T>) -> io::Result<T> {
        match &res {
            Ok(_) => {
                if let Some(slot) = self.slot.as_mut() {
                    slot.last_used = Instant::now();
                }
            }
            Err(_) => self.unusable = true,
        }
        res
    }
}

impl std::fmt::Debug for PooledConn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConn")
            .field("addr", &self.pool.addr)
            .field("unusable", &self.unusable)
            .finish()
    }
}

impl Read for PooledConn<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let res = self.stream().and_then(|s| s.read(buf));
        self.track(res)
    }
}

impl Write for PooledConn<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res = self.stream().and_then(|s| s.write(buf));
        self.track(res)
    }

    fn flush(&mut self) -> io::Result<()> {
        let res = self.stream().and_then(|s| s.flush());
        self.track(res)
    }
}

impl Drop for PooledConn<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            if let Err(e) = self.pool.put(slot, self.unusable) {
                debug!("{}: release on drop: {}", self.pool.addr, e);
            }
        }
    }
}
