use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Connect,
    Io,
    PoolWait,
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutKind::Connect => f.write_str("connect"),
            TimeoutKind::Io => f.write_str("io"),
            TimeoutKind::PoolWait => f.write_str("pool wait"),
        }
    }
}

/// Coarse meaning of a nonzero status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    FileNotFound,
    InvalidArgument,
    Generic,
}

impl StatusCategory {
    pub fn from_status(status: u8) -> Self {
        use crate::protocol::status;
        match status {
            status::FILE_NOT_EXIST => StatusCategory::FileNotFound,
            status::INVALID_ARGUMENT => StatusCategory::InvalidArgument,
            _ => StatusCategory::Generic,
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCategory::FileNotFound => f.write_str("file not found"),
            StatusCategory::InvalidArgument => f.write_str("invalid argument"),
            StatusCategory::Generic => f.write_str("generic warning"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("server answered status {status} ({category})")]
    Status { status: u8, category: StatusCategory },

    /// Error status whose diagnostic body was too long to consume; the
    /// stream is left mid-frame.
    #[error("server answered status {status} ({category}) with a {len} byte body, limit {max}")]
    OversizedStatus {
        status: u8,
        category: StatusCategory,
        len: i64,
        max: i64,
    },

    #[error("port {0} out of range")]
    BadPort(u64),

    #[error("negative body length {0} in header")]
    NegativeLength(i64),

    #[error("response body length {len} exceeds limit {max}")]
    TooLarge { len: i64, max: i64 },

    #[error("response body length {got} != {expected}")]
    BodyLength { got: usize, expected: usize },

    #[error("response body too short: {got} < {min}")]
    ShortBody { got: usize, min: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("{0} timeout")]
    Timeout(TimeoutKind),

    #[error("pool is closed")]
    PoolClosed,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(io::Error),
}

impl Error {
    /// Status category of a server-side error, if this is one.
    pub fn status_category(&self) -> Option<StatusCategory> {
        match self {
            Error::Protocol(ProtocolError::Status { category, .. })
            | Error::Protocol(ProtocolError::OversizedStatus { category, .. }) => Some(*category),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_category() == Some(StatusCategory::FileNotFound)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            // std reports an expired socket timeout as WouldBlock on unix
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout(TimeoutKind::Io),
            _ => Error::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_categories() {
        assert_eq!(StatusCategory::from_status(2), StatusCategory::FileNotFound);
        assert_eq!(StatusCategory::from_status(22), StatusCategory::InvalidArgument);
        assert_eq!(StatusCategory::from_status(5), StatusCategory::Generic);
        assert_eq!(StatusCategory::from_status(255), StatusCategory::Generic);
    }

    #[test]
    fn test_io_error_classification() {
        let e: Error = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(e, Error::Timeout(TimeoutKind::Io)));

        let e: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn test_not_found_helper() {
        let e = Error::Protocol(ProtocolError::Status {
            status: 2,
            category: StatusCategory::FileNotFound,
        });
        assert!(e.is_not_found());
        assert!(e.to_string().contains("file not found"));
        assert!(!Error::PoolClosed.is_not_found());
    }
}
