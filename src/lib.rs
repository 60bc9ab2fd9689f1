//! fdfs - blocking client for tracker/storage file clusters
//!
//! Ask a tracker where a file lives, then talk to that storage node over a
//! pooled TCP connection.

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod net;
pub mod pool;
pub mod protocol;
pub mod protocol_core;
pub mod registry;
pub mod storage;
pub mod tracker;

pub use client::Client;
pub use config::{ClientConfig, Settings};
pub use error::{Error, ProtocolError, Result, StatusCategory, TimeoutKind};
pub use tracker::StorageInfo;
