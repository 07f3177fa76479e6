//! The malware-scanner client: streams bytes to an external scanner, returns a [`Verdict`]
//! (§4.4). Results are pure functions of bytes and signature database version, so a scan
//! outcome should never be load-bearing on timing.

mod error;
mod fixture;
mod tcp;

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

pub use error::ScanError;
pub use fixture::FixtureScannerClient;
pub use tcp::TcpScannerClient;

pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'static>>;

/// Keep at most this many resident bytes while scanning a stream (§4.4: "budget ≤ 8 MiB
/// resident"). The TCP client never buffers more than one window at a time.
pub const MAX_RESIDENT_WINDOW_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    Infected(String),
    Indeterminate,
}

#[allow(async_fn_in_trait)]
pub trait ScannerClient: Send + Sync + 'static {
    async fn scan(&self, reader: ByteStream, size_hint: u64) -> Result<Verdict, ScanError>;
}
