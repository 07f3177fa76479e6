//! Production scanner client: a clamd-style `INSTREAM` protocol over TCP — chunks framed with
//! a 4-byte big-endian length prefix, terminated by a zero-length chunk, followed by a single
//! response line. Never buffers more than [`crate::MAX_RESIDENT_WINDOW_BYTES`] at a time.

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::ScanError;
use crate::{ByteStream, ScannerClient, Verdict, MAX_RESIDENT_WINDOW_BYTES};

pub struct TcpScannerClient {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpScannerClient {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    async fn scan_inner(&self, mut reader: ByteStream) -> Result<Verdict, ScanError> {
        let stream = TcpStream::connect(self.addr)
            .await
            .map_err(|e| ScanError::Connection(e.into()))?;
        let (read_half, mut write_half) = stream.into_split();
        let mut response_reader = BufReader::new(read_half);

        write_half
            .write_all(b"zINSTREAM\0")
            .await
            .map_err(|e| ScanError::Connection(e.into()))?;

        while let Some(chunk) = reader.next().await {
            let chunk = chunk.map_err(|e| ScanError::Connection(e.into()))?;
            for window in chunk.chunks(MAX_RESIDENT_WINDOW_BYTES) {
                let len = (window.len() as u32).to_be_bytes();
                write_half
                    .write_all(&len)
                    .await
                    .map_err(|e| ScanError::Connection(e.into()))?;
                write_half
                    .write_all(window)
                    .await
                    .map_err(|e| ScanError::Connection(e.into()))?;
            }
        }
        write_half
            .write_all(&0u32.to_be_bytes())
            .await
            .map_err(|e| ScanError::Connection(e.into()))?;

        let mut line = String::new();
        response_reader
            .read_line(&mut line)
            .await
            .map_err(|e| ScanError::Connection(e.into()))?;
        parse_response(line.trim())
    }
}

fn parse_response(line: &str) -> Result<Verdict, ScanError> {
    let body = line
        .strip_prefix("stream: ")
        .ok_or_else(|| ScanError::ProtocolMismatch(line.to_string()))?;
    if body == "OK" {
        Ok(Verdict::Clean)
    } else if let Some(signature) = body.strip_suffix(" FOUND") {
        Ok(Verdict::Infected(signature.to_string()))
    } else if body.starts_with("ERROR") {
        Ok(Verdict::Indeterminate)
    } else {
        Err(ScanError::ProtocolMismatch(line.to_string()))
    }
}

impl ScannerClient for TcpScannerClient {
    async fn scan(&self, reader: ByteStream, _size_hint: u64) -> Result<Verdict, ScanError> {
        tokio::time::timeout(self.timeout, self.scan_inner(reader))
            .await
            .map_err(|_| ScanError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_response() {
        assert_eq!(parse_response("stream: OK").unwrap(), Verdict::Clean);
    }

    #[test]
    fn parses_infected_response() {
        assert_eq!(
            parse_response("stream: Eicar-Test-Signature FOUND").unwrap(),
            Verdict::Infected("Eicar-Test-Signature".to_string())
        );
    }

    #[test]
    fn rejects_unrecognized_response() {
        assert!(parse_response("garbage").is_err());
    }
}
