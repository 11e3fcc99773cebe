// # Sentinel Master Source
//
// This crate provides the Redis Sentinel implementation of `MasterSource`.
//
// ## Protocol
//
// Plaintext TCP, one query per call:
//
// ```text
// > sentinel get-master-addr-by-name <master>\n
// < *2\r\n$10\r\n10.20.30.40\r\n$4\r\n6379\r\n
// ```
//
// The reply is RESP framing the client does not interpret beyond field
// positions: split on CRLF, the IP sits at position 2 and the port at
// position 4. A reported IP of 127.0.0.1 means Sentinel is describing an
// unconfigured or self-referential master and is rejected as stale rather
// than published.
//
// No authentication exists on this channel, and the query mutates nothing
// at the Sentinel.

use async_trait::async_trait;
use sentsync_core::traits::MasterSource;
use sentsync_core::{Error, Result};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Upper bound on the Sentinel reply we are willing to read
const REPLY_BUFFER_SIZE: usize = 256;

/// Reply field holding the master IP (0-indexed, CRLF-separated)
const IP_FIELD: usize = 2;

/// Reply field holding the master port
const PORT_FIELD: usize = 4;

/// Default bound on the whole connect-query-read exchange
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Sentinel answer meaning "no usable master configured"
const STALE_MASTER_IP: &str = "127.0.0.1";

/// Redis Sentinel master source
///
/// Stateless per call: each `current_master()` opens one connection, issues
/// one query, reads one reply and closes the connection on every exit path.
pub struct SentinelSource {
    /// Sentinel address (host:port)
    sentinel_addr: String,

    /// Logical master name to resolve, fixed for the process lifetime
    master_name: String,

    /// Bound on the whole exchange
    query_timeout: Duration,
}

impl SentinelSource {
    /// Create a new Sentinel source with the default query timeout
    pub fn new(sentinel_addr: impl Into<String>, master_name: impl Into<String>) -> Self {
        Self {
            sentinel_addr: sentinel_addr.into(),
            master_name: master_name.into(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the query timeout
    pub fn with_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// One connect-query-read exchange, without the outer timeout
    async fn exchange(&self) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect(&self.sentinel_addr).await?;

        let query = format!("sentinel get-master-addr-by-name {}\n", self.master_name);
        stream.write_all(query.as_bytes()).await?;

        let mut buf = [0u8; REPLY_BUFFER_SIZE];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::protocol("sentinel closed the connection without a reply"));
        }

        Ok(buf[..n].to_vec())
        // stream dropped here; the connection closes on every exit path
    }
}

#[async_trait]
impl MasterSource for SentinelSource {
    async fn current_master(&self) -> Result<SocketAddr> {
        tracing::debug!(
            sentinel = %self.sentinel_addr,
            master = %self.master_name,
            "querying sentinel for master address"
        );

        let reply = timeout(self.query_timeout, self.exchange())
            .await
            .map_err(|_| {
                Error::transport(format!(
                    "sentinel query to {} timed out after {:?}",
                    self.sentinel_addr, self.query_timeout
                ))
            })??;

        parse_master_reply(&reply)
    }
}

/// Parse a raw Sentinel reply buffer into the master address
///
/// Pure function so the edge cases are testable without a socket.
pub fn parse_master_reply(reply: &[u8]) -> Result<SocketAddr> {
    let text = String::from_utf8_lossy(reply);
    let fields: Vec<&str> = text.split("\r\n").collect();

    if fields.len() < 5 {
        return Err(Error::protocol(format!(
            "couldn't get master address from sentinel: expected at least 5 reply fields, got {}",
            fields.len()
        )));
    }

    let ip_field = fields[IP_FIELD];
    let port_field = fields[PORT_FIELD];

    // Checked before parsing: whatever else the reply says, a loopback
    // master is Sentinel talking about itself, not an answer.
    if ip_field == STALE_MASTER_IP {
        return Err(Error::stale_data(
            "got 127.0.0.1 from sentinel, skipping reply",
        ));
    }

    let ip: IpAddr = ip_field
        .parse()
        .map_err(|_| Error::address_parse(format!("invalid master IP '{ip_field}'")))?;
    let port: u16 = port_field
        .parse()
        .map_err(|_| Error::address_parse(format!("invalid master port '{port_field}'")))?;

    Ok(SocketAddr::new(ip, port))
}
