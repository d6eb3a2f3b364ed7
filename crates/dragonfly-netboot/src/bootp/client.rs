//! BOOTP discovery client
//!
//! Broadcasts a BOOTREQUEST and waits for the matching BOOTREPLY, retrying a
//! fixed number of times. On success the transport's session holds our IP and
//! the boot server's IP and MAC.

use super::packet::{BootpPacket, OpCode, BOOTPC_PORT, BOOTPS_PORT, PACKET_LEN};
use crate::config::NetbootConfig;
use crate::error::BootpError;
use crate::link::{Clock, LinkLayer};
use crate::udp::UdpTransport;
use std::time::Duration;
use tracing::{debug, info, warn};

/// BOOTP discovery client
#[derive(Debug, Clone)]
pub struct BootpClient {
    retries: u32,
    retry_delay: Duration,
}

impl BootpClient {
    /// Create a client with an explicit retry policy
    pub fn new(retries: u32, retry_delay: Duration) -> Self {
        Self {
            retries,
            retry_delay,
        }
    }

    /// Create a client from session configuration
    pub fn from_config(config: &NetbootConfig) -> Self {
        Self::new(config.bootp_retries, config.bootp_retry_delay)
    }

    /// Discover our address and the boot server
    ///
    /// Returns the boot file name: the server's choice if it named one,
    /// otherwise `requested_filename` as it was sent, cut to fit the BOOTP
    /// file field (empty if that is None too).
    pub fn discover<L: LinkLayer, C: Clock>(
        &self,
        transport: &mut UdpTransport<L, C>,
        requested_filename: Option<&str>,
    ) -> Result<String, BootpError> {
        let mut request = BootpPacket::request(transport.session().my_hw(), requested_filename);
        let started = transport.clock().now();

        for attempt in 0..self.retries {
            // A previous attempt may have left a half-learned binding behind
            transport.session_mut().reset();

            if attempt > 0 {
                transport.clock().sleep(self.retry_delay);
            }

            let clock = transport.clock();
            request.xid = clock.ticks() as u32;
            request.secs = clock
                .now()
                .saturating_sub(started)
                .as_secs()
                .min(u16::MAX as u64) as u16;

            debug!(attempt, xid = request.xid, secs = request.secs, "Sending BOOTP request");
            if let Err(e) = transport.send(&request.encode(), BOOTPC_PORT, BOOTPS_PORT) {
                warn!(attempt, error = %e, "BOOTP send failed");
                continue;
            }

            let (reply, server_hw) = match transport.receive(BOOTPS_PORT, BOOTPC_PORT) {
                Ok(datagram) => {
                    if datagram.len() < PACKET_LEN {
                        warn!(attempt, len = datagram.len(), "BOOTP reply too short");
                        continue;
                    }
                    match BootpPacket::parse(datagram.payload) {
                        Some(reply) => (reply, datagram.src.hw),
                        None => continue,
                    }
                }
                Err(e) => {
                    warn!(attempt, error = %e, "No BOOTP reply");
                    continue;
                }
            };

            if reply.op != OpCode::BootReply {
                warn!(attempt, op = ?reply.op, "Ignoring BOOTP packet that is not a reply");
                continue;
            }
            if reply.xid != request.xid {
                warn!(
                    attempt,
                    expected = request.xid,
                    got = reply.xid,
                    "BOOTP xid mismatch"
                );
                continue;
            }

            let session = transport.session_mut();
            session.server_ip = reply.siaddr;
            session.server_hw = server_hw;
            session.my_ip = reply.yiaddr;

            let filename = reply
                .file_name()
                .or_else(|| request.file_name())
                .unwrap_or_default();

            info!(
                ip = %reply.yiaddr,
                server = %reply.siaddr,
                server_mac = %server_hw,
                filename = %filename,
                "BOOTP discovery complete"
            );
            return Ok(filename);
        }

        Err(BootpError::NoServer {
            attempts: self.retries,
        })
    }
}

impl Default for BootpClient {
    fn default() -> Self {
        Self::from_config(&NetbootConfig::default())
    }
}
