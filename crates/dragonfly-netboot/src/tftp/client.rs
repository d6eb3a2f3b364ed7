//! TFTP download state machine
//!
//! One transfer runs through `AwaitReply -> StoreAndAck -> AwaitReply ...`
//! until a short block ends it (`Done`) or a retry budget, the store or the
//! server ends it (`Failed`). Each step gets a fresh receive budget.

use super::packet::{ErrorCode, TftpPacket, BLOCK_SIZE, TFTP_PORT};
use crate::config::NetbootConfig;
use crate::error::{LinkError, TftpError, TransportError};
use crate::link::{Clock, LinkLayer};
use crate::store::ChunkedImageStore;
use crate::udp::UdpTransport;
use bytes::Bytes;
use tracing::{debug, info, trace, warn};

/// First port of the IANA dynamic range
const EPHEMERAL_BASE: u16 = 49152;

enum State {
    AwaitReply,
    StoreAndAck { block: u16, data: Bytes },
    Done,
    Failed(TftpError),
}

/// Per-transfer bookkeeping
struct Transfer {
    mytid: u16,
    remote_tid: u16,
    blk: u16,
    wpos: u64,
    last_acked: Option<u16>,
    last_sent: Bytes,
    last_port: u16,
}

impl Transfer {
    /// Re-send the last RRQ or ACK; failures are only logged
    fn retransmit<L: LinkLayer, C: Clock>(&self, transport: &mut UdpTransport<L, C>) {
        trace!(port = self.last_port, "Retransmitting last TFTP packet");
        if let Err(e) = transport.send(&self.last_sent, self.mytid, self.last_port) {
            debug!(error = %e, "Retransmit failed");
        }
    }
}

/// TFTP read client
#[derive(Debug, Clone)]
pub struct TftpClient {
    retries: u32,
}

impl TftpClient {
    /// Create a client with `retries` attempts per send and per receive step
    pub fn new(retries: u32) -> Self {
        Self { retries }
    }

    /// Create a client from session configuration
    pub fn from_config(config: &NetbootConfig) -> Self {
        Self::new(config.tftp_retries)
    }

    /// Download `filename` from the session's server into `store`
    ///
    /// On success `store.total_size()` is the file size. On failure the
    /// store is empty.
    pub fn download<L: LinkLayer, C: Clock>(
        &self,
        transport: &mut UdpTransport<L, C>,
        filename: &str,
        store: &mut ChunkedImageStore,
    ) -> Result<(), TftpError> {
        store.reset();
        let result = self.run(transport, filename, store);
        if let Err(e) = &result {
            warn!(filename = %filename, error = %e, "TFTP download failed");
            store.reset();
        }
        result
    }

    fn run<L: LinkLayer, C: Clock>(
        &self,
        transport: &mut UdpTransport<L, C>,
        filename: &str,
        store: &mut ChunkedImageStore,
    ) -> Result<(), TftpError> {
        let mytid = ephemeral_port(transport.clock().ticks());
        let server = transport.session().server_ip;
        info!(filename = %filename, server = %server, port = mytid, "Starting TFTP download");

        let rrq = TftpPacket::read_request(filename).encode();
        self.send_with_retries(transport, &rrq, mytid, TFTP_PORT)?;

        let mut transfer = Transfer {
            mytid,
            remote_tid: 0,
            blk: 1,
            wpos: 0,
            last_acked: None,
            last_sent: rrq,
            last_port: TFTP_PORT,
        };

        let mut state = State::AwaitReply;
        loop {
            state = match state {
                State::AwaitReply => self.await_reply(transport, &mut transfer),
                State::StoreAndAck { block, data } => {
                    self.store_and_ack(transport, &mut transfer, store, block, data)
                }
                State::Done => {
                    info!(
                        filename = %filename,
                        size = store.total_size(),
                        chunks = store.allocated_chunks(),
                        "TFTP download complete"
                    );
                    return Ok(());
                }
                State::Failed(e) => return Err(e),
            };
        }
    }

    fn await_reply<L: LinkLayer, C: Clock>(
        &self,
        transport: &mut UdpTransport<L, C>,
        transfer: &mut Transfer,
    ) -> State {
        let mut last_error = TransportError::Recv(LinkError::Timeout);

        for attempt in 0..self.retries {
            let (packet, src_port) = match transport.receive(transfer.remote_tid, transfer.mytid) {
                Ok(datagram) => (TftpPacket::parse(datagram.payload), datagram.src.port),
                Err(e) => {
                    debug!(attempt, block = transfer.blk, error = %e, "No TFTP reply");
                    if e.is_timeout() {
                        transfer.retransmit(transport);
                    }
                    last_error = e;
                    continue;
                }
            };

            if transfer.remote_tid == 0 {
                debug!(port = src_port, "Server transfer ID pinned");
                transfer.remote_tid = src_port;
            }

            match packet {
                Ok(TftpPacket::Error { code, message }) => {
                    if message.is_empty() {
                        warn!(code, "TFTP server error #{}", code);
                    } else {
                        warn!(code, message = %message, "TFTP server error");
                    }
                    return State::Failed(TftpError::Server { code, message });
                }
                Ok(TftpPacket::Data { block, data }) if block == transfer.blk => {
                    return State::StoreAndAck { block, data };
                }
                Ok(TftpPacket::Data { block, .. }) if Some(block) == transfer.last_acked => {
                    debug!(attempt, block, "Duplicate block, re-acknowledging");
                    let ack = TftpPacket::ack(block).encode();
                    if let Err(e) = transport.send(&ack, transfer.mytid, transfer.remote_tid) {
                        debug!(block, error = %e, "Re-ACK failed");
                    }
                }
                Ok(TftpPacket::Data { block, .. }) => {
                    debug!(attempt, expected = transfer.blk, got = block, "Ignoring out-of-order block");
                }
                Ok(other) => {
                    debug!(attempt, opcode = ?other.opcode(), "Ignoring unexpected TFTP packet");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Ignoring malformed TFTP packet");
                }
            }
        }

        State::Failed(TftpError::Recv(last_error))
    }

    fn store_and_ack<L: LinkLayer, C: Clock>(
        &self,
        transport: &mut UdpTransport<L, C>,
        transfer: &mut Transfer,
        store: &mut ChunkedImageStore,
        block: u16,
        data: Bytes,
    ) -> State {
        if !data.is_empty() {
            if let Err(e) = store.write_at(transfer.wpos, &data) {
                warn!(block, offset = transfer.wpos, error = %e, "Image store full");
                let packet = TftpPacket::error(ErrorCode::DiskFull, "out of memory").encode();
                if let Err(send_err) = transport.send(&packet, transfer.mytid, transfer.remote_tid) {
                    debug!(error = %send_err, "Failed to notify server");
                }
                return State::Failed(TftpError::OutOfMemory(e));
            }
            transfer.wpos += data.len() as u64;
        }
        trace!(block, len = data.len(), offset = transfer.wpos, "Stored block");

        let ack = TftpPacket::ack(block).encode();
        if let Err(e) = self.send_with_retries(transport, &ack, transfer.mytid, transfer.remote_tid) {
            return State::Failed(e);
        }
        transfer.last_acked = Some(block);
        transfer.last_sent = ack;
        transfer.last_port = transfer.remote_tid;

        if data.len() < BLOCK_SIZE {
            store.set_total_size(transfer.wpos);
            return State::Done;
        }

        transfer.blk = transfer.blk.wrapping_add(1);
        State::AwaitReply
    }

    fn send_with_retries<L: LinkLayer, C: Clock>(
        &self,
        transport: &mut UdpTransport<L, C>,
        payload: &[u8],
        from_port: u16,
        to_port: u16,
    ) -> Result<(), TftpError> {
        let mut last_error = TransportError::Send(LinkError::SendError);
        for attempt in 0..self.retries {
            match transport.send(payload, from_port, to_port) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, to_port, error = %e, "TFTP send failed");
                    last_error = e;
                }
            }
        }
        Err(TftpError::Send(last_error))
    }
}

impl Default for TftpClient {
    fn default() -> Self {
        Self::from_config(&NetbootConfig::default())
    }
}

/// Map the tick counter into the dynamic port range
fn ephemeral_port(ticks: u64) -> u16 {
    let span = u64::from(u16::MAX - EPHEMERAL_BASE) + 1;
    EPHEMERAL_BASE + (ticks % span) as u16
}
