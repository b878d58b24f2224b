//! # Transmitter
//!
//! Fragments a document into RTP packets sharing one timestamp, marks
//! the last fragment, and emits them over UDP. Used through a scoped
//! connection acquired for the lifetime of a send session — modelled
//! after the source's `__enter__`/`__exit__` and `__aenter__`/`__aexit__`
//! pair, since Rust has no direct `with`-statement analogue: `Drop`
//! guarantees socket closure on the blocking path, and is kept as a
//! backstop alongside an explicit `close` on the cooperative path.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use bytes::BytesMut;
use rand::Rng;
use tracing::warn;

use crate::error::RtpError;
use crate::fragment::fragment;
use crate::rtp::{RtpHeader, RtpPacket};
use crate::stats::TransmitterStats;
use crate::ttml_payload::{self, Encoding};

const DEFAULT_MAX_FRAGMENT_SIZE: usize = 1200;
const DEFAULT_PAYLOAD_TYPE: u8 = 96; // dynamic

// ─── Configuration ──────────────────────────────────────────────────────────

/// Transmitter configuration, constructable independently of the owning
/// socket so tests can build one without sending anything.
#[derive(Debug, Clone)]
pub struct TransmitterConfig {
    /// Cap on a single fragment's encoded byte length (default 1200).
    pub max_fragment_size: usize,
    /// RTP payload type carried on every packet (default 96, dynamic).
    pub payload_type: u8,
    /// TTML payload encoding.
    pub encoding: Encoding,
    /// Whether to prefix the first fragment of each document with a BOM.
    pub bom: bool,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        TransmitterConfig {
            max_fragment_size: DEFAULT_MAX_FRAGMENT_SIZE,
            payload_type: DEFAULT_PAYLOAD_TYPE,
            encoding: Encoding::default(),
            bom: false,
        }
    }
}

// ─── Transmitter state ──────────────────────────────────────────────────────

/// Owns the sequence-number/timestamp-offset state shared by every
/// connection opened against one `(address, port)`. Not itself
/// socket-owning — call [`Transmitter::connect`] or
/// [`Transmitter::connect_async`] to acquire a send session.
pub struct Transmitter {
    address: String,
    port: u16,
    config: TransmitterConfig,
    next_seq_num: u16,
    ts_offset: u32,
    stats: TransmitterStats,
}

impl Transmitter {
    /// Random initial sequence number and timestamp offset, as the
    /// source does via `randrange`. Fails if `config.payload_type`
    /// doesn't fit in 7 bits — validated once here rather than masked
    /// silently on every packet built afterward.
    pub fn new(
        address: impl Into<String>,
        port: u16,
        config: TransmitterConfig,
    ) -> Result<Self, RtpError> {
        let mut rng = rand::rng();
        Self::with_seed(
            address,
            port,
            config,
            rng.random::<u16>(),
            rng.random::<u32>(),
        )
    }

    /// Pin the initial sequence number and timestamp offset explicitly —
    /// the injectable-randomness seam §9 calls for so tests can fix them.
    pub fn with_seed(
        address: impl Into<String>,
        port: u16,
        config: TransmitterConfig,
        initial_seq_num: u16,
        ts_offset: u32,
    ) -> Result<Self, RtpError> {
        if config.payload_type & 0x80 != 0 {
            return Err(RtpError::PayloadTypeOutOfRange(config.payload_type));
        }
        Ok(Transmitter {
            address: address.into(),
            port,
            config,
            next_seq_num: initial_seq_num,
            ts_offset,
            stats: TransmitterStats::new(),
        })
    }

    /// The sequence number the next packet constructed will carry.
    /// Advances only when a packet is actually built, not on network
    /// success (§4.6).
    pub fn next_seq_num(&self) -> u16 {
        self.next_seq_num
    }

    pub fn stats(&self) -> &TransmitterStats {
        &self.stats
    }

    fn rtp_timestamp(&self, wall_clock: SystemTime) -> u32 {
        let since_epoch = wall_clock
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let ms = since_epoch.as_millis() as u64;
        ms.wrapping_add(self.ts_offset as u64) as u32
    }

    /// Fragment `doc`, stamp every fragment with `rtp_ts`, and mark the
    /// last one. Advances `next_seq_num` by the fragment count.
    fn packetize_doc(&mut self, doc: &str, rtp_ts: u32) -> Vec<RtpPacket> {
        let fragments = fragment(doc, self.config.max_fragment_size, self.config.encoding, self.config.bom);
        let last_index = fragments.len().saturating_sub(1);

        fragments
            .iter()
            .enumerate()
            .map(|(i, frag)| {
                let is_first = i == 0;
                let is_last = i == last_index;
                let payload = ttml_payload::encode(frag, self.config.encoding, is_first && self.config.bom);

                let seq = self.next_seq_num;
                self.next_seq_num = self.next_seq_num.wrapping_add(1);

                let header = RtpHeader::new(seq, rtp_ts, is_last, self.config.payload_type, 0)
                    .expect("payload_type validated in Transmitter::with_seed");
                RtpPacket::new(header, bytes::Bytes::from(payload))
            })
            .collect()
    }

    /// Open a blocking send session.
    pub fn connect(&mut self) -> anyhow::Result<TransmitterConnection<'_>> {
        TransmitterConnection::open(self)
    }

    /// Open a cooperative send session.
    pub async fn connect_async(&mut self) -> anyhow::Result<AsyncTransmitterConnection<'_>> {
        AsyncTransmitterConnection::open(self).await
    }
}

// ─── Blocking connection ────────────────────────────────────────────────────

/// A scoped blocking send session. Opening binds an ephemeral local UDP
/// socket and connects it to the transmitter's `(address, port)`;
/// dropping it (or calling [`close`](Self::close)) releases the socket.
pub struct TransmitterConnection<'a> {
    transmitter: &'a mut Transmitter,
    socket: Option<std::net::UdpSocket>,
}

impl<'a> TransmitterConnection<'a> {
    fn open(transmitter: &'a mut Transmitter) -> anyhow::Result<Self> {
        let socket = std::net::UdpSocket::bind("0.0.0.0:0").context("binding send socket")?;
        socket
            .connect((transmitter.address.as_str(), transmitter.port))
            .with_context(|| format!("connecting to {}:{}", transmitter.address, transmitter.port))?;
        Ok(TransmitterConnection {
            transmitter,
            socket: Some(socket),
        })
    }

    pub fn next_seq_num(&self) -> u16 {
        self.transmitter.next_seq_num
    }

    /// Fragment `doc`, stamp it with the RTP timestamp derived from
    /// `wall_clock`, and send one datagram per fragment. A `sendto`
    /// failure surfaces to the caller with no retry and no rollback of
    /// the sequence numbers already allocated (§7). Sending on an
    /// already-closed connection is a silent no-op (§7,
    /// Socket-lifetime violation).
    pub fn send_doc(&mut self, doc: &str, wall_clock: SystemTime) -> anyhow::Result<()> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(());
        };

        let rtp_ts = self.transmitter.rtp_timestamp(wall_clock);
        let packets = self.transmitter.packetize_doc(doc, rtp_ts);
        self.transmitter.stats.docs_sent += 1;

        for pkt in &packets {
            let mut buf = BytesMut::with_capacity(pkt.encoded_len());
            pkt.encode(&mut buf);
            match socket.send(&buf) {
                Ok(_) => self.transmitter.stats.packets_sent += 1,
                Err(err) => {
                    self.transmitter.stats.send_failures += 1;
                    warn!(error = %err, "sendto failed");
                    return Err(err).context("sendto failed");
                }
            }
        }
        Ok(())
    }

    /// Explicit close. Idempotent — calling it again, or dropping the
    /// connection afterward, is harmless. A `send_doc` after this point
    /// is a silent no-op, matching the source's `if self._socket is
    /// None: return` guard.
    pub fn close(&mut self) {
        self.socket.take();
    }
}

impl<'a> Drop for TransmitterConnection<'a> {
    fn drop(&mut self) {
        self.socket.take();
    }
}

// ─── Cooperative connection ─────────────────────────────────────────────────

/// A scoped cooperative send session built on `tokio::net::UdpSocket`.
pub struct AsyncTransmitterConnection<'a> {
    transmitter: &'a mut Transmitter,
    socket: Option<tokio::net::UdpSocket>,
}

impl<'a> AsyncTransmitterConnection<'a> {
    async fn open(transmitter: &'a mut Transmitter) -> anyhow::Result<Self> {
        let socket = tokio::net::UdpSocket::bind("0.0.0.0:0")
            .await
            .context("binding send socket")?;
        socket
            .connect((transmitter.address.as_str(), transmitter.port))
            .await
            .with_context(|| format!("connecting to {}:{}", transmitter.address, transmitter.port))?;
        Ok(AsyncTransmitterConnection {
            transmitter,
            socket: Some(socket),
        })
    }

    pub fn next_seq_num(&self) -> u16 {
        self.transmitter.next_seq_num
    }

    pub async fn send_doc(&mut self, doc: &str, wall_clock: SystemTime) -> anyhow::Result<()> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(());
        };

        let rtp_ts = self.transmitter.rtp_timestamp(wall_clock);
        let packets = self.transmitter.packetize_doc(doc, rtp_ts);
        self.transmitter.stats.docs_sent += 1;

        for pkt in &packets {
            let mut buf = BytesMut::with_capacity(pkt.encoded_len());
            pkt.encode(&mut buf);
            match socket.send(&buf).await {
                Ok(_) => self.transmitter.stats.packets_sent += 1,
                Err(err) => {
                    self.transmitter.stats.send_failures += 1;
                    warn!(error = %err, "sendto failed");
                    return Err(err).context("sendto failed");
                }
            }
        }
        Ok(())
    }

    /// Explicit async close. `Drop` is a backstop for the cases this
    /// isn't called (cancellation, early return).
    pub async fn close(&mut self) {
        self.socket.take();
    }
}

impl<'a> Drop for AsyncTransmitterConnection<'a> {
    fn drop(&mut self) {
        self.socket.take();
    }
}
