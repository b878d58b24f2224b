//! # Receiver
//!
//! Owns a UDP socket, drives the reassembly pipeline (`OrderedBuffer` +
//! `FragmentAssembler`) over the datagrams it reads, and hands completed
//! documents to the caller — either through a synchronous callback
//! (`recv_once`/`run`) or a drained event queue (`drain_events`), both
//! backed by the same pure-logic [`ReceiverCore`].
//!
//! Two I/O adapters share that core: [`Receiver`], blocking on
//! `std::net::UdpSocket`, and [`AsyncReceiver`], cooperative on
//! `tokio::net::UdpSocket`. Neither adapter duplicates the state machine.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::debug;

use crate::assembler::{AssembledDoc, FragmentAssembler};
use crate::ordered_buffer::OrderedBuffer;
use crate::rtp::RtpPacket;
use crate::stats::ReceiverStats;
use crate::ttml_payload::Encoding;

const DEFAULT_RECV_BUF_SIZE: usize = 65536;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Configuration ──────────────────────────────────────────────────────────

/// Receiver configuration parameters, constructable independently of the
/// owning socket so tests can build one without binding a port.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Maximum datagram size read per `recv`. Must be in `[1, 65536]`.
    pub recv_buf_size: usize,
    /// Read timeout; `None` means block forever. This bounds a single
    /// socket read, not document assembly — a timed-out read does not
    /// reset in-flight reassembly state.
    pub timeout: Option<Duration>,
    /// TTML payload encoding to decode fragments under.
    pub encoding: Encoding,
    /// Unused by decoding (a leading BOM is detected automatically), kept
    /// for parity with the transmitter-side config and with callers that
    /// want to assert the wire contract they expect.
    pub bom: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            recv_buf_size: DEFAULT_RECV_BUF_SIZE,
            timeout: Some(DEFAULT_TIMEOUT),
            encoding: Encoding::default(),
            bom: false,
        }
    }
}

// ─── Events ─────────────────────────────────────────────────────────────────

/// An event produced by the receive pipeline, drained via
/// [`ReceiverCore::drain_events`]. Currently only successful document
/// delivery is surfaced this way — malformed packets, gaps, and
/// timestamp-change abandonment are logged and folded into `stats()`
/// rather than emitted as events, matching §7's "failures that affect a
/// single document never poison the pipeline" principle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// A document was fully reassembled and is ready for delivery.
    Document(AssembledDoc),
}

// ─── Pure-logic core ────────────────────────────────────────────────────────

/// The reassembly pipeline with no I/O: feed it raw datagram bytes, drain
/// the documents it produces. Both [`Receiver`] and [`AsyncReceiver`] are
/// thin socket adapters wrapped around one of these.
pub struct ReceiverCore {
    buffer: OrderedBuffer<RtpPacket>,
    assembler: FragmentAssembler,
    stats: ReceiverStats,
    events: Vec<ReceiverEvent>,
}

impl ReceiverCore {
    pub fn new(encoding: Encoding) -> Self {
        ReceiverCore {
            buffer: OrderedBuffer::new(),
            assembler: FragmentAssembler::new(encoding),
            stats: ReceiverStats::new(),
            events: Vec::new(),
        }
    }

    /// Feed one raw UDP datagram through RTP decode, reorder, and
    /// reassembly. Malformed datagrams are counted and logged, never
    /// propagated as an error — per §7, a single bad datagram doesn't
    /// affect the rest of the stream.
    pub fn process_datagram(&mut self, raw: &[u8]) {
        self.stats.packets_received += 1;

        let pkt = match RtpPacket::decode(&mut &raw[..]) {
            Ok(pkt) => pkt,
            Err(err) => {
                self.stats.malformed_packets += 1;
                debug!(error = %err, "dropping malformed RTP datagram");
                return;
            }
        };

        let seq = pkt.sequence_number();
        for ordered in self.buffer.push_get(seq, pkt) {
            if let Some(doc) = self.assembler.process_packet(&ordered) {
                self.events.push(ReceiverEvent::Document(doc));
            }
        }

        self.stats.buffer_overflows = self.buffer.overflow_count();
        self.stats.docs_delivered = self.assembler.docs_delivered();
        self.stats.docs_discarded = self.assembler.docs_discarded();
    }

    /// Drain and return every event produced since the last drain.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ReceiverEvent> + '_ {
        self.events.drain(..)
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }
}

// ─── Blocking adapter ───────────────────────────────────────────────────────

/// Blocking receiver built on `std::net::UdpSocket`. Binds to `(any,
/// port)` for the lifetime of the value; running two receivers on the
/// same port is not supported (the second bind fails).
pub struct Receiver {
    socket: std::net::UdpSocket,
    config: ReceiverConfig,
    core: ReceiverCore,
}

impl Receiver {
    pub fn bind(port: u16, config: ReceiverConfig) -> anyhow::Result<Self> {
        let socket = std::net::UdpSocket::bind(("0.0.0.0", port))
            .with_context(|| format!("binding receiver socket to port {port}"))?;
        socket.set_read_timeout(config.timeout)?;
        let core = ReceiverCore::new(config.encoding);
        Ok(Receiver {
            socket,
            config,
            core,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Read and process exactly one datagram, invoking `on_doc` for every
    /// document it completes. A read timeout surfaces as an `Err`; it
    /// does not reset assembler state (§5).
    pub fn recv_once(&mut self, mut on_doc: impl FnMut(String, u32)) -> anyhow::Result<()> {
        let mut buf = vec![0u8; self.config.recv_buf_size];
        let n = self.socket.recv(&mut buf).context("reading datagram")?;
        self.core.process_datagram(&buf[..n]);
        for event in self.core.drain_events() {
            let ReceiverEvent::Document(doc) = event;
            on_doc(doc.text, doc.timestamp);
        }
        Ok(())
    }

    /// Receive forever, invoking `on_doc` for each completed document.
    /// Returns on the first socket error (including a read timeout).
    pub fn run(&mut self, mut on_doc: impl FnMut(String, u32)) -> anyhow::Result<()> {
        loop {
            self.recv_once(&mut on_doc)?;
        }
    }

    /// Channel-style alternative to the callback form: read one datagram
    /// and drain whatever events it produced.
    pub fn recv_once_events(&mut self) -> anyhow::Result<Vec<ReceiverEvent>> {
        let mut buf = vec![0u8; self.config.recv_buf_size];
        let n = self.socket.recv(&mut buf).context("reading datagram")?;
        self.core.process_datagram(&buf[..n]);
        Ok(self.core.drain_events().collect())
    }

    pub fn stats(&self) -> &ReceiverStats {
        self.core.stats()
    }
}

// ─── Cooperative adapter ────────────────────────────────────────────────────

/// Cooperative receiver built on `tokio::net::UdpSocket`. The primary
/// mode per §5; functionally identical to [`Receiver`] but suspends
/// (rather than blocks) awaiting the next datagram.
pub struct AsyncReceiver {
    socket: tokio::net::UdpSocket,
    config: ReceiverConfig,
    core: ReceiverCore,
}

impl AsyncReceiver {
    pub async fn bind(port: u16, config: ReceiverConfig) -> anyhow::Result<Self> {
        let socket = tokio::net::UdpSocket::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("binding async receiver socket to port {port}"))?;
        let core = ReceiverCore::new(config.encoding);
        Ok(AsyncReceiver {
            socket,
            config,
            core,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Await and process exactly one datagram, invoking `on_doc` for
    /// every document it completes. Honors `config.timeout` as a read
    /// timeout, not a document-assembly deadline.
    pub async fn recv_once(&mut self, mut on_doc: impl FnMut(String, u32)) -> anyhow::Result<()> {
        let mut buf = vec![0u8; self.config.recv_buf_size];
        let n = match self.config.timeout {
            Some(d) => tokio::time::timeout(d, self.socket.recv(&mut buf))
                .await
                .context("receive timed out")??,
            None => self.socket.recv(&mut buf).await?,
        };
        self.core.process_datagram(&buf[..n]);
        for event in self.core.drain_events() {
            let ReceiverEvent::Document(doc) = event;
            on_doc(doc.text, doc.timestamp);
        }
        Ok(())
    }

    pub async fn run(&mut self, mut on_doc: impl FnMut(String, u32)) -> anyhow::Result<()> {
        loop {
            self.recv_once(&mut on_doc).await?;
        }
    }

    pub fn stats(&self) -> &ReceiverStats {
        self.core.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtp::RtpHeader;
    use crate::ttml_payload;
    use bytes::BytesMut;

    fn encode_pkt(seq: u16, ts: u32, marker: bool, text: &str) -> Vec<u8> {
        let header = RtpHeader::new(seq, ts, marker, 96, 0).unwrap();
        let payload = ttml_payload::encode(text, Encoding::Utf8, false);
        let pkt = RtpPacket::new(header, bytes::Bytes::from(payload));
        let mut buf = BytesMut::new();
        pkt.encode(&mut buf);
        buf.to_vec()
    }

    // ─── S2 — single-packet doc ──────────────────────────────────────────

    #[test]
    fn single_packet_doc_delivers_one_event() {
        let mut core = ReceiverCore::new(Encoding::Utf8);
        core.process_datagram(&encode_pkt(0, 0, true, "<tt/>"));
        let events: Vec<_> = core.drain_events().collect();
        assert_eq!(
            events,
            vec![ReceiverEvent::Document(AssembledDoc {
                text: "<tt/>".to_string(),
                timestamp: 0
            })]
        );
        assert_eq!(core.stats().packets_received, 1);
        assert_eq!(core.stats().docs_delivered, 1);
    }

    // ─── S3 / S5 — three fragments, including reordered ─────────────────

    #[test]
    fn three_fragments_in_order() {
        let mut core = ReceiverCore::new(Encoding::Utf8);
        core.process_datagram(&encode_pkt(10, 500, false, "AB"));
        core.process_datagram(&encode_pkt(11, 500, false, "CD"));
        core.process_datagram(&encode_pkt(12, 500, true, "E"));
        let events: Vec<_> = core.drain_events().collect();
        assert_eq!(
            events,
            vec![ReceiverEvent::Document(AssembledDoc {
                text: "ABCDE".to_string(),
                timestamp: 500
            })]
        );
    }

    #[test]
    fn reordered_fragments_still_assemble() {
        let mut core = ReceiverCore::new(Encoding::Utf8);
        core.process_datagram(&encode_pkt(10, 500, false, "AB"));
        core.process_datagram(&encode_pkt(12, 500, true, "E"));
        core.process_datagram(&encode_pkt(11, 500, false, "CD"));
        let events: Vec<_> = core.drain_events().collect();
        assert_eq!(
            events,
            vec![ReceiverEvent::Document(AssembledDoc {
                text: "ABCDE".to_string(),
                timestamp: 500
            })]
        );
    }

    // ─── S4 — lost middle fragment ────────────────────────────────────────

    #[test]
    fn lost_fragment_yields_no_event() {
        let mut core = ReceiverCore::new(Encoding::Utf8);
        core.process_datagram(&encode_pkt(10, 500, false, "AB"));
        // seq 11 never arrives
        core.process_datagram(&encode_pkt(12, 500, true, "E"));
        let events: Vec<_> = core.drain_events().collect();
        assert!(events.is_empty());
        assert_eq!(core.stats().docs_discarded, 1);
    }

    // ─── Malformed datagrams ──────────────────────────────────────────────

    #[test]
    fn malformed_datagram_is_counted_not_propagated() {
        let mut core = ReceiverCore::new(Encoding::Utf8);
        core.process_datagram(&[0u8; 2]); // too short for a fixed header
        assert_eq!(core.stats().malformed_packets, 1);
        assert!(core.drain_events().next().is_none());
    }

    // ─── Loopback integration (blocking) ──────────────────────────────────

    #[test]
    fn blocking_receiver_assembles_over_loopback() {
        let mut rx = Receiver::bind(0, ReceiverConfig::default()).unwrap();
        let addr = rx.local_addr().unwrap();
        let sock = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        sock.set_read_timeout(Some(Duration::from_secs(1))).unwrap();

        sock.send_to(&encode_pkt(0, 42, true, "<tt/>"), addr).unwrap();

        let mut delivered = None;
        rx.recv_once(|text, ts| delivered = Some((text, ts))).unwrap();
        assert_eq!(delivered, Some(("<tt/>".to_string(), 42)));
    }
}
