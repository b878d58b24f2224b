//! Receiver and transmitter counters, serialisable for external reporting.

use serde::Serialize;

// ─── Receiver Stats ─────────────────────────────────────────────────────────

/// Aggregate receiver-side statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReceiverStats {
    /// Total datagrams read off the socket.
    pub packets_received: u64,
    /// Datagrams that failed RTP header decode and were dropped.
    pub malformed_packets: u64,
    /// Times the reorder buffer fast-forwarded past a missing slot.
    pub buffer_overflows: u64,
    /// Documents successfully reassembled and delivered.
    pub docs_delivered: u64,
    /// Documents discarded for a gap at the marker or a timestamp change
    /// abandoning a partial document.
    pub docs_discarded: u64,
}

impl ReceiverStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of in-flight documents that were discarded rather than
    /// delivered. `0.0` when no document has completed or been dropped yet.
    pub fn drop_rate(&self) -> f64 {
        let total = self.docs_delivered + self.docs_discarded;
        if total == 0 {
            0.0
        } else {
            self.docs_discarded as f64 / total as f64
        }
    }
}

// ─── Transmitter Stats ──────────────────────────────────────────────────────

/// Aggregate transmitter-side statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransmitterStats {
    /// Documents submitted to `send_doc`.
    pub docs_sent: u64,
    /// RTP packets successfully written to the socket.
    pub packets_sent: u64,
    /// `sendto` failures (the document may be partially sent).
    pub send_failures: u64,
}

impl TransmitterStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average fragment count per sent document.
    pub fn mean_fragments_per_doc(&self) -> f64 {
        if self.docs_sent == 0 {
            0.0
        } else {
            self.packets_sent as f64 / self.docs_sent as f64
        }
    }
}
