//! Groups fragments by RTP timestamp into an in-flight document, verifies
//! contiguity at the marker, and hands the concatenated document to the
//! caller (or discards it silently on loss).

use tracing::debug;

use crate::rtp::RtpPacket;
use crate::ttml_payload::{self, Encoding};
use crate::unwrap::unwrap_seq;

/// A reassembled document ready for delivery: the concatenated text and
/// the RTP timestamp shared by all its fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDoc {
    pub text: String,
    pub timestamp: u32,
}

/// Per-document fragment accumulator. One instance drives exactly one
/// receiver's in-flight reassembly state.
pub struct FragmentAssembler {
    encoding: Encoding,
    current_timestamp: Option<u32>,
    fragments: Vec<(u64, String)>,
    docs_discarded: u64,
    docs_delivered: u64,
}

impl FragmentAssembler {
    pub fn new(encoding: Encoding) -> Self {
        FragmentAssembler {
            encoding,
            current_timestamp: None,
            fragments: Vec::new(),
            docs_discarded: 0,
            docs_delivered: 0,
        }
    }

    pub fn docs_discarded(&self) -> u64 {
        self.docs_discarded
    }

    pub fn docs_delivered(&self) -> u64 {
        self.docs_delivered
    }

    /// Feed one ordered RTP packet into the assembler. Returns the
    /// assembled document if this packet's marker bit completed one.
    ///
    /// A malformed TTML payload is treated the same as a gap: the
    /// fragment is dropped and, if it carried the marker, whatever is
    /// left of the document is re-evaluated for completeness exactly as
    /// if the fragment had never arrived.
    pub fn process_packet(&mut self, pkt: &RtpPacket) -> Option<AssembledDoc> {
        if self.current_timestamp != Some(pkt.timestamp()) {
            if !self.fragments.is_empty() {
                debug!(
                    prev_timestamp = ?self.current_timestamp,
                    new_timestamp = pkt.timestamp(),
                    fragments = self.fragments.len(),
                    "timestamp changed mid-document, discarding in-flight fragments"
                );
                self.docs_discarded += 1;
            }
            self.fragments.clear();
            self.current_timestamp = Some(pkt.timestamp());
        }

        // Spec §9 open question, reproduced as-is: the first fragment of
        // a document keys off the packet's raw sequence number; every
        // subsequent fragment unwraps against the max key seen so far.
        let key = match self.fragments.iter().map(|(k, _)| *k).max() {
            None => pkt.sequence_number() as u64,
            Some(max_key) => unwrap_seq(max_key, pkt.sequence_number()),
        };

        match ttml_payload::decode(&pkt.payload, self.encoding) {
            Ok(text) => self.fragments.push((key, text)),
            Err(err) => {
                debug!(error = %err, "dropping fragment with malformed TTML payload");
            }
        }

        if pkt.marker() {
            self.process_fragments()
        } else {
            None
        }
    }

    /// Check the in-flight fragment set for contiguity and either deliver
    /// the concatenated document or discard it.
    fn process_fragments(&mut self) -> Option<AssembledDoc> {
        if self.fragments.is_empty() {
            return None;
        }

        let timestamp = self
            .current_timestamp
            .expect("current_timestamp is set whenever fragments is non-empty");

        let min = self.fragments.iter().map(|(k, _)| *k).min().unwrap();
        let max = self.fragments.iter().map(|(k, _)| *k).max().unwrap();
        let expected = (max - min + 1) as usize;

        if self.fragments.len() != expected {
            debug!(
                timestamp,
                have = self.fragments.len(),
                expected,
                "gap in document at marker, discarding"
            );
            self.fragments.clear();
            self.docs_discarded += 1;
            return None;
        }

        let mut sorted = std::mem::take(&mut self.fragments);
        sorted.sort_by_key(|(k, _)| *k);
        let text: String = sorted.into_iter().map(|(_, s)| s).collect();

        self.docs_delivered += 1;
        Some(AssembledDoc { text, timestamp })
    }
}
