//! Error types for the codec boundary.
//!
//! The socket-owning boundary (`Receiver`, `Transmitter`) uses
//! `anyhow::Result`; these types are for the pure codec functions that
//! sit underneath it.

use thiserror::Error;

/// Errors decoding an RTP fixed header or packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtpError {
    #[error("packet too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("unsupported RTP version {0}, expected 2")]
    UnsupportedVersion(u8),

    #[error("payload type {0} out of range, must fit in 7 bits")]
    PayloadTypeOutOfRange(u8),
}

/// Errors decoding a TTML payload under a declared encoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TtmlPayloadError {
    #[error("payload is not valid {encoding} (odd byte length {len})")]
    OddByteLength { encoding: &'static str, len: usize },

    #[error("payload contains invalid {encoding} sequence")]
    InvalidSequence { encoding: &'static str },
}
