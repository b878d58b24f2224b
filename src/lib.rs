//! # rtp-ttml
//!
//! Transports timed-text (TTML) documents over RTP on UDP: fragments a
//! document into packets sharing one timestamp on the way out, and
//! reorders, unwraps, and reassembles them into documents on the way in.
//!
//! ## Crate structure
//!
//! - [`rtp`] — RFC 3550 fixed-header codec
//! - [`ttml_payload`] — TTML payload codec (UTF-8/16/16LE/16BE, optional BOM)
//! - [`ordered_buffer`] — bounded reorder buffer keyed by wrapping `u16`
//! - [`unwrap`] — 16-bit sequence number unwrap
//! - [`assembler`] — per-document fragment accumulation and gap detection
//! - [`fragment`] — document-to-fragments splitter
//! - [`receiver`] — socket-owning receive loop (blocking and cooperative)
//! - [`transmitter`] — socket-owning scoped send session
//! - [`stats`] — receiver/transmitter counters
//! - [`error`] — codec-boundary error types

pub mod assembler;
pub mod error;
pub mod fragment;
pub mod ordered_buffer;
pub mod receiver;
pub mod rtp;
pub mod stats;
pub mod transmitter;
pub mod ttml_payload;
pub mod unwrap;
