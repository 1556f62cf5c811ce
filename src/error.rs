//! Error taxonomy for the modem and link layers.
//!
//! Per the design's error-handling policy, only two kinds of failure are
//! ever surfaced as `Result`s: a single decode attempt failing
//! ([`ModemError`]) and configuration being rejected at construction time
//! ([`ConfigError`]). Everything else in the link protocol (self-echo,
//! duplicate sequence numbers, buffer overflow, timeouts) is transient
//! channel noise the link hides by design and is handled as plain control
//! flow, logged rather than returned.

/// A single attempt to demodulate one frame failed.
///
/// None of these are fatal: the decoder's streaming loop treats every
/// variant as "drop this candidate and keep scanning."
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModemError {
    #[error("no start sequence found in decode buffer")]
    NoStart,
    #[error("frame truncated: need {needed} bytes, have {available}")]
    TruncatedFrame { needed: usize, available: usize },
    #[error("checksum mismatch")]
    BadChecksum,
}

/// `TransmissionParameters` was built with an invalid combination of values.
///
/// This is the only error that can leave the crate's user with no working
/// link, so it is checked eagerly in `TransmissionParameters::build`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_payload_size must be <= 63 to fit the six-bit length field, got {0}")]
    PayloadTooLarge(u32),
    #[error("num_channels must be >= 2 to support duplex send/recv subsets, got {0}")]
    TooFewChannels(u32),
    #[error("seq_max must be <= 15 to fit the four-bit sequence field, got {0}")]
    SeqMaxTooLarge(u32),
}
