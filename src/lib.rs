//! Acoustic link: a multicarrier on-off-keying modem plus a Go-Back-N
//! reliable transport, for sending arbitrary byte payloads between two
//! peers over a speaker and a microphone.
//!
//! The crate is organised leaves-first:
//!
//! - [`params`] — immutable per-session configuration and derived
//!   quantities (carrier frequencies, window sample count, timeout).
//! - [`audio`] — the `AudioStream` collaborator contract, plus an
//!   in-process loopback implementation for tests and development.
//! - [`modem`] — [`MessageEncoder`]/[`MessageDecoder`]: byte payload to
//!   float32 waveform and back.
//! - [`link`] — [`SlidingWindow`]: the Go-Back-N link over a modem and an
//!   audio stream.
//!
//! A real speaker/microphone binding (device enumeration, hardware sample
//! format conversion) is outside this crate's scope; callers provide their
//! own [`audio::AudioStream`] implementation.

pub mod audio;
pub mod error;
pub mod link;
pub mod modem;
pub mod params;

pub use audio::{AudioStream, LoopbackAudioStream};
pub use error::{ConfigError, ModemError};
pub use link::SlidingWindow;
pub use modem::{DecoderEngine, MessageDecoder, MessageEncoder};
pub use params::{FrequencySet, TransmissionParameters};
