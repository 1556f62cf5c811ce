//! The multicarrier OOK modem: bit-to-tone mapping, per-symbol Goertzel-style
//! demodulation, streaming start-of-frame detection, adaptive thresholding,
//! parity and checksum framing.

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod parity;

pub use decoder::{DecoderEngine, MessageDecoder};
pub use encoder::MessageEncoder;
