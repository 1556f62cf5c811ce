//! Byte payload to float32 audio waveform. Stateless beyond its cached
//! per-channel carrier tables.

use std::f64::consts::PI;

use crate::modem::{checksum, frame, parity};
use crate::params::{FrequencySet, TransmissionParameters};

/// Multicarrier on-off-keying modulator.
///
/// Caches one period's worth of each send channel's carrier (`W` samples,
/// one full symbol) at construction and tiles it per bit, rather than
/// recomputing `cos(2*pi*f*t)` on every sample of every call to `encode`.
pub struct MessageEncoder {
    params: TransmissionParameters,
    carrier_tables: Vec<Vec<f32>>,
}

impl MessageEncoder {
    pub fn new(params: TransmissionParameters) -> Self {
        let window = params.window_size();
        let sample_rate = params.sample_rate() as f64;
        let carrier_tables = params
            .frequencies(FrequencySet::Send)
            .into_iter()
            .map(|freq| {
                (0..window)
                    .map(|n| (2.0 * PI * freq * (n as f64) / sample_rate).cos() as f32)
                    .collect()
            })
            .collect();
        Self {
            params,
            carrier_tables,
        }
    }

    fn channels(&self) -> usize {
        self.carrier_tables.len()
    }

    /// Builds one channel's OOK waveform: `carrier` tiled at every bit equal
    /// to 1, silence at every bit equal to 0.
    fn modulate_channel(&self, ch: usize, bits: &[u8]) -> Vec<f32> {
        let window = self.params.window_size();
        let carrier = &self.carrier_tables[ch];
        let mut out = Vec::with_capacity(bits.len() * window);
        for &bit in bits {
            if bit == 1 {
                out.extend_from_slice(carrier);
            } else {
                out.resize(out.len() + window, 0.0);
            }
        }
        out
    }

    /// Encodes `message` (fewer than 256 bytes) into a normalised float32
    /// waveform summing every channel's OOK stream.
    pub fn encode(&self, message: &[u8]) -> Vec<f32> {
        assert!(message.len() < 256, "message too long to encode");

        let mut header = [0u8; frame::HEADER_LEN];
        header[2] = message.len() as u8;
        checksum::fill(&mut header, message);

        let mut complete = header.to_vec();
        complete.extend_from_slice(message);

        let channels = self.channels();
        let mut bits = frame::bytes_to_bits(&complete);
        let pad = (channels - bits.len() % channels) % channels;
        bits.resize(bits.len() + pad, 0);

        let mut audio: Option<Vec<f32>> = None;
        for ch in 0..channels {
            let ch_bits: Vec<u8> = bits.iter().skip(ch).step_by(channels).copied().collect();

            let mut stream = frame::START_SEQ.to_vec();
            stream.extend(parity::add_parity_bits(&ch_bits));

            let ch_audio = self.modulate_channel(ch, &stream);
            match audio.as_mut() {
                None => audio = Some(ch_audio),
                Some(acc) => {
                    for (a, b) in acc.iter_mut().zip(ch_audio.iter()) {
                        *a += b;
                    }
                }
            }
        }

        let mut audio = audio.unwrap_or_default();
        let peak = audio.iter().fold(0f32, |m, &x| m.max(x.abs()));
        if peak > 0.0 {
            for x in audio.iter_mut() {
                *x /= peak;
            }
        }
        audio
    }
}
