//! Wire-level constants and the byte/bit/symbol-count math shared by the
//! encoder and decoder.

/// The literal 11-bit pattern prepended to every channel's transmission,
/// before parity insertion.
pub const START_SEQ: [u8; 11] = [0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0];

/// Header size in bytes: 2-byte checksum + 1-byte length field.
pub const HEADER_LEN: usize = 3;

/// `ceil(8 * (payload_len + HEADER_LEN) / channels)` — the number of data
/// bits (pre-parity) assigned to each channel.
pub fn bits_per_channel(payload_len: usize, channels: usize) -> usize {
    let total_bits = 8 * (payload_len + HEADER_LEN);
    (total_bits + channels - 1) / channels
}

/// Per-channel symbol count after parity insertion, excluding the start
/// sequence.
pub fn channel_symbols(payload_len: usize, channels: usize) -> usize {
    let bpc = bits_per_channel(payload_len, channels);
    bpc + bpc / 8
}

/// Total per-channel symbol count including the 11-symbol start sequence.
pub fn total_symbols(payload_len: usize, channels: usize) -> usize {
    START_SEQ.len() + channel_symbols(payload_len, channels)
}

/// The modem frame's length in audio samples for a payload of `payload_len`
/// bytes demultiplexed across `channels` channels with a `window`-sample
/// symbol.
pub fn frame_samples(payload_len: usize, channels: usize, window: usize) -> usize {
    window * total_symbols(payload_len, channels)
}

/// Expands bytes into bits, most-significant-bit first.
pub fn bytes_to_bits(data: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(data.len() * 8);
    for &byte in data {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

/// Groups bits into bytes, most-significant-bit first. A trailing partial
/// byte (fewer than 8 leftover bits) is dropped.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modem::encoder::MessageEncoder;
    use crate::params::TransmissionParameters;
    use rand::{Rng, SeedableRng};

    #[test]
    fn byte_bit_round_trip() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        let bits = bytes_to_bits(&bytes);
        assert_eq!(bits.len(), bytes.len() * 8);
        assert_eq!(bits_to_bytes(&bits), bytes);
    }

    #[test]
    fn frame_size_prediction_matches_the_encoder() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        for k in 1..=16u32 {
            let params = TransmissionParameters::new()
                .with_num_channels(2 * k)
                .build()
                .unwrap();
            let encoder = MessageEncoder::new(params);
            let window = params.window_size();
            for length in 0..=12usize {
                let message: Vec<u8> = (0..length).map(|_| rng.gen()).collect();
                let audio = encoder.encode(&message);
                let predicted = frame_samples(length, k as usize, window);
                assert_eq!(
                    audio.len(),
                    predicted,
                    "k={k} length={length}: got {} want {predicted}",
                    audio.len()
                );
            }
        }
    }
}
