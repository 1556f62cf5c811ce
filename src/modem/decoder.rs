//! Streaming float32 audio to zero or more decoded byte payloads.
//!
//! [`DecoderEngine`] is the synchronous core: feed it samples, poll it for
//! messages, no threads involved. [`MessageDecoder`] wraps a `DecoderEngine`
//! in a background worker fed by a channel, which is what [`SlidingWindow`]
//! actually uses — replacing the Python source's condvar-and-shared-flag
//! pattern with a task blocking on a channel receive, per the concurrency
//! redesign.
//!
//! [`SlidingWindow`]: crate::link::SlidingWindow

use std::f64::consts::PI;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::ModemError;
use crate::modem::{frame, parity};
use crate::params::{FrequencySet, TransmissionParameters};

/// The synchronous demodulation core: an input sample buffer, precomputed
/// per-channel sine/cosine reference tables, and the §4.9 scan loop.
pub struct DecoderEngine {
    params: TransmissionParameters,
    sin_tables: Vec<Vec<f64>>,
    cos_tables: Vec<Vec<f64>>,
    decode_buf: Vec<f32>,
}

impl DecoderEngine {
    pub fn new(params: TransmissionParameters) -> Self {
        let window = params.window_size();
        let sample_rate = params.sample_rate() as f64;
        let frequencies = params.frequencies(FrequencySet::Recv);

        let mut sin_tables = Vec::with_capacity(frequencies.len());
        let mut cos_tables = Vec::with_capacity(frequencies.len());
        for freq in frequencies {
            let mut sin_t = Vec::with_capacity(window);
            let mut cos_t = Vec::with_capacity(window);
            for n in 0..window {
                let t = n as f64 / sample_rate;
                sin_t.push((2.0 * PI * freq * t).sin());
                cos_t.push((2.0 * PI * freq * t).cos());
            }
            sin_tables.push(sin_t);
            cos_tables.push(cos_t);
        }

        Self {
            params,
            sin_tables,
            cos_tables,
            decode_buf: Vec::new(),
        }
    }

    fn window_size(&self) -> usize {
        self.params.window_size()
    }

    fn channels(&self) -> usize {
        self.sin_tables.len()
    }

    fn max_frame_samples(&self) -> usize {
        frame::frame_samples(
            self.params.max_payload_size() as usize,
            self.channels(),
            self.window_size(),
        )
    }

    /// Appends newly captured samples to the decode buffer.
    pub fn feed(&mut self, samples: &[f32]) {
        self.decode_buf.extend_from_slice(samples);
    }

    /// One non-negative magnitude per symbol window, computed in double
    /// precision against channel `ch`'s precomputed sine/cosine tables.
    fn magnitudes(&self, ch: usize, audio: &[f32]) -> Vec<f64> {
        let window = self.window_size();
        debug_assert_eq!(audio.len() % window, 0);
        let sin_t = &self.sin_tables[ch];
        let cos_t = &self.cos_tables[ch];
        audio
            .chunks_exact(window)
            .map(|win| {
                let mut a = 0f64;
                let mut b = 0f64;
                for (i, &x) in win.iter().enumerate() {
                    let x = x as f64;
                    a += sin_t[i] * x;
                    b += cos_t[i] * x;
                }
                (a * a + b * b).sqrt()
            })
            .collect()
    }

    /// Slides an `11*W`-sample window across `data` in `W/4` steps looking
    /// for an exact match of the start sequence on channel 0, bootstrapping
    /// the threshold from the mean of the sequence's first two symbols.
    fn find_start(&self, data: &[f32]) -> Option<usize> {
        let window = self.window_size();
        let start_len = frame::START_SEQ.len() * window;
        let step = (window / 4).max(1);

        let mut cursor = 0;
        while cursor + start_len <= data.len() {
            let mags = self.magnitudes(0, &data[cursor..cursor + start_len]);
            let threshold = (mags[0] + mags[1]) / 2.0;
            let matches = mags
                .iter()
                .zip(frame::START_SEQ.iter())
                .all(|(&m, &expected)| (if m > threshold { 1 } else { 0 }) == expected);
            if matches {
                return Some(cursor);
            }
            cursor += step;
        }
        None
    }

    /// Demodulates exactly one maximal frame's worth of samples from the
    /// front of `audio` using adaptive per-channel thresholding, then
    /// validates the length field and checksum.
    fn process_frame(&self, audio: &[f32]) -> Result<Vec<u8>, ModemError> {
        let window = self.window_size();
        let new_size = audio.len() - audio.len() % window;
        let max_size = self.max_frame_samples();
        let audio = &audio[..new_size.min(max_size)];

        let channels = self.channels();
        let mut bin_data_ch: Vec<Vec<u8>> = Vec::with_capacity(channels);
        for ch in 0..channels {
            let mags = self.magnitudes(ch, audio);
            let mut lo = mags[0];
            let mut hi = mags[1];
            let mut bits = Vec::with_capacity(mags.len());
            for &m in &mags {
                let threshold = (lo + hi) / 2.0;
                if m > threshold {
                    bits.push(1u8);
                    hi = m;
                } else {
                    bits.push(0u8);
                    lo = m;
                }
            }
            bin_data_ch.push(bits);
        }

        for bits in bin_data_ch.iter_mut() {
            let no_start = bits[frame::START_SEQ.len()..].to_vec();
            *bits = parity::remove_parity_bits(&no_start);
        }

        let symbols_per_channel = bin_data_ch[0].len();
        let mut bit_stream = Vec::with_capacity(symbols_per_channel * channels);
        for i in 0..symbols_per_channel {
            for channel_bits in &bin_data_ch {
                bit_stream.push(channel_bits[i]);
            }
        }

        let data = frame::bits_to_bytes(&bit_stream);
        if data.len() < frame::HEADER_LEN {
            return Err(ModemError::TruncatedFrame {
                needed: frame::HEADER_LEN,
                available: data.len(),
            });
        }

        let length = (data[2] & 0x3f) as usize;
        if length + frame::HEADER_LEN > data.len() {
            return Err(ModemError::TruncatedFrame {
                needed: length + frame::HEADER_LEN,
                available: data.len(),
            });
        }

        let framed = &data[..length + frame::HEADER_LEN];
        if !crate::modem::checksum::verify(framed) {
            return Err(ModemError::BadChecksum);
        }

        Ok(framed[frame::HEADER_LEN..].to_vec())
    }

    /// Runs the §4.9 scan loop once over the buffered samples: repeatedly
    /// searches for a start sequence and attempts a frame decode until the
    /// buffer can no longer contain another maximal frame, or no start can
    /// be found. Failed decode attempts advance the cursor by a small step
    /// rather than aborting the whole scan — starts are cheap to re-search
    /// and collisions with in-band data are screened out by the checksum.
    fn scan(&mut self) -> Vec<Vec<u8>> {
        let window = self.window_size();
        let max_required = self.max_frame_samples();
        let mut messages = Vec::new();
        let mut cursor = 0usize;

        while cursor + max_required <= self.decode_buf.len() {
            match self.find_start(&self.decode_buf[cursor..]) {
                None => {
                    cursor = self.decode_buf.len();
                    break;
                }
                Some(offset) => {
                    cursor += offset;
                    if cursor + max_required > self.decode_buf.len() {
                        break;
                    }
                    match self.process_frame(&self.decode_buf[cursor..]) {
                        Ok(message) => {
                            log::debug!("decoded frame: {} byte payload", message.len());
                            let consumed = frame::frame_samples(message.len(), self.channels(), window);
                            cursor += consumed;
                            messages.push(message);
                        }
                        Err(e) => {
                            log::trace!("frame decode attempt at offset {cursor} failed: {e}");
                            cursor += (window / 10).max(1);
                        }
                    }
                }
            }
        }

        self.decode_buf.drain(..cursor);

        if self.decode_buf.len() > max_required {
            log::warn!(
                "decode buffer exceeded {max_required} samples, truncating to the most recent {}",
                2 * max_required
            );
            let keep = 2 * max_required;
            let excess = self.decode_buf.len() - keep;
            self.decode_buf.drain(..excess);
        }

        messages
    }

    /// Feeds `samples` and runs the scan loop, returning every message
    /// decoded as a result.
    pub fn push_and_poll(&mut self, samples: &[f32]) -> Vec<Vec<u8>> {
        self.feed(samples);
        self.scan()
    }

    /// Runs the scan loop over whatever is already buffered, without
    /// feeding new samples first.
    pub fn poll(&mut self) -> Vec<Vec<u8>> {
        self.scan()
    }
}

/// The public, thread-backed decoder: a dedicated worker blocks on a
/// channel receive, demodulates whatever arrives, and queues decoded
/// payloads for [`get_message`](Self::get_message) to drain.
pub struct MessageDecoder {
    input_tx: Option<Sender<Vec<f32>>>,
    output_rx: Receiver<Vec<u8>>,
    worker: Option<JoinHandle<()>>,
}

impl MessageDecoder {
    pub fn new(params: TransmissionParameters) -> Self {
        let (input_tx, input_rx) = unbounded::<Vec<f32>>();
        let (output_tx, output_rx) = unbounded::<Vec<u8>>();

        let worker = thread::spawn(move || {
            let mut engine = DecoderEngine::new(params);
            while let Ok(samples) = input_rx.recv() {
                for message in engine.push_and_poll(&samples) {
                    if output_tx.send(message).is_err() {
                        return;
                    }
                }
            }
        });

        Self {
            input_tx: Some(input_tx),
            output_rx,
            worker: Some(worker),
        }
    }

    /// Hands newly captured samples to the decoder worker. Never blocks
    /// meaningfully; the worker processes them asynchronously.
    pub fn add_frames(&self, frames: &[f32]) {
        if let Some(tx) = &self.input_tx {
            let _ = tx.send(frames.to_vec());
        }
    }

    /// Pops the oldest decoded message, if any are queued.
    pub fn get_message(&self) -> Option<Vec<u8>> {
        self.output_rx.try_recv().ok()
    }

    /// Stops the worker: closing the input channel unblocks its pending
    /// `recv`, which treats the resulting `Err` as a shutdown signal.
    pub fn stop(mut self) {
        self.shut_down();
    }

    fn shut_down(&mut self) {
        self.input_tx.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MessageDecoder {
    fn drop(&mut self) {
        self.shut_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modem::encoder::MessageEncoder;

    fn mirrored_params(num_channels: u32) -> (TransmissionParameters, TransmissionParameters) {
        let send = TransmissionParameters::new()
            .with_num_channels(num_channels)
            .with_is_master(true)
            .build()
            .unwrap();
        let recv = TransmissionParameters::new()
            .with_num_channels(num_channels)
            .with_is_master(false)
            .build()
            .unwrap();
        (send, recv)
    }

    #[test]
    fn decodes_a_single_frame_with_trailing_silence() {
        let (send_params, recv_params) = mirrored_params(4);
        let encoder = MessageEncoder::new(send_params);
        let mut engine = DecoderEngine::new(recv_params);

        let mut audio = encoder.encode(b"Hello World");
        audio.extend(std::iter::repeat(0.0f32).take(1_000_000));

        let messages = engine.push_and_poll(&audio);
        assert_eq!(messages, vec![b"Hello World".to_vec()]);
    }

    #[test]
    fn decodes_back_to_back_frames() {
        let (send_params, recv_params) = mirrored_params(32);
        let encoder = MessageEncoder::new(send_params);
        let mut engine = DecoderEngine::new(recv_params);

        let mut audio = encoder.encode(b"Hello World");
        audio.extend(encoder.encode(b"Hello World"));
        audio.extend(std::iter::repeat(0.0f32).take(1_000_000));

        let messages = engine.push_and_poll(&audio);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], b"Hello World");
        assert_eq!(messages[1], b"Hello World");
    }

    #[test]
    fn segmented_feed_matches_whole_feed() {
        let (send_params, recv_params) = mirrored_params(32);
        let encoder = MessageEncoder::new(send_params);

        let payload = vec![b'a'; 12];
        let audio = encoder.encode(&payload);

        let mut whole = DecoderEngine::new(recv_params);
        let whole_messages = whole.push_and_poll(&audio);

        let mut segmented = DecoderEngine::new(recv_params);
        let mut segmented_messages = Vec::new();
        for chunk in audio.chunks(1000) {
            segmented_messages.extend(segmented.push_and_poll(chunk));
        }

        assert_eq!(whole_messages, segmented_messages);
        assert_eq!(whole_messages, vec![payload]);
    }

    #[test]
    fn worker_decodes_and_stops_cleanly() {
        let (send_params, recv_params) = mirrored_params(32);
        let encoder = MessageEncoder::new(send_params);
        let decoder = MessageDecoder::new(recv_params);

        let audio = encoder.encode(b"ping");
        decoder.add_frames(&audio);
        decoder.add_frames(&vec![0.0f32; 200_000]);

        let mut message = None;
        for _ in 0..200 {
            if let Some(m) = decoder.get_message() {
                message = Some(m);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(message, Some(b"ping".to_vec()));
        decoder.stop();
    }
}
