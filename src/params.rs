//! Immutable per-session configuration and the quantities derived from it.

use std::time::Duration;

use crate::error::ConfigError;

/// Selects which of the two disjoint carrier subsets a caller is asking
/// about: the one this peer transmits on, or the one it listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencySet {
    Send,
    Recv,
}

/// Per-session modem and link configuration.
///
/// Built with the `with_*` methods and finalized with [`build`](Self::build),
/// which performs the fatal validation from the error-handling design.
/// Once built, a `TransmissionParameters` is `Copy` and is shared read-only
/// between the link, the encoder, and the decoder's worker thread — it is
/// never mutated after the link starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmissionParameters {
    base_freq: f64,
    num_channels: u32,
    sample_rate: u32,
    window_length: f64,
    seq_max: u8,
    max_payload_size: u8,
    is_master: bool,
}

impl Default for TransmissionParameters {
    fn default() -> Self {
        Self {
            base_freq: 2000.0,
            num_channels: 8,
            sample_rate: 44100,
            window_length: 0.1,
            seq_max: 3,
            max_payload_size: 12,
            is_master: true,
        }
    }
}

impl TransmissionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_freq(mut self, base_freq: f64) -> Self {
        self.base_freq = base_freq;
        self
    }

    pub fn with_num_channels(mut self, num_channels: u32) -> Self {
        self.num_channels = num_channels;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_window_length(mut self, window_length: f64) -> Self {
        self.window_length = window_length;
        self
    }

    pub fn with_seq_max(mut self, seq_max: u8) -> Self {
        self.seq_max = seq_max;
        self
    }

    pub fn with_max_payload_size(mut self, max_payload_size: u8) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn with_is_master(mut self, is_master: bool) -> Self {
        self.is_master = is_master;
        self
    }

    /// Validates the fatal configuration constraints and returns the
    /// finished parameters. The only way to obtain a `TransmissionParameters`
    /// outside of tests that rely on defaults should be through this.
    pub fn build(self) -> Result<Self, ConfigError> {
        if self.max_payload_size as u32 > 63 {
            return Err(ConfigError::PayloadTooLarge(self.max_payload_size as u32));
        }
        if self.num_channels < 2 {
            return Err(ConfigError::TooFewChannels(self.num_channels));
        }
        if self.seq_max > 15 {
            return Err(ConfigError::SeqMaxTooLarge(self.seq_max as u32));
        }
        Ok(self)
    }

    pub fn base_freq(&self) -> f64 {
        self.base_freq
    }

    pub fn num_channels(&self) -> u32 {
        self.num_channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn window_length(&self) -> f64 {
        self.window_length
    }

    pub fn seq_max(&self) -> u8 {
        self.seq_max
    }

    pub fn max_payload_size(&self) -> u8 {
        self.max_payload_size
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    /// `W = round(fs * W_sec)`, the number of audio samples in one symbol.
    pub fn window_size(&self) -> usize {
        (self.sample_rate as f64 * self.window_length).round() as usize
    }

    /// The full `f_i = f0 * (1 + 0.2*i)` ladder, before splitting into send
    /// and receive subsets.
    fn all_frequencies(&self) -> Vec<f64> {
        (0..self.num_channels)
            .map(|i| self.base_freq * (1.0 + 0.2 * i as f64))
            .collect()
    }

    /// The disjoint send or receive carrier subset for this peer's role.
    ///
    /// The master's send subset is the even-indexed frequencies and its
    /// receive subset the odd-indexed ones; the slave is mirrored, so
    /// master-send lines up with slave-recv and vice versa.
    pub fn frequencies(&self, set: FrequencySet) -> Vec<f64> {
        let frequencies = self.all_frequencies();
        let want_even = (self.is_master && set == FrequencySet::Send)
            || (!self.is_master && set == FrequencySet::Recv);
        let start = if want_even { 0 } else { 1 };
        frequencies.into_iter().skip(start).step_by(2).collect()
    }

    /// Estimate of a reasonable Go-Back-N retransmission timeout: enough for
    /// a full window of maximum-payload frames to round-trip.
    pub fn timeout(&self) -> Duration {
        let latency = 3.0;
        let nchannels = self.num_channels as f64 / 2.0;
        let data_time_ch =
            self.seq_max as f64 * 9.0 * (self.max_payload_size as f64 + 3.0) / nchannels;
        let timeout = self.window_length * (11.0 + data_time_ch);
        Duration::from_secs_f64((1.5 * timeout).max(1.0) + latency)
    }

    /// Theoretical maximum application throughput in bits per second, given
    /// one full window's worth of maximum-payload frames in flight.
    pub fn max_bits_per_second(&self) -> f64 {
        let nchannels = if self.is_master {
            (self.num_channels as f64 / 2.0).ceil()
        } else {
            (self.num_channels as f64 / 2.0).floor()
        };
        let transmission_time = (11.0
            + (9.0 * (self.max_payload_size as f64 + 3.0) / nchannels).ceil())
            * self.window_length;
        8.0 * (self.max_payload_size as f64 - 1.0) / transmission_time
    }
}
