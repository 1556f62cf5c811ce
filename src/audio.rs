//! The `AudioStream` collaborator contract.
//!
//! The link consumes exactly this interface; a real speaker/microphone
//! binding (device enumeration, sample format conversion, real-time
//! scheduling) is out of scope here and lives outside this crate. What
//! this module does provide is [`LoopbackAudioStream`], an in-process pair
//! of full-duplex FIFOs implementing the same contract — the "lossless
//! float32 pipe" used to connect two `SlidingWindow`s without any audio
//! hardware, for tests and for development.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Maximum number of buffered float32 samples before a receive FIFO starts
/// dropping the oldest data. Matches the audio I/O worker's overflow policy.
const MAX_RECV_BUF_SIZE: usize = 1024 * 1024;

/// Full-duplex float32 PCM sink/source at the sample rate and channel count
/// (mono) implied by the session's `TransmissionParameters`.
///
/// `play` must return promptly without meaningfully blocking the caller;
/// `record` atomically drains everything captured since the last call.
pub trait AudioStream: Send {
    /// Appends samples to the output FIFO.
    fn play(&self, samples: &[f32]);
    /// Atomically returns and clears all buffered captured samples.
    fn record(&self) -> Vec<f32>;
    fn start(&self);
    fn stop(&self);
}

/// A single-producer/single-consumer FIFO of float32 samples, bounded to
/// [`MAX_RECV_BUF_SIZE`]. On overflow the oldest samples are discarded and a
/// warning is logged once per contiguous dropping episode, not once per
/// sample.
struct Fifo {
    buf: Mutex<VecDeque<f32>>,
    dropping: AtomicBool,
}

impl Fifo {
    fn new() -> Self {
        Self {
            buf: Mutex::new(VecDeque::new()),
            dropping: AtomicBool::new(false),
        }
    }

    fn push(&self, samples: &[f32]) {
        let mut buf = self.buf.lock().unwrap();
        buf.extend(samples.iter().copied());
        if buf.len() > MAX_RECV_BUF_SIZE {
            let excess = buf.len() - MAX_RECV_BUF_SIZE;
            buf.drain(..excess);
            if !self.dropping.swap(true, Ordering::Relaxed) {
                log::warn!("audio receive buffer exceeded {MAX_RECV_BUF_SIZE} samples, dropping oldest");
            }
        } else {
            self.dropping.store(false, Ordering::Relaxed);
        }
    }

    fn drain_all(&self) -> Vec<f32> {
        let mut buf = self.buf.lock().unwrap();
        buf.drain(..).collect()
    }
}

/// An in-process `AudioStream` implementation backed by plain FIFOs rather
/// than a sound card. [`LoopbackAudioStream::pair`] wires two of these
/// together so that one side's `play` feeds the other's `record`,
/// simulating a lossless acoustic channel for tests and demos.
pub struct LoopbackAudioStream {
    outgoing: Arc<Fifo>,
    incoming: Arc<Fifo>,
    running: Arc<AtomicBool>,
}

impl LoopbackAudioStream {
    /// Builds two linked stream endpoints: whatever endpoint A plays,
    /// endpoint B records, and vice versa.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Fifo::new());
        let b_to_a = Arc::new(Fifo::new());
        let a = Self {
            outgoing: a_to_b.clone(),
            incoming: b_to_a.clone(),
            running: Arc::new(AtomicBool::new(false)),
        };
        let b = Self {
            outgoing: b_to_a,
            incoming: a_to_b,
            running: Arc::new(AtomicBool::new(false)),
        };
        (a, b)
    }
}

impl AudioStream for LoopbackAudioStream {
    fn play(&self, samples: &[f32]) {
        self.outgoing.push(samples);
    }

    fn record(&self) -> Vec<f32> {
        self.incoming.drain_all()
    }

    fn start(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}
