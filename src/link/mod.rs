//! Go-Back-N reliable transport over the modem, with duplex roles separated
//! by frequency-division so each peer transmits and receives on disjoint
//! sub-bands.

pub mod pdu;

use std::collections::VecDeque;
use std::time::Instant;

use bytes::{Bytes, BytesMut};

use crate::audio::AudioStream;
use crate::modem::{MessageDecoder, MessageEncoder};
use crate::params::TransmissionParameters;
use pdu::PduHeader;

fn advance(seq: u8, modulus: u8) -> u8 {
    (seq + 1) % modulus
}

/// A symmetric Go-Back-N link driven by external calls to [`tick`](Self::tick)
/// at roughly 10 Hz. All link-state mutation happens inside `tick`; it is
/// not re-entrant.
pub struct SlidingWindow<A: AudioStream> {
    params: TransmissionParameters,
    encoder: MessageEncoder,
    decoder: MessageDecoder,
    audio: A,

    send_buf: VecDeque<u8>,
    send_frames: Vec<Option<Bytes>>,
    send_seq: u8,
    send_ack: u8,

    recv_seq: u8,
    recv_buf: Vec<u8>,

    timeout_deadline: Instant,

    on_send_complete: Option<Box<dyn FnMut() + Send>>,
    on_data_available: Option<Box<dyn FnMut() + Send>>,
}

impl<A: AudioStream> SlidingWindow<A> {
    pub fn new(params: TransmissionParameters, audio: A) -> Self {
        let encoder = MessageEncoder::new(params);
        let decoder = MessageDecoder::new(params);
        audio.start();

        log::debug!(
            "sending freq set: {:?}",
            params.frequencies(crate::params::FrequencySet::Send)
        );
        log::debug!(
            "recving freq set: {:?}",
            params.frequencies(crate::params::FrequencySet::Recv)
        );

        let modulus = params.seq_max() + 1;
        Self {
            params,
            encoder,
            decoder,
            audio,
            send_buf: VecDeque::new(),
            send_frames: vec![None; modulus as usize],
            send_seq: 0,
            send_ack: 0,
            recv_seq: 0,
            recv_buf: Vec::new(),
            timeout_deadline: Instant::now(),
            on_send_complete: None,
            on_data_available: None,
        }
    }

    fn modulus(&self) -> u8 {
        self.params.seq_max() + 1
    }

    /// Registers a callback fired when `send_ack == send_seq` and the
    /// outbound byte stream is empty — everything handed to `send` has been
    /// acknowledged.
    pub fn attach_on_send_complete(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_send_complete = Some(Box::new(callback));
    }

    /// Registers a callback fired once per accepted inbound data PDU.
    pub fn attach_on_data_available(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_data_available = Some(Box::new(callback));
    }

    /// Appends `data` to the outbound byte stream. Returns immediately and
    /// never fails; `tick` drains it in `max_payload_size - 1`-byte frames.
    pub fn send(&mut self, data: &[u8]) {
        self.send_buf.extend(data.iter().copied());
    }

    /// Atomically drains and returns everything accepted from inbound data
    /// PDUs since the last call.
    pub fn recv(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.recv_buf)
    }

    fn send_ack_pdu(&mut self) {
        let header = PduHeader {
            ack: true,
            is_master: self.params.is_master(),
            seq: self.recv_seq,
        };
        let pdu = vec![header.to_byte()];
        log::trace!("send_ack_message seq={}", self.recv_seq);
        let audio = self.encoder.encode(&pdu);
        self.audio.play(&audio);
    }

    fn send_data_pdu(&mut self) {
        let max_payload = self.params.max_payload_size() as usize;
        let take = self.send_buf.len().min(max_payload.saturating_sub(1));

        let mut payload = Vec::with_capacity(take);
        for _ in 0..take {
            payload.push(self.send_buf.pop_front().expect("checked by take"));
        }

        let header = PduHeader {
            ack: false,
            is_master: self.params.is_master(),
            seq: self.send_seq,
        };
        let mut pdu = BytesMut::with_capacity(1 + payload.len());
        pdu.extend_from_slice(&[header.to_byte()]);
        pdu.extend_from_slice(&payload);
        let pdu = pdu.freeze();

        log::debug!("send_data_message seq={} len={}", self.send_seq, pdu.len());
        self.send_frames[self.send_seq as usize] = Some(pdu.clone());

        let audio = self.encoder.encode(&pdu);
        self.audio.play(&audio);

        self.send_seq = advance(self.send_seq, self.modulus());
        self.timeout_deadline = Instant::now() + self.params.timeout();
    }

    fn resend_data_pdu(&mut self, seq: u8) {
        if let Some(pdu) = self.send_frames[seq as usize].clone() {
            log::debug!("resend_data_message seq={seq}");
            let audio = self.encoder.encode(&pdu);
            self.audio.play(&audio);
        }
    }

    /// Drives one iteration of the link: drains captured audio into the
    /// decoder, processes every decoded PDU, sends as much buffered data as
    /// the window allows, and retransmits on timeout. Call at roughly 10 Hz.
    pub fn tick(&mut self) {
        let captured = self.audio.record();
        if !captured.is_empty() {
            self.decoder.add_frames(&captured);
        }

        let modulus = self.modulus();

        while let Some(message) = self.decoder.get_message() {
            if message.is_empty() {
                log::warn!("received empty message, this should not happen");
                continue;
            }

            let header = PduHeader::from_byte(message[0]);
            if header.is_master == self.params.is_master() {
                log::trace!("self-echo filtered seq={}", header.seq);
                continue;
            }

            if header.ack {
                self.send_ack = header.seq;
                if self.send_ack == self.send_seq && self.send_buf.is_empty() {
                    if let Some(callback) = self.on_send_complete.as_mut() {
                        callback();
                    }
                }
            } else {
                if header.seq == self.recv_seq {
                    self.recv_buf.extend_from_slice(&message[1..]);
                    self.recv_seq = advance(self.recv_seq, modulus);
                    if let Some(callback) = self.on_data_available.as_mut() {
                        callback();
                    }
                } else {
                    log::trace!(
                        "duplicate seq {} (expected {}), re-acking",
                        header.seq,
                        self.recv_seq
                    );
                }
                self.send_ack_pdu();
            }
        }

        while !self.send_buf.is_empty() {
            let diff = (self.send_seq + modulus - self.send_ack) % modulus;
            if diff >= self.params.seq_max() {
                break;
            }
            self.send_data_pdu();
        }

        if Instant::now() > self.timeout_deadline {
            let mut seq = self.send_ack;
            while seq != self.send_seq {
                self.resend_data_pdu(seq);
                seq = advance(seq, modulus);
            }
            self.timeout_deadline = Instant::now() + self.params.timeout();
        }
    }

    /// Terminates the decoder and audio workers.
    pub fn stop(self) {
        self.decoder.stop();
        self.audio.stop();
    }
}
