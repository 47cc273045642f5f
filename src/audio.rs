//! Decoding of base64 16-bit PCM speech payloads.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::observability::AUDIO_DECODE_ERRORS;
use crate::{Error, Result};

/// Sample rate of synthesized speech.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Channel count of synthesized speech.
pub const SPEECH_CHANNELS: u16 = 1;

const BYTES_PER_SAMPLE: usize = 2;

/// Normalized floating-point samples, one vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples of channel `index`, each in [-1, 1).
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Playback length.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Encodes the buffer as a 16-bit PCM RIFF/WAVE file.
    pub fn to_wav(&self) -> Vec<u8> {
        let channels = self.channels.len() as u16;
        let frames = self.frames();
        let data_len = (frames * self.channels.len() * BYTES_PER_SAMPLE) as u32;
        let block_align = channels * BYTES_PER_SAMPLE as u16;
        let byte_rate = self.sample_rate * block_align as u32;

        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for frame in 0..frames {
            for channel in &self.channels {
                let sample = (channel[frame] * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }
        out
    }
}

/// Decodes base64 little-endian 16-bit PCM, interleaved by channel.
///
/// Each sample is divided by 32768. A payload whose byte length is not a
/// whole number of frames is rejected rather than truncated.
pub fn decode_pcm16(payload: &str, sample_rate: u32, channels: u16) -> Result<AudioBuffer> {
    let result = decode_pcm16_inner(payload, sample_rate, channels);
    if result.is_err() {
        AUDIO_DECODE_ERRORS.click();
    }
    result
}

fn decode_pcm16_inner(payload: &str, sample_rate: u32, channels: u16) -> Result<AudioBuffer> {
    if channels == 0 {
        return Err(Error::audio_decode("channel count must be positive"));
    }
    let bytes = STANDARD.decode(payload.trim())?;
    let channels = channels as usize;
    let frame_len = channels * BYTES_PER_SAMPLE;
    if bytes.len() % frame_len != 0 {
        return Err(Error::audio_decode(format!(
            "payload of {} bytes is not a multiple of {frame_len} ({channels} channel(s) x 2 bytes)",
            bytes.len()
        )));
    }

    let frames = bytes.len() / frame_len;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for (index, chunk) in bytes.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        out[index % channels].push(sample as f32 / 32768.0);
    }
    Ok(AudioBuffer {
        sample_rate,
        channels: out,
    })
}

/// Decodes a speech payload at the fixed speech format (24 kHz mono).
pub fn decode_speech(payload: &str) -> Result<AudioBuffer> {
    decode_pcm16(payload, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)
}
