//! Fixed-duration PCM chunk assembly

use std::time::Instant;

/// One fixed-duration unit of captured PCM audio.
///
/// Immutable once produced; emission order matches capture order.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// 16-bit signed mono samples
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Monotonic capture timestamp
    pub captured_at: Instant,
}

impl AudioChunk {
    /// Samples as little-endian bytes, the upstream wire layout
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Assembles raw device samples into fixed-size chunks.
///
/// Device callbacks deliver buffers of arbitrary length; the chunker
/// re-cuts them so every emitted chunk holds exactly `chunk_samples`
/// samples. A trailing partial chunk stays pending until completed or
/// discarded by `reset`, so consumers never observe a ragged boundary.
#[derive(Debug)]
pub struct AudioChunker {
    pending: Vec<i16>,
    chunk_samples: usize,
    sample_rate: u32,
}

impl AudioChunker {
    pub fn new(chunk_samples: usize, sample_rate: u32) -> Self {
        Self {
            pending: Vec::with_capacity(chunk_samples),
            chunk_samples: chunk_samples.max(1),
            sample_rate,
        }
    }

    /// Feed device samples; returns every chunk completed by this buffer
    pub fn push(&mut self, samples: &[i16]) -> Vec<AudioChunk> {
        let mut complete = Vec::new();
        for &sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.chunk_samples {
                let samples = std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(self.chunk_samples),
                );
                complete.push(AudioChunk {
                    samples,
                    sample_rate: self.sample_rate,
                    captured_at: Instant::now(),
                });
            }
        }
        complete
    }

    /// Number of samples waiting for the current chunk to fill
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Discard any partial chunk
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Convert f32 device samples to i16, clamping non-finite values to silence
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = if s.is_finite() { s } else { 0.0 };
            (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        })
        .collect()
}
