//! # Circular Delay Store (Multi-Channel Ring Buffer)
//!
//! The delay store keeps the most recent audio history for every channel
//! and lets the engine read it back at an arbitrary lag.
//!
//! ## One Cursor, Many Channels
//!
//! Every channel has its own `Vec<f32>`, but they all share a single write
//! cursor. The engine writes each channel at the cursor, then advances the
//! cursor exactly once (per sample, or per block in block-granular mode).
//! Keeping one cursor means the channels can never drift out of step.
//!
//! ```text
//!            cursor - offset            cursor
//!                  │                      │
//!   ch 0: [ . . . .▼. . . . . . . . . . . ▼ . . . ]
//!   ch 1: [ . . . .▼. . . . . . . . . . . ▼ . . . ]
//!                  └──── offset samples ──┘
//! ```
//!
//! ## Index Arithmetic
//!
//! The read position is `(cursor + capacity - offset) % capacity`. Adding
//! `capacity` before subtracting keeps everything in `usize`, so a read near
//! the start of the buffer wraps to the end instead of underflowing.
//!
//! ## Read/Write Ordering
//!
//! Per-sample processing reads *before* it writes. So offset 1 is the sample
//! written one step ago, and offset 0 is the slot about to be overwritten
//! (the oldest sample in the buffer). Block processing writes the block
//! first and reads afterwards, so offset 0 returns the block just written.

use nih_plug::nih_debug_assert;

use crate::error::{DelayError, Result};

/// Fixed-capacity ring buffers, one per channel, sharing one write cursor.
///
/// All memory is allocated in [`configure()`](Self::configure). Nothing on
/// the read/write/advance path allocates.
#[derive(Debug, Default)]
pub struct DelayStore {
    buffers: Vec<Vec<f32>>,
    cursor: usize,
    capacity: usize,
}

impl DelayStore {
    /// An empty store. Call [`configure()`](Self::configure) before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)allocate `channel_count` zeroed buffers of `capacity` samples and
    /// reset the cursor.
    pub fn configure(&mut self, channel_count: usize, capacity: usize) -> Result<()> {
        if channel_count == 0 {
            return Err(DelayError::InvalidChannelCount {
                count: channel_count,
            });
        }
        if capacity == 0 {
            return Err(DelayError::InvalidCapacity { capacity });
        }

        self.buffers = vec![vec![0.0; capacity]; channel_count];
        self.capacity = capacity;
        self.cursor = 0;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channel_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Copy `samples` into `channel` starting at the cursor.
    ///
    /// If the block runs past the end of the buffer it is split: the tail
    /// segment fills `cursor..capacity` and the remainder lands at offset 0.
    /// The cursor does not move; see [`advance()`](Self::advance).
    ///
    /// # Panics
    ///
    /// If `samples` is longer than the buffer. That can only happen when the
    /// host breaks its own maximum block size.
    pub fn write(&mut self, channel: usize, samples: &[f32]) {
        let count = samples.len();
        assert!(
            count <= self.capacity,
            "block of {count} samples does not fit a delay store of {}",
            self.capacity
        );

        let buffer = &mut self.buffers[channel];
        let tail = count.min(self.capacity - self.cursor);

        buffer[self.cursor..self.cursor + tail].copy_from_slice(&samples[..tail]);
        buffer[..count - tail].copy_from_slice(&samples[tail..]);
    }

    /// Store one sample for `channel` at the cursor.
    #[inline]
    pub fn write_sample(&mut self, channel: usize, sample: f32) {
        self.buffers[channel][self.cursor] = sample;
    }

    /// Copy `out.len()` samples starting `offset` samples behind the cursor.
    pub fn read(&self, channel: usize, offset: usize, out: &mut [f32]) {
        let buffer = &self.buffers[channel];
        let start = self.read_position(offset);
        let count = out.len();
        let tail = count.min(self.capacity - start);

        out[..tail].copy_from_slice(&buffer[start..start + tail]);
        out[tail..].copy_from_slice(&buffer[..count - tail]);
    }

    /// Like [`read()`](Self::read), but mixes the delayed block into `out`
    /// scaled by `gain` instead of overwriting it.
    pub fn add_from(&self, channel: usize, offset: usize, out: &mut [f32], gain: f32) {
        let buffer = &self.buffers[channel];
        let start = self.read_position(offset);
        let tail = out.len().min(self.capacity - start);
        let (out_tail, out_head) = out.split_at_mut(tail);

        for (o, s) in out_tail.iter_mut().zip(&buffer[start..start + tail]) {
            *o += s * gain;
        }
        for (o, s) in out_head.iter_mut().zip(buffer.iter()) {
            *o += s * gain;
        }
    }

    /// The sample `offset` samples behind the cursor.
    #[inline]
    pub fn read_sample(&self, channel: usize, offset: usize) -> f32 {
        self.buffers[channel][self.read_position(offset)]
    }

    /// Read a fractional delay with linear interpolation.
    ///
    /// For a delay of 441.3 samples this blends the sample 441 behind the
    /// cursor (weight 0.7) with the one 442 behind (weight 0.3). `delay` is
    /// clamped to `[0, capacity - 1]`.
    #[inline]
    pub fn read_interpolated(&self, channel: usize, delay: f32) -> f32 {
        let max_delay = self.capacity.saturating_sub(1) as f32;
        let delay = delay.clamp(0.0, max_delay);

        let delay_int = delay as usize;
        let delay_frac = delay - delay_int as f32;

        let sample_a = self.read_sample(channel, delay_int);
        if delay_frac == 0.0 {
            return sample_a;
        }
        let sample_b = self.read_sample(channel, delay_int + 1);

        sample_a + (sample_b - sample_a) * delay_frac
    }

    /// Move the cursor forward by `count` samples.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.cursor = (self.cursor + count) % self.capacity;
    }

    /// Silence every channel and rewind the cursor.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        self.cursor = 0;
    }

    /// Drop the buffers. The store must be configured again before use.
    pub fn release(&mut self) {
        self.buffers = Vec::new();
        self.capacity = 0;
        self.cursor = 0;
    }

    #[inline]
    fn read_position(&self, offset: usize) -> usize {
        nih_debug_assert!(
            offset < self.capacity,
            "delay offset {} outside a store of {} samples",
            offset,
            self.capacity
        );
        (self.cursor + self.capacity - offset % self.capacity) % self.capacity
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn store(channels: usize, capacity: usize) -> DelayStore {
        let mut store = DelayStore::new();
        store.configure(channels, capacity).unwrap();
        store
    }

    #[test]
    fn test_configure_rejects_empty_store() {
        let mut store = DelayStore::new();
        assert_eq!(
            store.configure(2, 0),
            Err(DelayError::InvalidCapacity { capacity: 0 })
        );
        assert_eq!(
            store.configure(0, 16),
            Err(DelayError::InvalidChannelCount { count: 0 })
        );
    }

    /// Offset 1 is the most recently written sample when reading before
    /// writing.
    #[test]
    fn test_sample_write_then_read() {
        let mut store = store(1, 100);

        store.write_sample(0, 0.75);
        store.advance(1);

        let result = store.read_sample(0, 1);
        assert!((result - 0.75).abs() < 1e-6, "Expected 0.75, got {result}");
    }

    #[test]
    fn test_fifo_sequence() {
        let mut store = store(1, 10);

        for i in 1..=5 {
            store.write_sample(0, i as f32);
            store.advance(1);
        }

        for (offset, expected) in [(1, 5.0), (2, 4.0), (3, 3.0), (4, 2.0), (5, 1.0)] {
            assert_eq!(store.read_sample(0, offset), expected);
        }
    }

    /// Offset 0 is the slot the next write will overwrite: the oldest sample.
    #[test]
    fn test_offset_zero_is_oldest_sample() {
        let mut store = store(1, 4);

        for i in 0..6 {
            store.write_sample(0, i as f32);
            store.advance(1);
        }

        // Buffer: [4, 5, 2, 3], cursor at 2.
        assert_eq!(store.cursor(), 2);
        assert_eq!(store.read_sample(0, 0), 2.0);
        assert_eq!(store.read_sample(0, 1), 5.0);
    }

    #[test]
    fn test_interpolation() {
        let mut store = store(1, 100);

        store.write_sample(0, 0.0);
        store.advance(1);
        store.write_sample(0, 1.0);
        store.advance(1);

        // 1 behind = 1.0, 2 behind = 0.0.
        let result = store.read_interpolated(0, 1.5);
        assert!((result - 0.5).abs() < 1e-6, "Expected 0.5, got {result}");

        let result = store.read_interpolated(0, 1.25);
        assert!((result - 0.75).abs() < 1e-6, "Expected 0.75, got {result}");
    }

    #[test]
    fn test_interpolated_read_clamps_to_capacity() {
        let mut store = store(1, 8);
        for i in 0..8 {
            store.write_sample(0, i as f32);
            store.advance(1);
        }

        // Anything past capacity - 1 reads the oldest retained sample.
        assert_eq!(store.read_interpolated(0, 50.0), store.read_sample(0, 7));
        assert_eq!(store.read_interpolated(0, -3.0), store.read_sample(0, 0));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut store = store(2, 16);

        store.write_sample(0, 1.0);
        store.write_sample(1, -1.0);
        store.advance(1);

        assert_eq!(store.read_sample(0, 1), 1.0);
        assert_eq!(store.read_sample(1, 1), -1.0);
    }

    /// A block that runs off the end is split into a tail and a head segment.
    #[test]
    fn test_block_write_splits_at_end() {
        let mut store = store(1, 8);
        store.advance(6);

        store.write(0, &[1.0, 2.0, 3.0, 4.0]);

        // Positions 6, 7 then 0, 1.
        assert_eq!(store.buffers[0], vec![3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_block_read_after_write_at_offset_zero() {
        let mut store = store(1, 8);
        store.advance(5);
        store.write(0, &[1.0, 2.0, 3.0, 4.0]);

        let mut out = [0.0; 4];
        store.read(0, 0, &mut out);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_add_from_mixes_into_output() {
        let mut store = store(1, 8);
        store.write(0, &[1.0, 2.0, 3.0, 4.0]);
        store.advance(4);

        let mut out = [10.0; 4];
        store.add_from(0, 4, &mut out, 0.5);
        assert_eq!(out, [10.5, 11.0, 11.5, 12.0]);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_oversized_block_panics() {
        let mut store = store(1, 4);
        store.write(0, &[0.0; 5]);
    }

    #[test]
    fn test_clear() {
        let mut store = store(2, 10);

        store.write_sample(0, 0.5);
        store.write_sample(1, 0.5);
        store.advance(1);
        store.clear();

        assert_eq!(store.cursor(), 0);
        assert_eq!(store.read_sample(0, 1), 0.0);
        assert_eq!(store.read_sample(1, 1), 0.0);
    }

    #[test]
    fn test_release_drops_buffers() {
        let mut store = store(2, 10);
        store.release();

        assert_eq!(store.capacity(), 0);
        assert_eq!(store.channel_count(), 0);
    }

    /// Block writes and reads across the boundary must match an unbounded
    /// history for several full wrap cycles.
    #[test]
    fn test_block_wrap_matches_unbounded_reference() {
        const CAPACITY: usize = 16;
        const BLOCK: usize = 5;

        for offset in [0, 3, 8, CAPACITY - BLOCK] {
            let mut store = store(2, CAPACITY);
            // History before time zero is silence.
            let mut reference = vec![vec![0.0_f32; CAPACITY]; 2];
            let mut next_value = 1.0_f32;

            // 20 blocks of 5 = 100 samples, a bit over 6 wraps.
            for _ in 0..20 {
                let start = reference[0].len();

                for (channel, history) in reference.iter_mut().enumerate() {
                    let sign = if channel == 0 { 1.0 } else { -1.0 };
                    let block: Vec<f32> =
                        (0..BLOCK).map(|k| sign * (next_value + k as f32)).collect();

                    store.write(channel, &block);
                    history.extend_from_slice(&block);

                    let mut out = [0.0; BLOCK];
                    store.read(channel, offset, &mut out);
                    assert_eq!(
                        &out[..],
                        &history[start - offset..start - offset + BLOCK],
                        "mismatch at offset {offset}, channel {channel}"
                    );
                }

                next_value += BLOCK as f32;
                store.advance(BLOCK);
            }
        }
    }

    /// Same property for the per-sample read-before-write path.
    #[test]
    fn test_sample_wrap_matches_unbounded_reference() {
        const CAPACITY: usize = 7;
        let mut store = store(1, CAPACITY);
        let mut history = vec![0.0_f32; CAPACITY];

        for n in 0..(CAPACITY * 4) {
            for offset in 1..CAPACITY {
                assert_eq!(
                    store.read_sample(0, offset),
                    history[history.len() - offset],
                    "mismatch at sample {n}, offset {offset}"
                );
            }

            let value = n as f32 + 1.0;
            store.write_sample(0, value);
            history.push(value);
            store.advance(1);
        }
    }
}
