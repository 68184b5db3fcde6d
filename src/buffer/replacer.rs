//! Page replacement policies.
//!
//! Victim selection and access bookkeeping for the buffer pool. The five
//! policies share the frame table; per-frame bookkeeping (recency stamp,
//! reference bit, frequency, access history) lives on the frames, while
//! policy-wide state (cursors, the logical clock) lives here.

use crate::buffer::pool::Frame;
use crate::error::{Result, StorageError};

/// Replacement policy for a buffer pool.
///
/// `LruK` carries its history depth `k`; two is the conventional default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementPolicy {
    /// First in, first out: evict in load order
    Fifo,
    /// Least recently used: evict the oldest access stamp
    Lru,
    /// Second-chance clock sweep over a reference bit
    Clock,
    /// Least frequently used: evict the smallest access count
    Lfu,
    /// LRU-K: evict the frame whose k-th most recent access is oldest
    LruK { k: usize },
}

impl ReplacementPolicy {
    /// Default history depth for LRU-K
    pub const DEFAULT_K: usize = 2;

    /// LRU-K with the default history depth
    pub fn lru_k() -> Self {
        ReplacementPolicy::LruK { k: Self::DEFAULT_K }
    }
}

/// Replacement state for one buffer pool
pub(crate) struct Replacer {
    policy: ReplacementPolicy,
    /// Logical clock driving LRU stamps and LRU-K histories
    clock: u64,
    /// Next frame to consider for FIFO eviction
    fifo_cursor: usize,
    /// Clock hand for the second-chance sweep
    clock_hand: usize,
}

impl Replacer {
    pub(crate) fn new(policy: ReplacementPolicy) -> Self {
        if let ReplacementPolicy::LruK { k } = policy {
            assert!(k > 0, "LRU-K history depth must be positive");
        }
        Self {
            policy,
            clock: 0,
            fifo_cursor: 0,
            clock_hand: 0,
        }
    }

    pub(crate) fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Update bookkeeping for a page found resident in `frame`
    pub(crate) fn on_hit(&mut self, frame: &mut Frame) {
        match self.policy {
            ReplacementPolicy::Fifo => {}
            ReplacementPolicy::Lru => frame.stamp = self.tick(),
            ReplacementPolicy::Clock => frame.ref_bit = true,
            ReplacementPolicy::Lfu => frame.freq += 1,
            ReplacementPolicy::LruK { k } => {
                if frame.history.len() == k {
                    frame.history.pop_front();
                }
                let now = self.tick();
                frame.history.push_back(now);
            }
        }
    }

    /// Reset bookkeeping for a page freshly loaded into `frame`
    pub(crate) fn on_load(&mut self, frame: &mut Frame) {
        match self.policy {
            ReplacementPolicy::Fifo => {}
            ReplacementPolicy::Lru => frame.stamp = self.tick(),
            ReplacementPolicy::Clock => frame.ref_bit = false,
            ReplacementPolicy::Lfu => frame.freq = 1,
            ReplacementPolicy::LruK { .. } => {
                frame.history.clear();
                let now = self.tick();
                frame.history.push_back(now);
            }
        }
    }

    /// Choose a victim among unpinned frames.
    ///
    /// Fails with `PoolPinned` when every frame has a positive fix count.
    pub(crate) fn select_victim(&mut self, frames: &mut [Frame]) -> Result<usize> {
        match self.policy {
            ReplacementPolicy::Fifo => self.select_fifo(frames),
            ReplacementPolicy::Lru => Self::select_lru(frames),
            ReplacementPolicy::Clock => self.select_clock(frames),
            ReplacementPolicy::Lfu => Self::select_lfu(frames),
            ReplacementPolicy::LruK { k } => Self::select_lru_k(frames, k),
        }
    }

    /// First unpinned frame at or after the FIFO cursor
    fn select_fifo(&mut self, frames: &[Frame]) -> Result<usize> {
        let n = frames.len();
        for j in 0..n {
            let idx = (self.fifo_cursor + j) % n;
            if frames[idx].fix_count == 0 {
                self.fifo_cursor = (idx + 1) % n;
                return Ok(idx);
            }
        }
        Err(StorageError::PoolPinned)
    }

    /// Unpinned frame with the smallest access stamp
    fn select_lru(frames: &[Frame]) -> Result<usize> {
        frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.fix_count == 0)
            .min_by_key(|(_, f)| f.stamp)
            .map(|(i, _)| i)
            .ok_or(StorageError::PoolPinned)
    }

    /// Second-chance sweep: clear set reference bits, take the first clear one
    fn select_clock(&mut self, frames: &mut [Frame]) -> Result<usize> {
        if frames.iter().all(|f| f.fix_count > 0) {
            return Err(StorageError::PoolPinned);
        }

        let n = frames.len();
        loop {
            let idx = self.clock_hand;
            self.clock_hand = (self.clock_hand + 1) % n;
            let frame = &mut frames[idx];
            if frame.fix_count != 0 {
                continue;
            }
            if frame.ref_bit {
                frame.ref_bit = false;
            } else {
                return Ok(idx);
            }
        }
    }

    /// Unpinned frame with the smallest frequency; ties go to the lower index
    fn select_lfu(frames: &[Frame]) -> Result<usize> {
        let mut victim = None;
        let mut min_freq = u64::MAX;
        for (i, frame) in frames.iter().enumerate() {
            if frame.fix_count == 0 && frame.freq < min_freq {
                min_freq = frame.freq;
                victim = Some(i);
            }
        }
        victim.ok_or(StorageError::PoolPinned)
    }

    /// Oldest k-th most recent access among frames with a full history;
    /// frames with fewer than k accesses fall back to their most recent one
    fn select_lru_k(frames: &[Frame], k: usize) -> Result<usize> {
        let mut victim = None;
        let mut oldest = u64::MAX;
        for (i, frame) in frames.iter().enumerate() {
            if frame.fix_count != 0 || frame.history.len() < k {
                continue;
            }
            let kth = *frame.history.front().unwrap();
            if kth < oldest {
                oldest = kth;
                victim = Some(i);
            }
        }

        if victim.is_none() {
            for (i, frame) in frames.iter().enumerate() {
                if frame.fix_count != 0 {
                    continue;
                }
                if let Some(&last) = frame.history.back() {
                    if last < oldest {
                        oldest = last;
                        victim = Some(i);
                    }
                }
            }
        }

        victim.ok_or(StorageError::PoolPinned)
    }
}
