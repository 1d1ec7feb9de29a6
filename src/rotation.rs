//! Cross-Frame Buffer Rotation
//!
//! Two independent mechanisms select between the physical resources of a
//! temporal pair:
//!
//! - [`BufferSlot`] is rotated explicitly, exactly once per update tick
//!   (depth history). After rotation `current()` is the instance written this
//!   frame and `previous()` holds last frame's copy.
//! - [`FrameParityPair`] derives its roles from the frame counter
//!   (temporal AA output/history) and is never rotated.
//!
//! The two never share a resource, so neither can disturb the other.

use crate::device::TextureHandle;

/// A two-element rotating pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSlot<T> {
    data: [T; 2],
    index: usize,
}

impl<T> BufferSlot<T> {
    #[must_use]
    pub const fn new(first: T, second: T) -> Self {
        Self {
            data: [first, second],
            index: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> &T {
        &self.data[self.index]
    }

    #[inline]
    #[must_use]
    pub fn previous(&self) -> &T {
        &self.data[self.index ^ 1]
    }

    #[inline]
    pub fn rotate(&mut self) {
        self.index ^= 1;
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Pair whose write/read roles alternate with the frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParityPair {
    pub resources: [TextureHandle; 2],
}

impl FrameParityPair {
    #[must_use]
    pub const fn new(even: TextureHandle, odd: TextureHandle) -> Self {
        Self {
            resources: [even, odd],
        }
    }

    /// Resource written on `frame`: index `frame mod 2`.
    #[inline]
    #[must_use]
    pub fn output(&self, frame: u64) -> TextureHandle {
        self.resources[(frame % 2) as usize]
    }

    /// Resource holding the previous frame's result: index `1 - frame mod 2`.
    #[inline]
    #[must_use]
    pub fn history(&self, frame: u64) -> TextureHandle {
        self.resources[1 - (frame % 2) as usize]
    }
}

/// Owner of every cross-frame pair of the render path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRotator {
    depth_history: BufferSlot<TextureHandle>,
    temporal_aa: FrameParityPair,
    rotations: u64,
}

impl BufferRotator {
    #[must_use]
    pub const fn new(depth_history: BufferSlot<TextureHandle>, temporal_aa: FrameParityPair) -> Self {
        Self {
            depth_history,
            temporal_aa,
            rotations: 0,
        }
    }

    /// Called once per update tick, never while rendering.
    pub fn on_update(&mut self) {
        self.depth_history.rotate();
        self.rotations += 1;
    }

    /// Depth copy written by this frame's depth prepass.
    #[inline]
    #[must_use]
    pub fn depth_current(&self) -> TextureHandle {
        *self.depth_history.current()
    }

    /// Depth copy written by the previous frame.
    #[inline]
    #[must_use]
    pub fn depth_previous(&self) -> TextureHandle {
        *self.depth_history.previous()
    }

    #[inline]
    #[must_use]
    pub fn depth_history(&self) -> &BufferSlot<TextureHandle> {
        &self.depth_history
    }

    #[inline]
    #[must_use]
    pub fn temporal_aa(&self) -> &FrameParityPair {
        &self.temporal_aa
    }

    /// Number of update ticks observed since the pair was created.
    #[inline]
    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.rotations
    }
}
