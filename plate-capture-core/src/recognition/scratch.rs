use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use image::GrayImage;

/// Ledger of intermediate pixel buffers allocated during `detect`.
///
/// Every buffer is wrapped in a [`ScratchBuffer`] that decrements the live
/// count when dropped, so release happens on every exit path, including
/// early returns from `?` and skipped contours.
#[derive(Debug, Default)]
pub struct ScratchLedger {
    live: AtomicUsize,
    allocated: AtomicU64,
}

impl ScratchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, image: GrayImage) -> ScratchBuffer<'_> {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.allocated.fetch_add(1, Ordering::SeqCst);
        ScratchBuffer {
            image,
            ledger: self,
        }
    }

    /// Buffers currently held. Zero between `detect` calls.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Buffers ever allocated.
    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::SeqCst)
    }
}

/// An intermediate buffer released back to its ledger on drop.
#[derive(Debug)]
pub struct ScratchBuffer<'a> {
    image: GrayImage,
    ledger: &'a ScratchLedger,
}

impl Deref for ScratchBuffer<'_> {
    type Target = GrayImage;

    fn deref(&self) -> &GrayImage {
        &self.image
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        self.ledger.live.fetch_sub(1, Ordering::SeqCst);
    }
}
