//! Scrubbing primitives for secret byte ranges
//!
//! Every secret copy in the handoff goes through this module so that the
//! "zero, then barrier" sequence lives in exactly one place.
//!
//! # Safety Invariants
//!
//! 1. **No residue**: a scrubbed range reads back as zero
//! 2. **Ordering**: the zeroing is ordered before any later access to the range
//! 3. **Every exit path**: guards scrub on drop, including unwinding

use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{fence, Ordering};

use zeroize::Zeroize;

/// Overwrite `bytes` with zero and fence.
///
/// The writes are volatile (via `zeroize`) so they survive optimization even
/// when the memory is about to be freed.
pub fn scrub(bytes: &mut [u8]) {
    bytes.zeroize();
    fence(Ordering::SeqCst);
}

/// Copy `src` into `dest`, then scrub `src`.
///
/// Both ranges must have the same length. The scrub runs even if the copy
/// panics.
pub fn move_and_scrub(dest: &mut [u8], src: &mut [u8]) -> usize {
    let src = ScrubOnDrop::new(src);
    dest.copy_from_slice(&src);
    src.len()
}

/// Scoped borrow of a secret range that is scrubbed when the guard drops.
pub struct ScrubOnDrop<'a> {
    bytes: &'a mut [u8],
}

impl<'a> ScrubOnDrop<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }
}

impl Deref for ScrubOnDrop<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl DerefMut for ScrubOnDrop<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

impl Drop for ScrubOnDrop<'_> {
    fn drop(&mut self) {
        scrub(self.bytes);
    }
}

/// Staging allocation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError;

/// Heap buffer for a staged secret.
///
/// Allocated with exactly the requested length and zero-filled. The contents
/// are scrubbed before the storage goes back to the allocator.
pub struct SecretBuffer {
    bytes: Vec<u8>,
}

impl SecretBuffer {
    /// Allocate `len` zeroed bytes, reporting allocator exhaustion instead of
    /// aborting.
    pub fn try_zeroed(len: usize) -> Result<Self, AllocError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len).map_err(|_| AllocError)?;
        bytes.resize(len, 0);
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        scrub(&mut self.bytes);
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Kani Proofs
// ============================================================================

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Proof: every byte is zero after a scrub
    #[kani::proof]
    fn scrub_zeroes_every_byte() {
        let mut buf: [u8; 8] = kani::any();
        scrub(&mut buf);
        kani::assert(buf.iter().all(|b| *b == 0), "Scrubbed range must be zero");
    }

    /// Proof: move_and_scrub delivers the source bytes and leaves none behind
    #[kani::proof]
    fn move_preserves_and_clears() {
        let original: [u8; 8] = kani::any();
        let mut src = original;
        let mut dest = [0u8; 8];

        let moved = move_and_scrub(&mut dest, &mut src);

        kani::assert(moved == 8, "All bytes must be moved");
        kani::assert(dest == original, "Destination must hold the source bytes");
        kani::assert(src.iter().all(|b| *b == 0), "Source must be zero");
    }
}
