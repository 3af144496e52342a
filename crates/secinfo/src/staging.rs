//! Staging slot
//!
//! Holds the blob between "store into internal" and "deliver from internal"
//! when the final destination is not known yet. The slot is a plain value
//! owned by a `Relocator`; there is no process-wide state.

use core::mem;

use secinfo_unsafe_primitives::SecretBuffer;

/// Empty/Staged ownership of the transient staging buffer.
///
/// Dropping a staged slot scrubs and frees the buffer.
#[derive(Debug, Default)]
pub enum StagingSlot {
    #[default]
    Empty,
    Staged(SecretBuffer),
}

impl StagingSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, StagingSlot::Empty)
    }

    /// Length of the staged blob, 0 when empty
    pub fn staged_len(&self) -> usize {
        match self {
            StagingSlot::Empty => 0,
            StagingSlot::Staged(buffer) => buffer.len(),
        }
    }

    /// Take ownership of the staged buffer, leaving the slot empty.
    pub fn take(&mut self) -> Option<SecretBuffer> {
        match mem::take(self) {
            StagingSlot::Empty => None,
            StagingSlot::Staged(buffer) => Some(buffer),
        }
    }
}
