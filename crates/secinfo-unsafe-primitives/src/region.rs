//! Raw memory regions handed over by a loader
//!
//! Boot loaders pass the security-info blob as a bare address. These helpers
//! turn such addresses into slices so that everything past this point is
//! bounds-checked safe code. A null address means "no region".

use core::slice;

/// Length of the little-endian size prefix at the start of every blob
pub const SIZE_PREFIX_LEN: usize = 4;

/// Build a mutable region of `len` bytes at `ptr`.
///
/// Returns `None` for a null pointer.
///
/// # Safety
///
/// - `ptr` must be valid for reads and writes of `len` bytes for `'a`
/// - No other reference may access the region during `'a`
pub unsafe fn region_from_raw<'a>(ptr: *mut u8, len: usize) -> Option<&'a mut [u8]> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: Non-null, and the caller guarantees validity and exclusivity
    // for `len` bytes over `'a`.
    Some(unsafe { slice::from_raw_parts_mut(ptr, len) })
}

/// Build the region described by the size prefix stored at `ptr`.
///
/// The region always covers at least the prefix itself, so a corrupt
/// (too small) declared size can still be inspected and rejected by the
/// caller. Returns `None` for a null pointer.
///
/// # Safety
///
/// - `ptr` must be valid for reads of the 4-byte prefix
/// - `ptr` must then be valid for reads and writes of
///   `max(declared size, 4)` bytes for `'a`
/// - No other reference may access the region during `'a`
pub unsafe fn declared_region<'a>(ptr: *mut u8) -> Option<&'a mut [u8]> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: The caller guarantees the prefix is readable. The read is
    // unaligned because loaders do not promise word alignment of the blob.
    let prefix = unsafe { core::ptr::read_unaligned(ptr as *const [u8; SIZE_PREFIX_LEN]) };
    let len = (u32::from_le_bytes(prefix) as usize).max(SIZE_PREFIX_LEN);
    // SAFETY: Non-null, and the caller guarantees validity and exclusivity
    // for the declared length over `'a`.
    Some(unsafe { slice::from_raw_parts_mut(ptr, len) })
}
