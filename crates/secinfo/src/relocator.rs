//! Security-info relocation
//!
//! A relocation moves one size-prefixed blob from a source to a destination
//! and scrubs the source. Either side may be the relocator's staging slot,
//! which lets a loader hand the blob off before the final destination
//! exists:
//!
//! | destination | source   | operation                                  |
//! |-------------|----------|--------------------------------------------|
//! | Internal    | External | `stage`: allocate slot, move into it        |
//! | External    | Internal | `deliver`: move out, free slot, derive key  |
//! | External    | External | `transfer`: move, derive key                |
//! | Internal    | Internal | invalid                                     |
//!
//! # Failure Handling
//!
//! Corruption of the blob (bad size prefix, region too small) and staging
//! allocation failure scrub the source and halt through the HAL. Misuse of
//! the staging slot scrubs an external source first, then panics in debug
//! builds and halts in release builds.

use secinfo_core::{check_scrubbed, checked_declared_size};
use secinfo_hal::SecInfoHal;
use secinfo_unsafe_primitives::{move_and_scrub, region, scrub, SecretBuffer};

use crate::audit::{HandoffEventType, HandoffLog};
use crate::staging::StagingSlot;

const MSG_BOTH_INTERNAL: &str = "dest and src can't both be the staging slot";
const MSG_SLOT_OCCUPIED: &str = "staging slot must be empty when dest is internal";
const MSG_NOTHING_STAGED: &str = "src must be external when nothing is staged";
const MSG_DEST_TOO_SMALL: &str = "destination region smaller than security info";
const MSG_ALLOC_FAILED: &str = "failed to allocate staging buffer";
#[cfg(feature = "derive-key")]
const MSG_DERIVE_FAILED: &str = "failed to derive key";

/// One side of a relocation.
#[derive(Debug)]
pub enum Endpoint<'a> {
    /// Caller-visible memory region
    External(&'a mut [u8]),
    /// The relocator's staging slot
    Internal,
}

impl Endpoint<'_> {
    pub fn is_internal(&self) -> bool {
        matches!(self, Endpoint::Internal)
    }
}

impl<'a> From<Option<&'a mut [u8]>> for Endpoint<'a> {
    fn from(region: Option<&'a mut [u8]>) -> Self {
        match region {
            Some(bytes) => Endpoint::External(bytes),
            None => Endpoint::Internal,
        }
    }
}

/// Moves security-info blobs and owns the staging slot between a stage and
/// its delivery.
pub struct Relocator<H: SecInfoHal> {
    hal: H,
    slot: StagingSlot,
    log: HandoffLog,
}

impl<H: SecInfoHal> Relocator<H> {
    pub fn new(hal: H) -> Self {
        Self {
            hal,
            slot: StagingSlot::Empty,
            log: HandoffLog::new(),
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Audit trail of relocations and derivation outcomes
    pub fn log(&self) -> &HandoffLog {
        &self.log
    }

    pub fn is_staged(&self) -> bool {
        !self.slot.is_empty()
    }

    /// Length of the staged blob, 0 when nothing is staged
    pub fn staged_len(&self) -> usize {
        self.slot.staged_len()
    }

    /// Move the blob at `src` to `dest` and return the bytes moved.
    ///
    /// The source is zero over the moved length when this returns. When the
    /// destination is external and `derive-key` is enabled, the key is
    /// derived into it before returning.
    pub fn relocate(&mut self, dest: Endpoint<'_>, mut src: Endpoint<'_>) -> u32 {
        if let Some(msg) = self.misuse(&dest, &src) {
            if let Endpoint::External(bytes) = &mut src {
                scrub(bytes);
            }
            if cfg!(debug_assertions) {
                panic!("{}", msg);
            }
            self.fatal(msg);
        }

        match (dest, src) {
            (Endpoint::Internal, Endpoint::External(src)) => self.stage(src),
            (Endpoint::External(dest), Endpoint::Internal) => self.deliver(dest),
            (Endpoint::External(dest), Endpoint::External(src)) => self.transfer(dest, src),
            (Endpoint::Internal, Endpoint::Internal) => self.fatal(MSG_BOTH_INTERNAL),
        }
    }

    /// First staging-slot precondition the endpoint pair violates.
    fn misuse(&self, dest: &Endpoint<'_>, src: &Endpoint<'_>) -> Option<&'static str> {
        if dest.is_internal() && src.is_internal() {
            Some(MSG_BOTH_INTERNAL)
        } else if dest.is_internal() && !self.slot.is_empty() {
            Some(MSG_SLOT_OCCUPIED)
        } else if src.is_internal() && self.slot.is_empty() {
            Some(MSG_NOTHING_STAGED)
        } else {
            None
        }
    }

    /// Pointer-level entry point: a null pointer selects the staging slot.
    ///
    /// The source region is sized by its own size prefix; an external
    /// destination is sized to match the source.
    ///
    /// # Safety
    ///
    /// - A non-null `src` must point to a readable size prefix followed by
    ///   the declared number of readable and writable bytes
    /// - A non-null `dest` must be writable for that many bytes
    /// - The two regions must not overlap and nothing else may access them
    ///   during the call
    #[allow(unsafe_code)]
    pub unsafe fn relocate_raw(&mut self, dest: *mut u8, src: *mut u8) -> u32 {
        // SAFETY: Forwarded to the caller.
        let src = unsafe { region::declared_region(src) };
        let len = match &src {
            Some(bytes) => bytes.len(),
            None => self.slot.staged_len(),
        };
        // SAFETY: Forwarded to the caller.
        let dest = unsafe { region::region_from_raw(dest, len) };

        self.relocate(Endpoint::from(dest), Endpoint::from(src))
    }

    /// Move the blob at `src` into a freshly allocated staging buffer.
    pub fn stage(&mut self, src: &mut [u8]) -> u32 {
        if !self.slot.is_empty() {
            scrub(src);
            self.fatal(MSG_SLOT_OCCUPIED);
        }

        let size = self.checked_size(src);
        let mut buffer = match SecretBuffer::try_zeroed(size as usize) {
            Ok(buffer) => buffer,
            Err(_) => {
                scrub(src);
                self.fatal(MSG_ALLOC_FAILED);
            }
        };

        let moved = self.move_info(buffer.as_mut_slice(), src);
        self.slot = StagingSlot::Staged(buffer);

        self.hal.debug_write(&alloc::format!(
            "[secinfo] Staged security info ({} bytes)",
            moved
        ));
        self.record(HandoffEventType::Staged { size: moved });
        moved
    }

    /// Move the staged blob to `dest` and release the staging buffer.
    pub fn deliver(&mut self, dest: &mut [u8]) -> u32 {
        let Some(mut buffer) = self.slot.take() else {
            self.fatal(MSG_NOTHING_STAGED);
        };

        let moved = self.move_info(dest, buffer.as_mut_slice());
        drop(buffer);

        self.hal.debug_write(&alloc::format!(
            "[secinfo] Delivered security info ({} bytes)",
            moved
        ));
        self.record(HandoffEventType::Delivered { size: moved });
        self.finish_delivery(&mut dest[..moved as usize]);
        moved
    }

    /// Move the blob directly between two external regions.
    pub fn transfer(&mut self, dest: &mut [u8], src: &mut [u8]) -> u32 {
        let moved = self.move_info(dest, src);

        self.hal.debug_write(&alloc::format!(
            "[secinfo] Transferred security info ({} bytes)",
            moved
        ));
        self.record(HandoffEventType::Transferred { size: moved });
        self.finish_delivery(&mut dest[..moved as usize]);
        moved
    }

    /// Copy exactly the declared size, then scrub the source.
    fn move_info(&self, dest: &mut [u8], src: &mut [u8]) -> u32 {
        let size = self.checked_size(src);
        let len = size as usize;

        if dest.len() < len {
            scrub(src);
            self.fatal(MSG_DEST_TOO_SMALL);
        }

        move_and_scrub(&mut dest[..len], &mut src[..len]);
        debug_assert!(check_scrubbed(&src[..len]).is_ok());
        size
    }

    /// Validated declared size of the blob at `src`; scrubs and halts on
    /// corruption.
    fn checked_size(&self, src: &mut [u8]) -> u32 {
        match checked_declared_size(src) {
            Ok(size) => size,
            Err(e) => {
                scrub(src);
                self.fatal(&alloc::format!("corrupt security info: {:?}", e));
            }
        }
    }

    #[cfg(feature = "derive-key")]
    fn finish_delivery(&mut self, blob: &mut [u8]) {
        use secinfo_core::{check_derivation_postcondition, DerivationOutcome};

        match crate::derive::derive_key(&self.hal, blob) {
            Ok(selection) => {
                debug_assert!(
                    check_derivation_postcondition(blob, DerivationOutcome::Keyed).is_ok()
                );
                self.hal.debug_write(&alloc::format!(
                    "[secinfo] Derived key from seed {} (svn {})",
                    selection.index,
                    selection.anti_rollback_version
                ));
                self.record(HandoffEventType::KeyDerived {
                    seed_index: selection.index,
                    anti_rollback_version: selection.anti_rollback_version,
                });
            }
            Err(err) => {
                debug_assert!(check_derivation_postcondition(blob, err.outcome()).is_ok());
                self.record(HandoffEventType::KeyDiscarded {
                    outcome: err.outcome(),
                });
                if err.is_fatal() {
                    self.fatal(MSG_DERIVE_FAILED);
                }
            }
        }
    }

    #[cfg(not(feature = "derive-key"))]
    fn finish_delivery(&mut self, _blob: &mut [u8]) {}

    fn record(&mut self, event_type: HandoffEventType) {
        let timestamp = self.hal.now_nanos();
        self.log.record(event_type, timestamp);
    }

    fn fatal(&self, msg: &str) -> ! {
        self.hal.debug_write(&alloc::format!("[secinfo] FATAL: {}", msg));
        self.hal.halt(msg)
    }
}
