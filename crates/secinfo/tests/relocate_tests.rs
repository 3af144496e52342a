//! Relocation integration tests
//!
//! Drives the public `relocate` entry points through a mock HAL and checks
//! scrubbing, staging exclusivity, and the fail-closed paths.

use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};

use secinfo::{
    Endpoint, HalError, HandoffEventType, Relocator, SecInfoHal, SecurityInfo,
    SecurityInfoBuilder,
};
use secinfo_hal::{soft_hmac_sha256, HMAC_SHA256_LEN};

// ============================================================================
// Mock HAL for Testing
// ============================================================================

#[derive(Default)]
pub struct MockHal {
    time: Cell<u64>,
    fail_hmac: Cell<bool>,
    hmac_calls: Cell<u32>,
    debug_log: RefCell<Vec<String>>,
    halted: RefCell<Option<String>>,
}

impl MockHal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_hmac() -> Self {
        let hal = Self::default();
        hal.fail_hmac.set(true);
        hal
    }

    fn logged(&self, needle: &str) -> bool {
        self.debug_log.borrow().iter().any(|l| l.contains(needle))
    }

    fn halt_reason(&self) -> Option<String> {
        self.halted.borrow().clone()
    }
}

impl SecInfoHal for MockHal {
    fn hmac_sha256(
        &self,
        key: &[u8],
        data: &[u8],
        out: &mut [u8; HMAC_SHA256_LEN],
    ) -> Result<(), HalError> {
        self.hmac_calls.set(self.hmac_calls.get() + 1);
        if self.fail_hmac.get() {
            return Err(HalError::CryptoFailure);
        }
        soft_hmac_sha256(key, data, out)
    }

    fn debug_write(&self, msg: &str) {
        self.debug_log.borrow_mut().push(msg.to_string());
    }

    fn halt(&self, msg: &str) -> ! {
        *self.halted.borrow_mut() = Some(msg.to_string());
        panic!("halt: {}", msg)
    }

    fn now_nanos(&self) -> u64 {
        let now = self.time.get();
        self.time.set(now + 100);
        now
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn seed(fill: u8) -> [u8; 32] {
    [fill; 32]
}

fn sample_blob() -> Vec<u8> {
    SecurityInfoBuilder::new()
        .seed(3, seed(0x31))
        .seed(1, seed(0x11))
        .seed(5, seed(0x51))
        .seed(5, seed(0x52))
        .seed(2, seed(0x21))
        .trailing_bytes(12)
        .build()
}

fn is_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}

/// Compare everything except the key field, which derivation may rewrite.
fn assert_same_except_key(delivered: &[u8], original: &[u8]) {
    assert_eq!(delivered.len(), original.len());
    let key_range = SecurityInfo::parse(original).unwrap().key_range();
    assert_eq!(delivered[..key_range.start], original[..key_range.start]);
    assert_eq!(delivered[key_range.end..], original[key_range.end..]);
}

// ============================================================================
// Zeroization
// ============================================================================

#[test]
fn test_stage_scrubs_source() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let len = src.len();

    let moved = relocator.relocate(Endpoint::Internal, Endpoint::External(&mut src));

    assert_eq!(moved as usize, len);
    assert!(is_zero(&src));
    assert!(relocator.is_staged());
    assert_eq!(relocator.hal().hmac_calls.get(), 0);
}

#[test]
fn test_transfer_scrubs_source() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let original = src.clone();
    let mut dest = vec![0u8; src.len()];

    let moved = relocator.relocate(Endpoint::External(&mut dest), Endpoint::External(&mut src));

    assert_eq!(moved as usize, original.len());
    assert!(is_zero(&src));
    assert_same_except_key(&dest, &original);
    assert!(!relocator.is_staged());
}

#[test]
fn test_only_declared_size_moves() {
    let mut relocator = Relocator::new(MockHal::new());
    let blob = sample_blob();
    let mut src = blob.clone();
    src.extend_from_slice(&[0xCC; 16]);
    let mut dest = vec![0xEEu8; src.len()];

    let moved = relocator.relocate(Endpoint::External(&mut dest), Endpoint::External(&mut src));

    assert_eq!(moved as usize, blob.len());
    assert!(is_zero(&src[..blob.len()]));
    assert_eq!(src[blob.len()..], [0xCC; 16]);
    assert_eq!(dest[blob.len()..], [0xEE; 16]);
}

// ============================================================================
// Staging lifecycle
// ============================================================================

#[test]
fn test_round_trip_releases_slot() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let original = src.clone();

    let staged = relocator.relocate(Endpoint::Internal, Endpoint::External(&mut src));
    assert_eq!(relocator.staged_len(), original.len());

    let mut dest = vec![0u8; original.len()];
    let delivered = relocator.relocate(Endpoint::External(&mut dest), Endpoint::Internal);

    assert_eq!(staged, delivered);
    assert!(!relocator.is_staged());
    assert_eq!(relocator.staged_len(), 0);
    assert_same_except_key(&dest, &original);

    let events: Vec<_> = relocator
        .log()
        .events()
        .iter()
        .map(|e| e.event_type.clone())
        .collect();
    assert_eq!(events[0], HandoffEventType::Staged { size: staged });
    assert_eq!(events[1], HandoffEventType::Delivered { size: staged });
}

#[test]
fn test_slot_reusable_after_delivery() {
    let mut relocator = Relocator::new(MockHal::new());

    for _ in 0..2 {
        let mut src = sample_blob();
        let mut dest = vec![0u8; src.len()];
        relocator.relocate(Endpoint::Internal, Endpoint::External(&mut src));
        relocator.relocate(Endpoint::External(&mut dest), Endpoint::Internal);
        assert!(!relocator.is_staged());
    }
}

#[test]
#[should_panic(expected = "staging slot must be empty when dest is internal")]
fn test_double_stage_rejected() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut first = sample_blob();
    let mut second = sample_blob();

    relocator.relocate(Endpoint::Internal, Endpoint::External(&mut first));
    relocator.relocate(Endpoint::Internal, Endpoint::External(&mut second));
}

#[test]
fn test_double_stage_scrubs_second_source() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut first = sample_blob();
    let mut second = sample_blob();
    let staged = relocator.relocate(Endpoint::Internal, Endpoint::External(&mut first));

    let result = catch_unwind(AssertUnwindSafe(|| {
        relocator.relocate(Endpoint::Internal, Endpoint::External(&mut second))
    }));

    assert!(result.is_err());
    assert!(is_zero(&second));
    // The first blob stays staged and untouched
    assert_eq!(relocator.staged_len(), staged as usize);
}

#[test]
#[should_panic(expected = "src must be external when nothing is staged")]
fn test_deliver_with_empty_slot_rejected() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut dest = vec![0u8; 64];
    relocator.relocate(Endpoint::External(&mut dest), Endpoint::Internal);
}

#[test]
#[should_panic(expected = "dest and src can't both be the staging slot")]
fn test_both_internal_rejected() {
    let mut relocator = Relocator::new(MockHal::new());
    relocator.relocate(Endpoint::Internal, Endpoint::Internal);
}

// ============================================================================
// Corruption
// ============================================================================

#[test]
fn test_misaligned_size_scrubs_and_halts() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let bad = (src.len() as u32) - 2;
    src[..4].copy_from_slice(&bad.to_le_bytes());
    let mut dest = vec![0u8; src.len()];

    let result = catch_unwind(AssertUnwindSafe(|| {
        relocator.relocate(Endpoint::External(&mut dest), Endpoint::External(&mut src))
    }));

    assert!(result.is_err());
    assert!(is_zero(&src));
    assert!(is_zero(&dest));
    let reason = relocator.hal().halt_reason().unwrap();
    assert!(reason.contains("MisalignedSize"));
    assert!(relocator.hal().logged("FATAL"));
}

#[test]
fn test_size_beyond_region_scrubs_and_halts() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let oversized = src.len() as u32 + 64;
    src[..4].copy_from_slice(&oversized.to_le_bytes());

    let result = catch_unwind(AssertUnwindSafe(|| {
        relocator.relocate(Endpoint::Internal, Endpoint::External(&mut src))
    }));

    assert!(result.is_err());
    assert!(is_zero(&src));
    assert!(!relocator.is_staged());
    assert!(relocator.hal().halt_reason().unwrap().contains("SizeExceedsRegion"));
}

#[test]
fn test_size_below_prefix_scrubs_and_halts() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = vec![0xABu8; 16];
    src[..4].copy_from_slice(&0u32.to_le_bytes());

    let result = catch_unwind(AssertUnwindSafe(|| {
        relocator.relocate(Endpoint::Internal, Endpoint::External(&mut src))
    }));

    assert!(result.is_err());
    assert!(is_zero(&src));
    assert!(!relocator.is_staged());
    assert!(relocator.hal().halt_reason().unwrap().contains("UndersizedPrefix"));
}

#[test]
fn test_small_destination_scrubs_and_halts() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let mut dest = vec![0u8; 16];

    let result = catch_unwind(AssertUnwindSafe(|| {
        relocator.relocate(Endpoint::External(&mut dest), Endpoint::External(&mut src))
    }));

    assert!(result.is_err());
    assert!(is_zero(&src));
    assert!(is_zero(&dest));
    assert_eq!(
        relocator.hal().halt_reason().as_deref(),
        Some("destination region smaller than security info")
    );
}

// ============================================================================
// Raw pointer entry point
// ============================================================================

#[test]
fn test_raw_stage_and_deliver() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let original = src.clone();
    let mut dest = vec![0u8; src.len()];

    let staged = unsafe { relocator.relocate_raw(std::ptr::null_mut(), src.as_mut_ptr()) };
    assert_eq!(staged as usize, original.len());
    assert!(is_zero(&src));

    let delivered = unsafe { relocator.relocate_raw(dest.as_mut_ptr(), std::ptr::null_mut()) };
    assert_eq!(delivered, staged);
    assert!(!relocator.is_staged());
    assert_same_except_key(&dest, &original);
}

#[test]
fn test_raw_transfer() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let original = src.clone();
    let mut dest = vec![0u8; src.len()];

    let moved = unsafe { relocator.relocate_raw(dest.as_mut_ptr(), src.as_mut_ptr()) };

    assert_eq!(moved as usize, original.len());
    assert!(is_zero(&src));
    assert_same_except_key(&dest, &original);
}

// ============================================================================
// Audit trail
// ============================================================================

#[test]
fn test_audit_trail_exports_without_secrets() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let mut dest = vec![0u8; src.len()];
    relocator.relocate(Endpoint::Internal, Endpoint::External(&mut src));
    relocator.relocate(Endpoint::External(&mut dest), Endpoint::Internal);

    let json = serde_json::to_string(relocator.log().events()).unwrap();
    assert!(json.contains("Staged"));
    assert!(json.contains("Delivered"));

    let timestamps: Vec<u64> = relocator.log().events().iter().map(|e| e.timestamp).collect();
    assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
}

// ============================================================================
// Key derivation on delivery
// ============================================================================

#[cfg(feature = "derive-key")]
mod derivation {
    use super::*;
    use secinfo::{DerivationOutcome, KEY_DERIVATION_SALT, MAX_SEED_ENTRIES};

    fn expected_key(material: &[u8; 32]) -> [u8; 32] {
        let mut out = [0u8; 32];
        soft_hmac_sha256(KEY_DERIVATION_SALT, material, &mut out).unwrap();
        out
    }

    #[test]
    fn test_delivery_derives_key() {
        let mut relocator = Relocator::new(MockHal::new());
        let mut src = sample_blob();
        let mut dest = vec![0u8; src.len()];

        relocator.relocate(Endpoint::Internal, Endpoint::External(&mut src));
        assert_eq!(relocator.hal().hmac_calls.get(), 0);
        relocator.relocate(Endpoint::External(&mut dest), Endpoint::Internal);
        assert_eq!(relocator.hal().hmac_calls.get(), 1);

        let info = SecurityInfo::parse(&dest).unwrap();
        assert_eq!(info.derived_key(), &expected_key(&seed(0x51))[..]);
        assert_eq!(
            relocator.log().last().unwrap().event_type,
            HandoffEventType::KeyDerived {
                seed_index: 2,
                anti_rollback_version: 5
            }
        );
    }

    #[test]
    fn test_invalid_seed_count_is_not_fatal() {
        for count in [0, MAX_SEED_ENTRIES + 1] {
            let mut relocator = Relocator::new(MockHal::new());
            let mut src = SecurityInfoBuilder::new()
                .seed(1, seed(1))
                .num_seeds(count)
                .build();
            let len = src.len();
            let mut dest = vec![0u8; len];

            let moved =
                relocator.relocate(Endpoint::External(&mut dest), Endpoint::External(&mut src));

            assert_eq!(moved as usize, len);
            assert!(is_zero(&src));
            assert!(is_zero(&dest));
            assert!(relocator.hal().halt_reason().is_none());
            assert!(relocator.hal().logged("failed to get max svn index"));
            assert_eq!(
                relocator.log().last().unwrap().event_type,
                HandoffEventType::KeyDiscarded {
                    outcome: DerivationOutcome::ZeroizedInvalidInput
                }
            );
        }
    }

    #[test]
    fn test_hmac_failure_destroys_blob_and_halts() {
        let mut relocator = Relocator::new(MockHal::failing_hmac());
        let mut src = sample_blob();
        let mut dest = vec![0u8; src.len()];

        let result = catch_unwind(AssertUnwindSafe(|| {
            relocator.relocate(Endpoint::External(&mut dest), Endpoint::External(&mut src))
        }));

        assert!(result.is_err());
        assert!(is_zero(&src));
        assert!(is_zero(&dest));
        assert_eq!(
            relocator.hal().halt_reason().as_deref(),
            Some("failed to derive key")
        );
        assert_eq!(
            relocator.log().last().unwrap().event_type,
            HandoffEventType::KeyDiscarded {
                outcome: DerivationOutcome::ZeroizedCryptoFailure
            }
        );
    }
}

#[cfg(not(feature = "derive-key"))]
#[test]
fn test_delivery_leaves_key_field_untouched() {
    let mut relocator = Relocator::new(MockHal::new());
    let mut src = sample_blob();
    let original = src.clone();
    let mut dest = vec![0u8; src.len()];

    relocator.relocate(Endpoint::External(&mut dest), Endpoint::External(&mut src));

    assert_eq!(dest, original);
    assert_eq!(relocator.hal().hmac_calls.get(), 0);
}
