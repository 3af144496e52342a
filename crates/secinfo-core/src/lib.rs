//! Security-Info Core - Pure Blob Logic for Formal Verification
//!
//! This crate contains the **pure, HAL-free** part of the security-info
//! handoff: the blob wire layout, the anti-rollback seed selection rule, and
//! the invariants the runtime checks after every step.
//!
//! # Design Principles
//!
//! 1. **No HAL dependency**: crypto, logging, and halting live in `secinfo`
//! 2. **No I/O or side effects**: views and decisions over byte slices only
//! 3. **Verifiable**: small enough for Kani proofs of the selection rule
//!
//! # Wire Layout (little-endian)
//!
//! ```text
//! offset 0        : u32 size        (total length, multiple of 4)
//! offset 4        : u32 num_seeds   (1..=MAX_SEED_ENTRIES)
//! offset 8        : num_seeds x { u32 cse_svn, [u8; 32] seed }
//! offset 8 + 36n  : [u8; 32] derived key
//! ...             : opaque trailing bytes up to `size`
//! ```
//!
//! # Module Organization
//!
//! - `layout` - Constants, size-prefix checks, `SecurityInfo` view, builder
//! - `selection` - Anti-rollback seed selection
//! - `types` - Derivation outcome state
//! - `invariants` - Post-condition checks for scrubbing and derivation

#![no_std]
#![deny(unsafe_code)]
extern crate alloc;

pub mod invariants;
pub mod layout;
pub mod selection;
pub mod types;

pub use invariants::{check_derivation_postcondition, check_scrubbed, InvariantViolation};
pub use layout::{
    checked_declared_size, LayoutError, SecurityInfo, SecurityInfoBuilder, SeedEntry,
    DERIVED_KEY_LEN, MAX_SEED_ENTRIES, SEED_ENTRY_LEN, SEED_LEN, SIZE_ALIGN, SIZE_PREFIX_LEN,
};
pub use selection::max_svn_index;
pub use types::DerivationOutcome;
