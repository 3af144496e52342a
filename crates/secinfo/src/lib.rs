//! Security-info handoff runtime
//!
//! Moves the device security-info blob from the loader that produced it to
//! its final owner, scrubbing every location it leaves, and derives the
//! attestation keybox encryption key once the blob arrives.
//!
//! ```text
//!   loader region ──stage──▶ StagingSlot ──deliver──▶ owner region
//!        │                                                 │
//!        └────────────── transfer ───────────────────────▶ │
//!                                                          ▼
//!                                                     derive_key
//! ```
//!
//! # Module Organization
//!
//! - `relocator` - `Relocator` and the `relocate` entry points
//! - `staging` - The Empty/Staged slot owned by a relocator
//! - `derive` - Seed selection and key extraction (feature `derive-key`)
//! - `audit` - Bounded handoff event log

#![no_std]
#![deny(unsafe_code)]
extern crate alloc;

pub mod audit;
#[cfg(feature = "derive-key")]
pub mod derive;
pub mod relocator;
pub mod staging;

pub use audit::{EventId, HandoffEvent, HandoffEventType, HandoffLog};
#[cfg(feature = "derive-key")]
pub use derive::{
    derive_key, kdf_extract, DeriveError, DeriveFailure, SeedSelection, KEY_DERIVATION_SALT,
};
pub use relocator::{Endpoint, Relocator};
pub use staging::StagingSlot;

pub use secinfo_core::{
    DerivationOutcome, LayoutError, SecurityInfo, SecurityInfoBuilder, MAX_SEED_ENTRIES,
};
pub use secinfo_hal::{HalError, SecInfoHal};
