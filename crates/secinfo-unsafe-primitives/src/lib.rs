//! Security-Info Unsafe Primitives - Consolidated Unsafe Code TCB
//!
//! This crate contains ALL unsafe code of the handoff, consolidated into a
//! single auditable location. The other crates use `#![deny(unsafe_code)]`
//! (except the raw-pointer relocation entry point).
//!
//! # Module Organization
//!
//! - `secret` - Scrub-with-barrier, scoped scrub guard, heap staging buffer
//! - `region` - Raw pointer to memory region adapters for loader handoff
//! - `loom_tests` - Ordering tests using loom (with `loom` feature)
//!
//! # Verification
//!
//! 1. **Kani proofs** (`cargo kani`): every byte is zero after a scrub
//! 2. **Loom tests** (`cargo test --features loom`): scrub-then-publish ordering
//! 3. **Unit tests**: guard and buffer lifecycles

#![no_std]

extern crate alloc;

pub mod region;
pub mod secret;


pub use secret::{move_and_scrub, scrub, AllocError, ScrubOnDrop, SecretBuffer};
