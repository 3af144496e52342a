//! Post-condition invariants for the handoff
//!
//! These are runtime-checkable properties that must hold after every
//! relocation and every derivation. The runtime asserts them in debug
//! builds; tests assert them directly.
//!
//! # Invariants
//!
//! 1. **Source Scrubbed**: after a relocation, the moved source bytes are zero
//! 2. **Derivation Atomicity**: after derivation, either the blob is intact
//!    and keyed, or every byte of it is zero

use alloc::string::String;

use crate::layout::SecurityInfo;
use crate::types::DerivationOutcome;

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Invariant 1: every byte of `source` is zero
pub fn check_scrubbed(source: &[u8]) -> Result<(), InvariantViolation> {
    match source.iter().position(|b| *b != 0) {
        None => Ok(()),
        Some(offset) => Err(InvariantViolation {
            invariant: "source_scrubbed",
            description: alloc::format!(
                "Byte at offset {} of {} still set after relocation",
                offset,
                source.len()
            ),
        }),
    }
}

/// Invariant 2: the blob matches the terminal state reported for it
pub fn check_derivation_postcondition(
    blob: &[u8],
    outcome: DerivationOutcome,
) -> Result<(), InvariantViolation> {
    match outcome {
        DerivationOutcome::Keyed => SecurityInfo::parse(blob).map(|_| ()).map_err(|e| {
            InvariantViolation {
                invariant: "derivation_atomicity",
                description: alloc::format!("Keyed blob no longer parses: {:?}", e),
            }
        }),
        DerivationOutcome::ZeroizedInvalidInput | DerivationOutcome::ZeroizedCryptoFailure => {
            check_scrubbed(blob).map_err(|v| InvariantViolation {
                invariant: "derivation_atomicity",
                description: alloc::format!("{:?} blob not destroyed: {}", outcome, v.description),
            })
        }
    }
}
