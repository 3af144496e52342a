//! Derivation outcome types

use serde::{Deserialize, Serialize};

/// Terminal state of a delivered blob after key derivation.
///
/// Every blob starts undetermined and ends in exactly one of these states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivationOutcome {
    /// The key field holds the derived key
    Keyed,
    /// The seed list was unusable; the blob is all zero
    ZeroizedInvalidInput,
    /// The HMAC primitive failed; the blob is all zero
    ZeroizedCryptoFailure,
}

impl DerivationOutcome {
    /// Whether the blob still carries its contents
    pub fn is_keyed(&self) -> bool {
        matches!(self, DerivationOutcome::Keyed)
    }

    /// Whether the outcome must stop the handoff
    pub fn is_fatal(&self) -> bool {
        matches!(self, DerivationOutcome::ZeroizedCryptoFailure)
    }
}
