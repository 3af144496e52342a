//! Attestation keybox encryption key derivation
//!
//! Picks the seed with the highest anti-rollback version and extracts a
//! 32-byte key from it with HMAC-SHA256 into the blob's key field.
//!
//! Either the key field ends up populated or the whole blob is zero. The
//! only way to obtain a [`DeriveError`] is through the path that scrubs the
//! blob, so holding one proves nothing readable is left.

use core::ops::Range;

use zeroize::Zeroizing;

use secinfo_core::{max_svn_index, DerivationOutcome, SecurityInfo, SEED_LEN};
use secinfo_hal::{HalError, SecInfoHal, HMAC_SHA256_LEN};
use secinfo_unsafe_primitives::scrub;

/// Salt for the extract step, including its terminating NUL
pub const KEY_DERIVATION_SALT: &[u8] = b"Attestation Keybox Encryption Key\0";

/// Why derivation destroyed the blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeriveFailure {
    /// Seed count out of range or blob too short for its seed list
    InvalidSeedList,
    /// The HMAC primitive reported failure
    CryptoFailure,
}

/// Derivation failed; the blob has already been zeroed.
#[derive(Debug, PartialEq, Eq)]
pub struct DeriveError {
    failure: DeriveFailure,
}

impl DeriveError {
    fn destroy(blob: &mut [u8], failure: DeriveFailure) -> Self {
        scrub(blob);
        Self { failure }
    }

    pub fn failure(&self) -> DeriveFailure {
        self.failure
    }

    /// Crypto failures stop the handoff; an unusable seed list does not.
    pub fn is_fatal(&self) -> bool {
        self.failure == DeriveFailure::CryptoFailure
    }

    pub fn outcome(&self) -> DerivationOutcome {
        match self.failure {
            DeriveFailure::InvalidSeedList => DerivationOutcome::ZeroizedInvalidInput,
            DeriveFailure::CryptoFailure => DerivationOutcome::ZeroizedCryptoFailure,
        }
    }
}

/// The seed a key was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSelection {
    pub index: u32,
    pub anti_rollback_version: u32,
}

/// HMAC-based extract: `PRK = HMAC-SHA256(salt, ikm)`.
pub fn kdf_extract<H>(
    hal: &H,
    salt: &[u8],
    ikm: &[u8],
) -> Result<Zeroizing<[u8; HMAC_SHA256_LEN]>, HalError>
where
    H: SecInfoHal + ?Sized,
{
    let mut prk = Zeroizing::new([0u8; HMAC_SHA256_LEN]);
    hal.hmac_sha256(salt, ikm, &mut *prk)?;
    Ok(prk)
}

/// Copy out the selected seed and locate the key field.
fn select_seed(blob: &[u8]) -> Option<(SeedSelection, Zeroizing<[u8; SEED_LEN]>, Range<usize>)> {
    let info = SecurityInfo::parse(blob).ok()?;
    let index = max_svn_index(info.seeds().map(|s| s.anti_rollback_version))?;
    let entry = info.seed(index)?;

    let selection = SeedSelection {
        index: index as u32,
        anti_rollback_version: entry.anti_rollback_version,
    };
    Some((selection, Zeroizing::new(*entry.seed_material), info.key_range()))
}

/// Derive the keybox encryption key into `blob` in place.
///
/// `blob` is exactly the delivered blob (its declared size). On error the
/// whole of `blob` is zero.
pub fn derive_key<H>(hal: &H, blob: &mut [u8]) -> Result<SeedSelection, DeriveError>
where
    H: SecInfoHal + ?Sized,
{
    let Some((selection, ikm, key_range)) = select_seed(blob) else {
        hal.debug_write("[secinfo] failed to get max svn index");
        return Err(DeriveError::destroy(blob, DeriveFailure::InvalidSeedList));
    };

    match kdf_extract(hal, KEY_DERIVATION_SALT, &ikm[..]) {
        Ok(prk) => {
            blob[key_range].copy_from_slice(&prk[..]);
            Ok(selection)
        }
        Err(e) => {
            hal.debug_write(&alloc::format!("[secinfo] key extract failed: {:?}", e));
            Err(DeriveError::destroy(blob, DeriveFailure::CryptoFailure))
        }
    }
}
