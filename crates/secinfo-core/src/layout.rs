//! Security-info blob wire layout
//!
//! All multi-byte fields are little-endian. The blob describes its own
//! length in the first word; everything else is located relative to the
//! seed count.

use alloc::vec::Vec;
use core::ops::Range;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Length of the leading size field
pub const SIZE_PREFIX_LEN: usize = 4;

/// Offset of the seed count
pub const NUM_SEEDS_OFFSET: usize = 4;

/// Offset of the first seed record
pub const SEED_LIST_OFFSET: usize = 8;

/// Length of the anti-rollback version field of a seed record
pub const SVN_LEN: usize = 4;

/// Length of the secret seed material
pub const SEED_LEN: usize = 32;

/// Length of one seed record
pub const SEED_ENTRY_LEN: usize = SVN_LEN + SEED_LEN;

/// Length of the derived key field
pub const DERIVED_KEY_LEN: usize = 32;

/// Maximum number of seed records a blob may carry
pub const MAX_SEED_ENTRIES: u32 = 10;

/// Required alignment of the declared size
pub const SIZE_ALIGN: u32 = 4;

/// Layout validation errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutError {
    /// Region too short to hold the size prefix
    MissingSizePrefix,
    /// Declared size does not even cover the size prefix
    UndersizedPrefix(u32),
    /// Declared size is not a multiple of 4
    MisalignedSize(u32),
    /// Declared size is larger than the region holding the blob
    SizeExceedsRegion { declared: u32, available: usize },
    /// Seed count outside `1..=MAX_SEED_ENTRIES`
    InvalidSeedCount(u32),
    /// Declared size cannot hold the header, seed records, and key
    Truncated { declared: usize, required: usize },
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let field = bytes.get(offset..offset + 4)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(field);
    Some(u32::from_le_bytes(word))
}

/// Read and validate the size prefix of the blob at the start of `region`.
///
/// The declared size must cover its own prefix, be word aligned, and fit
/// in `region`.
pub fn checked_declared_size(region: &[u8]) -> Result<u32, LayoutError> {
    let size = read_u32(region, 0).ok_or(LayoutError::MissingSizePrefix)?;

    if (size as usize) < SIZE_PREFIX_LEN {
        return Err(LayoutError::UndersizedPrefix(size));
    }
    if size % SIZE_ALIGN != 0 {
        return Err(LayoutError::MisalignedSize(size));
    }
    if size as usize > region.len() {
        return Err(LayoutError::SizeExceedsRegion {
            declared: size,
            available: region.len(),
        });
    }

    Ok(size)
}

/// Check a seed count against `1..=MAX_SEED_ENTRIES`.
pub fn checked_seed_count(num_seeds: u32) -> Result<u32, LayoutError> {
    if num_seeds == 0 || num_seeds > MAX_SEED_ENTRIES {
        return Err(LayoutError::InvalidSeedCount(num_seeds));
    }
    Ok(num_seeds)
}

/// Bytes needed for a blob with `num_seeds` records, without trailing data.
pub const fn required_len(num_seeds: u32) -> usize {
    SEED_LIST_OFFSET + num_seeds as usize * SEED_ENTRY_LEN + DERIVED_KEY_LEN
}

/// One candidate seed.
#[derive(Clone, Copy, Debug)]
pub struct SeedEntry<'a> {
    /// Anti-rollback version ("cse_svn"), higher is newer
    pub anti_rollback_version: u32,
    /// Secret key-derivation input
    pub seed_material: &'a [u8; SEED_LEN],
}

/// Validated read-only view of a delivered blob.
///
/// `bytes` is exactly the delivered blob: its length is the declared size.
#[derive(Clone, Copy)]
pub struct SecurityInfo<'a> {
    bytes: &'a [u8],
    num_seeds: u32,
}

impl<'a> SecurityInfo<'a> {
    /// Validate the seed count and that the blob holds all records and the
    /// key field.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, LayoutError> {
        let raw_count = read_u32(bytes, NUM_SEEDS_OFFSET).ok_or(LayoutError::Truncated {
            declared: bytes.len(),
            required: SEED_LIST_OFFSET,
        })?;
        let num_seeds = checked_seed_count(raw_count)?;

        let required = required_len(num_seeds);
        if bytes.len() < required {
            return Err(LayoutError::Truncated {
                declared: bytes.len(),
                required,
            });
        }

        Ok(Self { bytes, num_seeds })
    }

    pub fn declared_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn num_seeds(&self) -> u32 {
        self.num_seeds
    }

    fn seed_offset(index: usize) -> usize {
        SEED_LIST_OFFSET + index * SEED_ENTRY_LEN
    }

    /// Seed record at `index`, or `None` past `num_seeds`.
    pub fn seed(&self, index: usize) -> Option<SeedEntry<'a>> {
        if index >= self.num_seeds as usize {
            return None;
        }
        let offset = Self::seed_offset(index);
        let anti_rollback_version = read_u32(self.bytes, offset)?;
        let seed_material: &'a [u8; SEED_LEN] = self
            .bytes
            .get(offset + SVN_LEN..offset + SEED_ENTRY_LEN)?
            .try_into()
            .ok()?;
        Some(SeedEntry {
            anti_rollback_version,
            seed_material,
        })
    }

    /// Iterate over the `num_seeds` records in order.
    pub fn seeds(&self) -> impl Iterator<Item = SeedEntry<'a>> + '_ {
        (0..self.num_seeds as usize).filter_map(move |i| self.seed(i))
    }

    /// Byte range of the derived key field within the blob.
    pub fn key_range(&self) -> Range<usize> {
        let start = Self::seed_offset(self.num_seeds as usize);
        start..start + DERIVED_KEY_LEN
    }

    pub fn derived_key(&self) -> &'a [u8] {
        &self.bytes[self.key_range()]
    }
}

impl core::fmt::Debug for SecurityInfo<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecurityInfo")
            .field("declared_size", &self.bytes.len())
            .field("num_seeds", &self.num_seeds)
            .finish_non_exhaustive()
    }
}

/// Encoder for blobs in the wire layout.
///
/// Used by upstream producers and tests. Seed material held by the builder
/// is scrubbed when it drops.
#[derive(Default)]
pub struct SecurityInfoBuilder {
    seeds: Vec<(u32, [u8; SEED_LEN])>,
    num_seeds: Option<u32>,
    key: [u8; DERIVED_KEY_LEN],
    trailing: usize,
}

impl SecurityInfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a seed record.
    pub fn seed(mut self, anti_rollback_version: u32, material: [u8; SEED_LEN]) -> Self {
        self.seeds.push((anti_rollback_version, material));
        self
    }

    /// Override the encoded seed count (records written stay as added).
    pub fn num_seeds(mut self, count: u32) -> Self {
        self.num_seeds = Some(count);
        self
    }

    /// Initial contents of the key field.
    pub fn key(mut self, key: [u8; DERIVED_KEY_LEN]) -> Self {
        self.key = key;
        self
    }

    /// Opaque bytes after the key field, rounded up to keep the size aligned.
    pub fn trailing_bytes(mut self, len: usize) -> Self {
        self.trailing = len.next_multiple_of(SIZE_ALIGN as usize);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let size = SEED_LIST_OFFSET
            + self.seeds.len() * SEED_ENTRY_LEN
            + DERIVED_KEY_LEN
            + self.trailing;
        let count = self.num_seeds.unwrap_or(self.seeds.len() as u32);

        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(&(size as u32).to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        for (svn, material) in &self.seeds {
            out.extend_from_slice(&svn.to_le_bytes());
            out.extend_from_slice(material);
        }
        out.extend_from_slice(&self.key);
        // Trailing bytes get a recognisable pattern so tests can see them move
        out.extend((0..self.trailing).map(|i| (i as u8) ^ 0x5C));
        out
    }
}

impl Drop for SecurityInfoBuilder {
    fn drop(&mut self) {
        for (_, material) in self.seeds.iter_mut() {
            material.zeroize();
        }
        self.key.zeroize();
    }
}
