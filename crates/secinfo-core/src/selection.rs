//! Anti-rollback seed selection
//!
//! The selected index starts at 0 and moves to `i` whenever the version at
//! `i` is strictly greater than the version at `i - 1`. The result is the
//! last position where the version rises over its predecessor. Equal
//! neighbours never move the selection, and a rise that stays below an
//! earlier peak still does (`[5, 1, 2]` selects index 2).

/// Index of the seed to derive from, or `None` for an empty list.
pub fn max_svn_index<I>(svns: I) -> Option<usize>
where
    I: IntoIterator<Item = u32>,
{
    let mut svns = svns.into_iter();
    let mut prev = svns.next()?;
    let mut selected = 0;

    for (i, svn) in svns.enumerate() {
        if svn > prev {
            selected = i + 1;
        }
        prev = svn;
    }

    Some(selected)
}

// ============================================================================
// Kani Proofs
// ============================================================================

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Proof: the selected index is always within the list
    #[kani::proof]
    fn selection_in_bounds() {
        let svns: [u32; 4] = kani::any();
        let len: usize = kani::any();
        kani::assume(len >= 1 && len <= 4);

        let idx = max_svn_index(svns[..len].iter().copied());
        kani::assert(idx.is_some(), "Non-empty list must select");
        kani::assert(idx.unwrap() < len, "Selection must be in bounds");
    }

    /// Proof: a non-zero selection is a strict rise over its predecessor
    #[kani::proof]
    fn selection_is_strict_rise() {
        let svns: [u32; 4] = kani::any();

        if let Some(idx) = max_svn_index(svns.iter().copied()) {
            if idx > 0 {
                kani::assert(svns[idx] > svns[idx - 1], "Selected entry must rise");
            }
        }
    }
}
