//! Sector bucket index
//!
//! Stable counting sort of asset ids by sector, precomputed once:
//! - `sector_offsets[s]..sector_offsets[s + 1]` is sector `s`'s range in
//!   sector-sorted order
//! - `asset_to_sorted[a]` is asset `a`'s position in that order
//!
//! Immutable after construction. To change assignments, build a new index.

use crate::{Result, XsError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;

/// Precomputed sector permutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorIndex {
    num_sectors: usize,
    /// Cumulative counts, length `num_sectors + 1`
    sector_offsets: Vec<usize>,
    /// Asset id -> sector-sorted position
    asset_to_sorted: Vec<usize>,
}

impl SectorIndex {
    /// Build the index in O(num_assets + num_sectors)
    ///
    /// # Errors
    /// Fails fast when the assignment vector length differs from
    /// `num_assets`, when an assignment is outside `[0, num_sectors)`, or
    /// when there are assets but no sectors.
    pub fn new(num_assets: usize, num_sectors: usize, sector_assignments: &[u32]) -> Result<Self> {
        if sector_assignments.len() != num_assets {
            return Err(XsError::SectorAssignment(format!(
                "expected {} assignments, got {}",
                num_assets,
                sector_assignments.len()
            )));
        }
        if num_sectors == 0 && num_assets > 0 {
            return Err(XsError::SectorAssignment(
                "assets present but zero sectors configured".to_string(),
            ));
        }
        if let Some((asset, &sector)) = sector_assignments
            .iter()
            .enumerate()
            .find(|&(_, &s)| s as usize >= num_sectors)
        {
            return Err(XsError::SectorAssignment(format!(
                "asset {} assigned to sector {} but only {} sectors exist",
                asset, sector, num_sectors
            )));
        }

        let mut sector_offsets = vec![0usize; num_sectors + 1];
        for &sector in sector_assignments {
            sector_offsets[sector as usize + 1] += 1;
        }
        for i in 1..=num_sectors {
            sector_offsets[i] += sector_offsets[i - 1];
        }

        // Write cursors start at each sector's offset; the offsets
        // themselves stay queryable.
        let mut cursors = sector_offsets.clone();
        let mut asset_to_sorted = vec![0usize; num_assets];
        for (asset, &sector) in sector_assignments.iter().enumerate() {
            let cursor = &mut cursors[sector as usize];
            asset_to_sorted[asset] = *cursor;
            *cursor += 1;
        }

        tracing::debug!(num_assets, num_sectors, "Sector index built");

        Ok(Self {
            num_sectors,
            sector_offsets,
            asset_to_sorted,
        })
    }

    /// First sorted position of `sector_id`; panics if out of range
    #[inline(always)]
    pub fn sector_start(&self, sector_id: u32) -> usize {
        self.sector_offsets[sector_id as usize]
    }

    /// One past the last sorted position of `sector_id`; panics if out of range
    #[inline(always)]
    pub fn sector_end(&self, sector_id: u32) -> usize {
        self.sector_offsets[sector_id as usize + 1]
    }

    #[inline]
    pub fn sector_range(&self, sector_id: u32) -> Range<usize> {
        self.sector_start(sector_id)..self.sector_end(sector_id)
    }

    #[inline]
    pub fn sector_len(&self, sector_id: u32) -> usize {
        self.sector_end(sector_id) - self.sector_start(sector_id)
    }

    #[inline(always)]
    pub fn num_sectors(&self) -> usize {
        self.num_sectors
    }

    #[inline(always)]
    pub fn num_assets(&self) -> usize {
        self.asset_to_sorted.len()
    }

    /// Sector-sorted position of `asset_id`; panics if out of range
    #[inline(always)]
    pub fn sorted_index(&self, asset_id: u32) -> usize {
        self.asset_to_sorted[asset_id as usize]
    }

    /// Iterate `(sector_id, range)` over all sectors
    pub fn ranges(&self) -> impl Iterator<Item = (u32, Range<usize>)> + '_ {
        (0..self.num_sectors as u32).map(move |s| (s, self.sector_range(s)))
    }

    /// Scatter asset-ordered `src` into sector order in `dst`
    ///
    /// Both slices must hold at least `num_assets` values.
    pub fn sort_to_sector_order(&self, src: &[f32], dst: &mut [f32]) {
        debug_assert!(src.len() >= self.num_assets() && dst.len() >= self.num_assets());
        for (&value, &sorted) in src.iter().zip(&self.asset_to_sorted) {
            dst[sorted] = value;
        }
    }

    /// Gather sector-ordered `src` back into asset order in `dst`
    ///
    /// `src` must hold at least `num_assets` values. Fills the first
    /// `min(num_assets, dst.len())` assets of `dst`.
    pub fn unsort_from_sector_order(&self, src: &[f32], dst: &mut [f32]) {
        debug_assert!(src.len() >= self.num_assets());
        for (out, &sorted) in dst.iter_mut().zip(&self.asset_to_sorted) {
            *out = src[sorted];
        }
    }

    /// Uniform random sector per asset (demo and benchmark universes)
    pub fn random_assignments(num_assets: usize, num_sectors: usize, seed: u64) -> Vec<u32> {
        if num_sectors == 0 {
            return Vec::new();
        }
        let mut rng = StdRng::seed_from_u64(seed);
        (0..num_assets)
            .map(|_| rng.gen_range(0..num_sectors as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_sectors_alternating() {
        let assignments = [0, 1, 0, 1, 0, 1, 0, 1];
        let index = SectorIndex::new(8, 2, &assignments).unwrap();

        assert_eq!(index.sector_start(0), 0);
        assert_eq!(index.sector_end(0), 4);
        assert_eq!(index.sector_start(1), 4);
        assert_eq!(index.sector_end(1), 8);

        // Stable: assets keep their relative order inside a sector
        let expected = [0, 4, 1, 5, 2, 6, 3, 7];
        for (asset, &sorted) in expected.iter().enumerate() {
            assert_eq!(index.sorted_index(asset as u32), sorted);
        }

        for (asset, &sector) in assignments.iter().enumerate() {
            if sector == 0 {
                assert!(index.sorted_index(asset as u32) < 4);
            }
        }
    }

    #[test]
    fn test_empty_sector_has_empty_range() {
        let index = SectorIndex::new(4, 3, &[0, 2, 2, 0]).unwrap();
        assert_eq!(index.sector_range(0), 0..2);
        assert_eq!(index.sector_len(1), 0);
        assert_eq!(index.sector_range(2), 2..4);
    }

    #[test]
    fn test_rejects_bad_assignments() {
        assert!(matches!(
            SectorIndex::new(3, 2, &[0, 1]),
            Err(XsError::SectorAssignment(_))
        ));
        assert!(matches!(
            SectorIndex::new(2, 2, &[0, 2]),
            Err(XsError::SectorAssignment(_))
        ));
        assert!(matches!(
            SectorIndex::new(1, 0, &[0]),
            Err(XsError::SectorAssignment(_))
        ));
    }

    #[test]
    fn test_empty_universe() {
        let index = SectorIndex::new(0, 0, &[]).unwrap();
        assert_eq!(index.num_assets(), 0);
        assert_eq!(index.ranges().count(), 0);
    }

    #[test]
    fn test_sort_and_unsort() {
        let index = SectorIndex::new(6, 2, &[1, 0, 1, 0, 1, 0]).unwrap();
        let prices = [10.0, 20.0, 11.0, 21.0, 12.0, 22.0];

        let mut sorted = [0.0f32; 6];
        index.sort_to_sector_order(&prices, &mut sorted);
        assert_eq!(sorted, [20.0, 21.0, 22.0, 10.0, 11.0, 12.0]);

        let mut restored = [0.0f32; 6];
        index.unsort_from_sector_order(&sorted, &mut restored);
        assert_eq!(restored, prices);
    }

    #[test]
    fn test_random_assignments_deterministic() {
        let a = SectorIndex::random_assignments(100, 7, 42);
        let b = SectorIndex::random_assignments(100, 7, 42);
        assert_eq!(a, b);
        assert!(a.iter().all(|&s| s < 7));
    }

    proptest! {
        #[test]
        fn prop_permutation_is_contiguous_bijection(
            num_sectors in 1usize..12,
            raw in proptest::collection::vec(any::<u32>(), 0..300),
        ) {
            let assignments: Vec<u32> = raw.iter().map(|r| r % num_sectors as u32).collect();
            let index = SectorIndex::new(assignments.len(), num_sectors, &assignments).unwrap();

            let mut seen = vec![false; assignments.len()];
            for (asset, &sector) in assignments.iter().enumerate() {
                let pos = index.sorted_index(asset as u32);
                prop_assert!(index.sector_range(sector).contains(&pos));
                prop_assert!(!seen[pos]);
                seen[pos] = true;
            }
            prop_assert!(seen.iter().all(|&s| s));
            prop_assert_eq!(index.sector_end(num_sectors as u32 - 1), assignments.len());
        }
    }
}
