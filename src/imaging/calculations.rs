//! Pure calculation functions for resampling and transform geometry.
//!
//! All functions here are pure and testable without any pixel data.

use super::params::Rotation;

/// Fixed-point divisor of resampling weights: a weight of 1000 means "the
/// whole destination cell".
pub const WEIGHT_DIVISOR: i64 = 1000;

/// One source sample's share of a destination sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    /// Index in source coordinates; may lie outside the source.
    pub source: i64,
    pub weight: i64,
}

/// Per destination index, the source samples that overlap its cell.
///
/// Built once per (selection extent, destination extent) pair. Source indices
/// within one destination index are non-decreasing and the weights of a
/// destination index add up to [`ResamplingVector::sum_of_weights`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResamplingVector {
    contributions: Vec<Vec<Contribution>>,
    sums: Vec<i64>,
}

impl ResamplingVector {
    /// Area weights mapping `extent` source samples starting at `origin` onto
    /// `dest` destination samples.
    ///
    /// Coordinates are scaled by `dest` so every boundary is an integer:
    /// destination cell `i` spans `[i * extent, (i + 1) * extent)` and source
    /// sample `j` spans `[j * dest, (j + 1) * dest)`.
    pub fn new(origin: i64, extent: usize, dest: usize) -> Self {
        let s = extent as i64;
        let d = dest as i64;
        let mut contributions = Vec::with_capacity(dest);
        let mut sums = Vec::with_capacity(dest);

        for i in 0..d {
            let cell_start = i * s;
            let cell_end = cell_start + s;
            let first = cell_start / d;
            let last = (cell_end + d - 1) / d;

            let mut row: Vec<Contribution> = (first..last)
                .filter_map(|j| {
                    let overlap = cell_end.min((j + 1) * d) - cell_start.max(j * d);
                    let weight = (2 * overlap * WEIGHT_DIVISOR + s) / (2 * s);
                    (weight > 0).then_some(Contribution {
                        source: origin + j,
                        weight,
                    })
                })
                .collect();

            // Reductions beyond the fixed-point resolution round every share
            // to zero; fall back to an unweighted mean of the cell.
            if row.is_empty() {
                row = (first..last)
                    .map(|j| Contribution {
                        source: origin + j,
                        weight: 1,
                    })
                    .collect();
            }

            sums.push(row.iter().map(|c| c.weight).sum());
            contributions.push(row);
        }

        Self {
            contributions,
            sums,
        }
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    pub fn contributions(&self, index: usize) -> &[Contribution] {
        &self.contributions[index]
    }

    pub fn sum_of_weights(&self, index: usize) -> i64 {
        self.sums[index]
    }
}

/// Dimensions `(rows, columns)` of a `height` x `width` matrix seen through
/// `rotation`.
pub fn view_dimensions(height: usize, width: usize, rotation: Rotation) -> (usize, usize) {
    if rotation.swaps_axes() {
        (width, height)
    } else {
        (height, width)
    }
}

/// Row-major offset into a stored `height` x `width` matrix of the sample
/// shown at (`row`, `column`) of the rotated, then optionally horizontally
/// flipped, view.
///
/// `Rotation::R0` without flip is the identity `row * width + column`.
pub fn get_offset_into_matrix(
    row: usize,
    column: usize,
    height: usize,
    width: usize,
    rotation: Rotation,
    horizontal_flip: bool,
) -> usize {
    let (_, view_columns) = view_dimensions(height, width, rotation);
    let column = if horizontal_flip {
        view_columns - 1 - column
    } else {
        column
    };
    let (source_row, source_column) = match rotation {
        Rotation::R0 => (row, column),
        Rotation::R90 => (height - 1 - column, row),
        Rotation::R180 => (height - 1 - row, width - 1 - column),
        Rotation::R270 => (column, width - 1 - row),
    };
    source_row * width + source_column
}

/// Inverse of [`get_offset_into_matrix`]: the view position that shows the
/// sample stored at `offset`.
pub fn get_position_in_view(
    offset: usize,
    height: usize,
    width: usize,
    rotation: Rotation,
    horizontal_flip: bool,
) -> (usize, usize) {
    let (source_row, source_column) = (offset / width, offset % width);
    let (row, column) = match rotation {
        Rotation::R0 => (source_row, source_column),
        Rotation::R90 => (source_column, height - 1 - source_row),
        Rotation::R180 => (height - 1 - source_row, width - 1 - source_column),
        Rotation::R270 => (width - 1 - source_column, source_row),
    };
    let (_, view_columns) = view_dimensions(height, width, rotation);
    if horizontal_flip {
        (row, view_columns - 1 - column)
    } else {
        (row, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTATIONS: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    // =========================================================================
    // ResamplingVector tests
    // =========================================================================

    fn assert_vector_invariants(v: &ResamplingVector) {
        for i in 0..v.len() {
            let contributions = v.contributions(i);
            assert!(!contributions.is_empty(), "index {i} has no contributions");

            let total: i64 = contributions.iter().map(|c| c.weight).sum();
            assert!((total - v.sum_of_weights(i)).abs() <= 1, "index {i}");

            assert!(
                contributions.windows(2).all(|w| w[0].source <= w[1].source),
                "index {i} not monotonic: {contributions:?}"
            );
        }
    }

    #[test]
    fn identity_extent_maps_one_to_one() {
        let v = ResamplingVector::new(0, 5, 5);
        for i in 0..5 {
            assert_eq!(
                v.contributions(i),
                &[Contribution {
                    source: i as i64,
                    weight: WEIGHT_DIVISOR
                }]
            );
            assert_eq!(v.sum_of_weights(i), WEIGHT_DIVISOR);
        }
    }

    #[test]
    fn halving_averages_pairs() {
        let v = ResamplingVector::new(0, 4, 2);
        assert_eq!(
            v.contributions(1),
            &[
                Contribution {
                    source: 2,
                    weight: 500
                },
                Contribution {
                    source: 3,
                    weight: 500
                },
            ]
        );
    }

    #[test]
    fn uneven_reduction_splits_shared_samples() {
        // 3 -> 2: cell 0 covers sample 0 fully and half of sample 1.
        let v = ResamplingVector::new(0, 3, 2);
        let weights: Vec<i64> = v.contributions(0).iter().map(|c| c.weight).collect();
        assert_eq!(weights, vec![667, 333]);
        assert_eq!(v.contributions(1)[0].source, 1);
    }

    #[test]
    fn first_source_index_contributes() {
        let v = ResamplingVector::new(0, 10, 3);
        assert_eq!(v.contributions(0)[0].source, 0);
    }

    #[test]
    fn origin_offsets_source_indices() {
        let v = ResamplingVector::new(-2, 4, 4);
        assert_eq!(v.contributions(0)[0].source, -2);
        assert_eq!(v.contributions(3)[0].source, 1);
    }

    #[test]
    fn invariants_hold_across_extents() {
        for extent in 1..40 {
            for dest in 1..40 {
                assert_vector_invariants(&ResamplingVector::new(0, extent, dest));
            }
        }
    }

    #[test]
    fn extreme_reduction_falls_back_to_equal_weights() {
        let v = ResamplingVector::new(0, 5000, 1);
        assert_eq!(v.contributions(0).len(), 5000);
        assert_vector_invariants(&v);
    }

    // =========================================================================
    // get_offset_into_matrix tests
    // =========================================================================

    #[test]
    fn unrotated_mapping_is_row_major() {
        for row in 0..3 {
            for col in 0..4 {
                assert_eq!(
                    get_offset_into_matrix(row, col, 3, 4, Rotation::R0, false),
                    row * 4 + col
                );
            }
        }
    }

    #[test]
    fn quarter_turn_shows_bottom_left_first() {
        // 2 rows x 3 columns; the view is 3 x 2.
        assert_eq!(get_offset_into_matrix(0, 0, 2, 3, Rotation::R90, false), 3);
        assert_eq!(get_offset_into_matrix(0, 1, 2, 3, Rotation::R90, false), 0);
        assert_eq!(get_offset_into_matrix(2, 1, 2, 3, Rotation::R90, false), 2);
    }

    #[test]
    fn flip_mirrors_view_columns() {
        assert_eq!(get_offset_into_matrix(0, 0, 2, 3, Rotation::R0, true), 2);
        assert_eq!(get_offset_into_matrix(1, 2, 2, 3, Rotation::R0, true), 3);
    }

    #[test]
    fn mapping_and_inverse_round_trip() {
        let (height, width) = (3, 5);
        for rotation in ROTATIONS {
            for flip in [false, true] {
                let (rows, cols) = view_dimensions(height, width, rotation);
                let mut seen = vec![false; height * width];
                for row in 0..rows {
                    for col in 0..cols {
                        let offset = get_offset_into_matrix(row, col, height, width, rotation, flip);
                        assert!(!seen[offset], "offset {offset} hit twice");
                        seen[offset] = true;
                        assert_eq!(
                            get_position_in_view(offset, height, width, rotation, flip),
                            (row, col),
                            "{rotation:?} flip={flip}"
                        );
                    }
                }
            }
        }
    }
}
