//! Matching utilities for centroid tracking.

use nalgebra::Point2;
use ndarray::Array2;
use serde::Deserialize;

/// Cost given to inadmissible pairs and to padding cells of the square solver matrix.
const GATE_COST: f64 = 1e6;

/// Total tie-break perturbation budget for one solve. Far below one pixel.
const TIE_BREAK: f64 = 1e-4;

/// How stored centroids are paired with the current frame's boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Minimal total distance over all pairs inside the matching radius.
    #[default]
    Optimal,
    /// Closest pair first; ties go to the older centroid, then the earlier box.
    GreedyNearest,
    /// Each box, in input order, takes the first centroid in the running table
    /// within the radius. The table includes centroids written earlier in the
    /// same frame and a centroid may be taken by several boxes, so coincident
    /// boxes share one identity. Handled by the tracker itself, not [`assign`].
    FirstMatch,
}

/// Euclidean distance matrix of shape (M, N) between stored centroids and new centroids.
pub fn centroid_distance(tracks: &[Point2<i64>], detections: &[Point2<i64>]) -> Array2<f64> {
    let mut dists = Array2::zeros((tracks.len(), detections.len()));
    for (i, t) in tracks.iter().enumerate() {
        for (j, d) in detections.iter().enumerate() {
            dists[[i, j]] = nalgebra::distance(&t.cast::<f64>(), &d.cast::<f64>());
        }
    }
    dists
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

impl AssignmentResult {
    fn from_matches(matches: Vec<(usize, usize)>, num_rows: usize, num_cols: usize) -> Self {
        let mut row_used = vec![false; num_rows];
        let mut col_used = vec![false; num_cols];
        for &(i, j) in &matches {
            row_used[i] = true;
            col_used[j] = true;
        }
        Self {
            matches,
            unmatched_tracks: (0..num_rows).filter(|&i| !row_used[i]).collect(),
            unmatched_detections: (0..num_cols).filter(|&j| !col_used[j]).collect(),
        }
    }
}

/// One-to-one assignment for the policies that claim each centroid once.
///
/// A pair is admissible only when its cost is strictly below `radius`.
/// Returns `None` for [`MatchPolicy::FirstMatch`], which is not a one-to-one
/// assignment.
pub fn assign(
    cost_matrix: &Array2<f64>,
    radius: f64,
    policy: MatchPolicy,
) -> Option<AssignmentResult> {
    match policy {
        MatchPolicy::Optimal => Some(linear_assignment(cost_matrix, radius)),
        MatchPolicy::GreedyNearest => Some(greedy_assignment(cost_matrix, radius)),
        MatchPolicy::FirstMatch => None,
    }
}

/// Minimum-total-cost assignment via `lapjv`.
///
/// Among assignments of equal total cost, the one pairing rows and columns
/// with the closest indices wins, so ties resolve the same way every frame.
pub fn linear_assignment(cost_matrix: &Array2<f64>, radius: f64) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult::from_matches(vec![], num_rows, num_cols);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), GATE_COST);

    // Each (i - j)^2 is below size^2, so any full assignment sums below size^3.
    let tie_scale = TIE_BREAK / (size as f64).powi(3);
    for i in 0..num_rows {
        for j in 0..num_cols {
            let cost = cost_matrix[[i, j]];
            if cost < radius {
                let skew = i.abs_diff(j) as f64;
                padded[[i, j]] = cost + tie_scale * skew * skew;
            }
        }
    }

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            let matches = row_to_col
                .iter()
                .enumerate()
                .filter(|&(row, &col)| {
                    row < num_rows && col < num_cols && cost_matrix[[row, col]] < radius
                })
                .map(|(row, &col)| (row, col))
                .collect();
            AssignmentResult::from_matches(matches, num_rows, num_cols)
        }
        Err(_) => {
            tracing::warn!("linear assignment failed, falling back to greedy matching");
            greedy_assignment(cost_matrix, radius)
        }
    }
}

pub fn greedy_assignment(cost_matrix: &Array2<f64>, radius: f64) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    let mut pairs: Vec<(f64, usize, usize)> = cost_matrix
        .indexed_iter()
        .filter(|&(_, &cost)| cost < radius)
        .map(|((i, j), &cost)| (cost, i, j))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut matches = Vec::new();
    for (_, i, j) in pairs {
        if row_used[i] || col_used[j] {
            continue;
        }
        row_used[i] = true;
        col_used[j] = true;
        matches.push((i, j));
    }

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}
