//! Centroid tracker assigning stable identities to per-frame boxes.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tracker::matching::{self, AssignmentResult, MatchPolicy};
use crate::tracker::rect::BoundingBox;

/// Stable object label. Allocated from 0 upwards and never reused.
pub type Identity = u64;

/// Configuration for the [`CentroidTracker`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Centroids closer than this (pixels, exclusive) are the same object.
    pub match_radius: f64,
    pub policy: MatchPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            match_radius: 35.0,
            policy: MatchPolicy::Optimal,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.match_radius.is_finite() && self.match_radius > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "match_radius must be positive, got {}",
                self.match_radius
            )))
        }
    }
}

/// A box paired with the identity the tracker gave it this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackedObject {
    pub bbox: BoundingBox,
    pub identity: Identity,
}

impl TrackedObject {
    pub fn centroid(&self) -> Point2<i64> {
        self.bbox.centroid()
    }
}

#[derive(Debug)]
pub struct CentroidTracker {
    /// Centroids of the identities seen in the last frame, oldest first.
    centroids: Vec<(Identity, Point2<i64>)>,
    next_id: Identity,
    config: TrackerConfig,
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            centroids: Vec::new(),
            next_id: 0,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Identities currently held in the centroid table, in table order.
    pub fn identities(&self) -> impl Iterator<Item = Identity> + '_ {
        self.centroids.iter().map(|(id, _)| *id)
    }

    /// Last known centroid of `identity`, if it was seen in the last frame.
    pub fn centroid_of(&self, identity: Identity) -> Option<Point2<i64>> {
        self.centroids
            .iter()
            .find(|(id, _)| *id == identity)
            .map(|(_, c)| *c)
    }

    /// Number of identities allocated so far.
    pub fn total_identities(&self) -> u64 {
        self.next_id
    }

    /// Match this frame's boxes against the previous frame's centroids.
    ///
    /// Returns one entry per input box, in input order. Identities missing
    /// from `boxes` are retired. Boxes are not validated here; callers must
    /// pass non-negative dimensions.
    pub fn update(&mut self, boxes: &[BoundingBox]) -> Vec<TrackedObject> {
        let new_centroids: Vec<Point2<i64>> = boxes.iter().map(BoundingBox::centroid).collect();
        let old_centroids: Vec<Point2<i64>> = self.centroids.iter().map(|(_, c)| *c).collect();

        let dists = matching::centroid_distance(&old_centroids, &new_centroids);
        let Some(AssignmentResult {
            matches,
            unmatched_tracks,
            ..
        }) = matching::assign(&dists, self.config.match_radius, self.config.policy)
        else {
            return self.update_first_match(boxes, &new_centroids);
        };

        let mut assigned: Vec<Option<Identity>> = vec![None; boxes.len()];
        for (itrack, idet) in matches {
            assigned[idet] = Some(self.centroids[itrack].0);
        }

        let mut objects = Vec::with_capacity(boxes.len());
        for (bbox, slot) in boxes.iter().zip(assigned) {
            let identity = match slot {
                Some(identity) => identity,
                None => self.allocate(bbox),
            };
            objects.push(TrackedObject {
                bbox: *bbox,
                identity,
            });
        }

        for idx in unmatched_tracks {
            tracing::debug!(identity = self.centroids[idx].0, "identity retired");
        }

        // Matched identities keep their table position; new ones follow.
        let mut table: Vec<(Identity, Point2<i64>)> = objects
            .iter()
            .zip(&new_centroids)
            .map(|(obj, c)| (obj.identity, *c))
            .collect();
        let order = |id: Identity| {
            self.centroids
                .iter()
                .position(|(old, _)| *old == id)
                .unwrap_or(usize::MAX)
        };
        table.sort_by_key(|(id, _)| (order(*id), *id));
        self.centroids = table;

        objects
    }

    /// Sequential matching against a table that is updated box by box.
    ///
    /// A box may match an identity another box already took this frame, or
    /// one created earlier in this frame. The new table keeps the identities
    /// that appear in the output, each at its first table position, holding
    /// the last centroid written to it.
    fn update_first_match(
        &mut self,
        boxes: &[BoundingBox],
        new_centroids: &[Point2<i64>],
    ) -> Vec<TrackedObject> {
        let radius = self.config.match_radius;
        let mut running = std::mem::take(&mut self.centroids);
        let mut objects = Vec::with_capacity(boxes.len());

        for (bbox, centroid) in boxes.iter().zip(new_centroids) {
            let hit = running.iter().position(|(_, c)| {
                nalgebra::distance(&c.cast::<f64>(), &centroid.cast::<f64>()) < radius
            });
            let identity = match hit {
                Some(idx) => {
                    running[idx].1 = *centroid;
                    running[idx].0
                }
                None => {
                    let identity = self.allocate(bbox);
                    running.push((identity, *centroid));
                    identity
                }
            };
            objects.push(TrackedObject {
                bbox: *bbox,
                identity,
            });
        }

        running.retain(|(id, _)| {
            let seen = objects.iter().any(|obj| obj.identity == *id);
            if !seen {
                tracing::debug!(identity = *id, "identity retired");
            }
            seen
        });
        self.centroids = running;

        objects
    }

    fn allocate(&mut self, bbox: &BoundingBox) -> Identity {
        let identity = self.next_id;
        self.next_id += 1;
        tracing::debug!(identity, ?bbox, "new identity");
        identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(objects: &[TrackedObject]) -> Vec<Identity> {
        objects.iter().map(|o| o.identity).collect()
    }

    #[test]
    fn test_new_identities_follow_input_order() {
        let mut tracker = CentroidTracker::default();
        let out = tracker.update(&[
            BoundingBox::new(0, 0, 20, 20),
            BoundingBox::new(200, 0, 20, 20),
            BoundingBox::new(400, 0, 20, 20),
        ]);
        assert_eq!(ids(&out), vec![0, 1, 2]);
        assert_eq!(tracker.total_identities(), 3);
    }

    #[test]
    fn test_output_preserves_boxes() {
        let mut tracker = CentroidTracker::default();
        let boxes = [BoundingBox::new(5, 6, 7, 8), BoundingBox::new(100, 100, 9, 9)];
        let out = tracker.update(&boxes);
        assert_eq!(out[0].bbox, boxes[0]);
        assert_eq!(out[1].bbox, boxes[1]);
    }

    #[test]
    fn test_centroid_table_overwritten() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[BoundingBox::new(0, 0, 20, 20)]);
        assert_eq!(tracker.centroid_of(0), Some(Point2::new(10, 10)));

        tracker.update(&[BoundingBox::new(10, 0, 20, 20)]);
        assert_eq!(tracker.centroid_of(0), Some(Point2::new(20, 10)));
    }

    #[test]
    fn test_empty_frame_retires_everything() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[BoundingBox::new(0, 0, 20, 20), BoundingBox::new(100, 0, 20, 20)]);
        assert!(tracker.update(&[]).is_empty());
        assert_eq!(tracker.identities().count(), 0);

        let out = tracker.update(&[BoundingBox::new(0, 0, 20, 20)]);
        assert_eq!(ids(&out), vec![2]);
    }

    #[test]
    fn test_centroid_claimed_once_per_frame() {
        for policy in [MatchPolicy::Optimal, MatchPolicy::GreedyNearest] {
            let mut tracker = CentroidTracker::new(TrackerConfig {
                policy,
                ..TrackerConfig::default()
            });
            tracker.update(&[BoundingBox::new(100, 100, 20, 20)]);

            // Both boxes are within the radius of identity 0.
            let out = tracker.update(&[
                BoundingBox::new(110, 100, 20, 20),
                BoundingBox::new(90, 100, 20, 20),
            ]);
            let got = ids(&out);
            assert!(got.contains(&0), "{policy:?}");
            assert!(got.contains(&1), "{policy:?}");
        }
    }

    #[test]
    fn test_first_match_follows_table_order() {
        let mut tracker = CentroidTracker::new(TrackerConfig {
            policy: MatchPolicy::FirstMatch,
            ..TrackerConfig::default()
        });
        tracker.update(&[BoundingBox::new(0, 0, 20, 20), BoundingBox::new(40, 0, 20, 20)]);

        // Centroid (40, 10) is 30px from id 0 and 10px from id 1.
        let out = tracker.update(&[BoundingBox::new(30, 0, 20, 20)]);
        assert_eq!(ids(&out), vec![0]);

        let mut tracker = CentroidTracker::default();
        tracker.update(&[BoundingBox::new(0, 0, 20, 20), BoundingBox::new(40, 0, 20, 20)]);
        let out = tracker.update(&[BoundingBox::new(30, 0, 20, 20)]);
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn test_first_match_shares_identity_between_nearby_boxes() {
        let mut tracker = CentroidTracker::new(TrackerConfig {
            policy: MatchPolicy::FirstMatch,
            ..TrackerConfig::default()
        });
        tracker.update(&[BoundingBox::new(100, 100, 20, 20)]);

        // Both boxes are within the radius of identity 0, and neither claims it.
        let out = tracker.update(&[
            BoundingBox::new(110, 100, 20, 20),
            BoundingBox::new(90, 100, 20, 20),
        ]);
        assert_eq!(ids(&out), vec![0, 0]);
        assert_eq!(tracker.centroid_of(0), Some(Point2::new(100, 110)));
        assert_eq!(tracker.total_identities(), 1);
    }

    #[test]
    fn test_first_match_sees_centroids_written_this_frame() {
        let mut tracker = CentroidTracker::new(TrackerConfig {
            policy: MatchPolicy::FirstMatch,
            ..TrackerConfig::default()
        });

        // Box 1 matches the identity box 0 just created.
        let out = tracker.update(&[
            BoundingBox::new(0, 0, 20, 20),
            BoundingBox::new(20, 0, 20, 20),
            BoundingBox::new(300, 0, 20, 20),
        ]);
        assert_eq!(ids(&out), vec![0, 0, 1]);
        assert_eq!(tracker.identities().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(tracker.centroid_of(0), Some(Point2::new(30, 10)));

        // 31px from the overwritten centroid, 48px from the first box.
        let out = tracker.update(&[BoundingBox::new(44, 20, 20, 20)]);
        assert_eq!(ids(&out), vec![0]);
        assert_eq!(tracker.identities().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_first_match_radius_is_strict() {
        let mut tracker = CentroidTracker::new(TrackerConfig {
            policy: MatchPolicy::FirstMatch,
            ..TrackerConfig::default()
        });
        let out = tracker.update(&[
            BoundingBox::new(0, 0, 20, 20),
            BoundingBox::new(35, 0, 20, 20),
        ]);
        assert_eq!(ids(&out), vec![0, 1]);
    }

    #[test]
    fn test_coincident_boxes_keep_identities_under_optimal() {
        let mut tracker = CentroidTracker::default();
        let boxes = [BoundingBox::new(100, 100, 20, 20); 3];
        for _ in 0..5 {
            assert_eq!(ids(&tracker.update(&boxes)), vec![0, 1, 2]);
        }
        assert_eq!(tracker.total_identities(), 3);
    }

    #[test]
    fn test_equidistant_boxes_keep_identities_under_optimal() {
        let mut tracker = CentroidTracker::default();
        // Two pairs of coincident boxes, 20px apart.
        let boxes = [
            BoundingBox::new(0, 0, 20, 20),
            BoundingBox::new(20, 0, 20, 20),
            BoundingBox::new(0, 0, 20, 20),
            BoundingBox::new(20, 0, 20, 20),
        ];
        for _ in 0..5 {
            assert_eq!(ids(&tracker.update(&boxes)), vec![0, 1, 2, 3]);
        }

        // Shifted right by 10px: several stored centroids are 10px from each box.
        let shifted = boxes.map(|b| BoundingBox::new(b.x + 10, b.y, b.width, b.height));
        for _ in 0..5 {
            assert_eq!(ids(&tracker.update(&shifted)), vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_centroid_does_not_overflow() {
        let mut tracker = CentroidTracker::default();
        let out = tracker.update(&[BoundingBox::new(2_000_000_000, 0, 100_000_000, 10)]);
        assert_eq!(ids(&out), vec![0]);
        assert_eq!(tracker.centroid_of(0), Some(Point2::new(2_050_000_000, 5)));
    }

    #[test]
    fn test_table_keeps_insertion_order() {
        let mut tracker = CentroidTracker::default();
        tracker.update(&[BoundingBox::new(0, 0, 20, 20), BoundingBox::new(200, 0, 20, 20)]);

        // Reversed input order must not reorder the table.
        tracker.update(&[
            BoundingBox::new(400, 0, 20, 20),
            BoundingBox::new(205, 0, 20, 20),
            BoundingBox::new(5, 0, 20, 20),
        ]);
        assert_eq!(tracker.identities().collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
