//! Zoom-dependent marker clustering with animated lifecycle.
//!
//! The grouping is a greedy single-pass agglomeration in input order:
//! each unclustered stop starts a cluster and absorbs every later
//! unclustered stop within the merge distance of the running centroid.
//! That is deliberately not an optimal clustering; it is O(n²) worst
//! case, stable frame-to-frame, and a stop can end up in a cluster
//! whose final centroid drifted outside the threshold. Far zoom-out
//! levels run a second pass over the first pass's centroids with an
//! enlarged distance, weighting by member count, to form super-clusters.
//!
//! [`cluster`] itself is stateless: the caller owns the returned list,
//! feeds it back as `previous` on the next frame, and drives the
//! animation by calling [`advance`] at most once per tick from a single
//! writer.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::model::Stop;

/// Base merge distance in pixels; scaled by the zoom bucket multiplier.
const BASE_MERGE_PX: f64 = 3.0;
/// Enlargement of the merge distance for the super-cluster pass.
const SUPER_PASS_FACTOR: f64 = 1.5;
/// Scale a cluster enters at before easing to full size.
const ENTER_SCALE: f64 = 0.25;
/// Exponential ease rate, per second.
const EASE_RATE: f64 = 8.0;
/// A dying cluster is removable once its alpha has decayed this far.
const ALPHA_EPSILON: f64 = 0.05;
/// ...and its animated position has converged this close to its target.
const POSITION_EPSILON_PX: f64 = 20.0;

/// Merge-distance multiplier for a camera zoom. Zero at the closest
/// bucket (no clustering, every marker its own), growing to 20x the
/// base distance when zoomed far out.
fn merge_multiplier(zoom: f64) -> f64 {
    if zoom >= 16.0 {
        0.0
    } else if zoom >= 14.0 {
        2.0
    } else if zoom >= 12.5 {
        5.0
    } else if zoom >= 11.0 {
        10.0
    } else {
        20.0
    }
}

/// The super-cluster pass only runs at far zoom-out buckets.
fn super_pass_active(zoom: f64) -> bool {
    merge_multiplier(zoom) >= 10.0
}

/// Viewport rectangle in pixel space; stops outside are not clustered.
#[derive(Clone, Copy, Debug)]
pub struct PixelBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PixelBounds {
    fn contains(&self, p: (f64, f64)) -> bool {
        p.0 >= self.min_x && p.0 <= self.max_x && p.1 >= self.min_y && p.1 <= self.max_y
    }
}

/// Cluster identity: the sorted ids of its member stops. Stable across
/// frames regardless of stop input order, so the presentation layer can
/// match clusters between clustering passes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClusterId(Vec<u32>);

impl ClusterId {
    fn from_members(mut ids: Vec<u32>) -> Self {
        ids.sort_unstable();
        Self(ids)
    }

    pub fn member_ids(&self) -> &[u32] {
        &self.0
    }
}

/// Animation lifecycle of a cluster entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Entering,
    Steady,
    Dying,
}

/// A visual grouping of stop markers. The one mutable, frame-persistent
/// entity of the model; owned by the presentation loop between frames.
#[derive(Clone, Debug)]
pub struct Cluster {
    pub id: ClusterId,
    /// Member stop ids, sorted.
    pub members: Vec<u32>,
    /// Where the grouping wants the marker, in pixel space.
    pub target_position: (f64, f64),
    /// Animated position, eased toward the target each tick.
    pub position: (f64, f64),
    pub scale: f64,
    pub target_scale: f64,
    pub alpha: f64,
    pub phase: Phase,
}

impl Cluster {
    /// A dying cluster whose fade and motion have both converged may be
    /// dropped; [`advance`] does this automatically.
    pub fn is_expired(&self) -> bool {
        let dx = self.position.0 - self.target_position.0;
        let dy = self.position.1 - self.target_position.1;
        self.phase == Phase::Dying
            && self.alpha <= ALPHA_EPSILON
            && (dx * dx + dy * dy).sqrt() <= POSITION_EPSILON_PX
    }
}

/// Groups stop markers for the given camera zoom and matches the result
/// against the previous frame's clusters to carry animation state.
///
/// `pixels` holds the screen position of each stop, parallel to
/// `stops`. New groupings enter small and transparent; previous
/// groupings that disappeared are returned as dying copies so they can
/// fade out. The input order of `stops` is the scan order of the greedy
/// pass.
pub fn cluster(
    stops: &[Arc<Stop>],
    pixels: &[(f64, f64)],
    zoom: f64,
    bounds: Option<&PixelBounds>,
    previous: &[Cluster],
) -> Vec<Cluster> {
    debug_assert_eq!(stops.len(), pixels.len());

    let visible: Vec<usize> = (0..stops.len().min(pixels.len()))
        .filter(|&idx| bounds.is_none_or(|b| b.contains(pixels[idx])))
        .collect();

    let merge_dist = BASE_MERGE_PX * merge_multiplier(zoom);

    // First pass over the stops themselves, unit weight each.
    let points: Vec<(f64, f64)> = visible.iter().map(|&idx| pixels[idx]).collect();
    let weights = vec![1.0; points.len()];
    let mut groups = greedy_pass(&points, &weights, merge_dist);

    // Second pass over the centroids at far zoom-out, weighted by
    // member count so big clusters pull proportionally.
    if super_pass_active(zoom) {
        let centroids: Vec<(f64, f64)> = groups.iter().map(|g| g.centroid).collect();
        let counts: Vec<f64> = groups.iter().map(|g| g.members.len() as f64).collect();
        let merged = greedy_pass(&centroids, &counts, merge_dist * SUPER_PASS_FACTOR);

        groups = merged
            .into_iter()
            .map(|superg| {
                let members = superg
                    .members
                    .iter()
                    .flat_map(|&gidx| groups[gidx].members.iter().copied())
                    .collect();
                Grouping {
                    members,
                    centroid: superg.centroid,
                }
            })
            .collect();
    }

    let prev_by_id: HashMap<&ClusterId, &Cluster> =
        previous.iter().map(|c| (&c.id, c)).collect();

    let mut out: Vec<Cluster> = groups
        .into_iter()
        .map(|group| {
            let members: Vec<u32> = {
                let mut ids: Vec<u32> =
                    group.members.iter().map(|&i| stops[visible[i]].id).collect();
                ids.sort_unstable();
                ids
            };
            let id = ClusterId::from_members(members.clone());

            match prev_by_id.get(&id) {
                Some(prev) => Cluster {
                    id,
                    members,
                    target_position: group.centroid,
                    position: prev.position,
                    scale: prev.scale,
                    target_scale: 1.0,
                    alpha: prev.alpha,
                    phase: match prev.phase {
                        // A grouping that came back mid-fade re-enters.
                        Phase::Dying => Phase::Entering,
                        phase => phase,
                    },
                },
                None => Cluster {
                    id,
                    members,
                    target_position: group.centroid,
                    position: group.centroid,
                    scale: ENTER_SCALE,
                    target_scale: 1.0,
                    alpha: 0.0,
                    phase: Phase::Entering,
                },
            }
        })
        .collect();

    // Groupings gone this frame linger as dying copies until their
    // animation converges.
    let dying: Vec<Cluster> = {
        let alive: hashbrown::HashSet<&ClusterId> = out.iter().map(|c| &c.id).collect();
        previous
            .iter()
            .filter(|prev| !alive.contains(&prev.id) && !prev.is_expired())
            .map(|prev| Cluster {
                phase: Phase::Dying,
                target_scale: 0.0,
                ..prev.clone()
            })
            .collect()
    };
    out.extend(dying);

    out
}

struct Grouping {
    /// Indices into the pass's input point list.
    members: Vec<usize>,
    centroid: (f64, f64),
}

/// Greedy single-link agglomeration: scan in input order, each
/// unclustered point seeds a group and absorbs every later unclustered
/// point within `merge_dist` of the running weighted centroid. A
/// non-positive distance disables merging entirely.
fn greedy_pass(points: &[(f64, f64)], weights: &[f64], merge_dist: f64) -> Vec<Grouping> {
    let mut clustered = vec![false; points.len()];
    let mut groups = Vec::new();

    for i in 0..points.len() {
        if clustered[i] {
            continue;
        }
        clustered[i] = true;
        let mut members = vec![i];
        let mut centroid = points[i];
        let mut weight = weights[i];

        if merge_dist > 0.0 {
            for j in (i + 1)..points.len() {
                if clustered[j] {
                    continue;
                }
                let dx = points[j].0 - centroid.0;
                let dy = points[j].1 - centroid.1;
                if (dx * dx + dy * dy).sqrt() <= merge_dist {
                    clustered[j] = true;
                    members.push(j);
                    let w = weights[j];
                    centroid = (
                        (centroid.0 * weight + points[j].0 * w) / (weight + w),
                        (centroid.1 * weight + points[j].1 * w) / (weight + w),
                    );
                    weight += w;
                }
            }
        }

        groups.push(Grouping { members, centroid });
    }

    groups
}

/// Eases every cluster toward its targets and drops the ones whose
/// death animation has finished. Critically-damped exponential ease:
/// the step fraction is `1 - 0.001^(delta * rate)`, so convergence
/// speed is frame-rate independent. Must be called from a single
/// writer, at most once per animation tick.
pub fn advance(clusters: &mut Vec<Cluster>, delta_s: f64) {
    let k = 1.0 - 0.001_f64.powf(delta_s * EASE_RATE);

    for c in clusters.iter_mut() {
        c.position.0 += (c.target_position.0 - c.position.0) * k;
        c.position.1 += (c.target_position.1 - c.position.1) * k;
        c.scale += (c.target_scale - c.scale) * k;

        let target_alpha = if c.phase == Phase::Dying { 0.0 } else { 1.0 };
        c.alpha += (target_alpha - c.alpha) * k;

        if c.phase == Phase::Entering && c.alpha > 0.9 {
            c.phase = Phase::Steady;
        }
    }

    clusters.retain(|c| !c.is_expired());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stop;
    use approx::assert_relative_eq;
    use geo::{Coord, Point};

    fn stop(id: u32) -> Arc<Stop> {
        Arc::new(Stop {
            id,
            external_id: String::new(),
            name: format!("Stop {id}"),
            source: Coord { x: 0.0, y: 0.0 },
            geometry: Point::new(0.0, 0.0),
            route_ids: Vec::new(),
        })
    }

    #[test]
    fn nearby_pair_merges_at_a_clustering_bucket() {
        let stops = vec![stop(1), stop(2)];
        let pixels = vec![(100.0, 100.0), (105.0, 100.0)];
        let clusters = cluster(&stops, &pixels, 14.5, None, &[]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![1, 2]);
        assert_relative_eq!(clusters[0].target_position.0, 102.5, epsilon = 1e-9);
    }

    #[test]
    fn same_pair_splits_at_max_zoom_in() {
        let stops = vec![stop(1), stop(2)];
        let pixels = vec![(100.0, 100.0), (105.0, 100.0)];
        let clusters = cluster(&stops, &pixels, 17.0, None, &[]);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.members.len() == 1));
    }

    #[test]
    fn identity_ignores_input_order() {
        let pixels_a = vec![(100.0, 100.0), (104.0, 100.0)];
        let a = cluster(&[stop(1), stop(2)], &pixels_a, 14.0, None, &[]);
        let b = cluster(&[stop(2), stop(1)], &pixels_a, 14.0, None, &[]);
        assert_eq!(a[0].id, b[0].id);
    }

    #[test]
    fn super_pass_merges_centroids_with_member_weighting() {
        // Three stops around x=4 and a lone stop at x=80. At zoom 10
        // the first pass groups them separately (distance 60), and the
        // super pass (distance 90) merges the centroids weighted 3:1.
        let stops = vec![stop(1), stop(2), stop(3), stop(4)];
        let pixels = vec![(0.0, 0.0), (4.0, 0.0), (8.0, 0.0), (80.0, 0.0)];

        let far = cluster(&stops, &pixels, 10.0, None, &[]);
        assert_eq!(far.len(), 1);
        assert_eq!(far[0].members, vec![1, 2, 3, 4]);
        assert_relative_eq!(far[0].target_position.0, 23.0, epsilon = 1e-9);

        // At a mid bucket there is no super pass; the groups stay apart.
        let mid = cluster(&stops, &pixels, 13.0, None, &[]);
        assert_eq!(mid.len(), 2);
    }

    #[test]
    fn viewport_bounds_exclude_offscreen_stops() {
        let stops = vec![stop(1), stop(2)];
        let pixels = vec![(10.0, 10.0), (500.0, 10.0)];
        let bounds = PixelBounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 100.0,
            max_y: 100.0,
        };
        let clusters = cluster(&stops, &pixels, 14.0, Some(&bounds), &[]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![1]);
    }

    #[test]
    fn matched_identity_carries_animation_state() {
        let stops = vec![stop(1), stop(2)];
        let pixels = vec![(100.0, 100.0), (104.0, 100.0)];

        let mut frame1 = cluster(&stops, &pixels, 14.0, None, &[]);
        assert_eq!(frame1[0].phase, Phase::Entering);
        for _ in 0..30 {
            advance(&mut frame1, 1.0 / 60.0);
        }
        assert_eq!(frame1[0].phase, Phase::Steady);
        let alpha = frame1[0].alpha;
        assert!(alpha > 0.9);

        let frame2 = cluster(&stops, &pixels, 14.0, None, &frame1);
        assert_eq!(frame2[0].phase, Phase::Steady);
        assert_relative_eq!(frame2[0].alpha, alpha, epsilon = 1e-12);
    }

    #[test]
    fn vanished_grouping_dies_and_is_removed_after_converging() {
        let stops = vec![stop(1), stop(2)];
        let pixels = vec![(100.0, 100.0), (104.0, 100.0)];

        let mut frame1 = cluster(&stops, &pixels, 14.0, None, &[]);
        for _ in 0..30 {
            advance(&mut frame1, 1.0 / 60.0);
        }

        // The grouping disappears on the next frame.
        let mut frame2 = cluster(&[], &[], 14.0, None, &frame1);
        assert_eq!(frame2.len(), 1);
        assert_eq!(frame2[0].phase, Phase::Dying);

        // One tick is not enough to finish the fade.
        advance(&mut frame2, 1.0 / 60.0);
        assert_eq!(frame2.len(), 1);
        assert!(frame2[0].alpha < 1.0);

        for _ in 0..120 {
            advance(&mut frame2, 1.0 / 60.0);
        }
        assert!(frame2.is_empty(), "dying cluster should be removed");
    }

    #[test]
    fn entering_cluster_eases_exponentially_not_linearly() {
        let stops = vec![stop(1)];
        let mut clusters = cluster(&stops, &[(50.0, 50.0)], 17.0, None, &[]);
        advance(&mut clusters, 1.0 / 60.0);
        let first_step = clusters[0].alpha;
        advance(&mut clusters, 1.0 / 60.0);
        let second_step = clusters[0].alpha - first_step;
        // Each step closes a fixed fraction of the remaining gap, so
        // consecutive increments shrink.
        assert!(second_step < first_step);
        assert!(second_step > 0.0);
    }
}
