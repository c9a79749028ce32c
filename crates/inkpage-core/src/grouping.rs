//! Connectivity grouping of committed segments.
//!
//! Segments that share an endpoint (exact coordinate equality) belong to the
//! same group. Groups are connected components of that relation and are
//! recomputed from scratch whenever the committed lines change.

use crate::geometry::{Segment, bounds_of, is_finite_point};
use kurbo::{Point, Rect};
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque group identifier, regenerated on every recompute.
pub type GroupId = Uuid;

/// One connected component of committed segments.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    /// Identifier minted for this recompute.
    pub id: GroupId,
    /// Indices into the committed lines, in traversal order.
    pub members: Vec<usize>,
    /// Envelope of every member endpoint.
    pub bounds: Rect,
}

impl LineGroup {
    /// Check whether the group contains the segment at `index`.
    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    /// Resolve member indices against the committed lines.
    pub fn segments<'a>(&'a self, lines: &'a [Segment]) -> impl Iterator<Item = &'a Segment> + 'a {
        self.members.iter().filter_map(move |&i| lines.get(i))
    }
}

/// The partition of committed lines into groups, plus the newest group.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    groups: Vec<LineGroup>,
    newest: Option<GroupId>,
}

impl Grouping {
    /// Partition `lines` into connected groups.
    ///
    /// `last_added` names the most recently committed index; the group that
    /// contains it is reported by [`Grouping::newest`].
    pub fn compute(lines: &[Segment], last_added: Option<usize>) -> Self {
        let groups: Vec<LineGroup> = connected_components(lines)
            .into_iter()
            .map(|members| {
                // Components are never empty.
                let bounds = bounds_of(members.iter().map(|&i| &lines[i])).unwrap_or(Rect::ZERO);
                LineGroup {
                    id: Uuid::new_v4(),
                    members,
                    bounds,
                }
            })
            .collect();

        let newest = last_added.and_then(|index| {
            groups
                .iter()
                .find(|group| group.contains(index))
                .map(|group| group.id)
        });

        log::debug!(
            "grouped {} segments into {} groups (newest: {:?})",
            lines.len(),
            groups.len(),
            newest
        );

        Self { groups, newest }
    }

    /// All groups, ordered by their lowest member index.
    pub fn groups(&self) -> &[LineGroup] {
        &self.groups
    }

    /// The group containing the most recently added segment.
    pub fn newest(&self) -> Option<GroupId> {
        self.newest
    }

    /// Look up a group by identifier.
    pub fn get(&self, id: GroupId) -> Option<&LineGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// Find the group a segment index belongs to.
    pub fn group_of(&self, index: usize) -> Option<&LineGroup> {
        self.groups.iter().find(|group| group.contains(index))
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group membership without identifiers.
    pub fn partition(&self) -> Vec<Vec<usize>> {
        self.groups.iter().map(|group| group.members.clone()).collect()
    }
}

/// Hashable key for exact endpoint equality.
///
/// `-0.0` and `0.0` compare equal as floats, so zero is normalized before
/// taking the bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EndpointKey(u64, u64);

impl EndpointKey {
    fn new(point: Point) -> Self {
        Self(coordinate_bits(point.x), coordinate_bits(point.y))
    }
}

fn coordinate_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() }
}

/// Check whether two segments share an endpoint.
pub fn are_connected(a: &Segment, b: &Segment) -> bool {
    a.shares_endpoint(b)
}

/// Undirected adjacency lists over segment indices.
///
/// Endpoints are indexed by coordinate, so neighbours are found without
/// comparing every pair. Each list is sorted ascending and free of
/// duplicates. Non-finite endpoints never connect (NaN is unequal to itself).
pub fn adjacency(lines: &[Segment]) -> Vec<Vec<usize>> {
    let mut by_endpoint: HashMap<EndpointKey, Vec<usize>> = HashMap::with_capacity(lines.len() * 2);
    for (index, segment) in lines.iter().enumerate() {
        for point in segment.endpoints() {
            if !is_finite_point(point) {
                continue;
            }
            let bucket = by_endpoint.entry(EndpointKey::new(point)).or_default();
            // A degenerate segment lands in the same bucket twice.
            if bucket.last() != Some(&index) {
                bucket.push(index);
            }
        }
    }

    let mut neighbours = vec![Vec::new(); lines.len()];
    for bucket in by_endpoint.values() {
        for &i in bucket {
            neighbours[i].extend(bucket.iter().copied().filter(|&j| j != i));
        }
    }
    for list in &mut neighbours {
        list.sort_unstable();
        list.dedup();
    }
    neighbours
}

/// Partition segment indices into connected components.
///
/// Components are discovered from the lowest unvisited index upward and
/// filled depth-first, visiting neighbours in ascending order. Member order
/// is the pre-order of that traversal, so the result is identical run to run.
pub fn connected_components(lines: &[Segment]) -> Vec<Vec<usize>> {
    let neighbours = adjacency(lines);
    let mut visited = vec![false; lines.len()];
    let mut components = Vec::new();

    for start in 0..lines.len() {
        if visited[start] {
            continue;
        }

        let mut members = vec![start];
        visited[start] = true;
        // (node, position of the next neighbour to try)
        let mut stack = vec![(start, 0usize)];

        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            match neighbours[node].get(cursor) {
                Some(&next) => {
                    top.1 += 1;
                    if !visited[next] {
                        visited[next] = true;
                        members.push(next);
                        stack.push((next, 0));
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }

        components.push(members);
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seg(ax: f64, ay: f64, bx: f64, by: f64) -> Segment {
        Segment::new(Point::new(ax, ay), Point::new(bx, by))
    }

    /// Pairwise comparison of every segment pair followed by a recursive DFS.
    fn reference_components(lines: &[Segment]) -> Vec<Vec<usize>> {
        let mut connections = vec![Vec::new(); lines.len()];
        for i in 0..lines.len() {
            for j in (i + 1)..lines.len() {
                if are_connected(&lines[i], &lines[j]) {
                    connections[i].push(j);
                    connections[j].push(i);
                }
            }
        }

        fn dfs(
            index: usize,
            connections: &[Vec<usize>],
            visited: &mut [bool],
            group: &mut Vec<usize>,
        ) {
            visited[index] = true;
            group.push(index);
            for &neighbour in &connections[index] {
                if !visited[neighbour] {
                    dfs(neighbour, connections, visited, group);
                }
            }
        }

        let mut visited = vec![false; lines.len()];
        let mut groups = Vec::new();
        for i in 0..lines.len() {
            if !visited[i] {
                let mut group = Vec::new();
                dfs(i, &connections, &mut visited, &mut group);
                groups.push(group);
            }
        }
        groups
    }

    #[test]
    fn test_empty_lines() {
        let grouping = Grouping::compute(&[], Some(0));
        assert!(grouping.is_empty());
        assert!(grouping.newest().is_none());
    }

    #[test]
    fn test_shared_endpoint_groups_together() {
        let lines = [seg(0.0, 0.0, 1.0, 1.0), seg(1.0, 1.0, 2.0, 2.0)];
        assert_eq!(connected_components(&lines), vec![vec![0, 1]]);
    }

    #[test]
    fn test_disjoint_segments_stay_apart() {
        let lines = [seg(0.0, 0.0, 1.0, 1.0), seg(5.0, 5.0, 6.0, 6.0)];
        assert_eq!(connected_components(&lines), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_near_miss_does_not_connect() {
        let lines = [seg(0.0, 0.0, 1.0, 1.0), seg(1.0, 1.0 + 1e-9, 2.0, 2.0)];
        assert_eq!(connected_components(&lines).len(), 2);
    }

    #[test]
    fn test_negative_zero_connects() {
        let lines = [seg(-0.0, 0.0, 1.0, 1.0), seg(0.0, -0.0, 3.0, 1.0)];
        assert_eq!(connected_components(&lines), vec![vec![0, 1]]);
    }

    #[test]
    fn test_transitive_chain_joins_late() {
        // 0 and 1 only connect through 2.
        let lines = [
            seg(0.0, 0.0, 10.0, 0.0),
            seg(20.0, 0.0, 30.0, 0.0),
            seg(10.0, 0.0, 20.0, 0.0),
        ];
        assert_eq!(connected_components(&lines), vec![vec![0, 2, 1]]);
    }

    #[test]
    fn test_depth_first_member_order() {
        // Star around (0,0) plus a tail hanging off segment 1.
        let lines = [
            seg(0.0, 0.0, 1.0, 0.0),
            seg(0.0, 0.0, 0.0, 1.0),
            seg(0.0, 0.0, -1.0, 0.0),
            seg(0.0, 1.0, 0.0, 2.0),
        ];
        assert_eq!(connected_components(&lines), reference_components(&lines));
        assert_eq!(connected_components(&lines), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_degenerate_segment() {
        let lines = [seg(1.0, 1.0, 1.0, 1.0), seg(1.0, 1.0, 2.0, 2.0)];
        let neighbours = adjacency(&lines);
        assert_eq!(neighbours, vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_nan_endpoints_never_connect() {
        let lines = [seg(f64::NAN, 0.0, 1.0, 1.0), seg(f64::NAN, 0.0, 5.0, 5.0)];
        assert_eq!(connected_components(&lines).len(), 2);
    }

    #[test]
    fn test_closed_triangle() {
        let lines = [
            seg(0.0, 0.0, 10.0, 0.0),
            seg(10.0, 0.0, 5.0, 8.0),
            seg(5.0, 8.0, 0.0, 0.0),
        ];
        let grouping = Grouping::compute(&lines, Some(2));
        assert_eq!(grouping.len(), 1);
        let group = &grouping.groups()[0];
        assert_eq!(group.bounds, Rect::new(0.0, 0.0, 10.0, 8.0));
        assert_eq!(grouping.newest(), Some(group.id));
    }

    #[test]
    fn test_bounding_box_of_group() {
        let lines = [seg(0.0, 0.0, 2.0, 2.0), seg(2.0, 2.0, 2.0, 5.0)];
        let grouping = Grouping::compute(&lines, None);
        assert_eq!(grouping.groups()[0].bounds, Rect::new(0.0, 0.0, 2.0, 5.0));
    }

    #[test]
    fn test_newest_group_tracks_last_added() {
        let lines = [
            seg(0.0, 0.0, 1.0, 1.0),
            seg(5.0, 5.0, 6.0, 6.0),
            seg(6.0, 6.0, 7.0, 7.0),
        ];
        let grouping = Grouping::compute(&lines, Some(2));
        let newest = grouping.newest().unwrap();
        assert_eq!(grouping.get(newest).unwrap().members, vec![1, 2]);
        assert_eq!(grouping.group_of(1).map(|g| g.id), Some(newest));
    }

    #[test]
    fn test_newest_out_of_range() {
        let lines = [seg(0.0, 0.0, 1.0, 1.0)];
        assert!(Grouping::compute(&lines, Some(7)).newest().is_none());
        assert!(Grouping::compute(&lines, None).newest().is_none());
    }

    #[test]
    fn test_recompute_mints_fresh_ids() {
        let lines = [seg(0.0, 0.0, 1.0, 1.0), seg(1.0, 1.0, 2.0, 2.0), seg(9.0, 9.0, 8.0, 8.0)];
        let first = Grouping::compute(&lines, Some(1));
        let second = Grouping::compute(&lines, Some(1));
        assert_eq!(first.partition(), second.partition());
        assert_ne!(first.groups()[0].id, second.groups()[0].id);
    }

    #[test]
    fn test_segments_resolve_members() {
        let lines = [seg(0.0, 0.0, 1.0, 1.0), seg(1.0, 1.0, 2.0, 2.0)];
        let grouping = Grouping::compute(&lines, None);
        let resolved: Vec<_> = grouping.groups()[0].segments(&lines).copied().collect();
        assert_eq!(resolved, lines.to_vec());
    }

    fn small_coord() -> impl Strategy<Value = f64> {
        // A tiny coordinate range forces plenty of shared endpoints.
        (0i32..4).prop_map(f64::from)
    }

    fn arb_segment() -> impl Strategy<Value = Segment> {
        (small_coord(), small_coord(), small_coord(), small_coord())
            .prop_map(|(ax, ay, bx, by)| seg(ax, ay, bx, by))
    }

    proptest! {
        #[test]
        fn prop_partition_covers_every_index_once(
            lines in prop::collection::vec(arb_segment(), 0..40)
        ) {
            let mut seen: Vec<usize> =
                connected_components(&lines).into_iter().flatten().collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..lines.len()).collect::<Vec<_>>());
        }

        #[test]
        fn prop_indexed_matches_pairwise(lines in prop::collection::vec(arb_segment(), 0..40)) {
            prop_assert_eq!(connected_components(&lines), reference_components(&lines));
        }

        #[test]
        fn prop_bounds_enclose_members(lines in prop::collection::vec(arb_segment(), 1..30)) {
            let grouping = Grouping::compute(&lines, Some(lines.len() - 1));
            prop_assert!(grouping.newest().is_some());
            for group in grouping.groups() {
                for segment in group.segments(&lines) {
                    for p in segment.endpoints() {
                        prop_assert!(p.x >= group.bounds.x0 && p.x <= group.bounds.x1);
                        prop_assert!(p.y >= group.bounds.y0 && p.y <= group.bounds.y1);
                    }
                }
            }
        }
    }
}
