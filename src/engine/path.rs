// Navigation routes: an ordered list of NavNodes plus a traversal policy.
//
// The cursor starts on node 0. `next()` moves it according to the policy and
// returns the node it lands on. A ONE_SHOT track is done once `next()` is
// called while standing on the last node; LOOP and REVERSE never finish.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use super::error::{NavError, NavResult};
use super::terrain::HeightField;

// ============================================================================
// NAV NODE
// ============================================================================

/// Metadata tag for a node. Does not change how a track is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavNodeKind {
    Vertex,
    Waypoint,
    Path,
    AStar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavNode {
    pub position: Vec3,
    pub kind: NavNodeKind,
}

impl NavNode {
    pub fn new(position: Vec3, kind: NavNodeKind) -> Self {
        Self { position, kind }
    }

    /// Node on the terrain surface at grid vertex (ix, iz).
    pub fn on_terrain(terrain: &HeightField, ix: usize, iz: usize, kind: NavNodeKind) -> Self {
        Self::new(terrain.vertex(ix, iz), kind)
    }
}

// ============================================================================
// PATH TRACK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalPolicy {
    /// Walk the nodes once; done after the last one.
    OneShot,
    /// Wrap back to the first node after the last.
    Loop,
    /// Walk to the end, then back to the start, forever.
    Reverse,
}

#[derive(Debug, Clone)]
pub struct PathTrack {
    nodes: Vec<NavNode>,
    policy: TraversalPolicy,
    cursor: usize,
    /// +1 walking toward the end, -1 walking back (REVERSE only).
    direction: i8,
    done: bool,
    /// Times the cursor wrapped to the start (LOOP) or turned around (REVERSE).
    passes: u32,
}

impl PathTrack {
    /// Build a track. An empty node list is allowed but is done from the
    /// start and every node query returns `NavError::EmptyPath`.
    pub fn new(nodes: Vec<NavNode>, policy: TraversalPolicy) -> Self {
        let done = nodes.is_empty();
        Self { nodes, policy, cursor: 0, direction: 1, done, passes: 0 }
    }

    /// Like `new` but rejects an empty node list up front.
    pub fn non_empty(nodes: Vec<NavNode>, policy: TraversalPolicy) -> NavResult<Self> {
        if nodes.is_empty() {
            return Err(NavError::EmptyPath);
        }
        Ok(Self::new(nodes, policy))
    }

    pub fn current(&self) -> NavResult<NavNode> {
        self.nodes.get(self.cursor).copied().ok_or(NavError::EmptyPath)
    }

    /// Advance the cursor and return the node it now points at.
    pub fn next(&mut self) -> NavResult<NavNode> {
        if self.nodes.is_empty() {
            return Err(NavError::EmptyPath);
        }
        let last = self.nodes.len() - 1;

        match self.policy {
            TraversalPolicy::OneShot => {
                if self.cursor < last {
                    self.cursor += 1;
                } else {
                    self.done = true;
                }
            }
            TraversalPolicy::Loop => {
                if self.cursor < last {
                    self.cursor += 1;
                } else {
                    self.cursor = 0;
                    self.passes += 1;
                }
            }
            TraversalPolicy::Reverse => {
                if last == 0 {
                    self.passes += 1;
                } else {
                    if (self.direction > 0 && self.cursor == last)
                        || (self.direction < 0 && self.cursor == 0)
                    {
                        self.direction = -self.direction;
                        self.passes += 1;
                    }
                    if self.direction > 0 {
                        self.cursor += 1;
                    } else {
                        self.cursor -= 1;
                    }
                }
            }
        }

        self.current()
    }

    pub fn is_done(&self) -> bool { self.done }
    pub fn policy(&self) -> TraversalPolicy { self.policy }
    pub fn cursor(&self) -> usize { self.cursor }
    pub fn passes(&self) -> u32 { self.passes }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    pub fn nodes(&self) -> &[NavNode] { &self.nodes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<NavNode> {
        (0..n)
            .map(|i| NavNode::new(Vec3::new(i as f32 * 10.0, 0.0, 0.0), NavNodeKind::Waypoint))
            .collect()
    }

    #[test]
    fn one_shot_finishes_after_n_calls() {
        let n = 4;
        let mut track = PathTrack::new(line(n), TraversalPolicy::OneShot);
        assert_eq!(track.cursor(), 0);
        for i in 0..n {
            assert!(!track.is_done(), "done too early at call {i}");
            track.next().unwrap();
        }
        assert!(track.is_done());
        assert_eq!(track.cursor(), n - 1);

        let again = track.next().unwrap();
        assert_eq!(track.cursor(), n - 1);
        assert_eq!(again, line(n)[n - 1]);
    }

    #[test]
    fn loop_wraps_and_never_finishes() {
        let n = 5;
        let nodes = line(n);
        let mut track = PathTrack::new(nodes.clone(), TraversalPolicy::Loop);
        for _ in 0..n {
            track.next().unwrap();
            assert!(!track.is_done());
        }
        assert_eq!(track.current().unwrap(), nodes[0]);
        assert_eq!(track.passes(), 1);
    }

    #[test]
    fn reverse_ping_pongs_with_period() {
        let n = 4;
        let mut track = PathTrack::new(line(n), TraversalPolicy::Reverse);
        let period = 2 * (n - 1);

        let visited: Vec<usize> = (0..period * 2)
            .map(|_| {
                track.next().unwrap();
                track.cursor()
            })
            .collect();

        assert_eq!(&visited[..period], &[1, 2, 3, 2, 1, 0]);
        assert_eq!(&visited[..period], &visited[period..]);
        assert!(!track.is_done());
    }

    #[test]
    fn reverse_single_node_stays_put() {
        let mut track = PathTrack::new(line(1), TraversalPolicy::Reverse);
        for _ in 0..3 {
            track.next().unwrap();
            assert_eq!(track.cursor(), 0);
        }
    }

    #[test]
    fn empty_track_is_done_and_errors() {
        let mut track = PathTrack::new(Vec::new(), TraversalPolicy::Loop);
        assert!(track.is_done());
        assert_eq!(track.current(), Err(NavError::EmptyPath));
        assert_eq!(track.next(), Err(NavError::EmptyPath));
        assert_eq!(
            PathTrack::non_empty(Vec::new(), TraversalPolicy::OneShot).unwrap_err(),
            NavError::EmptyPath
        );
    }

    #[test]
    fn current_is_idempotent() {
        let track = PathTrack::new(line(3), TraversalPolicy::OneShot);
        assert_eq!(track.current(), track.current());
    }

    #[test]
    fn nodes_snap_to_terrain() {
        let terrain = HeightField::from_fn(4, 150.0, |x, z| (x + z) as f32).unwrap();
        let node = NavNode::on_terrain(&terrain, 2, 3, NavNodeKind::AStar);
        assert_eq!(node.position, Vec3::new(300.0, 5.0, 450.0));
    }
}
