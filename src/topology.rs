//! Board topology: the structural graph of squares.
//!
//! A topology is pure structure with no runtime state. Generated kinds
//! (rectangular, hex) compute adjacency on demand; custom graphs store it
//! explicitly. All queries treat unknown squares as having no neighbors
//! rather than failing.

use crate::square::Square;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::instrument;

/// Eight compass directions for rectangular adjacency. Consumers restrict
/// to four or eight as needed.
const RECT_DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Six axial directions for hex adjacency.
const HEX_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Immutable board structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "lowercase")]
pub enum Topology {
    /// Width × height grid addressed with algebraic squares.
    Rectangular {
        /// Number of files.
        width: i32,
        /// Number of ranks.
        height: i32,
    },
    /// Hexagon of the given radius addressed with axial squares.
    Hex {
        /// Hex radius; radius 0 is a single cell.
        radius: i32,
    },
    /// Arbitrary graph with explicit adjacency.
    #[serde(rename = "custom")]
    Graph {
        /// Neighbor lists keyed by square.
        #[serde(rename = "adjacencyMap")]
        adjacency: BTreeMap<Square, Vec<Square>>,
    },
}

impl Topology {
    /// Standard 8×8 board.
    pub fn standard() -> Self {
        Topology::Rectangular {
            width: 8,
            height: 8,
        }
    }

    /// Rendering-bounds hint as (width, height).
    pub fn bounds(&self) -> (i32, i32) {
        match self {
            Topology::Rectangular { width, height } => (*width, *height),
            Topology::Hex { radius } => (radius * 2 + 1, radius * 2 + 1),
            Topology::Graph { adjacency } => {
                let coords = adjacency.keys().filter_map(Square::coords);
                let (mut min_x, mut max_x, mut min_y, mut max_y) = (0, 0, 0, 0);
                let mut seen = false;
                for (x, y) in coords {
                    if !seen {
                        (min_x, max_x, min_y, max_y) = (x, x, y, y);
                        seen = true;
                    } else {
                        min_x = min_x.min(x);
                        max_x = max_x.max(x);
                        min_y = min_y.min(y);
                        max_y = max_y.max(y);
                    }
                }
                if seen {
                    (max_x - min_x + 1, max_y - min_y + 1)
                } else {
                    (1, 1)
                }
            }
        }
    }

    /// Whether the square exists in this topology.
    pub fn contains(&self, square: &Square) -> bool {
        match self {
            Topology::Rectangular { width, height } => match square {
                Square::Algebraic { file, rank } => {
                    (0..*width).contains(file) && (0..*height).contains(rank)
                }
                _ => false,
            },
            Topology::Hex { radius } => match square {
                Square::Axial { q, r } => {
                    q.abs() <= *radius && r.abs() <= *radius && (q + r).abs() <= *radius
                }
                _ => false,
            },
            Topology::Graph { adjacency } => adjacency.contains_key(square),
        }
    }

    /// Neighbors of a square. Unknown squares have none.
    pub fn adjacent(&self, square: &Square) -> Vec<Square> {
        if !self.contains(square) {
            return Vec::new();
        }
        match self {
            Topology::Rectangular { .. } => RECT_DIRECTIONS
                .iter()
                .filter_map(|(dx, dy)| square.offset(*dx, *dy))
                .filter(|sq| self.contains(sq))
                .collect(),
            Topology::Hex { .. } => HEX_DIRECTIONS
                .iter()
                .filter_map(|(dq, dr)| square.offset(*dq, *dr))
                .filter(|sq| self.contains(sq))
                .collect(),
            Topology::Graph { adjacency } => adjacency.get(square).cloned().unwrap_or_default(),
        }
    }

    /// Every square of the topology, in a deterministic order.
    pub fn all_squares(&self) -> Vec<Square> {
        match self {
            Topology::Rectangular { width, height } => {
                let mut squares = Vec::with_capacity((width * height).max(0) as usize);
                for file in 0..*width {
                    for rank in 0..*height {
                        squares.push(Square::alg(file, rank));
                    }
                }
                squares
            }
            Topology::Hex { radius } => {
                let mut squares = Vec::new();
                for q in -radius..=*radius {
                    for r in -radius..=*radius {
                        if (q + r).abs() <= *radius {
                            squares.push(Square::axial(q, r));
                        }
                    }
                }
                squares
            }
            Topology::Graph { adjacency } => adjacency.keys().cloned().collect(),
        }
    }

    /// Shortest path from `from` to `to` by breadth-first search, inclusive
    /// of both endpoints. `is_blocked` squares are impassable unless
    /// `can_jump` is set. Returns `None` when no path exists.
    #[instrument(skip(self, is_blocked))]
    pub fn find_path(
        &self,
        from: &Square,
        to: &Square,
        can_jump: bool,
        is_blocked: impl Fn(&Square) -> bool,
    ) -> Option<Vec<Square>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(vec![from.clone()]);
        }

        let mut queue = VecDeque::from([from.clone()]);
        let mut visited = HashSet::from([from.clone()]);
        let mut parent: HashMap<Square, Square> = HashMap::new();

        while let Some(current) = queue.pop_front() {
            if current == *to {
                let mut path = vec![current];
                while let Some(prev) = parent.get(path.last().expect("non-empty path")) {
                    path.push(prev.clone());
                }
                path.reverse();
                return Some(path);
            }
            for next in self.adjacent(&current) {
                if visited.contains(&next) {
                    continue;
                }
                if !can_jump && is_blocked(&next) {
                    continue;
                }
                visited.insert(next.clone());
                parent.insert(next.clone(), current.clone());
                queue.push_back(next);
            }
        }
        None
    }

    /// Minimum number of adjacency steps between two squares, ignoring
    /// blockers. `None` when the squares are not connected.
    pub fn distance(&self, from: &Square, to: &Square) -> Option<u32> {
        self.find_path(from, to, true, |_| false)
            .map(|path| path.len() as u32 - 1)
    }

    /// All squares reachable within `range` adjacency steps, excluding the
    /// origin. BFS frontier expansion.
    pub fn neighbors_in_range(&self, square: &Square, range: u32) -> Vec<Square> {
        let mut found: Vec<Square> = Vec::new();
        let mut seen = HashSet::from([square.clone()]);
        let mut frontier = vec![square.clone()];

        for _ in 0..range {
            let mut next_frontier = Vec::new();
            for sq in &frontier {
                for adj in self.adjacent(sq) {
                    if seen.insert(adj.clone()) {
                        found.push(adj.clone());
                        next_frontier.push(adj);
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_contains() {
        let topo = Topology::standard();
        assert!(topo.contains(&Square::alg(0, 0)));
        assert!(topo.contains(&Square::alg(7, 7)));
        assert!(!topo.contains(&Square::alg(8, 0)));
        assert!(!topo.contains(&Square::axial(0, 0)));
    }

    #[test]
    fn test_rectangular_corner_adjacency() {
        let topo = Topology::standard();
        assert_eq!(topo.adjacent(&Square::alg(0, 0)).len(), 3);
        assert_eq!(topo.adjacent(&Square::alg(4, 4)).len(), 8);
    }

    #[test]
    fn test_hex_adjacency() {
        let topo = Topology::Hex { radius: 2 };
        assert_eq!(topo.adjacent(&Square::axial(0, 0)).len(), 6);
        // Corner of the hexagon has fewer neighbors.
        assert_eq!(topo.adjacent(&Square::axial(2, 0)).len(), 3);
        assert!(!topo.contains(&Square::axial(2, 1)));
    }

    #[test]
    fn test_graph_adjacency_is_explicit() {
        let adjacency = BTreeMap::from([
            (Square::named("hub"), vec![Square::named("spoke")]),
            (Square::named("spoke"), vec![Square::named("hub")]),
        ]);
        let topo = Topology::Graph { adjacency };
        assert_eq!(topo.adjacent(&Square::named("hub")), vec![Square::named("spoke")]);
        assert!(topo.adjacent(&Square::named("lost")).is_empty());
    }

    #[test]
    fn test_find_path_routes_around_blockers() {
        let topo = Topology::standard();
        let blocked = Square::alg(1, 1);
        let path = topo
            .find_path(&Square::alg(0, 0), &Square::alg(2, 2), false, |sq| {
                *sq == blocked
            })
            .expect("path exists");
        assert_eq!(path.first(), Some(&Square::alg(0, 0)));
        assert_eq!(path.last(), Some(&Square::alg(2, 2)));
        assert!(!path.contains(&blocked));
    }

    #[test]
    fn test_find_path_jump_ignores_blockers() {
        let topo = Topology::standard();
        let path = topo
            .find_path(&Square::alg(0, 0), &Square::alg(2, 0), true, |_| true)
            .expect("jump path");
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_distance() {
        let topo = Topology::standard();
        assert_eq!(topo.distance(&Square::alg(0, 0), &Square::alg(3, 3)), Some(3));
        assert_eq!(topo.distance(&Square::alg(0, 0), &Square::alg(0, 0)), Some(0));
        assert_eq!(topo.distance(&Square::alg(0, 0), &Square::alg(9, 9)), None);
    }

    #[test]
    fn test_neighbors_in_range() {
        let topo = Topology::standard();
        let near = topo.neighbors_in_range(&Square::alg(0, 0), 1);
        assert_eq!(near.len(), 3);
        let wider = topo.neighbors_in_range(&Square::alg(4, 4), 2);
        assert_eq!(wider.len(), 24);
    }

    #[test]
    fn test_serde_shape() {
        let topo = Topology::Hex { radius: 3 };
        let json = serde_json::to_string(&topo).unwrap();
        assert_eq!(json, r#"{"kind":"hex","params":{"radius":3}}"#);
        let back: Topology = serde_json::from_str(&json).unwrap();
        assert_eq!(back, topo);
    }
}
