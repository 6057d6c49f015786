//! 2D k-d tree for nearest-neighbor separation queries.
//!
//! The non-overlap coordinate sampler needs, for every point in a pool, the
//! distance to its nearest *other* point. The tree is built once per
//! rejection round (median split, balanced) and queried once per point.

/// A 2D k-d tree over a fixed point set.
#[derive(Debug)]
pub struct KdTree2 {
    nodes: Vec<KdNode>,
    points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
struct KdNode {
    point_idx: usize,
    left: Option<usize>,
    right: Option<usize>,
    /// 0 = x, 1 = y
    split_dim: usize,
}

impl KdTree2 {
    /// Build a balanced tree from a point set. Returns `None` when the set
    /// is empty.
    pub fn build(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let points_vec = points.to_vec();
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        Self::build_recursive(&points_vec, &mut indices, 0, &mut nodes);

        Some(Self {
            nodes,
            points: points_vec,
        })
    }

    fn build_recursive(
        points: &[(f64, f64)],
        indices: &mut [usize],
        depth: usize,
        nodes: &mut Vec<KdNode>,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let split_dim = depth % 2;
        indices.sort_by(|&a, &b| {
            let va = axis_value(points[a], split_dim);
            let vb = axis_value(points[b], split_dim);
            va.partial_cmp(&vb).expect("coordinates are finite")
        });

        let median = indices.len() / 2;
        let node_idx = nodes.len();
        nodes.push(KdNode {
            point_idx: indices[median],
            left: None,
            right: None,
            split_dim,
        });

        let (left_indices, right_part) = indices.split_at_mut(median);
        let right_indices = &mut right_part[1..];

        let left = Self::build_recursive(points, left_indices, depth + 1, nodes);
        let right = Self::build_recursive(points, right_indices, depth + 1, nodes);
        nodes[node_idx].left = left;
        nodes[node_idx].right = right;

        Some(node_idx)
    }

    /// Number of points in the tree.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Euclidean distance from the point at `query_idx` to its nearest other
    /// point. Returns `None` when the tree holds a single point.
    pub fn nearest_other_distance(&self, query_idx: usize) -> Option<f64> {
        if self.points.len() < 2 {
            return None;
        }
        let query = self.points[query_idx];
        let mut best = f64::INFINITY;
        self.nearest_recursive(0, query, query_idx, &mut best);
        Some(best.sqrt())
    }

    /// Nearest-other distance for every point, in point order.
    pub fn nearest_other_distances(&self) -> Vec<f64> {
        (0..self.points.len())
            .map(|idx| self.nearest_other_distance(idx).unwrap_or(f64::INFINITY))
            .collect()
    }

    fn nearest_recursive(
        &self,
        node_idx: usize,
        query: (f64, f64),
        exclude_idx: usize,
        best_sq: &mut f64,
    ) {
        let node = &self.nodes[node_idx];
        let point = self.points[node.point_idx];

        if node.point_idx != exclude_idx {
            let dist_sq = distance_squared(query, point);
            if dist_sq < *best_sq {
                *best_sq = dist_sq;
            }
        }

        let diff = axis_value(query, node.split_dim) - axis_value(point, node.split_dim);
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near_idx) = near {
            self.nearest_recursive(near_idx, query, exclude_idx, best_sq);
        }
        // The far subtree can only help if the splitting plane is closer
        // than the best match so far.
        if let Some(far_idx) = far {
            if diff * diff < *best_sq {
                self.nearest_recursive(far_idx, query, exclude_idx, best_sq);
            }
        }
    }
}

#[inline]
fn axis_value(point: (f64, f64), dim: usize) -> f64 {
    if dim == 0 {
        point.0
    } else {
        point.1
    }
}

#[inline]
fn distance_squared(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force_nearest_other(points: &[(f64, f64)], idx: usize) -> f64 {
        points
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != idx)
            .map(|(_, &p)| distance_squared(points[idx], p).sqrt())
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_empty_and_singleton() {
        assert!(KdTree2::build(&[]).is_none());

        let tree = KdTree2::build(&[(1.0, 2.0)]).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.nearest_other_distance(0).is_none());
    }

    #[test]
    fn test_nearest_other_simple() {
        let points = [(0.0, 0.0), (3.0, 4.0), (10.0, 10.0)];
        let tree = KdTree2::build(&points).unwrap();
        assert_relative_eq!(tree.nearest_other_distance(0).unwrap(), 5.0);
        assert_relative_eq!(tree.nearest_other_distance(1).unwrap(), 5.0);
    }

    #[test]
    fn test_coincident_points_have_zero_distance() {
        let points = [(2.0, 2.0), (2.0, 2.0), (9.0, 9.0)];
        let tree = KdTree2::build(&points).unwrap();
        assert_relative_eq!(tree.nearest_other_distance(0).unwrap(), 0.0);
        assert_relative_eq!(tree.nearest_other_distance(1).unwrap(), 0.0);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(99);
        let points: Vec<(f64, f64)> = (0..200)
            .map(|_| (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
            .collect();

        let tree = KdTree2::build(&points).unwrap();
        let distances = tree.nearest_other_distances();
        for (idx, &dist) in distances.iter().enumerate() {
            let expected = brute_force_nearest_other(&points, idx);
            assert_relative_eq!(dist, expected, epsilon = 1e-12);
        }
    }
}
