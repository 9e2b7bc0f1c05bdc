use crate::points::{CloudPoint, PointCloud};
use glam::Vec2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub point: CloudPoint,
    pub distance: f32,
}

#[derive(Clone, Copy, Debug)]
struct Node {
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    points: Vec<CloudPoint>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

// Max-heap entry: the worst candidate (farthest, then latest in the asset) sits on top.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    distance: f32,
    point: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.point.cmp(&other.point))
    }
}

#[inline]
fn axis_value(p: Vec2, axis: usize) -> f32 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

impl SpatialIndex {
    pub fn build(cloud: &PointCloud) -> Self {
        let points = cloud.points().to_vec();
        let mut index = Self {
            nodes: Vec::with_capacity(points.len()),
            points,
            root: None,
        };
        let mut order: Vec<usize> = (0..index.points.len()).collect();
        index.root = index.build_recursive(&mut order, 0);
        index
    }

    fn build_recursive(&mut self, order: &mut [usize], depth: usize) -> Option<usize> {
        if order.is_empty() {
            return None;
        }
        let axis = depth % 2;
        let points = &self.points;
        order.sort_by(|&a, &b| {
            axis_value(points[a].planar(), axis)
                .total_cmp(&axis_value(points[b].planar(), axis))
                .then(a.cmp(&b))
        });
        let median = order.len() / 2;
        let node_id = self.nodes.len();
        self.nodes.push(Node {
            point: order[median],
            axis,
            left: None,
            right: None,
        });
        let (left, rest) = order.split_at_mut(median);
        let left = self.build_recursive(left, depth + 1);
        let right = self.build_recursive(&mut rest[1..], depth + 1);
        self.nodes[node_id].left = left;
        self.nodes[node_id].right = right;
        Some(node_id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Up to `limit` points within `max_radius` of `query`, closest first.
    pub fn nearest(&self, query: Vec2, limit: usize, max_radius: f32) -> Vec<Neighbor> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if limit == 0 || max_radius.is_nan() || max_radius < 0.0 {
            return Vec::new();
        }
        let mut heap = BinaryHeap::with_capacity(limit.min(self.points.len()) + 1);
        self.search(root, query, limit, max_radius, &mut heap);
        heap.into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                point: self.points[c.point],
                distance: c.distance,
            })
            .collect()
    }

    fn search(
        &self,
        node_id: usize,
        query: Vec2,
        limit: usize,
        max_radius: f32,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = self.nodes[node_id];
        let pos = self.points[node.point].planar();
        let distance = pos.distance(query);
        if distance <= max_radius {
            let cand = Candidate {
                distance,
                point: node.point,
            };
            if heap.len() < limit {
                heap.push(cand);
            } else if heap.peek().is_some_and(|worst| cand < *worst) {
                heap.pop();
                heap.push(cand);
            }
        }

        let diff = axis_value(query, node.axis) - axis_value(pos, node.axis);
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        if let Some(n) = near {
            self.search(n, query, limit, max_radius, heap);
        }
        let plane = diff.abs();
        let worth_crossing = plane <= max_radius
            && (heap.len() < limit || heap.peek().is_some_and(|w| plane <= w.distance));
        if worth_crossing {
            if let Some(f) = far {
                self.search(f, query, limit, max_radius, heap);
            }
        }
    }
}
