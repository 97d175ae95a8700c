use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Numeric configuration handed verbatim to the layout backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutParameters {
    pub coarse_graph_size: i32,
    pub interpolation_iterations: i32,
    pub level_convergence: i32,
    pub edge_len: f64,
    pub initial_iterations: i32,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl Default for LayoutParameters {
    fn default() -> Self {
        Self {
            coarse_graph_size: 50,
            interpolation_iterations: 50,
            level_convergence: 2,
            edge_len: 5.0,
            initial_iterations: 300,
            canvas_width: 1000.0,
            canvas_height: 1000.0,
        }
    }
}

/// Compressed adjacency of one partition.
///
/// `index[i]..index[i + 1]` is the slice of `values` holding the neighbor
/// positions of node `i`. Every undirected edge appears once per direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdjacencyEncoding {
    pub index: Vec<i32>,
    pub values: Vec<i32>,
}

impl AdjacencyEncoding {
    pub fn node_count(&self) -> usize {
        self.index.len().saturating_sub(1)
    }

    pub fn neighbors(&self, node: usize) -> &[i32] {
        let start = self.index[node] as usize;
        let end = self.index[node + 1] as usize;
        &self.values[start..end]
    }
}

/// Backend output: one point per node, in encoding order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawCoordinates {
    pub points: Vec<Point>,
}

impl RawCoordinates {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn from_rows(rows: &[[f64; 2]]) -> Self {
        Self {
            points: rows.iter().map(|[x, y]| Point::new(*x, *y)).collect(),
        }
    }
}
