use super::Point;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub locked: bool,
}

impl LayoutNode {
    pub fn new(id: &str, width: f64, height: f64) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            x: 0.0,
            y: 0.0,
            locked: false,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Larger of the node's two extents.
    pub fn size(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// Undirected edge between two node positions of the same partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEdge {
    pub source: usize,
    pub target: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// One independently laid-out group of nodes.
///
/// Node order is the canonical order used by the adjacency encoding and by
/// the backend's output rows. Locked nodes ignore position updates.
#[derive(Debug, Clone)]
pub struct LayoutPartition {
    number: usize,
    nodes: Vec<LayoutNode>,
    edges: Vec<LayoutEdge>,
    neighbors: Vec<Vec<usize>>,
}

impl LayoutPartition {
    pub fn new(number: usize, nodes: Vec<LayoutNode>, edges: Vec<LayoutEdge>) -> Self {
        let mut part = Self {
            number,
            neighbors: vec![Vec::new(); nodes.len()],
            nodes,
            edges: Vec::with_capacity(edges.len()),
        };
        for edge in edges {
            part.push_edge(edge);
        }
        part
    }

    pub fn push_edge(&mut self, edge: LayoutEdge) {
        self.neighbors[edge.source].push(edge.target);
        self.neighbors[edge.target].push(edge.source);
        self.edges.push(edge);
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn node(&self, position: usize) -> &LayoutNode {
        &self.nodes[position]
    }

    pub fn edges(&self) -> &[LayoutEdge] {
        &self.edges
    }

    /// Neighbor positions of `position`, in edge insertion order.
    pub fn neighbors(&self, position: usize) -> &[usize] {
        &self.neighbors[position]
    }

    pub fn locked_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.locked).count()
    }

    /// Commit a new position for a node. Locked nodes keep theirs.
    pub fn move_node_to_location(&mut self, position: usize, x: f64, y: f64) {
        let node = &mut self.nodes[position];
        if node.locked {
            return;
        }
        node.x = x;
        node.y = y;
    }

    /// Centroid of the movable nodes, or `None` when every node is locked.
    pub fn average_location(&self) -> Option<Point> {
        let movable = self.nodes.iter().filter(|n| !n.locked);
        let (count, sum_x, sum_y) = movable.fold((0usize, 0.0, 0.0), |(c, sx, sy), n| {
            (c + 1, sx + n.x, sy + n.y)
        });
        (count > 0).then(|| Point::new(sum_x / count as f64, sum_y / count as f64))
    }

    /// Bounding box of the movable nodes, or `None` when every node is locked.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut movable = self.nodes.iter().filter(|n| !n.locked);
        let first = movable.next()?;
        let init = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(movable.fold(init, |b, n| Bounds {
            min_x: b.min_x.min(n.x),
            min_y: b.min_y.min(n.y),
            max_x: b.max_x.max(n.x),
            max_y: b.max_y.max(n.y),
        }))
    }

    /// Shift every movable node by `(dx, dy)`.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        for position in 0..self.nodes.len() {
            let (x, y) = (self.nodes[position].x + dx, self.nodes[position].y + dy);
            self.move_node_to_location(position, x, y);
        }
    }
}
