use super::{BackendError, LayoutBackend};
use crate::layout::{AdjacencyEncoding, LayoutParameters, Point, RawCoordinates};
use std::f64::consts::PI;

const NAME: &str = "cpu";
const COOLING: f64 = 0.95;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
// Matching that removes fewer nodes than this fraction stops coarsening.
const MIN_REDUCTION: f64 = 0.1;

/// Multilevel spring-electrical solver running on the CPU.
///
/// The graph is coarsened by neighbor matching until it has at most
/// `coarse_graph_size` nodes. The coarsest level starts on a circle and runs
/// `initial_iterations`; every finer level inherits its parent's positions
/// and runs `interpolation_iterations`, starting at a temperature of
/// `edge_len * level_convergence`. The result is fitted into the canvas.
#[derive(Debug, Default, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutBackend for CpuBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn is_reentrant(&self) -> bool {
        true
    }

    fn compute(
        &self,
        adjacency: &AdjacencyEncoding,
        params: &LayoutParameters,
    ) -> Result<RawCoordinates, BackendError> {
        let fine = Level::from_encoding(adjacency)?;
        let n = fine.len();
        if n == 0 {
            return Ok(RawCoordinates::default());
        }
        let k = if params.edge_len > 0.0 { params.edge_len } else { 1.0 };
        let coarse_limit = params.coarse_graph_size.max(1) as usize;

        let mut levels = vec![fine];
        let mut mappings: Vec<Vec<usize>> = Vec::new();
        while let Some(last) = levels.last() {
            if last.len() <= coarse_limit {
                break;
            }
            let Some((coarse, mapping)) = last.coarsen() else {
                break;
            };
            levels.push(coarse);
            mappings.push(mapping);
        }
        tracing::trace!(nodes = n, levels = levels.len(), "cpu backend hierarchy built");

        let coarsest = &levels[levels.len() - 1];
        let mut positions = circle_start(coarsest.len(), k, params);
        // a single step never exceeds the ideal edge length
        let start_temp = k;
        coarsest.relax(
            &mut positions,
            params.initial_iterations.max(0) as usize,
            start_temp,
            k,
        );

        let refine_temp = k * params.level_convergence.max(1) as f64;
        for depth in (0..mappings.len()).rev() {
            let mapping = &mappings[depth];
            positions = mapping
                .iter()
                .enumerate()
                .map(|(idx, &parent)| {
                    let angle = idx as f64 * GOLDEN_ANGLE;
                    let base = positions[parent];
                    Point::new(
                        base.x + 0.25 * k * angle.cos(),
                        base.y + 0.25 * k * angle.sin(),
                    )
                })
                .collect();
            levels[depth].relax(
                &mut positions,
                params.interpolation_iterations.max(0) as usize,
                refine_temp,
                k,
            );
        }

        fit_to_canvas(&mut positions, params);
        Ok(RawCoordinates::new(positions))
    }
}

/// One level of the hierarchy: weighted, deduplicated adjacency without
/// self loops.
struct Level {
    neighbors: Vec<Vec<(usize, f64)>>,
}

impl Level {
    fn from_encoding(adjacency: &AdjacencyEncoding) -> Result<Self, BackendError> {
        let index = &adjacency.index;
        if index.is_empty() || index[0] != 0 {
            return Err(BackendError::failure(NAME, "adjacency index must start at 0"));
        }
        if index.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(BackendError::failure(NAME, "adjacency index is not monotonic"));
        }
        if index[index.len() - 1] as usize != adjacency.values.len() {
            return Err(BackendError::failure(
                NAME,
                "adjacency index does not end at the value count",
            ));
        }
        let n = adjacency.node_count();
        let mut raw: Vec<Vec<usize>> = Vec::with_capacity(n);
        for node in 0..n {
            let mut list = Vec::new();
            for &value in adjacency.neighbors(node) {
                if value < 0 || value as usize >= n {
                    return Err(BackendError::failure(
                        NAME,
                        format!("neighbor {value} of node {node} is out of range"),
                    ));
                }
                list.push(value as usize);
            }
            raw.push(list);
        }
        Ok(Self::from_lists(raw.into_iter().enumerate().map(|(node, list)| {
            list.into_iter()
                .filter(move |&other| other != node)
                .map(|other| (other, 1.0))
                .collect::<Vec<_>>()
        })))
    }

    fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = Vec<(usize, f64)>>,
    {
        let neighbors = lists
            .into_iter()
            .map(|mut list| {
                list.sort_by_key(|(other, _)| *other);
                let mut merged: Vec<(usize, f64)> = Vec::with_capacity(list.len());
                for (other, weight) in list {
                    match merged.last_mut() {
                        Some((last, total)) if *last == other => *total += weight,
                        _ => merged.push((other, weight)),
                    }
                }
                merged
            })
            .collect();
        Self { neighbors }
    }

    fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Greedy heaviest-neighbor matching. Returns the coarse level and the
    /// fine-to-coarse node map, or `None` when matching barely shrinks the
    /// graph.
    fn coarsen(&self) -> Option<(Level, Vec<usize>)> {
        let n = self.len();
        let mut mapping = vec![usize::MAX; n];
        let mut next = 0usize;
        for node in 0..n {
            if mapping[node] != usize::MAX {
                continue;
            }
            let partner = self.neighbors[node]
                .iter()
                .filter(|(other, _)| mapping[*other] == usize::MAX)
                .fold(None, |best: Option<(usize, f64)>, &(other, weight)| match best {
                    Some((_, best_weight)) if best_weight >= weight => best,
                    _ => Some((other, weight)),
                });
            mapping[node] = next;
            if let Some((other, _)) = partner {
                mapping[other] = next;
            }
            next += 1;
        }
        if (n - next) as f64 <= n as f64 * MIN_REDUCTION {
            return None;
        }

        let mut lists: Vec<Vec<(usize, f64)>> = vec![Vec::new(); next];
        for (node, list) in self.neighbors.iter().enumerate() {
            let from = mapping[node];
            for &(other, weight) in list {
                let to = mapping[other];
                if from != to {
                    lists[from].push((to, weight));
                }
            }
        }
        Some((Level::from_lists(lists), mapping))
    }

    /// Fruchterman-Reingold iterations with geometric cooling.
    fn relax(&self, positions: &mut [Point], iterations: usize, start_temp: f64, k: f64) {
        let n = self.len();
        let min_dist = 0.01 * k;
        let mut temperature = start_temp;
        let mut forces = vec![Point::default(); n];
        for _ in 0..iterations {
            forces.iter_mut().for_each(|f| *f = Point::default());

            for i in 0..n {
                for j in (i + 1)..n {
                    let (ux, uy, dist) = direction(positions[i], positions[j], i, j, min_dist);
                    let repulsion = k * k / dist;
                    let fx = ux * repulsion;
                    let fy = uy * repulsion;
                    forces[i].x -= fx;
                    forces[i].y -= fy;
                    forces[j].x += fx;
                    forces[j].y += fy;
                }
            }

            for (i, list) in self.neighbors.iter().enumerate() {
                for &(j, weight) in list {
                    if j <= i {
                        continue;
                    }
                    let (ux, uy, dist) = direction(positions[i], positions[j], i, j, min_dist);
                    let attraction = weight * dist * dist / k;
                    let fx = ux * attraction;
                    let fy = uy * attraction;
                    forces[i].x += fx;
                    forces[i].y += fy;
                    forces[j].x -= fx;
                    forces[j].y -= fy;
                }
            }

            for (pos, force) in positions.iter_mut().zip(&forces) {
                let magnitude = (force.x * force.x + force.y * force.y).sqrt();
                if magnitude <= f64::EPSILON {
                    continue;
                }
                let step = magnitude.min(temperature);
                pos.x += force.x / magnitude * step;
                pos.y += force.y / magnitude * step;
            }
            temperature *= COOLING;
        }
    }
}

/// Unit vector from `a` to `b` and their distance, clamped to `min_dist`.
/// Pairs closer than `min_dist` get a fixed direction derived from their
/// indices so coincident nodes still push apart.
fn direction(a: Point, b: Point, i: usize, j: usize, min_dist: f64) -> (f64, f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist >= min_dist {
        return (dx / dist, dy / dist, dist);
    }
    let angle = (j - i) as f64 * GOLDEN_ANGLE + i as f64;
    (angle.cos(), angle.sin(), min_dist)
}

fn circle_start(n: usize, k: f64, params: &LayoutParameters) -> Vec<Point> {
    let center = Point::new(params.canvas_width / 2.0, params.canvas_height / 2.0);
    if n == 1 {
        return vec![center];
    }
    let radius = k * (n as f64).sqrt();
    (0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / n as f64;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// Shrink (never grow) the layout to fit the canvas and center it there.
fn fit_to_canvas(positions: &mut [Point], params: &LayoutParameters) {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in positions.iter() {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let width = max_x - min_x;
    let height = max_y - min_y;
    let mut scale = 1.0f64;
    if params.canvas_width > 0.0 && width > params.canvas_width {
        scale = scale.min(params.canvas_width / width);
    }
    if params.canvas_height > 0.0 && height > params.canvas_height {
        scale = scale.min(params.canvas_height / height);
    }
    let offset_x = (params.canvas_width - width * scale) / 2.0;
    let offset_y = (params.canvas_height - height * scale) / 2.0;
    for p in positions.iter_mut() {
        p.x = (p.x - min_x) * scale + offset_x;
        p.y = (p.y - min_y) * scale + offset_y;
    }
}
