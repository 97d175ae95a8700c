use super::{LayoutPartition, Point, RawCoordinates};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("node {node} lands on a non-finite position at scale {scale}")]
pub struct PlacementFault {
    pub scale: f64,
    pub node: usize,
}

/// Scale raw coordinates onto the partition with the bounding box pinned to
/// the origin.
///
/// Every target position is computed and checked before the first commit, so
/// a fault leaves the partition untouched. With `anchor` set (selected-only
/// layout) the movable nodes are shifted afterwards so their centroid returns
/// to `anchor`.
pub fn place(
    partition: &mut LayoutPartition,
    coords: &RawCoordinates,
    scale: f64,
    anchor: Option<Point>,
) -> Result<(), PlacementFault> {
    if partition.node_count() == 0 {
        return Ok(());
    }
    let raw = &coords.points[..partition.node_count()];
    let min_x = scale * raw.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = scale * raw.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

    let mut targets = Vec::with_capacity(raw.len());
    for (node, p) in raw.iter().enumerate() {
        let target = Point::new(scale * p.x - min_x, scale * p.y - min_y);
        if !target.is_finite() {
            return Err(PlacementFault { scale, node });
        }
        targets.push(target);
    }

    for (position, target) in targets.iter().enumerate() {
        partition.move_node_to_location(position, target.x, target.y);
    }

    if let Some(initial) = anchor {
        if let Some(current) = partition.average_location() {
            let dx = current.x - initial.x;
            let dy = current.y - initial.y;
            partition.offset(-dx, -dy);
        }
    }
    Ok(())
}
