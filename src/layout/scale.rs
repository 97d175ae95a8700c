use super::{LayoutError, LayoutPartition, PlacementFault, RawCoordinates};
use serde::{Deserialize, Serialize};

/// How the separation an edge needs is derived from its endpoints' sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlapMetric {
    /// Twice the source node's larger extent, for both endpoints. Matches the
    /// layouts produced by the GPU plugin this tool replaces.
    #[default]
    SourceOnly,
    /// Source extent plus target extent.
    SourceAndTarget,
}

/// Smallest uniform scale that keeps every edge's endpoints at least their
/// required size apart. Never below 1.0.
pub fn compute_scale(
    partition: &LayoutPartition,
    coords: &RawCoordinates,
    metric: OverlapMetric,
) -> f64 {
    let mut up_ratio = 0.0f64;
    for edge in partition.edges() {
        let source = partition.node(edge.source);
        let target = partition.node(edge.target);
        let required = match metric {
            OverlapMetric::SourceOnly => source.size() + source.size(),
            OverlapMetric::SourceAndTarget => source.size() + target.size(),
        };
        let actual = coords.points[edge.source].distance(&coords.points[edge.target]);
        if actual > 0.0 {
            // overflowing ratios saturate; settle() reduces the scale from there
            let ratio = (required / actual).min(f64::MAX);
            if ratio > up_ratio {
                up_ratio = ratio;
            }
        }
    }
    if up_ratio < 1.0 {
        up_ratio = 1.0;
    }
    up_ratio
}

/// Run `place` at `initial`, dividing the scale by ten after every fault.
///
/// Returns the scale that placed successfully, or `ScaleExhausted` once the
/// scale drops to zero.
pub fn settle<F>(initial: f64, mut place: F) -> Result<f64, LayoutError>
where
    F: FnMut(f64) -> Result<(), PlacementFault>,
{
    let mut scale = initial;
    let mut attempts = 0usize;
    while scale > 0.0 && scale.is_finite() {
        attempts += 1;
        match place(scale) {
            Ok(()) => return Ok(scale),
            Err(fault) => {
                scale /= 10.0;
                tracing::warn!(%fault, next_scale = scale, "placement failed, reducing scale");
            }
        }
    }
    Err(LayoutError::ScaleExhausted { attempts })
}
