use super::LayoutPartition;
use std::borrow::BorrowMut;

/// Arrange laid-out partitions left to right in rows, largest first.
///
/// A row ends once a partition's right edge passes
/// `sqrt(total nodes) * spacing`; the next row starts below the tallest
/// partition placed so far.
pub fn pack_partitions<P>(partitions: &mut [P], spacing: f64)
where
    P: BorrowMut<LayoutPartition>,
{
    let size = |p: &P| -> usize {
        let part: &LayoutPartition = p.borrow();
        part.node_count()
    };
    let total_nodes: usize = partitions.iter().map(size).sum();
    let row_limit = (total_nodes as f64).sqrt() * spacing;

    let mut order: Vec<usize> = (0..partitions.len()).collect();
    order.sort_by(|a, b| size(&partitions[*b]).cmp(&size(&partitions[*a])));

    let mut next_x = 0.0f64;
    let mut next_y = 0.0f64;
    let mut row_bottom = 0.0f64;
    for idx in order {
        let part: &mut LayoutPartition = partitions[idx].borrow_mut();
        let Some(before) = part.bounds() else {
            continue;
        };
        part.offset(next_x - before.min_x, next_y - before.min_y);
        let Some(after) = part.bounds() else {
            continue;
        };
        row_bottom = row_bottom.max(after.max_y);
        if after.max_x > row_limit {
            next_x = 0.0;
            next_y = row_bottom + spacing;
        } else {
            next_x = after.max_x + spacing;
        }
    }
}
