use super::{AdjacencyEncoding, LayoutPartition};

/// Build the compressed adjacency of a partition.
///
/// Node `i`'s neighbors occupy `values[index[i]..index[i + 1]]` in insertion
/// order. Parallel edges are kept, so a duplicated edge shows up twice.
pub fn encode(partition: &LayoutPartition) -> AdjacencyEncoding {
    let node_count = partition.node_count();
    let mut index = vec![0i32; node_count + 1];
    let mut values = Vec::with_capacity(2 * partition.edge_count());

    for position in 0..node_count {
        index[position] = values.len() as i32;
        values.extend(partition.neighbors(position).iter().map(|&n| n as i32));
    }
    index[node_count] = values.len() as i32;

    AdjacencyEncoding { index, values }
}
