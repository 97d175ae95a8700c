use crate::ir::Graph;
use crate::layout::{PartitionOutcome, PartitionReport};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<NodeDump>,
    pub partitions: Vec<PartitionDump>,
}

/// `x` and `y` are the node's center, as in the graph document.
#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub locked: bool,
}

#[derive(Debug, Serialize)]
pub struct PartitionDump {
    pub number: usize,
    pub nodes: usize,
    pub edges: usize,
    pub status: String,
    pub scale: Option<f64>,
    pub error: Option<String>,
}

impl LayoutDump {
    pub fn from_layout(graph: &Graph, reports: &[PartitionReport]) -> Self {
        let nodes: Vec<NodeDump> = graph
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                locked: node.locked,
            })
            .collect();

        let width = nodes.iter().map(|n| n.x + n.width / 2.0).fold(0.0, f64::max);
        let height = nodes.iter().map(|n| n.y + n.height / 2.0).fold(0.0, f64::max);

        let partitions = reports
            .iter()
            .map(|report| {
                let (status, scale, error) = match &report.outcome {
                    PartitionOutcome::Placed { scale } => ("placed", Some(*scale), None),
                    PartitionOutcome::Empty => ("empty", None, None),
                    PartitionOutcome::Canceled => ("canceled", None, None),
                    PartitionOutcome::Abandoned(err) => ("abandoned", None, Some(err.to_string())),
                };
                PartitionDump {
                    number: report.number,
                    nodes: report.nodes,
                    edges: report.edges,
                    status: status.to_string(),
                    scale,
                    error,
                }
            })
            .collect();

        LayoutDump {
            width,
            height,
            nodes,
            partitions,
        }
    }
}

pub fn write_layout_dump(
    output: Option<&Path>,
    graph: &Graph,
    reports: &[PartitionReport],
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(graph, reports);
    match output {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &dump)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}
