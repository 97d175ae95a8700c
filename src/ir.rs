use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::layout::{LayoutEdge, LayoutNode, LayoutPartition};

const DEFAULT_NODE_SIZE: f64 = 40.0;

fn default_node_size() -> f64 {
    DEFAULT_NODE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_node_size")]
    pub width: f64,
    #[serde(default = "default_node_size")]
    pub height: f64,
    /// Center of the node.
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// A graph document: nodes in document order plus undirected edges by node id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &str, width: f64, height: f64) -> &mut Node {
        self.nodes.push(Node {
            id: id.to_string(),
            label: None,
            width,
            height,
            x: 0.0,
            y: 0.0,
            locked: false,
            selected: false,
        });
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.edges.push(Edge {
            source: source.to_string(),
            target: target.to_string(),
        });
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn index_by_id(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.as_str(), idx))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let index = self.index_by_id();
        if index.len() != self.nodes.len() {
            return Err(anyhow::anyhow!("Graph contains duplicate node ids"));
        }
        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !index.contains_key(endpoint.as_str()) {
                    return Err(anyhow::anyhow!(
                        "Edge {} -> {} references unknown node {}",
                        edge.source,
                        edge.target,
                        endpoint
                    ));
                }
            }
        }
        Ok(())
    }

    /// Split the graph into connected components.
    ///
    /// Nodes keep document order inside each partition and partitions are
    /// numbered from 1 in order of their first node. With `selected_only`,
    /// unselected nodes stay in their partitions but are locked.
    pub fn partitions(&self, selected_only: bool) -> Vec<LayoutPartition> {
        let index = self.index_by_id();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        let mut endpoints = Vec::with_capacity(self.edges.len());
        for edge in &self.edges {
            let (Some(&source), Some(&target)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            adjacency[source].push(target);
            adjacency[target].push(source);
            endpoints.push((source, target));
        }

        let mut component = vec![usize::MAX; self.nodes.len()];
        let mut members: Vec<Vec<usize>> = Vec::new();
        for start in 0..self.nodes.len() {
            if component[start] != usize::MAX {
                continue;
            }
            let id = members.len();
            let mut found = Vec::new();
            let mut queue = VecDeque::from([start]);
            component[start] = id;
            while let Some(current) = queue.pop_front() {
                found.push(current);
                for &next in &adjacency[current] {
                    if component[next] == usize::MAX {
                        component[next] = id;
                        queue.push_back(next);
                    }
                }
            }
            found.sort_unstable();
            members.push(found);
        }

        let mut local = vec![0usize; self.nodes.len()];
        let mut partitions: Vec<LayoutPartition> = members
            .iter()
            .enumerate()
            .map(|(number, nodes)| {
                let layout_nodes = nodes
                    .iter()
                    .enumerate()
                    .map(|(position, &graph_idx)| {
                        local[graph_idx] = position;
                        let node = &self.nodes[graph_idx];
                        LayoutNode {
                            id: node.id.clone(),
                            width: node.width,
                            height: node.height,
                            x: node.x,
                            y: node.y,
                            locked: node.locked || (selected_only && !node.selected),
                        }
                    })
                    .collect();
                LayoutPartition::new(number + 1, layout_nodes, Vec::new())
            })
            .collect();

        for (source, target) in endpoints {
            let part = &mut partitions[component[source]];
            part.push_edge(LayoutEdge {
                source: local[source],
                target: local[target],
            });
        }
        partitions
    }

    /// Write partition positions back onto the document nodes by id.
    pub fn apply(&mut self, partitions: &[LayoutPartition]) {
        let index: HashMap<String, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.clone(), idx))
            .collect();
        for part in partitions {
            for node in part.nodes() {
                if let Some(&idx) = index.get(&node.id) {
                    self.nodes[idx].x = node.x;
                    self.nodes[idx].y = node.y;
                }
            }
        }
    }
}

pub fn parse_graph(input: &str) -> Result<Graph> {
    let graph = match serde_json::from_str::<Graph>(input) {
        Ok(graph) => graph,
        Err(json_err) => json5::from_str::<Graph>(input)
            .map_err(|_| anyhow::anyhow!("Invalid graph document: {json_err}"))?,
    };
    graph.validate()?;
    Ok(graph)
}
