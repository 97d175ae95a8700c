use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use fdlayout::backend::{BackendConfig, BackendHandle, BackendKind, CpuBackend};
use fdlayout::layout::{LayoutError, TaskMonitor};
use fdlayout::{BackendError, BackendLoader, Config, Graph, PartitionOutcome, layout_graph, parse_graph};
use float_cmp::approx_eq;

struct SilentMonitor;

impl TaskMonitor for SilentMonitor {
    fn set_status(&self, _status: &str) {}
    fn set_percent(&self, _percent: Option<u8>) {}
    fn is_canceled(&self) -> bool {
        false
    }
    fn show_message(&self, _message: &str) {}
}

fn load_fixture(name: &str) -> Graph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    parse_graph(&input).expect("parse failed")
}

fn cpu_loader() -> BackendLoader {
    BackendLoader::preloaded(Arc::new(CpuBackend::new()) as BackendHandle)
}

fn positions(graph: &Graph) -> HashMap<String, (f64, f64)> {
    graph
        .nodes
        .iter()
        .map(|node| (node.id.clone(), (node.x, node.y)))
        .collect()
}

#[test]
fn lays_out_all_fixtures() {
    for name in ["path.json", "components.json", "selected.json", "locked.json5"] {
        let mut graph = load_fixture(name);
        let reports = layout_graph(&mut graph, &Config::default(), &cpu_loader(), &SilentMonitor);
        assert!(!reports.is_empty(), "{name}: no partitions");
        for report in &reports {
            assert!(
                report.outcome.is_placed(),
                "{name}: partition {} not placed: {:?}",
                report.number,
                report.outcome
            );
        }
        for node in &graph.nodes {
            assert!(node.x.is_finite() && node.y.is_finite(), "{name}: {} not finite", node.id);
        }
    }
}

#[test]
fn edges_are_long_enough_for_their_source_nodes() {
    for name in ["path.json", "components.json"] {
        let mut graph = load_fixture(name);
        layout_graph(&mut graph, &Config::default(), &cpu_loader(), &SilentMonitor);
        for edge in &graph.edges {
            let source = graph.node(&edge.source).expect("source exists");
            let target = graph.node(&edge.target).expect("target exists");
            let distance = ((source.x - target.x).powi(2) + (source.y - target.y).powi(2)).sqrt();
            let required = 2.0 * source.width.max(source.height);
            assert!(
                distance >= required - 1e-6,
                "{name}: {} -> {} is {distance}, needs {required}",
                edge.source,
                edge.target
            );
        }
    }
}

#[test]
fn components_are_numbered_and_packed_apart() {
    let mut graph = load_fixture("components.json");
    let reports = layout_graph(&mut graph, &Config::default(), &cpu_loader(), &SilentMonitor);
    let summary: Vec<(usize, usize, usize)> = reports
        .iter()
        .map(|report| (report.number, report.nodes, report.edges))
        .collect();
    assert_eq!(summary, vec![(1, 3, 3), (2, 4, 5), (3, 1, 0)]);

    let bounds = |prefix: &str| {
        graph
            .nodes
            .iter()
            .filter(|node| node.id.starts_with(prefix))
            .fold(
                (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
                |(x0, y0, x1, y1), node| (x0.min(node.x), y0.min(node.y), x1.max(node.x), y1.max(node.y)),
            )
    };
    let boxes = [bounds("t1-"), bounds("t2-"), bounds("solo")];
    for (i, a) in boxes.iter().enumerate() {
        for b in boxes.iter().skip(i + 1) {
            let disjoint = a.2 < b.0 || b.2 < a.0 || a.3 < b.1 || b.3 < a.1;
            assert!(disjoint, "partitions overlap: {a:?} and {b:?}");
        }
    }
    // the largest partition is packed at the origin
    assert_eq!((boxes[1].0, boxes[1].1), (0.0, 0.0));
}

#[test]
fn selected_only_moves_selection_around_its_centroid() {
    let mut graph = load_fixture("selected.json");
    let before = positions(&graph);
    let mut config = Config::default();
    config.placement.selected_only = true;

    let reports = layout_graph(&mut graph, &config, &cpu_loader(), &SilentMonitor);
    assert!(reports.iter().all(|report| report.outcome.is_placed()));

    let after = positions(&graph);
    assert_eq!(after["D"], before["D"]);
    assert_eq!(after["E"], before["E"]);

    let centroid = |pos: &HashMap<String, (f64, f64)>| {
        let ids = ["A", "B", "C"];
        let sum = ids
            .iter()
            .fold((0.0, 0.0), |(sx, sy), id| (sx + pos[*id].0, sy + pos[*id].1));
        (sum.0 / 3.0, sum.1 / 3.0)
    };
    let (bx, by) = centroid(&before);
    let (ax, ay) = centroid(&after);
    assert!(approx_eq!(f64, ax, bx, epsilon = 1e-6));
    assert!(approx_eq!(f64, ay, by, epsilon = 1e-6));
    assert_ne!(after["A"], before["A"]);
}

#[test]
fn locked_nodes_keep_their_position() {
    let mut graph = load_fixture("locked.json5");
    layout_graph(&mut graph, &Config::default(), &cpu_loader(), &SilentMonitor);
    let hub = graph.node("hub").expect("hub exists");
    assert_eq!((hub.x, hub.y), (250.0, 250.0));
    let spokes: Vec<(f64, f64)> = ["n1", "n2", "n3"]
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|node| (node.x, node.y))
        .collect();
    assert_eq!(spokes.len(), 3);
    assert!(spokes.iter().any(|&p| p != (0.0, 0.0)));
}

#[test]
fn unavailable_backend_leaves_graph_untouched() {
    let mut graph = load_fixture("components.json");
    let before = positions(&graph);
    let config = Config {
        backend: BackendConfig {
            kind: BackendKind::External,
            program: "fdlayout-missing-backend".to_string(),
            search_paths: Vec::new(),
            ..BackendConfig::default()
        },
        ..Config::default()
    };
    let loader = BackendLoader::new(config.backend.clone());

    let reports = layout_graph(&mut graph, &config, &loader, &SilentMonitor);
    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert!(matches!(
            report.outcome,
            PartitionOutcome::Abandoned(LayoutError::Backend(BackendError::Unavailable { .. }))
        ));
    }
    assert_eq!(positions(&graph), before);
}
