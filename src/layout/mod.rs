mod encode;
mod error;
mod monitor;
mod pack;
mod partition;
mod place;
mod scale;
pub(crate) mod types;
pub use encode::encode;
pub use error::LayoutError;
pub use monitor::{CancelFlag, LogMonitor, TaskMonitor};
pub use pack::pack_partitions;
pub use partition::{Bounds, LayoutEdge, LayoutNode, LayoutPartition};
pub use place::{PlacementFault, place};
pub use scale::{OverlapMetric, compute_scale, settle};
pub use types::*;

use crate::backend::{BackendLoader, validate_output};
use crate::config::{Config, PlacementConfig};
use crate::ir::Graph;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What happened to one partition.
#[derive(Debug, Clone)]
pub enum PartitionOutcome {
    /// Positions were committed at this scale factor.
    Placed { scale: f64 },
    /// Nothing to lay out.
    Empty,
    /// Cancellation was observed at a stage boundary.
    Canceled,
    /// The partition was left untouched after a terminal error.
    Abandoned(LayoutError),
}

impl PartitionOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, PartitionOutcome::Placed { .. })
    }
}

/// Runs encode, backend, scale and place for each partition.
pub struct LayoutDriver<'a> {
    backend: &'a BackendLoader,
    params: &'a LayoutParameters,
    placement: &'a PlacementConfig,
    monitor: &'a dyn TaskMonitor,
}

impl<'a> LayoutDriver<'a> {
    pub fn new(
        backend: &'a BackendLoader,
        params: &'a LayoutParameters,
        placement: &'a PlacementConfig,
        monitor: &'a dyn TaskMonitor,
    ) -> Self {
        Self {
            backend,
            params,
            placement,
            monitor,
        }
    }

    /// Lay out one partition in place. Failures are shown to the user
    /// through the monitor and leave the partition's positions unchanged.
    pub fn layout_partition(&self, partition: &mut LayoutPartition) -> PartitionOutcome {
        match self.run(partition) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(partition = partition.number(), %err, "partition abandoned");
                self.monitor.show_message(&err.diagnostic(partition.number()));
                PartitionOutcome::Abandoned(err)
            }
        }
    }

    fn run(&self, partition: &mut LayoutPartition) -> Result<PartitionOutcome, LayoutError> {
        if self.monitor.is_canceled() {
            return Ok(PartitionOutcome::Canceled);
        }
        let number = partition.number();
        self.monitor
            .set_status(&format!("Initializing: Partition: {number}"));
        self.monitor.set_percent(None);
        if partition.node_count() == 0 {
            return Ok(PartitionOutcome::Empty);
        }

        let anchor = if self.placement.selected_only {
            partition.average_location()
        } else {
            None
        };
        let encoding = encode(partition);
        tracing::debug!(
            partition = number,
            nodes = partition.node_count(),
            edges = partition.edge_count(),
            "partition encoded"
        );
        if self.monitor.is_canceled() {
            return Ok(PartitionOutcome::Canceled);
        }

        let backend = self.backend.acquire()?;
        if self.monitor.is_canceled() {
            return Ok(PartitionOutcome::Canceled);
        }

        self.monitor
            .set_status(&format!("Calling layout backend: Partition: {number}"));
        let coords = backend.compute(&encoding, self.params)?;
        validate_output(backend.name(), &coords, partition.node_count())?;
        if self.monitor.is_canceled() {
            return Ok(PartitionOutcome::Canceled);
        }

        let up_ratio = compute_scale(partition, &coords, self.placement.overlap_metric);
        tracing::debug!(partition = number, up_ratio, "initial scale");
        let scale = settle(up_ratio, |scale| place(partition, &coords, scale, anchor))?;
        if scale != up_ratio {
            tracing::info!(partition = number, initial = up_ratio, scale, "scale reduced");
        }
        Ok(PartitionOutcome::Placed { scale })
    }

    /// Lay out every partition. Runs in parallel when enabled and the
    /// backend is reentrant.
    pub fn layout_all(&self, partitions: &mut [LayoutPartition]) -> Vec<PartitionOutcome> {
        let reentrant = self
            .backend
            .acquire()
            .map(|backend| backend.is_reentrant())
            .unwrap_or(false);
        let total = partitions.len().max(1);
        let finished = AtomicUsize::new(0);
        let step = |partition: &mut LayoutPartition| {
            let outcome = self.layout_partition(partition);
            let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
            self.monitor.set_percent(Some((done * 100 / total) as u8));
            outcome
        };
        if self.placement.parallel && reentrant {
            partitions.par_iter_mut().map(step).collect()
        } else {
            partitions.iter_mut().map(step).collect()
        }
    }
}

/// Per-partition result of a whole-graph layout.
#[derive(Debug, Clone)]
pub struct PartitionReport {
    pub number: usize,
    pub nodes: usize,
    pub edges: usize,
    pub outcome: PartitionOutcome,
}

/// Partition `graph`, lay out each partition, pack them and write the
/// positions back.
pub fn layout_graph(
    graph: &mut Graph,
    config: &Config,
    backend: &BackendLoader,
    monitor: &dyn TaskMonitor,
) -> Vec<PartitionReport> {
    let mut partitions = graph.partitions(config.placement.selected_only);
    let driver = LayoutDriver::new(backend, &config.layout, &config.placement, monitor);
    let outcomes = driver.layout_all(&mut partitions);

    if config.packing.enabled && !config.placement.selected_only && !monitor.is_canceled() {
        // abandoned partitions keep their positions
        let mut placed: Vec<&mut LayoutPartition> = partitions
            .iter_mut()
            .zip(&outcomes)
            .filter(|(_, outcome)| outcome.is_placed())
            .map(|(partition, _)| partition)
            .collect();
        pack_partitions(&mut placed, config.packing.spacing);
    }
    graph.apply(&partitions);

    partitions
        .iter()
        .zip(outcomes)
        .map(|(partition, outcome)| PartitionReport {
            number: partition.number(),
            nodes: partition.node_count(),
            edges: partition.edge_count(),
            outcome,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BackendHandle, CpuBackend, LayoutBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingMonitor {
        statuses: Mutex<Vec<String>>,
        messages: Mutex<Vec<String>>,
        percents: Mutex<Vec<u8>>,
        cancel: CancelFlag,
        cancel_after_status: Option<usize>,
    }

    impl TaskMonitor for RecordingMonitor {
        fn set_status(&self, status: &str) {
            let mut statuses = self.statuses.lock().unwrap();
            statuses.push(status.to_string());
            if Some(statuses.len()) == self.cancel_after_status {
                self.cancel.cancel();
            }
        }

        fn set_percent(&self, percent: Option<u8>) {
            if let Some(p) = percent {
                self.percents.lock().unwrap().push(p);
            }
        }

        fn is_canceled(&self) -> bool {
            self.cancel.is_set()
        }

        fn show_message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    /// Returns fixed coordinates and counts calls.
    struct FixedBackend {
        points: Vec<Point>,
        calls: AtomicUsize,
    }

    impl LayoutBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn compute(
            &self,
            _adjacency: &AdjacencyEncoding,
            _params: &LayoutParameters,
        ) -> Result<RawCoordinates, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawCoordinates::new(self.points.clone()))
        }
    }

    fn fixed(points: &[(f64, f64)]) -> Arc<FixedBackend> {
        Arc::new(FixedBackend {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn triangle() -> LayoutPartition {
        LayoutPartition::new(
            1,
            vec![
                LayoutNode::new("A", 10.0, 10.0).at(5.0, 5.0),
                LayoutNode::new("B", 10.0, 10.0).at(15.0, 5.0),
                LayoutNode::new("C", 10.0, 10.0).at(10.0, 20.0),
            ],
            vec![
                LayoutEdge { source: 0, target: 1 },
                LayoutEdge { source: 1, target: 2 },
            ],
        )
    }

    fn positions(part: &LayoutPartition) -> Vec<Point> {
        part.nodes().iter().map(|n| n.position()).collect()
    }

    #[test]
    fn places_with_computed_scale() {
        let backend = fixed(&[(0.0, 0.0), (2.0, 0.0), (2.0, 4.0)]);
        let loader = BackendLoader::preloaded(backend.clone() as BackendHandle);
        let params = LayoutParameters::default();
        let placement = PlacementConfig::default();
        let monitor = RecordingMonitor::default();
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let mut part = triangle();
        let outcome = driver.layout_partition(&mut part);
        // edge A-B: 20 / 2 = 10 dominates edge B-C: 20 / 4 = 5
        assert!(matches!(outcome, PartitionOutcome::Placed { scale } if scale == 10.0));
        assert_eq!(
            positions(&part),
            vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(20.0, 40.0)]
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            monitor.statuses.lock().unwrap().as_slice(),
            &[
                "Initializing: Partition: 1".to_string(),
                "Calling layout backend: Partition: 1".to_string()
            ]
        );
    }

    #[test]
    fn unavailable_backend_leaves_positions() {
        let loader = BackendLoader::with_loader(|| {
            Err(BackendError::unavailable("gpu", "libGpuLayout.so not found"))
        });
        let params = LayoutParameters::default();
        let placement = PlacementConfig::default();
        let monitor = RecordingMonitor::default();
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let mut part = triangle();
        let before = positions(&part);
        let outcome = driver.layout_partition(&mut part);
        assert!(matches!(
            outcome,
            PartitionOutcome::Abandoned(LayoutError::Backend(BackendError::Unavailable { .. }))
        ));
        assert_eq!(positions(&part), before);
        let messages = monitor.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Cannot produce layout"));
    }

    #[test]
    fn malformed_backend_output_is_failure() {
        let backend = fixed(&[(0.0, 0.0), (1.0, 1.0)]);
        let loader = BackendLoader::preloaded(backend as BackendHandle);
        let params = LayoutParameters::default();
        let placement = PlacementConfig::default();
        let monitor = RecordingMonitor::default();
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let mut part = triangle();
        let before = positions(&part);
        let outcome = driver.layout_partition(&mut part);
        assert!(matches!(
            outcome,
            PartitionOutcome::Abandoned(LayoutError::Backend(BackendError::Failure { .. }))
        ));
        assert_eq!(positions(&part), before);
    }

    #[test]
    fn oversized_coordinates_retry_at_smaller_scale() {
        let backend = fixed(&[(0.0, 0.0), (1e-300, 0.0), (1e300, 0.0)]);
        let loader = BackendLoader::preloaded(backend as BackendHandle);
        let params = LayoutParameters::default();
        let placement = PlacementConfig::default();
        let monitor = RecordingMonitor::default();
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let mut part = triangle();
        let outcome = driver.layout_partition(&mut part);
        let PartitionOutcome::Placed { scale } = outcome else {
            panic!("expected placement, got {outcome:?}");
        };
        // up ratio 20 / 1e-300 overflows the far node; retries shrink it
        assert!(scale < 2e301);
        assert!(positions(&part).iter().all(|p| p.is_finite()));
    }

    #[test]
    fn cancellation_stops_before_backend_call() {
        let backend = fixed(&[(0.0, 0.0), (2.0, 0.0), (2.0, 4.0)]);
        let loader = BackendLoader::preloaded(backend.clone() as BackendHandle);
        let params = LayoutParameters::default();
        let placement = PlacementConfig::default();
        let monitor = RecordingMonitor {
            cancel_after_status: Some(1),
            ..Default::default()
        };
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let mut part = triangle();
        let before = positions(&part);
        assert!(matches!(
            driver.layout_partition(&mut part),
            PartitionOutcome::Canceled
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(positions(&part), before);
    }

    #[test]
    fn selected_only_keeps_centroid_and_locked_nodes() {
        let backend = fixed(&[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0)]);
        let loader = BackendLoader::preloaded(backend as BackendHandle);
        let params = LayoutParameters::default();
        let placement = PlacementConfig {
            selected_only: true,
            ..PlacementConfig::default()
        };
        let monitor = RecordingMonitor::default();
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let mut part = LayoutPartition::new(
            1,
            vec![
                LayoutNode::new("A", 2.0, 2.0).at(10.0, 10.0),
                LayoutNode::new("B", 2.0, 2.0).at(0.0, 0.0).locked(),
                LayoutNode::new("C", 2.0, 2.0).at(10.0, 10.0),
            ],
            vec![
                LayoutEdge { source: 0, target: 1 },
                LayoutEdge { source: 1, target: 2 },
            ],
        );
        assert!(driver.layout_partition(&mut part).is_placed());
        assert_eq!(part.node(1).position(), Point::new(0.0, 0.0));
        let centroid = part.average_location().unwrap();
        assert!((centroid.x - 10.0).abs() < 1e-9);
        assert!((centroid.y - 10.0).abs() < 1e-9);
        assert_ne!(part.node(0).position(), part.node(2).position());
    }

    #[test]
    fn failed_partition_does_not_affect_others() {
        let backend = fixed(&[(0.0, 0.0), (2.0, 0.0), (2.0, 4.0)]);
        let loader = BackendLoader::preloaded(backend as BackendHandle);
        let params = LayoutParameters::default();
        let placement = PlacementConfig::default();
        let monitor = RecordingMonitor::default();
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let pair = LayoutPartition::new(
            2,
            vec![LayoutNode::new("X", 1.0, 1.0), LayoutNode::new("Y", 1.0, 1.0)],
            vec![LayoutEdge { source: 0, target: 1 }],
        );
        let mut parts = vec![triangle(), pair];
        let outcomes = driver.layout_all(&mut parts);
        assert!(outcomes[0].is_placed());
        assert!(matches!(outcomes[1], PartitionOutcome::Abandoned(_)));
    }

    fn chain(number: usize, len: usize) -> LayoutPartition {
        let nodes = (0..len)
            .map(|i| LayoutNode::new(&format!("{number}-{i}"), 10.0, 10.0))
            .collect();
        let edges = (1..len)
            .map(|i| LayoutEdge { source: i - 1, target: i })
            .collect();
        LayoutPartition::new(number, nodes, edges)
    }

    #[test]
    fn parallel_run_reports_progress_across_partitions() {
        let loader = BackendLoader::preloaded(Arc::new(CpuBackend::new()) as BackendHandle);
        let params = LayoutParameters::default();
        let placement = PlacementConfig {
            parallel: true,
            ..PlacementConfig::default()
        };
        let monitor = RecordingMonitor::default();
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let mut parts: Vec<LayoutPartition> = (1..=4).map(|n| chain(n, n + 1)).collect();
        let outcomes = driver.layout_all(&mut parts);
        assert!(outcomes.iter().all(|o| o.is_placed()));

        let mut percents = monitor.percents.lock().unwrap().clone();
        percents.sort_unstable();
        assert_eq!(percents, vec![25, 50, 75, 100]);
    }

    #[test]
    fn sequential_run_reports_progress_in_order() {
        let backend = fixed(&[(0.0, 0.0), (2.0, 0.0), (2.0, 4.0)]);
        let loader = BackendLoader::preloaded(backend as BackendHandle);
        let params = LayoutParameters::default();
        let placement = PlacementConfig::default();
        let monitor = RecordingMonitor::default();
        let driver = LayoutDriver::new(&loader, &params, &placement, &monitor);

        let mut parts = vec![triangle(), triangle()];
        driver.layout_all(&mut parts);
        assert_eq!(monitor.percents.lock().unwrap().as_slice(), &[50, 100]);
    }

    #[test]
    fn layout_graph_runs_every_component() {
        let mut graph = Graph::new();
        for id in ["A", "B", "C", "D", "E"] {
            graph.add_node(id, 20.0, 20.0);
        }
        graph.add_edge("A", "B");
        graph.add_edge("B", "C");
        graph.add_edge("D", "E");
        let config = Config::default();
        let loader = BackendLoader::preloaded(Arc::new(CpuBackend::new()) as BackendHandle);
        let monitor = RecordingMonitor::default();

        let reports = layout_graph(&mut graph, &config, &loader, &monitor);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.outcome.is_placed()));
        let a = graph.node("A").unwrap();
        let b = graph.node("B").unwrap();
        assert!(a.x != b.x || a.y != b.y);
    }
}
