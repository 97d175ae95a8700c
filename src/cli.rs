use crate::backend::{BackendKind, BackendLoader};
use crate::config::{Config, load_config};
use crate::ir::parse_graph;
use crate::layout::{CancelFlag, LogMonitor, PartitionOutcome, layout_graph};
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fdlayout", version, about = "Force-directed layout of graph partitions")]
pub struct Args {
    /// Input graph (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Only move selected nodes, keeping their centroid in place
    #[arg(short = 's', long = "selectedOnly")]
    pub selected_only: bool,

    /// Layout backend
    #[arg(short = 'b', long = "backend", value_enum)]
    pub backend: Option<BackendArg>,

    /// Program for the external backend
    #[arg(long = "program")]
    pub program: Option<String>,

    /// Canvas width passed to the backend
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Canvas height passed to the backend
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendArg {
    Cpu,
    External,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    apply_args(&mut config, &args);

    let input = read_input(args.input.as_deref())?;
    let mut graph = parse_graph(&input)?;
    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "graph loaded"
    );

    let loader = BackendLoader::new(config.backend.clone());
    let cancel = CancelFlag::new();
    watch_interrupts(&cancel);
    let monitor = LogMonitor::new(cancel.clone());
    let reports = layout_graph(&mut graph, &config, &loader, &monitor);

    match args.output_format {
        OutputFormat::Json => write_layout_dump(args.output.as_deref(), &graph, &reports)?,
        OutputFormat::Svg => {
            let svg = render_svg(&graph, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => write_png(&graph, &config, args.output.as_deref())?,
    }

    if cancel.is_set() {
        return Err(anyhow::anyhow!("layout interrupted"));
    }

    let abandoned = reports
        .iter()
        .filter(|r| matches!(r.outcome, PartitionOutcome::Abandoned(_)))
        .count();
    if abandoned > 0 {
        return Err(anyhow::anyhow!(
            "{} of {} partitions could not be laid out",
            abandoned,
            reports.len()
        ));
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// First Ctrl-C sets `cancel`; a second one exits immediately.
#[cfg(unix)]
fn watch_interrupts(cancel: &CancelFlag) {
    use signal_hook::consts::signal::SIGINT;
    use signal_hook::flag;

    let registered = flag::register_conditional_shutdown(SIGINT, 130, cancel.handle())
        .and_then(|_| flag::register(SIGINT, cancel.handle()));
    if let Err(err) = registered {
        tracing::warn!(%err, "could not install interrupt handler");
    }
}

#[cfg(not(unix))]
fn watch_interrupts(_cancel: &CancelFlag) {}

fn apply_args(config: &mut Config, args: &Args) {
    if args.selected_only {
        config.placement.selected_only = true;
    }
    if let Some(backend) = args.backend {
        config.backend.kind = match backend {
            BackendArg::Cpu => BackendKind::Cpu,
            BackendArg::External => BackendKind::External,
        };
    }
    if let Some(program) = &args.program {
        config.backend.program = program.clone();
    }
    if let Some(width) = args.width {
        config.layout.canvas_width = width;
    }
    if let Some(height) = args.height {
        config.layout.canvas_height = height;
    }
}

#[cfg(feature = "png")]
fn write_png(graph: &crate::ir::Graph, config: &Config, output: Option<&Path>) -> Result<()> {
    let output = output.ok_or_else(|| anyhow::anyhow!("Output path required for png output"))?;
    let svg = render_svg(graph, &config.render);
    crate::render::write_output_png(&svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_graph: &crate::ir::Graph, _config: &Config, _output: Option<&Path>) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
