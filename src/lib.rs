pub mod backend;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;

pub use backend::{BackendConfig, BackendError, BackendHandle, BackendLoader, LayoutBackend};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use ir::{Graph, parse_graph};
pub use layout::{LayoutDriver, LayoutError, LayoutPartition, PartitionOutcome, layout_graph};
pub use render::render_svg;
