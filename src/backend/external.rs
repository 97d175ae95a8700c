use super::{BackendError, LayoutBackend};
use crate::layout::{AdjacencyEncoding, LayoutParameters, RawCoordinates};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const NAME: &str = "external";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRequest<'a> {
    adjacency_index: &'a [i32],
    adjacency_values: &'a [i32],
    coarse_graph_size: i32,
    interpolation_iterations: i32,
    level_convergence: i32,
    edge_len: f64,
    initial_iterations: i32,
    canvas_width: f64,
    canvas_height: f64,
}

/// Backend living in a separate program.
///
/// Each call spawns the program, writes one JSON request to its stdin and
/// expects a JSON array of `[x, y]` rows on stdout.
#[derive(Debug, Clone)]
pub struct ExternalBackend {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalBackend {
    /// Resolve `program` against `search_paths`, then `PATH`.
    pub fn locate(
        program: &str,
        search_paths: &[PathBuf],
        args: &[String],
    ) -> Result<Self, BackendError> {
        let resolved = resolve_program(program, search_paths).ok_or_else(|| {
            BackendError::unavailable(
                NAME,
                format!(
                    "could not find `{program}` in {} or PATH",
                    display_paths(search_paths)
                ),
            )
        })?;
        tracing::debug!(program = %resolved.display(), "external layout backend located");
        Ok(Self {
            program: resolved,
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl LayoutBackend for ExternalBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn is_reentrant(&self) -> bool {
        true
    }

    fn compute(
        &self,
        adjacency: &AdjacencyEncoding,
        params: &LayoutParameters,
    ) -> Result<RawCoordinates, BackendError> {
        let request = ComputeRequest {
            adjacency_index: &adjacency.index,
            adjacency_values: &adjacency.values,
            coarse_graph_size: params.coarse_graph_size,
            interpolation_iterations: params.interpolation_iterations,
            level_convergence: params.level_convergence,
            edge_len: params.edge_len,
            initial_iterations: params.initial_iterations,
            canvas_width: params.canvas_width,
            canvas_height: params.canvas_height,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|err| BackendError::failure(NAME, format!("encoding request: {err}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                BackendError::failure(NAME, format!("spawning {}: {err}", self.program.display()))
            })?;

        // stdin is written on its own thread while stdout drains below
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || -> std::io::Result<()> {
                stdin.write_all(&payload)?;
                stdin.flush()
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|err| BackendError::failure(NAME, format!("waiting for backend: {err}")))?;
        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::debug!(%err, "backend closed stdin early"),
                Err(_) => return Err(BackendError::failure(NAME, "stdin writer panicked")),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::failure(
                NAME,
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let rows: Vec<[f64; 2]> = serde_json::from_slice(&output.stdout)
            .map_err(|err| BackendError::failure(NAME, format!("malformed output: {err}")))?;
        Ok(RawCoordinates::from_rows(&rows))
    }
}

fn resolve_program(program: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let path_var = std::env::var_os("PATH");
    let from_env = path_var.iter().flat_map(std::env::split_paths);
    search_paths
        .iter()
        .cloned()
        .chain(from_env)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no search paths".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":")
}
