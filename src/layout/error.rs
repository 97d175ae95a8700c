use super::PlacementFault;
use crate::backend::BackendError;

/// Terminal failures for a single partition.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LayoutError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    PlacementFault(#[from] PlacementFault),
    #[error("Sorry, cannot produce layout: scale factor exhausted after {attempts} attempts")]
    ScaleExhausted { attempts: usize },
}

impl LayoutError {
    /// Message shown to the user when a partition is abandoned.
    pub fn diagnostic(&self, partition: usize) -> String {
        match self {
            LayoutError::Backend(BackendError::Unavailable { .. }) => format!(
                "Problem detected while loading the layout backend\nCannot produce layout for partition {partition}\n{self}\nPlease check the backend search paths in the configuration"
            ),
            _ => format!("Partition {partition}: {self}"),
        }
    }
}
