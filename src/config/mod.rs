//! Editor configuration
//! Grid, timing and naming defaults, loadable from JSON

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::GridAlign;
use crate::project::{ProjectError, ProjectResult};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snapping pitch used when grid alignment is on
    pub grid_pitch: f64,
    /// Whether grid alignment starts enabled
    pub align_to_grid: bool,
    /// Delay between auto-run steps
    pub auto_run_interval_ms: u64,
    /// Name given to freshly placed states
    pub default_node_name: String,
    /// Fixed seed for branch choices; entropy when absent
    pub seed: Option<u64>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_pitch: 50.0,
            align_to_grid: false,
            auto_run_interval_ms: 500,
            default_node_name: "State".to_string(),
            seed: None,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> ProjectResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ProjectResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn grid(&self) -> GridAlign {
        GridAlign {
            pitch: self.grid_pitch,
            enabled: self.align_to_grid,
        }
    }

    pub fn auto_run_interval(&self) -> Duration {
        Duration::from_millis(self.auto_run_interval_ms)
    }
}
