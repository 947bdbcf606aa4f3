//! Project persistence
//! Stored project documents, the project library and its JSON file store

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::graph::{Edge, GraphError, GraphSnapshot, Node, NodeIndex};
use crate::queue::EventQueue;

#[cfg(test)]
mod tests;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("invalid project: no project with id '{0}'")]
    EmptyProjectReference(String),
    #[error("malformed project graph: {0}")]
    Graph(#[from] GraphError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type ProjectResult<T> = Result<T, ProjectError>;

const UNTITLED: &str = "Untitled";

fn untitled() -> String {
    UNTITLED.to_string()
}

fn name_or_untitled(name: String) -> String {
    if name.is_empty() {
        untitled()
    } else {
        name
    }
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Nodes and edges as stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// One saved project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(default = "untitled")]
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    /// Epoch millis of the last save
    #[serde(default)]
    pub last_edit_time: i64,
    #[serde(default)]
    pub graph: StoredGraph,
    /// Event label set
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub entry_node: Option<NodeIndex>,
    /// Queue names only; ids are reassigned on load
    #[serde(default)]
    pub event_queue: Vec<String>,
}

impl ProjectDocument {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            project_name: name_or_untitled(name.into()),
            description: description.into(),
            last_edit_time: now_millis(),
            graph: StoredGraph::default(),
            events: Vec::new(),
            entry_node: None,
            event_queue: Vec::new(),
        }
    }

    /// Rebuild the graph snapshot, checking stored indices
    pub fn snapshot(&self) -> ProjectResult<GraphSnapshot> {
        Ok(GraphSnapshot::from_parts(
            self.graph.nodes.clone(),
            self.graph.edges.clone(),
            self.events.iter().cloned(),
            self.entry_node,
        )?)
    }

    /// Open an editor on this document
    pub fn open(&self, config: &EditorConfig) -> ProjectResult<Editor> {
        let graph = self.snapshot()?;
        let queue = EventQueue::from_names(self.event_queue.iter().cloned());
        Ok(Editor::with_contents(config, graph, queue))
    }

    /// Copy the editor's live state into the document and stamp the edit time
    pub fn store(&mut self, editor: &Editor) {
        let graph = editor.graph();
        self.graph = StoredGraph {
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
        };
        self.events = graph.event_labels().iter().cloned().collect();
        self.entry_node = graph.entry_node();
        self.event_queue = editor.queue().names();
        self.last_edit_time = now_millis();
    }
}

// ============================================================================
// LIBRARY
// ============================================================================

/// All of a user's projects, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectLibrary {
    projects: BTreeMap<String, ProjectDocument>,
}

impl ProjectLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> ProjectResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> ProjectResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Create an empty project and return its fresh id
    pub fn create(&mut self, name: impl Into<String>, description: impl Into<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.projects
            .insert(id.clone(), ProjectDocument::new(name, description));
        id
    }

    pub fn insert(&mut self, id: impl Into<String>, document: ProjectDocument) {
        self.projects.insert(id.into(), document);
    }

    pub fn get(&self, id: &str) -> ProjectResult<&ProjectDocument> {
        self.projects
            .get(id)
            .ok_or_else(|| ProjectError::EmptyProjectReference(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> ProjectResult<&mut ProjectDocument> {
        self.projects
            .get_mut(id)
            .ok_or_else(|| ProjectError::EmptyProjectReference(id.to_string()))
    }

    pub fn delete(&mut self, id: &str) -> ProjectResult<ProjectDocument> {
        self.projects
            .remove(id)
            .ok_or_else(|| ProjectError::EmptyProjectReference(id.to_string()))
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> ProjectResult<()> {
        self.get_mut(id)?.project_name = name_or_untitled(name.into());
        Ok(())
    }

    pub fn set_description(
        &mut self,
        id: &str,
        description: impl Into<String>,
    ) -> ProjectResult<()> {
        self.get_mut(id)?.description = description.into();
        Ok(())
    }

    /// Projects newest first
    pub fn recent(&self) -> Vec<(&str, &ProjectDocument)> {
        let mut projects: Vec<_> = self
            .projects
            .iter()
            .map(|(id, doc)| (id.as_str(), doc))
            .collect();
        projects.sort_by(|a, b| b.1.last_edit_time.cmp(&a.1.last_edit_time));
        projects
    }

    pub fn open(&self, id: &str, config: &EditorConfig) -> ProjectResult<Editor> {
        let editor = self.get(id)?.open(config)?;
        info!("opened project {id}");
        Ok(editor)
    }

    pub fn save(&mut self, id: &str, editor: &Editor) -> ProjectResult<()> {
        self.get_mut(id)?.store(editor);
        info!("saved project {id}");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Keeps a library in one JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ProjectError {
        ProjectError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Read the library; a missing file is an empty library
    pub fn load(&self) -> ProjectResult<ProjectLibrary> {
        if !self.path.exists() {
            info!("{} not found, starting empty", self.path.display());
            return Ok(ProjectLibrary::new());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let library = ProjectLibrary::from_json_str(&text)?;
        info!("loaded {} project(s) from {}", library.len(), self.path.display());
        Ok(library)
    }

    pub fn store(&self, library: &ProjectLibrary) -> ProjectResult<()> {
        let text = library.to_json_string()?;
        std::fs::write(&self.path, text).map_err(|e| self.io_error(e))?;
        info!("wrote {} project(s) to {}", library.len(), self.path.display());
        Ok(())
    }
}
