//! Statecraft - FSM Editor Core
//! Undoable state-diagram model with a nondeterministic event-queue simulator

pub mod config;
pub mod editor;
pub mod graph;
pub mod history;
pub mod project;
pub mod queue;
pub mod script;
pub mod sim;

pub use config::EditorConfig;
pub use editor::{Editor, Selection};
pub use graph::{EdgeIndex, EdgeToggle, GraphError, GraphSnapshot, GraphStore, NodeIndex};
pub use history::History;
pub use project::{JsonFileStore, ProjectDocument, ProjectError, ProjectLibrary};
pub use queue::{EventId, EventQueue, QueuedEvent};
pub use script::{parse_script, run_script};
pub use sim::{AutoRun, BranchPicker, RandomPicker, RunState, ScriptedPicker, Simulator, Step};
