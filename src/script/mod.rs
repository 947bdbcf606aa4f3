//! Command Script
//! Line-oriented editor commands, parsed with pest and replayed against an `Editor`

use log::warn;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::editor::Editor;
use crate::graph::{EdgeIndex, GraphError, NodeIndex};
use crate::queue::EventId;
use crate::sim::Step;


#[derive(Parser)]
#[grammar = "script/script.pest"]
pub struct ScriptParser;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Parse error: {0}")]
    PestError(#[from] Box<pest::error::Error<Rule>>),
    #[error("Invalid syntax at line {line}: {message}")]
    SyntaxError { line: usize, message: String },
    #[error("line {line}: {source}")]
    Graph { line: usize, source: GraphError },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

/// One editor command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddNode { x: f64, y: f64 },
    /// `save=false` is a drag preview
    MoveNode { node: NodeIndex, x: f64, y: f64, save: bool },
    RenameNode { node: NodeIndex, name: String },
    DeleteNode(NodeIndex),
    DeleteEdge(EdgeIndex),
    SetEntry(Option<NodeIndex>),
    ToggleEdge { from: NodeIndex, to: NodeIndex },
    SetEdgeEvents { edge: EdgeIndex, labels: Vec<String> },
    PruneLabels,
    Clear,
    Undo,
    Redo,
    Grid(bool),
    Enqueue(String),
    Remove(EventId),
    Reorder { id: EventId, to: usize },
    ClearQueue,
    Step,
    Back,
    /// Step `n` times, or to the end of the queue
    Run(Option<usize>),
    Restart,
    Panel,
}

/// A command with the line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub command: Command,
}

/// Parse a whole script
pub fn parse_script(source: &str) -> ScriptResult<Vec<ScriptLine>> {
    let pairs = ScriptParser::parse(Rule::script, source).map_err(Box::new)?;
    let mut lines = Vec::new();

    for pair in pairs {
        if pair.as_rule() != Rule::script {
            continue;
        }
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::command {
                lines.push(parse_command(inner)?);
            }
        }
    }

    Ok(lines)
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

fn next_pair<'a>(
    inner: &mut Pairs<'a, Rule>,
    line: usize,
    what: &str,
) -> ScriptResult<Pair<'a, Rule>> {
    inner.next().ok_or_else(|| ScriptError::SyntaxError {
        line,
        message: format!("missing {what}"),
    })
}

fn parse_number(pair: Pair<Rule>, line: usize) -> ScriptResult<f64> {
    pair.as_str().parse().map_err(|_| ScriptError::SyntaxError {
        line,
        message: format!("'{}' is not a number", pair.as_str()),
    })
}

fn parse_index(pair: Pair<Rule>, line: usize) -> ScriptResult<usize> {
    pair.as_str().parse().map_err(|_| ScriptError::SyntaxError {
        line,
        message: format!("'{}' is not an index", pair.as_str()),
    })
}

fn parse_name(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::quoted => pair
            .into_inner()
            .next()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default(),
        _ => pair.as_str().to_string(),
    }
}

fn parse_command(pair: Pair<Rule>) -> ScriptResult<ScriptLine> {
    let line = line_of(&pair);
    let cmd = next_pair(&mut pair.into_inner(), line, "command")?;
    let rule = cmd.as_rule();
    let mut args = cmd.into_inner();

    let command = match rule {
        Rule::add_node => Command::AddNode {
            x: parse_number(next_pair(&mut args, line, "x")?, line)?,
            y: parse_number(next_pair(&mut args, line, "y")?, line)?,
        },
        Rule::move_node => Command::MoveNode {
            node: parse_index(next_pair(&mut args, line, "node")?, line)?,
            x: parse_number(next_pair(&mut args, line, "x")?, line)?,
            y: parse_number(next_pair(&mut args, line, "y")?, line)?,
            save: args.next().is_none(),
        },
        Rule::rename_node => Command::RenameNode {
            node: parse_index(next_pair(&mut args, line, "node")?, line)?,
            name: parse_name(next_pair(&mut args, line, "name")?),
        },
        Rule::delete_node => {
            Command::DeleteNode(parse_index(next_pair(&mut args, line, "node")?, line)?)
        }
        Rule::delete_edge => {
            Command::DeleteEdge(parse_index(next_pair(&mut args, line, "edge")?, line)?)
        }
        Rule::set_entry => {
            let target = next_pair(&mut args, line, "entry node")?;
            match target.as_rule() {
                Rule::none => Command::SetEntry(None),
                _ => Command::SetEntry(Some(parse_index(target, line)?)),
            }
        }
        Rule::toggle_edge => Command::ToggleEdge {
            from: parse_index(next_pair(&mut args, line, "source node")?, line)?,
            to: parse_index(next_pair(&mut args, line, "target node")?, line)?,
        },
        Rule::set_labels => {
            let edge = parse_index(next_pair(&mut args, line, "edge")?, line)?;
            let labels: Vec<String> = args
                .next()
                .map(|list| list.into_inner().map(|w| w.as_str().to_string()).collect())
                .unwrap_or_default();
            Command::SetEdgeEvents { edge, labels }
        }
        Rule::prune => Command::PruneLabels,
        Rule::clear_queue => Command::ClearQueue,
        Rule::clear => Command::Clear,
        Rule::undo => Command::Undo,
        Rule::redo => Command::Redo,
        Rule::grid => {
            let switch = next_pair(&mut args, line, "on/off")?;
            Command::Grid(switch.as_str() == "on")
        }
        Rule::enqueue => {
            Command::Enqueue(next_pair(&mut args, line, "event")?.as_str().to_string())
        }
        Rule::remove => {
            Command::Remove(parse_index(next_pair(&mut args, line, "event id")?, line)? as EventId)
        }
        Rule::reorder => Command::Reorder {
            id: parse_index(next_pair(&mut args, line, "event id")?, line)? as EventId,
            to: parse_index(next_pair(&mut args, line, "position")?, line)?,
        },
        Rule::step => Command::Step,
        Rule::back => Command::Back,
        Rule::run => match args.next() {
            Some(n) => Command::Run(Some(parse_index(n, line)?)),
            None => Command::Run(None),
        },
        Rule::restart => Command::Restart,
        Rule::panel => Command::Panel,
        other => {
            return Err(ScriptError::SyntaxError {
                line,
                message: format!("unexpected {other:?}"),
            })
        }
    };

    Ok(ScriptLine { line, command })
}

// ============================================================================
// EXECUTION
// ============================================================================

/// What a script run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptReport {
    /// Every simulation step taken, in order
    pub steps: Vec<Step>,
    /// Connect gestures refused as self-loops
    pub rejected: usize,
}

impl Command {
    /// Apply to the editor, appending any simulation steps to `steps`
    pub fn apply(&self, editor: &mut Editor, steps: &mut Vec<Step>) -> Result<(), GraphError> {
        match self {
            Command::AddNode { x, y } => {
                editor.add_node(*x, *y);
            }
            Command::MoveNode { node, x, y, save } => editor.move_node(*node, *x, *y, *save)?,
            Command::RenameNode { node, name } => editor.rename_node(*node, name.clone())?,
            Command::DeleteNode(node) => editor.delete_node(*node)?,
            Command::DeleteEdge(edge) => editor.delete_edge(*edge)?,
            Command::SetEntry(node) => editor.set_entry_node(*node)?,
            Command::ToggleEdge { from, to } => {
                editor.toggle_edge(*from, *to)?;
            }
            Command::SetEdgeEvents { edge, labels } => {
                editor.set_edge_events(*edge, labels.iter().cloned())?
            }
            Command::PruneLabels => editor.prune_event_labels(),
            Command::Clear => editor.clear(),
            Command::Undo => {
                editor.undo();
            }
            Command::Redo => {
                editor.redo();
            }
            Command::Grid(on) => editor.set_align_to_grid(*on),
            Command::Enqueue(name) => {
                editor.enqueue(name.clone());
            }
            Command::Remove(id) => {
                editor.remove_event(*id);
            }
            Command::Reorder { id, to } => {
                editor.move_event(*id, *to);
            }
            Command::ClearQueue => editor.clear_queue(),
            Command::Step => steps.extend(editor.step()),
            Command::Back => {
                editor.step_back();
            }
            Command::Run(Some(n)) => steps.extend(editor.run_steps(*n)),
            Command::Run(None) => steps.extend(editor.run_to_end()),
            Command::Restart => editor.restart(),
            Command::Panel => {
                editor.toggle_run_panel();
            }
        }
        Ok(())
    }
}

/// Replay parsed lines in order. Self-loops are skipped; bad indices abort.
pub fn execute(editor: &mut Editor, lines: &[ScriptLine]) -> ScriptResult<ScriptReport> {
    let mut report = ScriptReport::default();
    for ScriptLine { line, command } in lines {
        match command.apply(editor, &mut report.steps) {
            Ok(()) => {}
            Err(GraphError::SelfLoopRejected(node)) => {
                warn!("line {line}: self-loop on node {node} skipped");
                report.rejected += 1;
            }
            Err(source) => return Err(ScriptError::Graph { line: *line, source }),
        }
    }
    Ok(report)
}

/// Parse and execute in one go
pub fn run_script(editor: &mut Editor, source: &str) -> ScriptResult<ScriptReport> {
    let lines = parse_script(source)?;
    execute(editor, &lines)
}
