//! Statecraft CLI - project library and simulation from the command line

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use statecraft::sim::Step;
use statecraft::{run_script, Editor, EditorConfig, JsonFileStore};

#[derive(Parser)]
#[command(name = "statecraft")]
#[command(about = "Edit and simulate finite state machines")]
#[command(version)]
struct Cli {
    /// Editor configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects in a library, newest first
    List {
        library: PathBuf,
    },

    /// Create an empty project and print its id
    New {
        library: PathBuf,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Run a stored project's event queue
    Simulate {
        library: PathBuf,
        project: String,
        /// Seed for branch choices
        #[arg(long)]
        seed: Option<u64>,
        /// Stop after this many steps
        #[arg(long)]
        steps: Option<usize>,
    },

    /// Execute a command script
    Script {
        file: PathBuf,
        /// Seed for branch choices
        #[arg(long)]
        seed: Option<u64>,
        /// Start from (and save back to) a project in this library
        #[arg(long, requires = "project")]
        save: Option<PathBuf>,
        #[arg(long)]
        project: Option<String>,
    },
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<EditorConfig> {
    let mut config = match path {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    Ok(config)
}

fn node_name(editor: &Editor, idx: usize) -> String {
    editor
        .graph()
        .nodes()
        .get(idx)
        .map(|n| format!("{} #{idx}", n.name))
        .unwrap_or_else(|| format!("#{idx}"))
}

fn print_steps(editor: &Editor, steps: &[Step]) {
    for step in steps {
        let note = if step.candidates > 1 {
            format!(" (1 of {})", step.candidates)
        } else if step.candidates == 0 {
            " (no transition)".to_string()
        } else {
            String::new()
        };
        println!(
            "  [{}] {} --{}--> {}{note}",
            step.position,
            node_name(editor, step.from),
            step.event,
            node_name(editor, step.to)
        );
    }
}

fn print_summary(editor: &Editor) {
    let graph = editor.graph();
    println!(
        "  States: {}  Transitions: {}  Labels: {}",
        graph.visible_nodes().count(),
        graph.live_edges().count(),
        graph.event_labels().len()
    );
    let run = editor.run();
    match run.current_node() {
        Some(node) => println!(
            "  Current: {} after {}/{} events",
            node_name(editor, node),
            run.consumed(),
            editor.queue().len()
        ),
        None => println!("  Current: <no entry state>"),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List { library } => {
            let library = JsonFileStore::new(library).load()?;
            for (id, doc) in library.recent() {
                let when = DateTime::<Utc>::from_timestamp_millis(doc.last_edit_time)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!("{id}  {when}  {}", doc.project_name);
                if !doc.description.is_empty() {
                    println!("    {}", doc.description);
                }
            }
        }

        Commands::New {
            library,
            name,
            description,
        } => {
            let store = JsonFileStore::new(library);
            let mut library = store.load()?;
            let id = library.create(name, description);
            store.store(&library)?;
            println!("{id}");
        }

        Commands::Simulate {
            library,
            project,
            seed,
            steps,
        } => {
            let config = load_config(cli.config.as_deref(), seed)?;
            let library = JsonFileStore::new(library).load()?;
            let mut editor = library.open(&project, &config)?;

            let taken = match steps {
                Some(n) => editor.run_steps(n),
                None => editor.run_to_end(),
            };

            println!("✅ {}", library.get(&project)?.project_name);
            print_steps(&editor, &taken);
            print_summary(&editor);
        }

        Commands::Script {
            file,
            seed,
            save,
            project,
        } => {
            let config = load_config(cli.config.as_deref(), seed)?;
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let target = match (save, project) {
                (Some(path), Some(id)) => Some((JsonFileStore::new(path), id)),
                _ => None,
            };
            let mut library = match &target {
                Some((store, _)) => Some(store.load()?),
                None => None,
            };
            let mut editor = match (&library, &target) {
                (Some(library), Some((_, id))) => library.open(id, &config)?,
                _ => Editor::new(&config),
            };

            let report = run_script(&mut editor, &source)
                .with_context(|| format!("running {}", file.display()))?;

            println!("✅ Ran {}", file.display());
            print_steps(&editor, &report.steps);
            if report.rejected > 0 {
                println!("  Skipped {} self-loop(s)", report.rejected);
            }
            print_summary(&editor);

            if let (Some(library), Some((store, id))) = (library.as_mut(), &target) {
                library.save(id, &editor)?;
                store.store(library)?;
                println!("  Saved to {}", store.path().display());
            }
        }
    }

    Ok(())
}
