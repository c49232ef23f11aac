mod script;

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context as _;
use clap::Parser;
use scribe_core::DocumentValue;
use scribe_widget::{TextEditor, WidgetConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scribe-story")]
#[command(about = "Replays a scripted editing session and prints the result", long_about = None)]
struct Args {
    /// JSON script of steps (defaults to the built-in welcome script)
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Widget config JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Starting document value JSON
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Print the final document value as JSON
    #[arg(long)]
    value: bool,
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => WidgetConfig::from_json_str(&read(path)?)?,
        None => WidgetConfig::default(),
    };
    let steps = match &args.script {
        Some(path) => script::parse(&read(path)?)?,
        None => script::parse(script::WELCOME)?,
    };

    let mut editor = match &args.document {
        Some(path) => {
            let value = DocumentValue::from_json_str(&read(path)?)?;
            TextEditor::with_document(value.into_document(), config)?
        }
        None => TextEditor::new(config)?,
    };

    let changes = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&changes);
    editor.on_change(move |_| counter.set(counter.get() + 1));

    info!(steps = steps.len(), "replaying script");
    for step in steps {
        script::run(&mut editor, step)?;
    }

    print!("{}", editor.render());
    info!(changes = changes.get(), "done");

    if args.value {
        let value = DocumentValue::from_document(editor.value().clone());
        println!("{}", value.to_json_pretty()?);
    }
    Ok(())
}
