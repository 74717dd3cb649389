//! Headless tile editor host.
//!
//! Replays a JSON gesture script against an [`Editor`] and prints the final
//! document as a `DocValue`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use tile_core::{
    DocValue, Editor, EditorConfig, EditorEvent, KeyCombo, PastePayload, Selection,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tile")]
#[command(about = "Replay editing gestures against a tile document")]
struct Args {
    /// Gesture script (JSON)
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Editor configuration (JSON)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the selection after every gesture
    #[arg(long)]
    trace_selection: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    document: Option<DocValue>,
    #[serde(default)]
    gestures: Vec<Gesture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Gesture {
    Key(String),
    Text(String),
    Select(Selection),
    Command {
        id: String,
        #[serde(default)]
        args: Option<Value>,
    },
    Paste {
        mime: String,
        payload: PastePayload,
    },
    Query {
        id: String,
        #[serde(default)]
        args: Option<Value>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            EditorConfig::from_json_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EditorConfig::default(),
    };

    let raw = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("parsing script {}", args.script.display()))?;

    let mut editor = Editor::new(config).context("creating editor")?;
    if let Some(document) = script.document {
        let event = editor.load_value(document).context("loading document")?;
        info!(?event, "document loaded");
    }

    for (index, gesture) in script.gestures.into_iter().enumerate() {
        let event = run_gesture(&mut editor, gesture)
            .with_context(|| format!("gesture #{index}"))?;
        match &event {
            Some(EditorEvent::Rejected(err)) => warn!(index, %err, "gesture rejected"),
            Some(event) => info!(index, ?event, "gesture"),
            None => {}
        }
        if args.trace_selection {
            eprintln!("#{index}: {:?}", editor.selection());
        }
    }

    println!("{}", editor.to_value().to_json_pretty()?);
    println!("{}", serde_json::to_string(editor.selection())?);
    Ok(())
}

fn run_gesture(editor: &mut Editor, gesture: Gesture) -> Result<Option<EditorEvent>> {
    let event = match gesture {
        Gesture::Key(combo) => {
            let combo: KeyCombo = combo.parse()?;
            editor.on_key(&combo)
        }
        Gesture::Text(text) => editor.on_text_input(&text),
        Gesture::Select(selection) => editor.on_selection_change(selection),
        Gesture::Command { id, args } => editor
            .on_command(&id, args)
            .with_context(|| format!("command {id}"))?,
        Gesture::Paste { mime, payload } => editor.on_paste(&mime, payload),
        Gesture::Query { id, args } => {
            let value = editor
                .run_query_json(&id, args)
                .with_context(|| format!("query {id}"))?;
            println!("{id} = {value}");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("tile_core=trace,tile=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
