//! Expand one frame of a JSON document and print the scene.
//!
//! ```text
//! RUST_LOG=debug cargo run -p tessera-core --example expand_json -- doc.json home
//! ```
//!
//! Lint diagnostics go to stderr, the expanded scene to stdout.

use std::env;
use std::fs;
use std::process::ExitCode;
use tessera_core::{Document, NodeId, expand, lint_document};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let (Some(path), Some(frame)) = (args.get(1), args.get(2)) else {
        eprintln!("usage: expand_json <document.json> <frame-id>");
        return ExitCode::FAILURE;
    };

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("cannot read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let doc = match Document::from_json(&text) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    for diag in lint_document(&doc) {
        eprintln!("{:?} [{}] {}", diag.severity, diag.rule, diag.message);
    }

    let Some(scene) = expand(NodeId::intern(frame), &doc) else {
        eprintln!("frame `{frame}` not found");
        return ExitCode::FAILURE;
    };
    for (node, error) in scene.errors() {
        log::warn!("{}: {error}", node.id);
    }
    match scene.to_json() {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
