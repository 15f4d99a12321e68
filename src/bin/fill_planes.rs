//! CLI tool for filling the planes of a board stored as JSON
//!
//! Usage:
//!   cargo run --release --bin fill_planes -- <board.json> [options]
//!
//! Options:
//!   --layer <id>        Only rebuild this layer (repeatable, e.g. top_cu)
//!   --output <path>     Write the filled board here (default: stdout)
//!   --fragments         Write only the plane fragments instead of the board
//!   --summary           Print the build summary only
//!
//! Set RUST_LOG=debug for progress and timings.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;

use plane_fill::board::{Board, Layer};
use plane_fill::fill::PlaneFragmentsBuilder;

fn print_usage(program: &str) {
    eprintln!("Usage: {} <board.json> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --layer <id>       Only rebuild this layer (repeatable)");
    eprintln!("  --output <path>    Write the result here instead of stdout");
    eprintln!("  --fragments        Write only the plane fragments");
    eprintln!("  --summary          Print the build summary only");
}

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        return Ok(());
    }

    let input = &args[1];
    let mut layers: BTreeSet<Layer> = BTreeSet::new();
    let mut output: Option<String> = None;
    let mut fragments_only = false;
    let mut summary_only = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--layer" => {
                i += 1;
                let Some(id) = args.get(i) else {
                    bail!("--layer needs a layer id");
                };
                let layer: Layer = id.parse().map_err(anyhow::Error::msg)?;
                layers.insert(layer);
            }
            "--output" => {
                i += 1;
                output = Some(args.get(i).context("--output needs a path")?.clone());
            }
            "--fragments" => fragments_only = true,
            "--summary" => summary_only = true,
            other => {
                print_usage(&args[0]);
                bail!("unknown option '{}'", other);
            }
        }
        i += 1;
    }

    let json = fs::read_to_string(input).with_context(|| format!("failed to read {}", input))?;
    let mut board: Board =
        serde_json::from_str(&json).with_context(|| format!("failed to parse board {}", input))?;
    // A loaded board has no rebuild schedule yet
    for layer in &layers {
        board.invalidate_planes(Some(*layer));
    }

    let filter = (!layers.is_empty()).then_some(&layers);
    let mut builder = PlaneFragmentsBuilder::new();
    let Some(summary) = builder
        .run_synchronously(&mut board, filter)
        .context("plane fill failed")?
    else {
        eprintln!("No planes to fill");
        return Ok(());
    };

    eprintln!(
        "Filled {} planes on {} layers: {} fragments in {:.2}ms",
        summary.planes,
        summary.layers.len(),
        summary.fragments,
        summary.elapsed_ms
    );
    for warning in &summary.warnings {
        eprintln!("  WARNING: {}", serde_json::to_string(warning)?);
    }
    if summary_only {
        return Ok(());
    }

    let text = if fragments_only {
        let fragments: BTreeMap<_, _> = board
            .planes
            .values()
            .map(|p| (p.uuid, &p.fragments))
            .collect();
        serde_json::to_string_pretty(&fragments)?
    } else {
        serde_json::to_string_pretty(&board)?
    };
    match output {
        Some(path) => fs::write(&path, text).with_context(|| format!("failed to write {}", path))?,
        None => println!("{}", text),
    }
    Ok(())
}
