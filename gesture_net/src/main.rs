//! Offline raw-model readout: score simulated windows and print a confusion
//! matrix, or dump the reference weights as JSON.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use emg_stream::{Gesture, SignalSimulator, GESTURE_COUNT};
use gesture_net::{argmax, load_model, ModelSource, NetResult, TemplateNet};
use tracing_subscriber::EnvFilter;

/// Evaluate a gesture model against the EMG simulator.
#[derive(Parser, Debug)]
#[command(name = "gesture_eval", version, about)]
struct Args {
    /// JSON weights file (defaults to the bundled reference weights)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Windows drawn per gesture
    #[arg(long, default_value_t = 50)]
    per_class: usize,

    /// Simulator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the reference weights to this path and exit
    #[arg(long, value_name = "PATH")]
    dump_reference: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let args = Args::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║          EMG Gesture Model — Raw Readout                 ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> NetResult<()> {
    if let Some(path) = args.dump_reference {
        let json = TemplateNet::reference().to_json_pretty()?;
        std::fs::write(&path, json).map_err(|source| gesture_net::NetError::Io {
            path: path.clone(),
            source,
        })?;
        println!("  ✓  Reference weights written to '{}'\n", path.display());
        return Ok(());
    }

    let source = args.model.map(ModelSource::File).unwrap_or_default();
    let model  = load_model(&source)?;
    let mut sim = match args.seed {
        Some(s) => SignalSimulator::with_seed(s),
        None    => SignalSimulator::new(),
    };
    let n = args.per_class.max(1);

    // confusion[actual][predicted]
    let mut confusion = [[0usize; GESTURE_COUNT]; GESTURE_COUNT];
    for g in Gesture::ALL {
        for _ in 0..n {
            let scores = model.predict(&sim.generate(g).window.into_tensor())?;
            if let Some(p) = argmax(&scores) {
                confusion[g.index()][p] += 1;
            }
        }
    }

    println!("  Model: {}   ({} windows per gesture)", model.name(), n);
    println!();
    print!("  {:>8} │", "actual");
    for g in Gesture::ALL { print!(" {:>6}", g.label()); }
    println!("  │ recall");
    println!("  ─────────┼{}──┼───────", "─".repeat(7 * GESTURE_COUNT));

    let mut correct = 0;
    for g in Gesture::ALL {
        let row = &confusion[g.index()];
        print!("  {:>8} │", g.label());
        for c in row { print!(" {:>6}", c); }
        let hit = row[g.index()];
        correct += hit;
        println!("  │ {:>5.1}%", 100.0 * hit as f32 / n as f32);
    }
    println!();
    println!(
        "  Overall accuracy: {:.1}%",
        100.0 * correct as f32 / (n * GESTURE_COUNT) as f32
    );
    println!();
    Ok(())
}
