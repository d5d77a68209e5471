//! hand_demo: interactive entry point.

use std::path::PathBuf;

use clap::Parser;
use hand_demo::app::run;
use hand_demo::config::DemoConfig;
use hand_demo::inference::DecisionPolicy;
use hand_demo::DemoError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Real-time EMG gesture demo with an articulated 3D hand.
#[derive(Parser, Debug)]
#[command(name = "hand_demo", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show the model's own arg-max instead of the selected gesture
    #[arg(long)]
    raw_model: bool,

    /// JSON weights file (defaults to the built-in template network)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Seed for the signal simulator and confidence jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Inference interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Window width
    #[arg(long)]
    width: Option<usize>,

    /// Window height
    #[arg(long)]
    height: Option<usize>,

    /// Skip the config file and start with defaults
    #[arg(long)]
    quick: bool,
}

impl Cli {
    fn into_config(self) -> Result<DemoConfig, DemoError> {
        let mut cfg = match (&self.config, self.quick) {
            (Some(path), false) => DemoConfig::load(path)?,
            _ => DemoConfig::default(),
        };

        if self.raw_model { cfg.inference.policy = DecisionPolicy::RawModel; }
        if let Some(m)  = self.model       { cfg.inference.model = Some(m); }
        if let Some(s)  = self.seed        { cfg.inference.seed = Some(s); }
        if let Some(ms) = self.interval_ms { cfg.inference.interval_ms = ms; }
        if let Some(w)  = self.width       { cfg.window.width = w; }
        if let Some(h)  = self.height      { cfg.window.height = h; }
        Ok(cfg)
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║       EMG Gesture Demo — Real-Time Articulated Hand          ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let cfg = match cli.into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cfg.inference.policy {
        DecisionPolicy::DemoGuaranteed => println!("  Mode: demo-guaranteed  (use --raw-model for the raw readout)"),
        DecisionPolicy::RawModel       => println!("  Mode: raw model"),
    }
    match &cfg.inference.model {
        Some(p) => println!("  Model: {}", p.display()),
        None    => println!("  Model: built-in template network"),
    }
    println!("  Keys:  1-5 or R/F/O/P/I select a gesture, Q quits");
    println!();
    println!("  Opening visualizer window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
