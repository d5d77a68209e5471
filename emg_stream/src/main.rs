//! Interactive explorer for the simulated EMG windows of each gesture.

use emg_stream::{
    channel_frequency, primary_channels, Gesture, SignalSimulator, CHANNELS, WINDOW_LEN,
};
use std::io::{self, BufRead, Write};

const TRACE_COLS: usize = 60;
const TRACE_ROWS: usize = 6;

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║        Simulated EMG Window Explorer                 ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut sim = SignalSimulator::new();

    loop {
        print_menu();
        let choice = match read_line("Select a gesture (1–5, or q to quit): ") {
            Some(line) => line,
            None       => { println!("\nGoodbye!\n"); break; }
        };

        if choice.trim().eq_ignore_ascii_case("q") {
            println!("\nGoodbye!\n");
            break;
        }

        let gesture = match choice.trim().parse::<usize>().ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(Gesture::from_index)
        {
            Some(g) => g,
            None    => { println!("  ⚠  Please enter 1–5 or q.\n"); continue; }
        };

        let out = sim.generate(gesture);

        println!();
        println!("  ┌─ {} ─", gesture);
        println!("  │  Primary channels : {:?}", primary_channels(gesture));
        println!("  │  Window           : {} samples × {} channels", WINDOW_LEN, CHANNELS);
        println!("  │  Mean amplitude   : {:.3}", out.window.mean_energy());
        println!("  │");
        for j in 0..CHANNELS {
            println!(
                "  │  CH{}  f={:.2} rad/sample  mean={:.3}  energy={:>5.1}%",
                j + 1,
                channel_frequency(gesture, j),
                out.window.channel_mean(j),
                out.energy.0[j],
            );
        }
        println!("  │");
        for j in 0..CHANNELS {
            println!("  │  CH{} trace (first {} samples):", j + 1, TRACE_COLS);
            for line in trace(out.window.samples().column(j).iter().copied()) {
                println!("  │    {}", line);
            }
        }
        println!("  └─");
        println!();
    }
}

/// Render the first `TRACE_COLS` samples as a coarse bar chart scaled to 1.0.
fn trace(samples: impl Iterator<Item = f32>) -> Vec<String> {
    let cols: Vec<f32> = samples.take(TRACE_COLS).collect();
    (0..TRACE_ROWS)
        .rev()
        .map(|row| {
            let level = (row as f32 + 0.5) / TRACE_ROWS as f32;
            cols.iter().map(|&v| if v >= level { '█' } else { ' ' }).collect::<String>()
        })
        .collect()
}

fn print_menu() {
    println!("  ┌──────────────────────────────────────────────────────┐");
    for (i, g) in Gesture::ALL.iter().enumerate() {
        println!("  │  {}. {:49} │", i + 1, g.label());
    }
    println!("  └──────────────────────────────────────────────────────┘");
    println!();
}

/// `None` once stdin is closed (or unreadable).
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    next_line(&mut io::stdin().lock())
}

fn next_line(input: &mut impl BufRead) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_)          => Some(buf),
    }
}
