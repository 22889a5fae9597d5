//! Render-loop benchmark.
//!
//! Drives `Engine::process_frame` directly, without queues, so that native
//! profilers (samply, Instruments, perf) see only the engine.

use colored::Colorize;
use cvseq_core::events::DiscardEvents;
use cvseq_core::{CHANNEL_COUNT, ChannelMode, Engine, MAX_STEPS, SequencerState};
use std::hint::black_box;
use std::time::{Duration, Instant};

const BENCH_SEED: u64 = 0xbe7c_4000;

const ALL_MODES: [ChannelMode; 6] = [
    ChannelMode::Trigger,
    ChannelMode::Pitch,
    ChannelMode::Lfo,
    ChannelMode::SampleHold,
    ChannelMode::Ramp,
    ChannelMode::Clock,
];

#[derive(Debug, Clone)]
pub struct BenchReport {
    pub frames: u64,
    pub sample_rate: f32,
    pub elapsed: Duration,
}

impl BenchReport {
    pub fn ns_per_frame(&self) -> f64 {
        self.elapsed.as_nanos() as f64 / self.frames.max(1) as f64
    }

    pub fn realtime_budget_ns(&self) -> f64 {
        1_000_000_000.0 / self.sample_rate as f64
    }

    /// Percentage of the real-time budget spent per frame.
    pub fn budget_usage(&self) -> f64 {
        (self.ns_per_frame() / self.realtime_budget_ns()) * 100.0
    }
}

fn run_engine(engine: &mut Engine, frames: u64) {
    let mut sink = DiscardEvents;
    for _ in 0..frames {
        black_box(engine.process_frame(&mut sink));
    }
}

pub fn run_benchmark(
    state: &SequencerState,
    frames: u64,
    sample_rate: f32,
    warmup: u64,
) -> BenchReport {
    let mut engine = Engine::new(sample_rate, Box::new(state.clone()), BENCH_SEED);
    engine.start();

    println!(
        "Running benchmark: {} frames ({:.2}s at {}Hz), {} channels",
        frames,
        frames as f64 / sample_rate as f64,
        sample_rate,
        CHANNEL_COUNT
    );
    println!("  Warmup: {} frames", warmup);

    print!("Warming up...");
    run_engine(&mut engine, warmup);
    println!(" done");

    print!("Benchmarking...");
    let start = Instant::now();
    run_engine(&mut engine, frames);
    let elapsed = start.elapsed();
    println!(" done\n");

    BenchReport {
        frames,
        sample_rate,
        elapsed,
    }
}

pub fn print_report(report: &BenchReport) {
    let ns_per_frame = report.ns_per_frame();
    let budget_usage = report.budget_usage();

    println!("Results:");
    println!("  Total time:     {:?}", report.elapsed);
    println!("  Frames:         {}", report.frames);
    println!("  ns/frame:       {:.2}", ns_per_frame);
    println!("  frames/sec:     {:.0}", 1_000_000_000.0 / ns_per_frame);
    println!(
        "  Real-time budget: {:.2} ns/frame @ {}Hz",
        report.realtime_budget_ns(),
        report.sample_rate
    );
    println!("  Budget usage:   {:.2}%", budget_usage);

    if budget_usage > 100.0 {
        println!("\n  {}", "⚠️  WARNING: Exceeds real-time budget!".red().bold());
    } else {
        println!(
            "\n  {}",
            format!(
                "✓ Within real-time budget ({:.1}x headroom)",
                100.0 / budget_usage
            )
            .green()
        );
    }
}

/// All eight channels in `mode` with every step active.
fn mode_state(mode: ChannelMode) -> SequencerState {
    let mut state = SequencerState::default();
    for channel in 0..CHANNEL_COUNT {
        state.channels[channel].mode = mode;
        for step in 0..MAX_STEPS {
            state.patterns.set(channel, step, true);
        }
    }
    state
}

pub fn run_per_mode(frames: u64, sample_rate: f32) -> Vec<(ChannelMode, BenchReport)> {
    ALL_MODES
        .iter()
        .map(|&mode| {
            let mut engine = Engine::new(sample_rate, Box::new(mode_state(mode)), BENCH_SEED);
            engine.start();
            let start = Instant::now();
            run_engine(&mut engine, frames);
            let report = BenchReport {
                frames,
                sample_rate,
                elapsed: start.elapsed(),
            };
            (mode, report)
        })
        .collect()
}

pub fn print_mode_table(results: &[(ChannelMode, BenchReport)]) {
    println!("\nPer-mode timing (all channels in one mode):");
    println!("  {:12} {:>10} {:>10}", "Mode", "ns/frame", "Budget%");
    println!("  {:-<12} {:-<10} {:-<10}", "", "", "");
    for (mode, report) in results {
        let usage = format!("{:>10.2}", report.budget_usage());
        let usage = if report.budget_usage() > 100.0 {
            usage.red()
        } else {
            usage.normal()
        };
        println!(
            "  {:12} {:>10.2} {}",
            format!("{:?}", mode),
            report.ns_per_frame(),
            usage
        );
    }
}
