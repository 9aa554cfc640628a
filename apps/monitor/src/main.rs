use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use laya_analyzer::{AnalysisPipeline, TempoMode};
use laya_audio::MicSource;
use laya_domain::AnalyserConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Listen on the default microphone and report tempo and key")]
struct Args {
    /// How long to listen, in seconds
    #[arg(long, default_value_t = 10)]
    duration: u64,
    /// Emit one JSON object per second instead of plain text
    #[arg(long)]
    json: bool,
    /// Use the simple global-threshold tempo strategy
    #[arg(long)]
    threshold_peak: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    bpm: u16,
    key: &'a str,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mode = if args.threshold_peak {
        TempoMode::ThresholdPeak
    } else {
        TempoMode::SpectralFlux
    };
    let source = MicSource::new(AnalyserConfig::default());
    let mut pipeline = AnalysisPipeline::with_mode(Box::new(source), mode);
    pipeline.start()?;
    info!(duration = args.duration, ?mode, "listening");

    let tick_interval = Duration::from_millis(16);
    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let mut last_report = Instant::now();
    while Instant::now() < deadline {
        pipeline.tick();
        if last_report.elapsed() >= Duration::from_secs(1) {
            let output = pipeline.output();
            if args.json {
                let report = Report {
                    bpm: output.bpm,
                    key: output.key_label(),
                };
                println!("{}", serde_json::to_string(&report)?);
            } else {
                let bpm = if output.bpm == 0 {
                    "--".to_string()
                } else {
                    output.bpm.to_string()
                };
                let key = if output.key_label().is_empty() {
                    "--"
                } else {
                    output.key_label()
                };
                println!("bpm {bpm:>3}  key {key:>2}");
            }
            last_report = Instant::now();
        }
        thread::sleep(tick_interval);
    }
    pipeline.stop();
    Ok(())
}
