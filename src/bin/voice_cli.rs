use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::Level;

use voice_frontend::config::AppConfig;
use voice_frontend::fixtures::{self, synth};
use voice_frontend::telemetry;
use voice_frontend::PipelineEvent;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("voice-cli error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Parser, Debug)]
#[command(
    name = "voice-cli",
    about = "Noise suppression and voice-activity diagnostics"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        match self.command {
            Command::Denoise(args) => denoise_command(args),
            Command::Analyze(args) => analyze_command(args),
            Command::Synth(args) => synth_command(args),
            Command::Live(args) => live_command(args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suppress noise in a WAV file and print a JSON report.
    Denoise(DenoiseArgs),
    /// Print pipeline events for a WAV file as JSON lines.
    Analyze(AnalyzeArgs),
    /// Write a synthetic noise + tone WAV file.
    Synth(SynthArgs),
    /// Process the default microphone (requires the capture feature).
    Live(LiveArgs),
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// JSON configuration file; defaults are used for missing fields.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> AppConfig {
        match &self.config {
            Some(path) => AppConfig::load_from_file(path),
            None => AppConfig::default(),
        }
    }
}

#[derive(Args, Debug, Clone)]
struct DenoiseArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    output: PathBuf,
    #[command(flatten)]
    config: ConfigArgs,
    /// Also write the report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct AnalyzeArgs {
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    config: ConfigArgs,
    /// Include a decision line for every non-speech frame.
    #[arg(long)]
    all_frames: bool,
}

#[derive(Args, Debug, Clone)]
struct SynthArgs {
    #[arg(long)]
    output: PathBuf,
    #[arg(long, default_value_t = 4.0)]
    seconds: f32,
    #[arg(long, default_value_t = 16_000)]
    sample_rate: u32,
    #[arg(long, default_value_t = 0.05)]
    noise: f32,
    #[arg(long, default_value_t = 1000.0)]
    tone_hz: f32,
    #[arg(long, default_value_t = 0.5)]
    tone_amplitude: f32,
    /// Seconds of noise before the tone starts.
    #[arg(long, default_value_t = 2.0)]
    tone_at: f32,
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Args, Debug, Clone)]
struct LiveArgs {
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    #[command(flatten)]
    config: ConfigArgs,
}

fn denoise_command(args: DenoiseArgs) -> Result<()> {
    let config = args.config.load();
    let report = fixtures::process_wav(&args.input, &args.output, &config.pipeline)?;
    let rendered = serde_json::to_string_pretty(&report)?;

    if let Some(path) = &args.report {
        std::fs::write(path, &rendered)
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    println!("{rendered}");
    Ok(())
}

fn analyze_command(args: AnalyzeArgs) -> Result<()> {
    let mut config = args.config.load();
    config.pipeline.report_decisions |= args.all_frames;

    let (samples, sample_rate) = fixtures::load_wav(&args.input)?;
    let pipeline_config = config.pipeline.with_sample_rate(sample_rate);
    let run = fixtures::run_pipeline(&pipeline_config, &samples)
        .with_context(|| format!("configuring pipeline for {}", args.input.display()))?;

    let seconds_per_hop = pipeline_config.hop_size as f32 / sample_rate as f32;
    for event in &run.events {
        println!("{}", event_line(event, seconds_per_hop));
    }
    println!(
        "{}",
        json!({ "event": "summary", "stats": run.stats, "telemetry": telemetry::hub().snapshot() })
    );
    Ok(())
}

/// One JSON line per event, without bulky sample payloads
fn event_line(event: &PipelineEvent, seconds_per_hop: f32) -> serde_json::Value {
    let time_s = event.frame_index() as f32 * seconds_per_hop;
    match event {
        PipelineEvent::NoiseProfileReady {
            frame_index,
            profile,
        } => json!({
            "event": "noise_profile_ready",
            "frame_index": frame_index,
            "time_s": time_s,
            "frames": profile.frames(),
            "mean_magnitude": profile.mean_magnitude(),
        }),
        PipelineEvent::VoiceActive(frame) => json!({
            "event": "voice_active",
            "frame_index": frame.frame_index,
            "time_s": time_s,
            "features": frame.decision.features,
            "cepstrum": frame.cepstrum,
        }),
        other => {
            let mut value = serde_json::to_value(other).unwrap_or_default();
            value["time_s"] = json!(time_s);
            value
        }
    }
}

fn synth_command(args: SynthArgs) -> Result<()> {
    let len = (args.seconds.max(0.0) * args.sample_rate as f32) as usize;
    let onset = (args.tone_at.max(0.0) * args.sample_rate as f32) as usize;
    let signal = synth::tone_after_noise(
        args.noise,
        args.tone_hz,
        args.tone_amplitude,
        args.sample_rate,
        len,
        onset,
        args.seed,
    );
    fixtures::write_wav(&args.output, &signal, args.sample_rate)?;
    println!(
        "{}",
        json!({ "output": args.output.display().to_string(), "samples": len, "sample_rate": args.sample_rate })
    );
    Ok(())
}

#[cfg(feature = "capture")]
fn live_command(args: LiveArgs) -> Result<()> {
    use std::time::{Duration, Instant};
    use tokio::sync::broadcast::error::TryRecvError;
    use voice_frontend::audio::{default_input_sample_rate, CaptureStream};
    use voice_frontend::PipelineHandle;

    let mut config = args.config.load();
    config.pipeline.sample_rate = default_input_sample_rate()?;

    let mut handle = PipelineHandle::spawn(config)?;
    let mut events = handle.subscribe();
    let sender = handle
        .take_sender()
        .context("pipeline input already taken")?;
    let capture = CaptureStream::start(sender)?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let seconds_per_hop = handle.config().hop_size as f32 / capture.sample_rate() as f32;
    let mut cleaned = Vec::new();
    while Instant::now() < deadline {
        loop {
            match events.try_recv() {
                Ok(event) => println!("{}", event_line(&event, seconds_per_hop)),
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!("[Live] Missed {} events", missed)
                }
                Err(_) => break,
            }
        }
        handle.pop_output(&mut cleaned);
        cleaned.clear();
        std::thread::sleep(Duration::from_millis(20));
    }

    let dropped = capture.dropped_samples();
    drop(capture);
    let stats = handle.stop()?;
    println!(
        "{}",
        json!({ "event": "summary", "stats": stats, "capture_dropped_samples": dropped })
    );
    Ok(())
}

#[cfg(not(feature = "capture"))]
fn live_command(_args: LiveArgs) -> Result<()> {
    anyhow::bail!("live capture requires building with `--features capture`")
}
