//! plate-scan - scan still images (or a directory of them) for vehicle plates.
//!
//! Frames are served by `StillImageDevice`, recognized with `ImageprocEngine`
//! plus an external OCR command, and every detection is printed as one JSON
//! line on stdout. If the OCR command cannot be started within the init
//! timeout the recognizer runs in fallback mode.

mod delegate;

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use plate_capture_core::{
    CaptureConfiguration, EngineHandle, ExecutionContext, FrameSource, PlateRecognizer, RecognizerConfig,
    ScanSession, VisionEngine,
};
use plate_capture_imaging::{CommandTextReader, ImageprocEngine, StillImageDevice};

use delegate::JsonLinesDelegate;

#[derive(Parser, Debug)]
#[command(name = "plate-scan", about = "Scan images for vehicle number plates")]
struct Args {
    /// Image files, or a single directory of PNG/JPEG files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Interval between snapshots.
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// OCR command line; reads a PNG on stdin, prints text on stdout.
    /// Defaults to tesseract in single-line mode.
    #[arg(long)]
    ocr_command: Option<String>,

    /// Skip the vision engine and run in fallback mode.
    #[arg(long)]
    no_engine: bool,

    /// Seed for fallback detections.
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many snapshots (default: run until Ctrl-C).
    #[arg(long)]
    frames: Option<u64>,

    /// Bound on the wait for the vision engine.
    #[arg(long, default_value_t = 5000)]
    init_timeout_ms: u64,
}

fn reader_from(command: Option<&str>) -> Result<CommandTextReader> {
    let Some(command) = command else {
        return Ok(CommandTextReader::tesseract());
    };
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("--ocr-command is empty");
    };
    Ok(CommandTextReader::new(program, parts))
}

fn device_from(inputs: &[PathBuf]) -> Result<StillImageDevice> {
    match inputs {
        [dir] if dir.is_dir() => StillImageDevice::from_directory(dir)
            .with_context(|| format!("failed to list {}", dir.display())),
        paths => Ok(StillImageDevice::from_paths(paths.iter().cloned())),
    }
}

fn engine_from(args: &Args) -> Result<EngineHandle> {
    if args.no_engine {
        log::info!("Vision engine disabled");
        return Ok(EngineHandle::absent());
    }
    let reader = reader_from(args.ocr_command.as_deref())?;
    Ok(EngineHandle::with_loader(move || {
        reader
            .probe()
            .then(|| Arc::new(ImageprocEngine::new(reader.clone())) as Arc<dyn VisionEngine>)
    }))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let device = device_from(&args.inputs)?;
    let config = RecognizerConfig {
        init_timeout_ms: args.init_timeout_ms,
        fallback_seed: args.seed,
        ..RecognizerConfig::default()
    };
    let recognizer = Arc::new(PlateRecognizer::new(engine_from(&args)?, config)?);

    let source = FrameSource::new(device, ExecutionContext::local());
    log::info!("Capture session {}", source.session_id());

    let mut session = ScanSession::new(source, Arc::clone(&recognizer))
        .with_interval(Duration::from_millis(args.interval_ms));
    session.set_delegate(Arc::new(JsonLinesDelegate));

    let dims = session
        .start(&CaptureConfiguration::default())
        .context("failed to start capture")?;
    log::info!("Scanning {}x{} frames", dims.width, dims.height);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("error setting Ctrl-C handler")?;

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                log::info!("Shutdown signal received");
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
        if args.frames.is_some_and(|limit| session.stats().ticks >= limit) {
            break;
        }
    }

    session.stop();

    let summary = serde_json::json!({
        "scan": session.stats(),
        "metrics": recognizer.metrics(),
        "diagnostics": recognizer.diagnostics(),
    });
    eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
