mod detector;
mod http;
mod model;
mod output;
mod uploader;

use anyhow::Result;
use api::{DetectionEvent, EyePair, GazeFrame};
use common::config::PipelineConfig;
use common::{
    clamp_to_viewport, preprocess, CaptureSession, GazeEstimator, InferenceError, OutputAdapter,
    PreprocessError, ValidityTracker,
};
use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use detector::DetectorSubscription;
use model::OrtGazeModel;
use output::UdpGazeOutput;
use uploader::{HttpUploader, NoopUploader};

fn load_config(path: &Path) -> Result<PipelineConfig> {
    if path.exists() {
        info!("Loading config from {:?}", path);
        let file = fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    } else {
        info!("Config not found. Creating default at {:?}", path);
        let config = PipelineConfig::default();
        let file = fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &config)?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    info!("Starting gazed...");

    let config_path = Path::new("config.json");
    let config = load_config(config_path).unwrap_or_else(|e| {
        error!("Failed to load config: {}. Using defaults.", e);
        PipelineConfig::default()
    });
    info!("Loaded Config: {:?}", config);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    // Shared pipeline state
    let tracker = Arc::new(ValidityTracker::new(config.validity.invalidation_timeout()));
    let estimator = Arc::new(GazeEstimator::new());
    let session = Arc::new(CaptureSession::new(
        &config.capture.owner_tag,
        &config.capture.storage_dir,
    ));
    let latest_eyes: Arc<RwLock<Option<EyePair>>> = Arc::new(RwLock::new(None));
    let latest_gaze: Arc<RwLock<Option<GazeFrame>>> = Arc::new(RwLock::new(None));

    let uploader: Arc<dyn api::Uploader> = match &config.capture.upload_url {
        Some(url) => {
            info!("Uploading captures to {}", url);
            Arc::new(HttpUploader::new(url.clone()))
        }
        None => Arc::new(NoopUploader),
    };

    // The model loads alongside the rest of init; a bad artifact aborts
    // startup before the consumer loop ever calls predict.
    let loader = {
        let estimator = estimator.clone();
        let model_path = config.inference.model_path.clone();
        thread::spawn(move || -> Result<()> {
            let gaze_model = OrtGazeModel::load(Path::new(&model_path))?;
            if estimator.install_model(Box::new(gaze_model)).is_err() {
                anyhow::bail!("gaze model installed twice");
            }
            Ok(())
        })
    };

    let timeout_task = tracker.spawn_timeout_task(config.validity.check_period());

    {
        let state = http::ControlState {
            tracker: tracker.clone(),
            latest_eyes: latest_eyes.clone(),
            latest_gaze: latest_gaze.clone(),
            session: session.clone(),
            uploader: uploader.clone(),
        };
        let control = config.control.clone();
        thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
            rt.block_on(async {
                if let Err(e) = http::serve(control, state).await {
                    error!("Control host failed: {}", e);
                }
            });
        });
    }

    let (tx, rx) = sync_channel::<DetectionEvent>(1);
    let subscription = DetectorSubscription::attach(config.detector.listen_port, tx, running.clone())?;

    match loader.join() {
        Ok(Ok(())) => info!("Gaze model ready"),
        Ok(Err(e)) => {
            error!("Failed to load gaze model: {:#}", e);
            return Err(e);
        }
        Err(_) => anyhow::bail!("Model loader thread panicked"),
    }

    let mut gaze_output = UdpGazeOutput::new(format!(
        "{}:{}",
        config.output.send_address, config.output.send_port
    ));
    gaze_output.initialize()?;

    info!("Entering Main Loop (Consumer)...");

    let viewport = config.viewport.size();
    let pointer_size = config.viewport.pointer_size;

    let mut frame_count: u64 = 0;
    let mut log_interval: u64 = 1000;
    let mut last_log = std::time::Instant::now();
    let mut last_frame_time = std::time::Instant::now();
    let target_frame_duration = config.max_fps.map(|fps| Duration::from_secs_f32(1.0 / fps));

    while running.load(Ordering::SeqCst) {
        let event = match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => event,
            Err(_) => continue,
        };

        tracker.on_detection_event(&event);

        let Some(eyes) = event.usable_eyes() else {
            continue;
        };

        // Freshest pair for the capture trigger, read at call time over HTTP.
        if let Ok(mut cache) = latest_eyes.write() {
            *cache = Some(eyes.clone());
        }

        let tensor = match preprocess(&eyes.first, &eyes.second) {
            Ok(tensor) => tensor,
            Err(PreprocessError::RegionTooSmall { .. }) => {
                debug!("Eye regions below minimum size, skipping frame");
                continue;
            }
            Err(e @ PreprocessError::MalformedBuffer { .. }) => {
                warn!("Detector delivered a malformed buffer: {}", e);
                continue;
            }
        };

        let raw = match estimator.predict(&tensor) {
            Ok(raw) => raw,
            Err(e @ (InferenceError::Busy | InferenceError::ModelNotReady)) => {
                debug!("Prediction skipped: {}", e);
                continue;
            }
            Err(e) => {
                error!("Prediction failed: {}", e);
                continue;
            }
        };

        let screen = clamp_to_viewport(raw, viewport, pointer_size);
        let frame = GazeFrame {
            eyes_present: tracker.is_valid(),
            raw,
            screen,
        };

        if let Ok(mut slot) = latest_gaze.write() {
            *slot = Some(frame);
        }
        if let Err(e) = gaze_output.send(&frame) {
            error!("Failed to send gaze frame: {}", e);
        }

        frame_count += 1;
        if frame_count.is_multiple_of(log_interval) {
            let elapsed = last_log.elapsed().as_secs_f32();
            let fps = log_interval as f32 / elapsed;
            info!(
                "Tracking Active: Processed {} frames (approx {:.1} FPS)",
                frame_count, fps
            );
            last_log = std::time::Instant::now();

            if frame_count >= 1_000_000 {
                log_interval = 1_000_000;
            } else if frame_count >= 100_000 {
                log_interval = 100_000;
            } else if frame_count >= 10_000 {
                log_interval = 10_000;
            }
        }

        if let Some(target_duration) = target_frame_duration {
            let elapsed = last_frame_time.elapsed();
            if elapsed < target_duration {
                thread::sleep(target_duration - elapsed);
            }
        }
        last_frame_time = std::time::Instant::now();
    }

    info!("Shutting down...");
    subscription.shutdown();
    timeout_task.shutdown();
    Ok(())
}
