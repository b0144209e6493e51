use api::{EyePair, EyeRegion, PositionTag, Uploader};
use anyhow::{Context, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

/// One stored eye image tagged with the on-screen target it was looking at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub position: PositionTag,
    pub timestamp_ms: u64,
    pub eye_index: u8,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    pub position: PositionTag,
    pub timestamp_ms: u64,
    pub stored: Vec<PathBuf>,
    pub clicks: u64,
}

/// Names are collision-free by construction: two captures can only collide
/// if they share position, eye index and millisecond.
pub fn capture_file_name(
    owner_tag: &str,
    position: PositionTag,
    eye_index: u8,
    timestamp_ms: u64,
) -> String {
    format!("{}_{}_{}_{}.json", owner_tag, position, eye_index, timestamp_ms)
}

/// Labeled-capture workflow: persists eye pairs under deterministic names,
/// counts clicks per target position and hands written files to the uploader.
pub struct CaptureSession {
    owner_tag: String,
    storage_dir: PathBuf,
    counts: RwLock<HashMap<PositionTag, u64>>,
}

impl CaptureSession {
    pub fn new(owner_tag: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            owner_tag: owner_tag.into(),
            storage_dir: storage_dir.into(),
            counts: RwLock::new(HashMap::new()),
        }
    }

    pub fn clicks(&self, position: PositionTag) -> u64 {
        self.counts
            .read()
            .map(|counts| counts.get(&position).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn counts(&self) -> HashMap<PositionTag, u64> {
        self.counts
            .read()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    /// Fire-and-forget: persists the pair on a worker thread and returns
    /// immediately. The pair must be the freshest detection available at the
    /// moment of the trigger; callers read it from the live cache, never from
    /// a snapshot taken when their handler was registered.
    pub fn capture(
        self: &Arc<Self>,
        position: PositionTag,
        eyes: EyePair,
        uploader: Arc<dyn Uploader>,
    ) -> JoinHandle<CaptureOutcome> {
        let session = Arc::clone(self);
        thread::spawn(move || {
            let timestamp_ms = now_ms();
            session.capture_at(position, &eyes, timestamp_ms, uploader.as_ref())
        })
    }

    /// Synchronous core of `capture`. Write failures are logged and skipped;
    /// the click counter advances either way, and every file that did reach
    /// disk is handed to the uploader. Upload failures are logged and do not
    /// undo local persistence.
    pub fn capture_at(
        &self,
        position: PositionTag,
        eyes: &EyePair,
        timestamp_ms: u64,
        uploader: &dyn Uploader,
    ) -> CaptureOutcome {
        let mut stored = Vec::with_capacity(2);
        for (eye_index, region) in [&eyes.first, &eyes.second].into_iter().enumerate() {
            match self.write_record(position, region, eye_index as u8, timestamp_ms) {
                Ok(path) => stored.push(path),
                Err(e) => error!("Failed to store capture for {}: {:#}", position, e),
            }
        }

        let clicks = self.increment(position);
        info!(
            "Captured {} ({} file(s), {} click(s) total)",
            position,
            stored.len(),
            clicks
        );

        for path in &stored {
            if let Err(e) = uploader.upload(path) {
                error!("Upload failed for {:?}: {:#}", path, e);
            }
        }

        CaptureOutcome {
            position,
            timestamp_ms,
            stored,
            clicks,
        }
    }

    fn write_record(
        &self,
        position: PositionTag,
        region: &EyeRegion,
        eye_index: u8,
        timestamp_ms: u64,
    ) -> Result<PathBuf> {
        if !self.storage_dir.exists() {
            fs::create_dir_all(&self.storage_dir)
                .with_context(|| format!("Failed to create capture dir: {:?}", self.storage_dir))?;
        }

        let record = CaptureRecord {
            position,
            timestamp_ms,
            eye_index,
            width: region.width,
            height: region.height,
            pixels: region.pixels.clone(),
        };

        let path = self.storage_dir.join(capture_file_name(
            &self.owner_tag,
            position,
            eye_index,
            timestamp_ms,
        ));
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create capture file: {:?}", path))?;
        serde_json::to_writer(std::io::BufWriter::new(file), &record)
            .with_context(|| format!("Failed to serialize capture record: {:?}", path))?;
        Ok(path)
    }

    fn increment(&self, position: PositionTag) -> u64 {
        match self.counts.write() {
            Ok(mut counts) => {
                let entry = counts.entry(position).or_insert(0);
                *entry += 1;
                *entry
            }
            Err(_) => 0,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
