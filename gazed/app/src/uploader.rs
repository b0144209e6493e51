use anyhow::{Context, Result};
use api::Uploader;
use log::debug;
use std::fs;
use std::path::Path;

/// POSTs capture files to the configured endpoint. Failures are logged by
/// the capture pipeline; local persistence is the durability guarantee.
pub struct HttpUploader {
    endpoint: String,
}

impl HttpUploader {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, local_path: &Path) -> Result<()> {
        let bytes = fs::read(local_path)
            .with_context(|| format!("Failed to read capture file: {:?}", local_path))?;
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("capture.json");
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), file_name);

        let response = ureq::post(&url)
            .set("Content-Type", "application/json")
            .send_bytes(&bytes)
            .with_context(|| format!("Upload request failed for {:?}", local_path))?;
        debug!("Uploaded {:?} ({})", local_path, response.status());
        Ok(())
    }
}

/// Stand-in when no upload endpoint is configured.
pub struct NoopUploader;

impl Uploader for NoopUploader {
    fn upload(&self, local_path: &Path) -> Result<()> {
        debug!(
            "No upload endpoint configured, keeping {:?} local only",
            local_path
        );
        Ok(())
    }
}
