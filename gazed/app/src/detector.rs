use anyhow::{Context, Result};
use api::DetectionEvent;
use log::{info, warn};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Owns the detector's event feed. Attached exactly once during startup and
/// torn down on shutdown; no global "listener registered" flag anywhere.
pub struct DetectorSubscription {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl DetectorSubscription {
    pub fn attach(
        listen_port: u16,
        tx: SyncSender<DetectionEvent>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let addr = format!("0.0.0.0:{}", listen_port);
        let socket = UdpSocket::bind(&addr)
            .with_context(|| format!("Failed to bind detector socket on {}", addr))?;
        socket
            .set_read_timeout(Some(Duration::from_millis(500)))
            .context("Failed to set detector socket timeout")?;
        info!("Listening for detection events on {}", addr);

        let thread_running = running.clone();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 65535]; // Max UDP size
            while thread_running.load(Ordering::SeqCst) {
                let amt = match socket.recv_from(&mut buf) {
                    Ok((amt, _src)) => amt,
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                        continue;
                    }
                    Err(e) => {
                        warn!("Detector socket error: {}", e);
                        continue;
                    }
                };

                match serde_json::from_slice::<DetectionEvent>(&buf[..amt]) {
                    Ok(event) => {
                        // Bounded channel: if the consumer is still busy the
                        // send fails and this frame is dropped. Only the
                        // latest detection state matters.
                        let _ = tx.try_send(event);
                    }
                    Err(e) => warn!("Failed to deserialize detection event: {}", e),
                }
            }
        });

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    pub fn shutdown(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
