use api::DetectionEvent;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct ValidityState {
    eyes_present: bool,
    last_seen: Option<Instant>,
}

/// Debounced "eyes currently tracked" flag. A usable detection sets the flag
/// and refreshes the deadline. A miss never clears it directly; only the
/// timeout check does, so single-frame detector dropouts don't flicker the
/// downstream state.
pub struct ValidityTracker {
    state: Mutex<ValidityState>,
    invalidation_timeout: Duration,
}

impl ValidityTracker {
    pub fn new(invalidation_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(ValidityState {
                eyes_present: false,
                last_seen: None,
            }),
            invalidation_timeout,
        }
    }

    pub fn on_detection_event(&self, event: &DetectionEvent) {
        self.on_detection_event_at(event, Instant::now());
    }

    pub fn on_detection_event_at(&self, event: &DetectionEvent, now: Instant) {
        if !event.is_usable() {
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            if !state.eyes_present {
                debug!("Eyes acquired");
            }
            state.eyes_present = true;
            state.last_seen = Some(now);
        }
    }

    /// Clears the flag once the last usable detection is older than the
    /// invalidation timeout. Runs on the tracker's own timer task.
    pub fn check_timeout(&self, now: Instant) {
        if let Ok(mut state) = self.state.lock() {
            let Some(last_seen) = state.last_seen else {
                return;
            };
            if state.eyes_present && now.duration_since(last_seen) > self.invalidation_timeout {
                state.eyes_present = false;
                debug!(
                    "Eyes lost: no usable detection within {:?}",
                    self.invalidation_timeout
                );
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.eyes_present)
            .unwrap_or(false)
    }

    /// Spawn the periodic invalidation check. The returned handle owns the
    /// timer thread; it is attached once during startup and joined on
    /// shutdown (or on drop).
    pub fn spawn_timeout_task(self: &Arc<Self>, period: Duration) -> TimeoutTask {
        let tracker = Arc::clone(self);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            info!("Validity timeout task started (period {:?})", period);
            let tick = Duration::from_millis(100);
            let mut elapsed = Duration::ZERO;
            while !stop_flag.load(Ordering::SeqCst) {
                thread::sleep(tick);
                elapsed += tick;
                if elapsed >= period {
                    tracker.check_timeout(Instant::now());
                    elapsed = Duration::ZERO;
                }
            }
        });

        TimeoutTask {
            stop,
            handle: Some(handle),
        }
    }
}

/// Handle to the tracker-owned timer thread.
pub struct TimeoutTask {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimeoutTask {
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimeoutTask {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
