use api::{EyePair, GazeFrame, PositionTag, Uploader};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use common::config::ControlConfig;
use common::{CaptureSession, ValidityTracker};
use log::{info, warn};
use mdns_sd::{ServiceDaemon, ServiceInfo};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;

/// Shared pipeline state the control surface reads. Handlers always go
/// through these live handles, never through values captured at startup.
#[derive(Clone)]
pub struct ControlState {
    pub tracker: Arc<ValidityTracker>,
    pub latest_eyes: Arc<RwLock<Option<EyePair>>>,
    pub latest_gaze: Arc<RwLock<Option<GazeFrame>>>,
    pub session: Arc<CaptureSession>,
    pub uploader: Arc<dyn Uploader>,
}

pub fn get_router(state: ControlState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/captures", get(captures_handler))
        .route("/capture", post(capture_body_handler))
        .route("/capture/:position", post(capture_handler))
        .with_state(state)
}

pub async fn serve(config: ControlConfig, state: ControlState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    info!("Control host listening on http://{}", local_addr);

    let _mdns = if config.mdns {
        match advertise(local_addr.port()) {
            Ok(daemon) => Some(daemon),
            Err(e) => {
                warn!("Failed to advertise control host via mDNS: {}", e);
                None
            }
        }
    } else {
        None
    };

    axum::serve(listener, get_router(state)).await?;
    Ok(())
}

fn advertise(port: u16) -> anyhow::Result<ServiceDaemon> {
    let mdns = ServiceDaemon::new()?;
    let service_type = "_gazed._tcp.local.";
    let instance_name = "gazed";
    let host_name = format!("gazed_{}.local.", port);
    let properties = [("txtvers", "1")];

    let service_info = ServiceInfo::new(
        service_type,
        instance_name,
        &host_name,
        "",
        port,
        &properties[..],
    )?
    .enable_addr_auto();

    mdns.register(service_info)?;
    info!(
        "Advertised control host via mDNS: {} on port {}",
        instance_name, port
    );
    Ok(mdns)
}

async fn status_handler(State(state): State<ControlState>) -> Json<Value> {
    let gaze = state.latest_gaze.read().unwrap().clone();
    Json(json!({
        "status": "ok",
        "eyes_present": state.tracker.is_valid(),
        "gaze": gaze,
        "captures": state.session.counts(),
    }))
}

async fn captures_handler(State(state): State<ControlState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "captures": state.session.counts(),
    }))
}

#[derive(Debug, serde::Deserialize)]
struct CapturePayload {
    position: String,
}

async fn capture_handler(
    State(state): State<ControlState>,
    Path(position): Path<String>,
) -> Json<Value> {
    trigger_capture(&state, &position)
}

async fn capture_body_handler(
    State(state): State<ControlState>,
    payload: Option<Json<CapturePayload>>,
) -> Json<Value> {
    let Some(Json(payload)) = payload else {
        return Json(json!({
            "status": "missing_position",
        }));
    };
    trigger_capture(&state, &payload.position)
}

fn trigger_capture(state: &ControlState, position: &str) -> Json<Value> {
    let Ok(position) = position.parse::<PositionTag>() else {
        return Json(json!({
            "status": "unknown_position",
            "position": position,
        }));
    };

    if !state.tracker.is_valid() {
        return Json(json!({
            "status": "no_eyes",
            "position": position.to_string(),
        }));
    }

    // Read the freshest detection at trigger time, never a stale snapshot.
    let eyes = state.latest_eyes.read().unwrap().clone();
    let Some(eyes) = eyes else {
        return Json(json!({
            "status": "no_eyes",
            "position": position.to_string(),
        }));
    };

    // Fire-and-forget; the worker thread owns the writes and the upload.
    let _ = state
        .session
        .capture(position, eyes, state.uploader.clone());

    Json(json!({
        "status": "capturing",
        "position": position.to_string(),
        "clicks": state.session.clicks(position),
    }))
}
