use anyhow::{Context, Result};
use api::GazeFrame;
use common::OutputAdapter;
use log::info;
use std::net::UdpSocket;

/// Publishes gaze frames as JSON datagrams for whatever renders the pointer.
pub struct UdpGazeOutput {
    socket: Option<UdpSocket>,
    target_address: String,
}

impl UdpGazeOutput {
    pub fn new(target_address: String) -> Self {
        Self {
            socket: None,
            target_address,
        }
    }
}

impl OutputAdapter for UdpGazeOutput {
    fn initialize(&mut self) -> Result<()> {
        // Bind to 0.0.0.0:0 to let OS pick a port
        let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind UDP socket")?;
        socket
            .connect(&self.target_address)
            .context(format!("Failed to connect to {}", self.target_address))?;
        socket
            .set_nonblocking(true)
            .context("Failed to set non-blocking mode")?;

        self.socket = Some(socket);
        info!("Gaze output initialized. Target: {}", self.target_address);
        Ok(())
    }

    fn send(&self, frame: &GazeFrame) -> Result<()> {
        if let Some(socket) = &self.socket {
            let json_data = serde_json::to_vec(frame)?;
            socket.send(&json_data)?;
        }
        Ok(())
    }
}
