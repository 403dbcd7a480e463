// crates/zigbee-rs/tests/simulator/transport.rs
use zigbee_rs::{BridgeTransport, ZigbeeError};

/// A serial link that records every frame written to it.
pub struct SimulatedTransport {
    pub frames: Vec<Vec<u8>>,
    pub available: bool,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            available: true,
        }
    }
}

impl BridgeTransport for SimulatedTransport {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), ZigbeeError> {
        if !self.available {
            return Err(ZigbeeError::TransportUnavailable);
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
