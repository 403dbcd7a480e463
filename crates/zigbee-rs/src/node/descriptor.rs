// crates/zigbee-rs/src/node/descriptor.rs
//! The descriptor walk of one node: node descriptor, then one simple
//! descriptor per active endpoint, then the power descriptor.
//!
//! The walk is a small state machine that only decides which command comes
//! next. Sending, correlating and retrying are up to its owner (bring-up for
//! the coordinator, the network for joined devices).

use crate::bridge::{BridgeCommand, ResponsePayload};
use crate::hal::ZigbeeError;
use crate::zdp::{NodeDescriptor, PowerDescriptor, SimpleDescriptor};
use alloc::vec::Vec;
use log::{debug, trace};

/// Everything learnt by a completed walk.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorSet {
    pub node_descriptor: NodeDescriptor,
    pub active_endpoints: Vec<u8>,
    pub simple_descriptors: Vec<SimpleDescriptor>,
    pub power_descriptor: PowerDescriptor,
}

/// Position of the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    NodeDescriptor,
    /// Index into the active endpoint list.
    SimpleDescriptor(usize),
    PowerDescriptor,
    Done,
}

/// What the owner has to do after feeding a response into the walk.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkProgress {
    /// Send this command next.
    Next(BridgeCommand),
    Finished(DescriptorSet),
}

#[derive(Debug, Clone)]
pub struct DescriptorWalk {
    short_address: u16,
    step: WalkStep,
    node_descriptor: Option<NodeDescriptor>,
    active_endpoints: Vec<u8>,
    simple_descriptors: Vec<SimpleDescriptor>,
}

impl DescriptorWalk {
    pub fn new(short_address: u16) -> Self {
        Self {
            short_address,
            step: WalkStep::NodeDescriptor,
            node_descriptor: None,
            active_endpoints: Vec::new(),
            simple_descriptors: Vec::new(),
        }
    }

    pub fn short_address(&self) -> u16 {
        self.short_address
    }

    /// The node changed its short address while the walk was running.
    pub fn set_short_address(&mut self, short_address: u16) {
        self.short_address = short_address;
    }

    pub fn step(&self) -> WalkStep {
        self.step
    }

    /// The command for the current step. Used both to start the walk and to
    /// retry a failed step. `None` once the walk is done.
    pub fn current_command(&self) -> Option<BridgeCommand> {
        let short_address = self.short_address;
        match self.step {
            WalkStep::NodeDescriptor => Some(BridgeCommand::NodeDescriptorRequest { short_address }),
            WalkStep::SimpleDescriptor(index) => {
                self.active_endpoints
                    .get(index)
                    .map(|endpoint| BridgeCommand::SimpleDescriptorRequest {
                        short_address,
                        endpoint: *endpoint,
                    })
            }
            WalkStep::PowerDescriptor => Some(BridgeCommand::PowerDescriptorRequest { short_address }),
            WalkStep::Done => None,
        }
    }

    /// Feeds the successful response of the current step into the walk.
    pub fn on_response(&mut self, payload: ResponsePayload) -> Result<WalkProgress, ZigbeeError> {
        match (self.step, payload) {
            (
                WalkStep::NodeDescriptor,
                ResponsePayload::NodeDescriptor {
                    short_address,
                    descriptor,
                    active_endpoints,
                },
            ) if short_address == self.short_address => {
                debug!(
                    "[ZDP] Node {:#06x}: node descriptor read, endpoints {:?}",
                    short_address, active_endpoints
                );
                self.node_descriptor = Some(descriptor);
                self.active_endpoints = active_endpoints;
                self.step = if self.active_endpoints.is_empty() {
                    WalkStep::PowerDescriptor
                } else {
                    WalkStep::SimpleDescriptor(0)
                };
            }
            (
                WalkStep::SimpleDescriptor(index),
                ResponsePayload::SimpleDescriptor {
                    short_address,
                    descriptor,
                },
            ) if short_address == self.short_address
                && self.active_endpoints.get(index) == Some(&descriptor.endpoint) =>
            {
                trace!(
                    "[ZDP] Node {:#06x}: simple descriptor of endpoint {} read",
                    short_address, descriptor.endpoint
                );
                self.simple_descriptors.push(descriptor);
                self.step = if index + 1 < self.active_endpoints.len() {
                    WalkStep::SimpleDescriptor(index + 1)
                } else {
                    WalkStep::PowerDescriptor
                };
            }
            (
                WalkStep::PowerDescriptor,
                ResponsePayload::PowerDescriptor {
                    short_address,
                    descriptor,
                },
            ) if short_address == self.short_address => {
                let node_descriptor = self.node_descriptor.ok_or(ZigbeeError::InvalidState)?;
                self.step = WalkStep::Done;
                debug!("[ZDP] Node {:#06x}: descriptor walk complete", short_address);
                return Ok(WalkProgress::Finished(DescriptorSet {
                    node_descriptor,
                    active_endpoints: core::mem::take(&mut self.active_endpoints),
                    simple_descriptors: core::mem::take(&mut self.simple_descriptors),
                    power_descriptor: descriptor,
                }));
            }
            _ => return Err(ZigbeeError::UnexpectedResponse),
        }
        self.current_command()
            .map(WalkProgress::Next)
            .ok_or(ZigbeeError::InvalidState)
    }
}
