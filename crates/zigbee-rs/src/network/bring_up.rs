// crates/zigbee-rs/src/network/bring_up.rs
//! The ordered command sequence that takes the controller from a cold start
//! to a running network.
//!
//! Every step is one bridge exchange. The machine only advances when the
//! exchange of the current step completed with a success status; any other
//! outcome ends the attempt. Restarting is left to the caller.

use crate::bridge::{BridgeCommand, FirmwareVersion, ResponsePayload};
use crate::correlator::ExchangeOutcome;
use crate::network::config::NetworkConfiguration;
use crate::node::descriptor::{DescriptorSet, DescriptorWalk, WalkProgress};
use crate::types::{ExtendedAddress, COORDINATOR_SHORT_ADDRESS};
use log::{debug, error, info, warn};

/// Steps of the bring-up, strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum StartingState {
    #[default]
    None,
    Erase,
    Reset,
    GetVersion,
    SetPanId,
    SetChannel,
    SetSecurity,
    StartNetwork,
    ReadNodeDescriptor,
    ReadSimpleDescriptor,
    ReadPowerDescriptor,
}

/// What bring-up learnt about the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct BringUpResult {
    pub firmware_version: Option<FirmwareVersion>,
    pub short_address: u16,
    pub extended_address: ExtendedAddress,
    pub channel: u8,
    pub descriptors: DescriptorSet,
}

/// What the owner has to do after feeding an outcome into the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum BringUpStep {
    /// Send this command as the next step.
    Issue(BridgeCommand),
    Complete(BringUpResult),
    /// The given step failed; the attempt is over.
    Failed(StartingState),
}

/// One bring-up attempt, working on a snapshot of the configuration taken
/// when the attempt started.
#[derive(Debug, Clone)]
pub struct BringUp {
    config: NetworkConfiguration,
    state: StartingState,
    firmware_version: Option<FirmwareVersion>,
    coordinator: Option<(ExtendedAddress, u8)>,
    walk: DescriptorWalk,
}

impl BringUp {
    pub fn new(config: NetworkConfiguration) -> Self {
        Self {
            config,
            state: StartingState::None,
            firmware_version: None,
            coordinator: None,
            walk: DescriptorWalk::new(COORDINATOR_SHORT_ADDRESS),
        }
    }

    pub fn state(&self) -> StartingState {
        self.state
    }

    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.firmware_version
    }

    /// Begins the attempt. Returns the command of the first step.
    pub fn start(&mut self) -> BridgeCommand {
        self.transition(StartingState::Erase);
        BridgeCommand::ErasePersistentData
    }

    /// Feeds the outcome of the current step's exchange into the machine.
    pub fn on_outcome(&mut self, outcome: ExchangeOutcome) -> BringUpStep {
        let payload = match outcome {
            ExchangeOutcome::Completed { status, payload } if status.is_success() => payload,
            ExchangeOutcome::Completed { status, .. } => {
                error!("[BRINGUP] Step {:?} rejected by the controller: {}", self.state, status);
                return self.fail();
            }
            ExchangeOutcome::TimedOut => {
                error!("[BRINGUP] Step {:?} timed out.", self.state);
                return self.fail();
            }
            ExchangeOutcome::Aborted => {
                warn!("[BRINGUP] Step {:?} aborted.", self.state);
                return self.fail();
            }
        };

        let next_state = match (self.state, payload) {
            (StartingState::Erase, _) => StartingState::Reset,
            (StartingState::Reset, _) => StartingState::GetVersion,
            (StartingState::GetVersion, ResponsePayload::Version(version)) => {
                info!("[BRINGUP] Controller firmware version {}", version);
                self.firmware_version = Some(version);
                StartingState::SetPanId
            }
            (StartingState::GetVersion, other) => {
                warn!("[BRINGUP] Version response without version: {:?}", other);
                StartingState::SetPanId
            }
            (StartingState::SetPanId, _) => StartingState::SetChannel,
            (StartingState::SetChannel, _) => StartingState::SetSecurity,
            (StartingState::SetSecurity, _) => StartingState::StartNetwork,
            (
                StartingState::StartNetwork,
                ResponsePayload::NetworkStarted {
                    short_address,
                    extended_address,
                    channel,
                },
            ) => {
                info!(
                    "[BRINGUP] Network started on channel {}: coordinator {} ({:#06x})",
                    channel, extended_address, short_address
                );
                self.coordinator = Some((extended_address, channel));
                self.walk = DescriptorWalk::new(short_address);
                StartingState::ReadNodeDescriptor
            }
            (
                StartingState::ReadNodeDescriptor
                | StartingState::ReadSimpleDescriptor
                | StartingState::ReadPowerDescriptor,
                payload,
            ) => return self.advance_walk(payload),
            (current, payload) => {
                warn!(
                    "[BRINGUP] Unexpected response in state {:?}: {:?}",
                    current, payload
                );
                return self.fail();
            }
        };

        self.transition(next_state);
        match self.command_for(next_state) {
            Some(command) => BringUpStep::Issue(command),
            None => self.fail(),
        }
    }

    fn advance_walk(&mut self, payload: ResponsePayload) -> BringUpStep {
        match self.walk.on_response(payload) {
            Ok(WalkProgress::Next(command)) => {
                let next_state = match command {
                    BridgeCommand::SimpleDescriptorRequest { .. } => StartingState::ReadSimpleDescriptor,
                    _ => StartingState::ReadPowerDescriptor,
                };
                self.transition(next_state);
                BringUpStep::Issue(command)
            }
            Ok(WalkProgress::Finished(descriptors)) => {
                let Some((extended_address, channel)) = self.coordinator else {
                    return self.fail();
                };
                info!("[BRINGUP] Coordinator descriptors read, bring-up complete.");
                let short_address = self.walk.short_address();
                self.transition(StartingState::None);
                BringUpStep::Complete(BringUpResult {
                    firmware_version: self.firmware_version,
                    short_address,
                    extended_address,
                    channel,
                    descriptors,
                })
            }
            Err(e) => {
                warn!("[BRINGUP] Descriptor walk failed in {:?}: {}", self.state, e);
                self.fail()
            }
        }
    }

    /// The command issued when entering `state`.
    fn command_for(&self, state: StartingState) -> Option<BridgeCommand> {
        match state {
            StartingState::None => None,
            StartingState::Erase => Some(BridgeCommand::ErasePersistentData),
            StartingState::Reset => Some(BridgeCommand::Reset),
            StartingState::GetVersion => Some(BridgeCommand::GetVersion),
            StartingState::SetPanId => Some(BridgeCommand::SetPanId {
                pan_id: self.config.pan_id,
                extended_pan_id: self.config.extended_pan_id,
            }),
            StartingState::SetChannel => Some(BridgeCommand::SetChannelMask(
                self.config.effective_channel_mask(),
            )),
            StartingState::SetSecurity => Some(BridgeCommand::SetSecurity {
                network_key: self.config.security.network_key.clone(),
                trust_center_link_key: self.config.security.trust_center_link_key.clone(),
                link_key_type: self.config.security.link_key_type,
            }),
            StartingState::StartNetwork => Some(BridgeCommand::StartNetwork),
            StartingState::ReadNodeDescriptor
            | StartingState::ReadSimpleDescriptor
            | StartingState::ReadPowerDescriptor => self.walk.current_command(),
        }
    }

    fn fail(&mut self) -> BringUpStep {
        let failed = self.state;
        self.transition(StartingState::None);
        BringUpStep::Failed(failed)
    }

    fn transition(&mut self, next_state: StartingState) {
        if next_state != self.state {
            info!(
                "[BRINGUP] Starting state transition: {:?} -> {:?}",
                self.state, next_state
            );
            self.state = next_state;
        } else {
            debug!("[BRINGUP] Staying in {:?}", self.state);
        }
    }
}
