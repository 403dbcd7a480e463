// crates/zigbee-rs/tests/simulator/mod.rs
#![allow(dead_code)]

pub mod backend;
pub mod storage;
pub mod transport;

pub use backend::{kind_code, CommandLog, MockBackend};
pub use storage::MemoryStorage;
pub use transport::SimulatedTransport;

use std::collections::{BTreeMap, BTreeSet};
use zigbee_rs::bridge::FirmwareVersion;
use zigbee_rs::network::NetworkConfiguration;
use zigbee_rs::zdp::{LogicalType, NodeDescriptor, PowerDescriptor, SimpleDescriptor};
use zigbee_rs::{
    BridgeCommand, BridgeMessage, BridgeResponse, BridgeStatus, CommandKind, ExtendedAddress,
    MacCapabilities, NetworkEvent, NetworkState, ResponsePayload, ZigbeeNetwork,
};

pub const COORDINATOR_IEEE: ExtendedAddress = ExtendedAddress(0x00158D00_01020304);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Descriptors a simulated device answers with.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub descriptor: NodeDescriptor,
    pub endpoints: Vec<SimpleDescriptor>,
    pub power: PowerDescriptor,
}

fn node_descriptor(logical_type: LogicalType, mac_capabilities: MacCapabilities) -> NodeDescriptor {
    NodeDescriptor {
        logical_type,
        complex_descriptor_available: false,
        user_descriptor_available: false,
        frequency_band: 0x08,
        mac_capabilities,
        manufacturer_code: 0x1037,
        maximum_buffer_size: 0x7F,
        maximum_rx_size: 0x64,
        server_mask: 0,
        maximum_tx_size: 0x64,
        descriptor_capabilities: 0,
    }
}

/// The coordinator: one Home Automation endpoint.
pub fn coordinator_device() -> SimulatedDevice {
    SimulatedDevice {
        descriptor: node_descriptor(
            LogicalType::Coordinator,
            MacCapabilities::FULL_FUNCTION_DEVICE
                | MacCapabilities::MAINS_POWERED
                | MacCapabilities::RECEIVER_ON_WHEN_IDLE,
        ),
        endpoints: vec![SimpleDescriptor {
            endpoint: 1,
            profile_id: 0x0104,
            device_id: 0x0005,
            device_version: 0,
            input_clusters: vec![0x0000],
            output_clusters: vec![0x0006],
        }],
        power: PowerDescriptor {
            power_mode: 0,
            available_sources: PowerDescriptor::SOURCE_MAINS,
            current_source: PowerDescriptor::SOURCE_MAINS,
            current_level: 12,
        },
    }
}

/// A dimmable light: Basic, On/Off and Level Control on endpoint 11.
pub fn light_device() -> SimulatedDevice {
    SimulatedDevice {
        descriptor: node_descriptor(
            LogicalType::Router,
            MacCapabilities::FULL_FUNCTION_DEVICE
                | MacCapabilities::MAINS_POWERED
                | MacCapabilities::RECEIVER_ON_WHEN_IDLE,
        ),
        endpoints: vec![SimpleDescriptor {
            endpoint: 11,
            profile_id: 0x0104,
            device_id: 0x0101,
            device_version: 1,
            input_clusters: vec![0x0000, 0x0006, 0x0008],
            output_clusters: vec![],
        }],
        power: PowerDescriptor {
            power_mode: 0,
            available_sources: PowerDescriptor::SOURCE_MAINS,
            current_source: PowerDescriptor::SOURCE_MAINS,
            current_level: 12,
        },
    }
}

/// A radio controller that answers every command it is sent, unless told
/// to stay silent or to fail for a command kind.
pub struct SimulatedController {
    pub extended_address: ExtendedAddress,
    pub channel: u8,
    pub version: FirmwareVersion,
    pub silent: BTreeSet<CommandKind>,
    pub failing: BTreeMap<CommandKind, BridgeStatus>,
    pub devices: BTreeMap<u16, SimulatedDevice>,
    pub aps_status: u8,
    pub aps_payload: Vec<u8>,
    /// Every command received, with its sequence number.
    pub handled: Vec<(u8, BridgeCommand)>,
}

impl SimulatedController {
    pub fn new() -> Self {
        let mut devices = BTreeMap::new();
        devices.insert(0x0000, coordinator_device());
        Self {
            extended_address: COORDINATOR_IEEE,
            channel: 15,
            version: FirmwareVersion {
                major: 3,
                minor: 0x0320,
            },
            silent: BTreeSet::new(),
            failing: BTreeMap::new(),
            devices,
            aps_status: 0,
            aps_payload: Vec::new(),
            handled: Vec::new(),
        }
    }

    pub fn handled_kinds(&self) -> Vec<CommandKind> {
        self.handled.iter().map(|(_, c)| c.kind()).collect()
    }

    pub fn has_handled(&self, kind: CommandKind) -> bool {
        self.handled.iter().any(|(_, c)| c.kind() == kind)
    }

    /// The response to one command, `None` if the controller stays silent.
    pub fn answer(&mut self, sequence: u8, command: &BridgeCommand) -> Option<BridgeMessage> {
        self.handled.push((sequence, command.clone()));
        let kind = command.kind();
        if self.silent.contains(&kind) {
            return None;
        }
        if let Some(status) = self.failing.get(&kind) {
            return Some(response(kind, sequence, *status, ResponsePayload::Empty));
        }
        let payload = match command {
            BridgeCommand::GetVersion => ResponsePayload::Version(self.version),
            BridgeCommand::StartNetwork => ResponsePayload::NetworkStarted {
                short_address: 0x0000,
                extended_address: self.extended_address,
                channel: self.channel,
            },
            BridgeCommand::NodeDescriptorRequest { short_address } => {
                let device = self.devices.get(short_address)?;
                ResponsePayload::NodeDescriptor {
                    short_address: *short_address,
                    descriptor: device.descriptor,
                    active_endpoints: device.endpoints.iter().map(|e| e.endpoint).collect(),
                }
            }
            BridgeCommand::SimpleDescriptorRequest {
                short_address,
                endpoint,
            } => {
                let device = self.devices.get(short_address)?;
                let descriptor = device
                    .endpoints
                    .iter()
                    .find(|e| e.endpoint == *endpoint)?
                    .clone();
                ResponsePayload::SimpleDescriptor {
                    short_address: *short_address,
                    descriptor,
                }
            }
            BridgeCommand::PowerDescriptorRequest { short_address } => {
                let device = self.devices.get(short_address)?;
                ResponsePayload::PowerDescriptor {
                    short_address: *short_address,
                    descriptor: device.power,
                }
            }
            BridgeCommand::ApsDataRequest(_) => ResponsePayload::ApsData {
                aps_status: self.aps_status,
                payload: self.aps_payload.clone(),
            },
            _ => ResponsePayload::Empty,
        };
        Some(response(kind, sequence, BridgeStatus::Success, payload))
    }
}

fn response(kind: CommandKind, sequence: u8, status: BridgeStatus, payload: ResponsePayload) -> BridgeMessage {
    BridgeMessage::Response(BridgeResponse {
        kind,
        sequence,
        status,
        payload,
    })
}

/// A network wired to a simulated controller, with a virtual clock.
pub struct Harness {
    pub network: ZigbeeNetwork<MockBackend, SimulatedTransport>,
    pub controller: SimulatedController,
    pub commands: CommandLog,
    pub current_time_us: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(default_config())
    }

    pub fn with_config(config: NetworkConfiguration) -> Self {
        init_logging();
        let (backend, commands) = MockBackend::new();
        Self {
            network: ZigbeeNetwork::new(backend, SimulatedTransport::new(), config),
            controller: SimulatedController::new(),
            commands,
            current_time_us: 1_000_000,
        }
    }

    pub fn with_storage(mut self, storage: MemoryStorage) -> Self {
        self.network = self.network.with_storage(Box::new(storage));
        self
    }

    /// Lets the controller answer every sent command until nothing is left.
    pub fn run(&mut self) {
        for _ in 0..1000 {
            let next = self.commands.borrow_mut().pop_front();
            let Some((sequence, command)) = next else {
                return;
            };
            if let Some(message) = self.controller.answer(sequence, &command) {
                self.network.process_message(message, self.current_time_us);
            }
        }
        panic!("the network never went quiet");
    }

    /// Advances the virtual clock, ticks the network and lets the controller answer.
    pub fn advance_ms(&mut self, ms: u64) {
        self.current_time_us += ms * 1000;
        self.network.tick(self.current_time_us);
        self.run();
    }

    pub fn notify(&mut self, message: BridgeMessage) {
        self.network.process_message(message, self.current_time_us);
        self.run();
    }

    /// Starts the network and runs the bring-up to completion.
    pub fn boot(&mut self) {
        self.network
            .start_network(self.current_time_us)
            .expect("start_network failed");
        self.run();
        assert_eq!(self.network.state(), NetworkState::Running);
    }

    pub fn drain_events(&mut self) -> Vec<NetworkEvent> {
        std::iter::from_fn(|| self.network.poll_event()).collect()
    }
}

pub fn default_config() -> NetworkConfiguration {
    let mut config = NetworkConfiguration::default();
    config.pan_id = 0x1A62;
    config.extended_pan_id = 0xDDDD_DDDD_DDDD_DDDD;
    config
}
