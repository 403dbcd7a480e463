// crates/zigbee-rs/src/network/mod.rs
//! The network façade: the single owner of the correlator, the node registry
//! and the bring-up state machine of one Zigbee network.
//!
//! `ZigbeeNetwork` is sans-I/O. Frames received by the transport are pushed in
//! with `process_frame`, time advances through `tick`, and everything higher
//! layers need to know is queued as `NetworkEvent`s (see `poll_event`) or as
//! `NetworkReply`s (see `take_reply`).

pub mod bring_up;
pub mod config;
pub mod request;
pub mod state;

pub use bring_up::{BringUp, BringUpResult, BringUpStep, StartingState};
pub use config::{LinkKeyType, NetworkConfiguration, SecurityConfiguration};
pub use request::{DestinationAddress, NetworkReply, NetworkRequest, ReplyError, ReplyHandle};
pub use state::{NetworkError, NetworkEvent, NetworkState};

use crate::bridge::{
    BridgeBackend, BridgeCommand, BridgeMessage, BridgeNotification, BridgeStatus,
    FirmwareVersion, ResponsePayload,
};
use crate::correlator::{
    ExchangeCompletion, ExchangeHandle, ExchangeOutcome, ReplyCorrelator,
    DEFAULT_EXCHANGE_TIMEOUT_MS,
};
use crate::hal::{BridgeTransport, NetworkStorage, ZigbeeError};
use crate::node::descriptor::{DescriptorWalk, WalkProgress};
use crate::node::registry::{NodeRegistry, RegistryEvent};
use crate::node::Node;
use crate::types::{ChannelMask, ExtendedAddress, COORDINATOR_SHORT_ADDRESS};
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;
use log::{debug, error, info, trace, warn};

/// Descriptor reads of a joined device are attempted this many times before
/// the device is dropped.
pub const MAX_DESCRIPTOR_ATTEMPTS: u8 = 3;
/// Delay before a failed descriptor read is retried.
pub const DESCRIPTOR_RETRY_DELAY_MS: u64 = 5000;
/// How long `stop_network` waits for the controller to acknowledge the reset.
pub const STOP_GRACE_PERIOD_MS: u64 = 1000;
/// Permit-join duration used when the caller has no preference.
pub const DEFAULT_PERMIT_JOIN_DURATION_S: u8 = 120;
/// Permit-join duration meaning "until disabled".
pub const PERMIT_JOIN_UNLIMITED: u8 = 0xFF;

/// Who is waiting for an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeOwner {
    BringUp,
    NodeInitialization(ExtendedAddress),
    Request(ReplyHandle),
    PermitJoin { reply: ReplyHandle, duration: u8 },
    Shutdown,
}

/// Descriptor walk of a joined device.
#[derive(Debug)]
struct NodeInitialization {
    walk: DescriptorWalk,
    exchange: Option<ExchangeHandle>,
    retry_at_us: Option<u64>,
}

pub struct ZigbeeNetwork<B: BridgeBackend, T: BridgeTransport> {
    backend: B,
    transport: T,
    storage: Option<Box<dyn NetworkStorage>>,
    config: NetworkConfiguration,
    state: NetworkState,
    error: NetworkError,
    correlator: ReplyCorrelator,
    registry: NodeRegistry,
    bring_up: Option<BringUp>,
    /// The exchange of the current bring-up step.
    bring_up_exchange: Option<ExchangeHandle>,
    owners: BTreeMap<ExchangeHandle, ExchangeOwner>,
    initializations: BTreeMap<ExtendedAddress, NodeInitialization>,
    events: VecDeque<NetworkEvent>,
    replies: BTreeMap<ReplyHandle, NetworkReply>,
    next_reply: u32,
    exchange_timeout_ms: u64,
    controller_version: Option<FirmwareVersion>,
    active_channel: Option<u8>,
    permit_joining: bool,
    permit_join_deadline_us: Option<u64>,
    restart_pending: bool,
}

impl<B: BridgeBackend, T: BridgeTransport> ZigbeeNetwork<B, T> {
    pub fn new(backend: B, transport: T, config: NetworkConfiguration) -> Self {
        info!(
            "[NET] Creating network with {} back-end, PAN id {:#06x}",
            backend.name(),
            config.pan_id
        );
        Self {
            backend,
            transport,
            storage: None,
            config,
            state: NetworkState::Uninitialized,
            error: NetworkError::None,
            correlator: ReplyCorrelator::new(),
            registry: NodeRegistry::new(),
            bring_up: None,
            bring_up_exchange: None,
            owners: BTreeMap::new(),
            initializations: BTreeMap::new(),
            events: VecDeque::new(),
            replies: BTreeMap::new(),
            next_reply: 0,
            exchange_timeout_ms: DEFAULT_EXCHANGE_TIMEOUT_MS,
            controller_version: None,
            active_channel: None,
            permit_joining: false,
            permit_join_deadline_us: None,
            restart_pending: false,
        }
    }

    /// Attaches the persistence back-end.
    pub fn with_storage(mut self, storage: Box<dyn NetworkStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn set_exchange_timeout_ms(&mut self, timeout_ms: u64) {
        self.exchange_timeout_ms = timeout_ms;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // --- Lifecycle ---

    /// Starts a bring-up attempt with the current configuration.
    pub fn start_network(&mut self, current_time_us: u64) -> Result<(), ZigbeeError> {
        if !matches!(self.state, NetworkState::Uninitialized | NetworkState::Offline) {
            warn!("[NET] Cannot start the network in state {:?}", self.state);
            return Err(ZigbeeError::InvalidState);
        }
        if !self.transport.is_available() {
            error!("[NET] Cannot start the network: transport unavailable.");
            self.set_state(NetworkState::Offline);
            self.set_error(NetworkError::HardwareUnavailable);
            return Err(ZigbeeError::TransportUnavailable);
        }

        self.error = NetworkError::None;
        self.set_state(NetworkState::Starting);
        let mut bring_up = BringUp::new(self.config.clone());
        let command = bring_up.start();
        self.bring_up = Some(bring_up);
        if let Err(e) = self.issue_bring_up(command, current_time_us) {
            self.fail_bring_up();
            return Err(e);
        }
        Ok(())
    }

    /// Stops the network. Every waiting exchange is aborted, then the
    /// controller gets a best-effort reset with a bounded grace period.
    pub fn stop_network(&mut self, current_time_us: u64) -> Result<(), ZigbeeError> {
        match self.state {
            NetworkState::Uninitialized | NetworkState::Offline | NetworkState::Stopping => {
                return Ok(());
            }
            NetworkState::Starting | NetworkState::Running => {}
        }
        info!("[NET] Stopping the network.");
        self.set_state(NetworkState::Stopping);
        self.bring_up = None;
        self.initializations.clear();
        self.abort_exchanges(current_time_us);
        self.set_permit_joining(false, None);

        let result = self.issue_with_timeout(
            BridgeCommand::Reset,
            ExchangeOwner::Shutdown,
            STOP_GRACE_PERIOD_MS,
            current_time_us,
        );
        if let Err(e) = result {
            debug!("[NET] Controller reset not sent ({}), going offline.", e);
            self.finish_stop(current_time_us);
        }
        Ok(())
    }

    /// Stops the network if needed and starts it again.
    pub fn reset(&mut self, current_time_us: u64) -> Result<(), ZigbeeError> {
        match self.state {
            NetworkState::Uninitialized | NetworkState::Offline => {
                self.start_network(current_time_us)
            }
            _ => {
                self.restart_pending = true;
                self.stop_network(current_time_us)
            }
        }
    }

    /// Forgets every node and all persisted data, then starts from scratch.
    pub fn factory_reset_network(&mut self, current_time_us: u64) -> Result<(), ZigbeeError> {
        info!("[NET] Factory reset.");
        // A shutdown aborted below must not start its own bring-up.
        self.restart_pending = false;
        self.bring_up = None;
        self.initializations.clear();
        self.abort_exchanges(current_time_us);
        self.set_permit_joining(false, None);
        if let Some(storage) = self.storage.as_mut() {
            storage.clear()?;
        }
        self.registry.clear();
        self.controller_version = None;
        self.active_channel = None;
        if self.state != NetworkState::Uninitialized {
            self.set_state(NetworkState::Offline);
        }
        self.start_network(current_time_us)
    }

    /// Restores the configuration and node inventory from storage. Returns
    /// whether a persisted configuration was found.
    pub fn load_network(&mut self) -> Result<bool, ZigbeeError> {
        if !matches!(self.state, NetworkState::Uninitialized | NetworkState::Offline) {
            return Err(ZigbeeError::InvalidState);
        }
        let Some(storage) = self.storage.as_mut() else {
            return Ok(false);
        };
        let config = storage.load_network()?;
        let nodes = storage.load_nodes()?;

        let found = config.is_some();
        if let Some(config) = config {
            info!(
                "[NET] Loaded network configuration: PAN id {:#06x}, channel {}",
                config.pan_id, config.channel
            );
            self.config = config;
        }
        info!("[NET] Restoring {} node(s) from storage.", nodes.len());
        for node in nodes {
            self.registry.restore(node);
        }
        self.drain_registry_events(false);
        Ok(found)
    }

    // --- Requests ---

    /// Sends an application request to a node. The outcome is available via
    /// `take_reply` once the exchange ends.
    pub fn send_request(
        &mut self,
        request: NetworkRequest,
        current_time_us: u64,
    ) -> Result<ReplyHandle, ZigbeeError> {
        if self.state != NetworkState::Running {
            return Err(ZigbeeError::NetworkOffline);
        }
        let reply = self.next_reply_handle();
        debug!(
            "[NET] Request {:?}: cluster {:#06x} to {:?}/{}",
            reply, request.cluster_id, request.destination, request.destination_endpoint
        );
        self.issue(
            BridgeCommand::ApsDataRequest(request),
            ExchangeOwner::Request(reply),
            current_time_us,
        )?;
        Ok(reply)
    }

    /// Opens or closes the network for joining devices. `duration_s` of 255
    /// keeps it open until disabled.
    pub fn permit_joining(
        &mut self,
        enabled: bool,
        duration_s: u8,
        current_time_us: u64,
    ) -> Result<ReplyHandle, ZigbeeError> {
        if self.state != NetworkState::Running {
            return Err(ZigbeeError::NetworkOffline);
        }
        let duration = if enabled { duration_s } else { 0 };
        let reply = self.next_reply_handle();
        self.issue(
            BridgeCommand::PermitJoin {
                short_address: COORDINATOR_SHORT_ADDRESS,
                duration,
            },
            ExchangeOwner::PermitJoin { reply, duration },
            current_time_us,
        )?;
        Ok(reply)
    }

    /// Opens the network for joining for `DEFAULT_PERMIT_JOIN_DURATION_S`.
    pub fn permit_joining_default(
        &mut self,
        current_time_us: u64,
    ) -> Result<ReplyHandle, ZigbeeError> {
        self.permit_joining(true, DEFAULT_PERMIT_JOIN_DURATION_S, current_time_us)
    }

    /// Takes the reply of a finished request.
    pub fn take_reply(&mut self, handle: ReplyHandle) -> Option<NetworkReply> {
        self.replies.remove(&handle)
    }

    // --- Input ---

    /// Decodes and processes one frame received from the transport.
    pub fn process_frame(&mut self, frame: &[u8], current_time_us: u64) -> Result<(), ZigbeeError> {
        trace!("[NET] Received frame: {:02X?}", frame);
        let message = self.backend.decode_message(frame).map_err(|e| {
            warn!("[NET] Dropping undecodable frame: {}", e);
            e
        })?;
        self.process_message(message, current_time_us);
        Ok(())
    }

    /// Processes a decoded bridge message.
    pub fn process_message(&mut self, message: BridgeMessage, current_time_us: u64) {
        match message {
            BridgeMessage::Response(response) => {
                match self.correlator.complete(
                    response.kind,
                    response.sequence,
                    response.status,
                    response.payload,
                ) {
                    Some(completion) => self.handle_completion(completion, current_time_us),
                    None => warn!(
                        "[NET] Unmatched {:?} response with sequence {}",
                        response.kind, response.sequence
                    ),
                }
            }
            BridgeMessage::Notification(notification) => {
                self.handle_notification(notification, current_time_us)
            }
        }
    }

    /// Reports a change of the transport's availability.
    pub fn set_transport_available(&mut self, available: bool, current_time_us: u64) {
        if available {
            info!("[NET] Transport available.");
            return;
        }
        warn!("[NET] Transport unavailable in state {:?}.", self.state);
        match self.state {
            NetworkState::Uninitialized | NetworkState::Offline => {}
            NetworkState::Stopping => {
                self.abort_exchanges(current_time_us);
                self.finish_stop(current_time_us);
            }
            NetworkState::Starting | NetworkState::Running => {
                self.bring_up = None;
                self.initializations.clear();
                self.restart_pending = false;
                self.abort_exchanges(current_time_us);
                self.set_permit_joining(false, None);
                self.set_state(NetworkState::Offline);
                self.set_error(NetworkError::HardwareUnavailable);
            }
        }
    }

    // --- Time ---

    /// Processes timeouts, descriptor retries and permit-join expiry.
    pub fn tick(&mut self, current_time_us: u64) {
        for completion in self.correlator.tick(current_time_us) {
            self.handle_completion(completion, current_time_us);
        }

        let due: Vec<ExtendedAddress> = self
            .initializations
            .iter()
            .filter(|(_, init)| init.retry_at_us.is_some_and(|t| current_time_us >= t))
            .map(|(ext, _)| *ext)
            .collect();
        for extended_address in due {
            debug!("[NET] Retrying descriptor read of {}", extended_address);
            self.issue_node_step(extended_address, current_time_us);
        }

        if self
            .permit_join_deadline_us
            .is_some_and(|deadline| current_time_us >= deadline)
        {
            info!("[NET] Permit joining expired.");
            self.set_permit_joining(false, None);
        }
    }

    /// The earliest time `tick` has work to do.
    pub fn next_action_time(&self) -> Option<u64> {
        let retries = self
            .initializations
            .values()
            .filter_map(|init| init.retry_at_us);
        self.correlator
            .next_deadline()
            .into_iter()
            .chain(retries)
            .chain(self.permit_join_deadline_us)
            .min()
    }

    // --- Output ---

    /// Takes the oldest pending event.
    pub fn poll_event(&mut self) -> Option<NetworkEvent> {
        self.events.pop_front()
    }

    // --- Queries ---

    pub fn state(&self) -> NetworkState {
        self.state
    }

    pub fn last_error(&self) -> NetworkError {
        self.error
    }

    /// Bring-up step in progress, `StartingState::None` when idle.
    pub fn starting_state(&self) -> StartingState {
        self.bring_up
            .as_ref()
            .map(|b| b.state())
            .unwrap_or(StartingState::None)
    }

    pub fn controller_version(&self) -> Option<FirmwareVersion> {
        self.controller_version
    }

    /// The channel the running network operates on.
    pub fn active_channel(&self) -> Option<u8> {
        self.active_channel
    }

    pub fn permit_joining_enabled(&self) -> bool {
        self.permit_joining
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.registry.nodes()
    }

    pub fn node(&self, extended_address: ExtendedAddress) -> Option<&Node> {
        self.registry.get(extended_address)
    }

    pub fn node_by_short_address(&self, short_address: u16) -> Option<&Node> {
        self.registry.get_by_short(short_address)
    }

    pub fn coordinator_node(&self) -> Option<&Node> {
        self.registry.coordinator()
    }

    pub fn has_node(&self, extended_address: ExtendedAddress) -> bool {
        self.registry.contains(extended_address)
    }

    /// Removes a node from the network's inventory.
    pub fn remove_node(&mut self, extended_address: ExtendedAddress) -> Result<(), ZigbeeError> {
        self.registry.remove(extended_address)?;
        self.cancel_initialization(extended_address);
        self.forget_node(extended_address);
        self.drain_registry_events(true);
        Ok(())
    }

    // --- Configuration ---
    // Changes are picked up by the next bring-up.

    pub fn configuration(&self) -> &NetworkConfiguration {
        &self.config
    }

    pub fn set_configuration(&mut self, config: NetworkConfiguration) {
        self.note_deferred_change();
        self.config = config;
    }

    pub fn pan_id(&self) -> u16 {
        self.config.pan_id
    }

    pub fn set_pan_id(&mut self, pan_id: u16) {
        self.note_deferred_change();
        self.config.pan_id = pan_id;
    }

    pub fn extended_pan_id(&self) -> u64 {
        self.config.extended_pan_id
    }

    pub fn set_extended_pan_id(&mut self, extended_pan_id: u64) {
        self.note_deferred_change();
        self.config.extended_pan_id = extended_pan_id;
    }

    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    pub fn set_channel(&mut self, channel: u8) -> Result<(), ZigbeeError> {
        self.config.set_channel(channel)?;
        self.note_deferred_change();
        Ok(())
    }

    pub fn channel_mask(&self) -> ChannelMask {
        self.config.channel_mask
    }

    pub fn set_channel_mask(&mut self, channel_mask: ChannelMask) {
        self.note_deferred_change();
        self.config.channel_mask = channel_mask;
    }

    pub fn security(&self) -> &SecurityConfiguration {
        &self.config.security
    }

    pub fn set_security(&mut self, security: SecurityConfiguration) {
        self.note_deferred_change();
        self.config.security = security;
    }

    // --- Internals ---

    fn note_deferred_change(&self) {
        if !matches!(self.state, NetworkState::Uninitialized | NetworkState::Offline) {
            info!(
                "[NET] Configuration changed in state {:?}; effective on next start.",
                self.state
            );
        }
    }

    fn next_reply_handle(&mut self) -> ReplyHandle {
        self.next_reply = self.next_reply.wrapping_add(1);
        ReplyHandle(self.next_reply)
    }

    fn issue(
        &mut self,
        command: BridgeCommand,
        owner: ExchangeOwner,
        current_time_us: u64,
    ) -> Result<ExchangeHandle, ZigbeeError> {
        self.issue_with_timeout(command, owner, self.exchange_timeout_ms, current_time_us)
    }

    /// Opens an exchange for `command` and sends it. On failure the exchange
    /// is released again.
    fn issue_with_timeout(
        &mut self,
        command: BridgeCommand,
        owner: ExchangeOwner,
        timeout_ms: u64,
        current_time_us: u64,
    ) -> Result<ExchangeHandle, ZigbeeError> {
        if !self.transport.is_available() {
            return Err(ZigbeeError::TransportUnavailable);
        }
        let (handle, sequence) =
            self.correlator
                .submit_next(command.kind(), timeout_ms, current_time_us)?;
        let sent = self
            .backend
            .encode_command(sequence, &command)
            .and_then(|frame| {
                trace!("[NET] Sending frame: {:02X?}", frame);
                self.transport.send_frame(&frame)
            });
        if let Err(e) = sent {
            warn!("[NET] Failed to send {:?}: {}", command.kind(), e);
            let _ = self.correlator.abort(handle);
            return Err(e);
        }
        self.owners.insert(handle, owner);
        Ok(handle)
    }

    fn abort_exchanges(&mut self, current_time_us: u64) {
        for completion in self.correlator.abort_all() {
            self.handle_completion(completion, current_time_us);
        }
    }

    fn handle_completion(&mut self, completion: ExchangeCompletion, current_time_us: u64) {
        let Some(owner) = self.owners.remove(&completion.handle) else {
            warn!(
                "[NET] Completion of unowned exchange {:?} ({:?})",
                completion.handle, completion.kind
            );
            return;
        };
        match owner {
            ExchangeOwner::BringUp => {
                if self.bring_up_exchange != Some(completion.handle) {
                    debug!(
                        "[NET] Dropping stale bring-up exchange {:?} ({:?}).",
                        completion.handle, completion.kind
                    );
                    return;
                }
                self.bring_up_exchange = None;
                self.on_bring_up_outcome(completion.outcome, current_time_us)
            }
            ExchangeOwner::NodeInitialization(extended_address) => {
                self.on_node_outcome(extended_address, completion.outcome, current_time_us)
            }
            ExchangeOwner::Request(reply) => {
                let result = request_result(completion.outcome);
                if let Err(e) = &result {
                    debug!("[NET] Request {:?} failed: {}", reply, e);
                }
                self.replies.insert(reply, NetworkReply { handle: reply, result });
            }
            ExchangeOwner::PermitJoin { reply, duration } => {
                let result = request_result(completion.outcome);
                if result.is_ok() {
                    let deadline = match duration {
                        0 | PERMIT_JOIN_UNLIMITED => None,
                        seconds => Some(current_time_us + u64::from(seconds) * 1_000_000),
                    };
                    self.set_permit_joining(duration != 0, deadline);
                }
                self.replies.insert(reply, NetworkReply { handle: reply, result });
            }
            ExchangeOwner::Shutdown => {
                debug!("[NET] Controller reset ended: {:?}", completion.state());
                self.finish_stop(current_time_us);
            }
        }
    }

    fn on_bring_up_outcome(&mut self, outcome: ExchangeOutcome, current_time_us: u64) {
        let Some(bring_up) = self.bring_up.as_mut() else {
            return;
        };
        match bring_up.on_outcome(outcome) {
            BringUpStep::Issue(command) => {
                if self.issue_bring_up(command, current_time_us).is_err() {
                    self.fail_bring_up();
                }
            }
            BringUpStep::Complete(result) => self.finish_bring_up(result, current_time_us),
            BringUpStep::Failed(step) => {
                error!("[NET] Bring-up failed in step {:?}.", step);
                self.fail_bring_up();
            }
        }
    }

    fn issue_bring_up(
        &mut self,
        command: BridgeCommand,
        current_time_us: u64,
    ) -> Result<(), ZigbeeError> {
        let handle = self.issue(command, ExchangeOwner::BringUp, current_time_us)?;
        self.bring_up_exchange = Some(handle);
        Ok(())
    }

    fn finish_bring_up(&mut self, result: BringUpResult, current_time_us: u64) {
        self.bring_up = None;
        self.bring_up_exchange = None;
        self.controller_version = result.firmware_version;
        self.active_channel = Some(result.channel);

        let coordinator = result.extended_address;
        self.registry
            .set_coordinator(result.short_address, coordinator);
        if let Err(e) = self
            .registry
            .apply_descriptors(coordinator, &result.descriptors)
            .and_then(|_| self.registry.promote(coordinator))
        {
            warn!("[NET] Failed to install coordinator descriptors: {}", e);
        }

        if let Some(storage) = self.storage.as_mut() {
            if let Err(e) = storage.save_network(&self.config) {
                warn!("[NET] Failed to persist network configuration: {}", e);
            }
        }
        self.drain_registry_events(true);
        self.set_state(NetworkState::Running);

        let pending: Vec<ExtendedAddress> = self
            .registry
            .uninitialized_nodes()
            .map(|n| n.extended_address)
            .collect();
        for extended_address in pending {
            self.start_node_initialization(extended_address, current_time_us);
        }
    }

    fn fail_bring_up(&mut self) {
        self.bring_up = None;
        self.bring_up_exchange = None;
        let error = if self.transport.is_available() {
            NetworkError::ZigbeeError
        } else {
            NetworkError::HardwareUnavailable
        };
        self.set_state(NetworkState::Offline);
        self.set_error(error);
    }

    fn finish_stop(&mut self, current_time_us: u64) {
        self.set_state(NetworkState::Offline);
        if self.restart_pending {
            self.restart_pending = false;
            if let Err(e) = self.start_network(current_time_us) {
                warn!("[NET] Restart after reset failed: {}", e);
            }
        }
    }

    fn handle_notification(&mut self, notification: BridgeNotification, current_time_us: u64) {
        match notification {
            BridgeNotification::DeviceAnnounce {
                short_address,
                extended_address,
                mac_capabilities,
            } => {
                info!(
                    "[NET] Device announce: {} ({:#06x})",
                    extended_address, short_address
                );
                let initialized = self
                    .registry
                    .create_node(short_address, extended_address, Some(mac_capabilities))
                    .is_initialized();
                if let Some(init) = self.initializations.get_mut(&extended_address) {
                    init.walk.set_short_address(short_address);
                }
                if initialized {
                    self.persist_node(extended_address);
                } else if self.state == NetworkState::Running {
                    self.start_node_initialization(extended_address, current_time_us);
                }
            }
            BridgeNotification::LeaveIndication {
                extended_address,
                rejoin,
            } => {
                if rejoin {
                    info!("[NET] Node {} left to rejoin.", extended_address);
                } else if self.registry.remove(extended_address).is_ok() {
                    self.cancel_initialization(extended_address);
                    self.forget_node(extended_address);
                }
            }
            BridgeNotification::AttributeReport(report) => {
                if let Err(e) = self.registry.apply_attribute_report(&report) {
                    warn!(
                        "[NET] Attribute report from {:#06x} dropped: {}",
                        report.source_address, e
                    );
                }
            }
            BridgeNotification::NodeClusterList {
                source_address,
                endpoint,
                profile_id,
                direction,
                cluster_ids,
            } => {
                if let Err(e) = self.registry.apply_cluster_list(
                    source_address,
                    endpoint,
                    profile_id,
                    direction,
                    &cluster_ids,
                ) {
                    warn!("[NET] Cluster list from {:#06x} dropped: {}", source_address, e);
                }
            }
            BridgeNotification::NodeAttributeList {
                source_address,
                endpoint,
                profile_id,
                cluster_id,
                attribute_ids,
            } => {
                if let Err(e) = self.registry.apply_attribute_list(
                    source_address,
                    endpoint,
                    profile_id,
                    cluster_id,
                    &attribute_ids,
                ) {
                    warn!("[NET] Attribute list from {:#06x} dropped: {}", source_address, e);
                }
            }
            BridgeNotification::NodeCommandIdList {
                source_address,
                endpoint,
                profile_id,
                cluster_id,
                command_ids,
            } => {
                if let Err(e) = self.registry.apply_command_id_list(
                    source_address,
                    endpoint,
                    profile_id,
                    cluster_id,
                    &command_ids,
                ) {
                    warn!("[NET] Command id list from {:#06x} dropped: {}", source_address, e);
                }
            }
            BridgeNotification::ControllerStateChanged(code) => {
                debug!("[NET] Controller state changed: {:#04x}", code);
            }
            BridgeNotification::Log { level, text } => {
                log::log!(level, "[NET] Controller: {}", text);
            }
        }
        self.drain_registry_events(true);
    }

    fn start_node_initialization(&mut self, extended_address: ExtendedAddress, current_time_us: u64) {
        if self.initializations.contains_key(&extended_address) {
            return;
        }
        let Some(node) = self.registry.get(extended_address) else {
            return;
        };
        if node.is_initialized() {
            return;
        }
        debug!("[NET] Reading descriptors of {}", extended_address);
        self.initializations.insert(
            extended_address,
            NodeInitialization {
                walk: DescriptorWalk::new(node.short_address),
                exchange: None,
                retry_at_us: None,
            },
        );
        self.issue_node_step(extended_address, current_time_us);
    }

    fn issue_node_step(&mut self, extended_address: ExtendedAddress, current_time_us: u64) {
        let Some(command) = self
            .initializations
            .get_mut(&extended_address)
            .and_then(|init| {
                init.retry_at_us = None;
                init.walk.current_command()
            })
        else {
            return;
        };
        match self.issue(
            command,
            ExchangeOwner::NodeInitialization(extended_address),
            current_time_us,
        ) {
            Ok(handle) => {
                if let Some(init) = self.initializations.get_mut(&extended_address) {
                    init.exchange = Some(handle);
                }
            }
            Err(_) => self.node_step_failed(extended_address, current_time_us),
        }
    }

    fn on_node_outcome(
        &mut self,
        extended_address: ExtendedAddress,
        outcome: ExchangeOutcome,
        current_time_us: u64,
    ) {
        let Some(init) = self.initializations.get_mut(&extended_address) else {
            return;
        };
        init.exchange = None;
        let progress = match outcome {
            ExchangeOutcome::Completed {
                status: BridgeStatus::Success,
                payload,
            } => init.walk.on_response(payload),
            other => {
                debug!(
                    "[NET] Descriptor read of {} failed: {:?}",
                    extended_address, other
                );
                Err(ZigbeeError::UnexpectedResponse)
            }
        };
        match progress {
            Ok(WalkProgress::Next(_)) => self.issue_node_step(extended_address, current_time_us),
            Ok(WalkProgress::Finished(descriptors)) => {
                self.initializations.remove(&extended_address);
                match self
                    .registry
                    .apply_descriptors(extended_address, &descriptors)
                    .and_then(|_| self.registry.promote(extended_address))
                {
                    Ok(()) => self.drain_registry_events(true),
                    Err(e) => warn!("[NET] Failed to install descriptors of {}: {}", extended_address, e),
                }
            }
            Err(_) => self.node_step_failed(extended_address, current_time_us),
        }
    }

    /// Bounded retry: the node is dropped after `MAX_DESCRIPTOR_ATTEMPTS`.
    fn node_step_failed(&mut self, extended_address: ExtendedAddress, current_time_us: u64) {
        let failures = self.registry.record_descriptor_failure(extended_address);
        if failures >= MAX_DESCRIPTOR_ATTEMPTS {
            warn!(
                "[NET] Dropping {} after {} failed descriptor reads.",
                extended_address, failures
            );
            self.initializations.remove(&extended_address);
            if self.registry.remove(extended_address).is_ok() {
                self.forget_node(extended_address);
            }
        } else if let Some(init) = self.initializations.get_mut(&extended_address) {
            init.retry_at_us = Some(current_time_us + DESCRIPTOR_RETRY_DELAY_MS * 1000);
        }
    }

    fn cancel_initialization(&mut self, extended_address: ExtendedAddress) {
        if let Some(init) = self.initializations.remove(&extended_address) {
            if let Some(handle) = init.exchange {
                self.owners.remove(&handle);
                let _ = self.correlator.abort(handle);
            }
        }
    }

    fn persist_node(&mut self, extended_address: ExtendedAddress) {
        if let (Some(storage), Some(node)) = (self.storage.as_mut(), self.registry.get(extended_address)) {
            if let Err(e) = storage.save_node(node) {
                warn!("[NET] Failed to persist node {}: {}", extended_address, e);
            }
        }
    }

    fn forget_node(&mut self, extended_address: ExtendedAddress) {
        if let Some(storage) = self.storage.as_mut() {
            if let Err(e) = storage.remove_node(extended_address) {
                warn!("[NET] Failed to remove node {} from storage: {}", extended_address, e);
            }
        }
    }

    /// Moves registry events into the network queue. Added nodes are
    /// persisted when `persist` is set.
    fn drain_registry_events(&mut self, persist: bool) {
        for event in self.registry.take_events() {
            let event = match event {
                RegistryEvent::NodeAdded(extended_address) => {
                    if persist {
                        self.persist_node(extended_address);
                    }
                    NetworkEvent::NodeAdded(extended_address)
                }
                RegistryEvent::NodeRemoved {
                    extended_address,
                    short_address,
                } => NetworkEvent::NodeRemoved {
                    extended_address,
                    short_address,
                },
                RegistryEvent::AttributeChanged {
                    extended_address,
                    endpoint,
                    cluster_id,
                    direction,
                    attribute,
                } => NetworkEvent::AttributeChanged {
                    extended_address,
                    endpoint,
                    cluster_id,
                    direction,
                    attribute,
                },
            };
            self.events.push_back(event);
        }
    }

    fn set_state(&mut self, state: NetworkState) {
        if self.state == state {
            return;
        }
        info!("[NET] Network state transition: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.events.push_back(NetworkEvent::StateChanged(state));
    }

    fn set_error(&mut self, error: NetworkError) {
        self.error = error;
        if error != NetworkError::None {
            error!("[NET] Network error: {:?}", error);
            self.events.push_back(NetworkEvent::ErrorOccurred(error));
        }
    }

    fn set_permit_joining(&mut self, enabled: bool, deadline_us: Option<u64>) {
        self.permit_join_deadline_us = deadline_us;
        if self.permit_joining != enabled {
            info!("[NET] Permit joining {}", if enabled { "enabled" } else { "disabled" });
            self.permit_joining = enabled;
            self.events.push_back(NetworkEvent::PermitJoiningChanged(enabled));
        }
    }
}

/// Translates the outcome of a request exchange into its reply.
fn request_result(outcome: ExchangeOutcome) -> Result<Vec<u8>, ReplyError> {
    match outcome {
        ExchangeOutcome::Completed { status, payload } if status.is_success() => match payload {
            ResponsePayload::ApsData { aps_status: 0, payload } => Ok(payload),
            ResponsePayload::ApsData { aps_status, .. } => Err(ReplyError::ApsStatus(aps_status)),
            ResponsePayload::Raw(payload) => Ok(payload),
            _ => Ok(Vec::new()),
        },
        ExchangeOutcome::Completed { status, .. } => Err(ReplyError::BridgeStatus(status)),
        ExchangeOutcome::TimedOut => Err(ReplyError::Timeout),
        ExchangeOutcome::Aborted => Err(ReplyError::Aborted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_request_result_translation() {
        assert_eq!(
            request_result(ExchangeOutcome::Completed {
                status: BridgeStatus::Success,
                payload: ResponsePayload::ApsData {
                    aps_status: 0,
                    payload: vec![0x18, 0x01, 0x0B]
                },
            }),
            Ok(vec![0x18, 0x01, 0x0B])
        );
        assert_eq!(
            request_result(ExchangeOutcome::Completed {
                status: BridgeStatus::Success,
                payload: ResponsePayload::ApsData {
                    aps_status: 0xA7,
                    payload: vec![]
                },
            }),
            Err(ReplyError::ApsStatus(0xA7))
        );
        assert_eq!(
            request_result(ExchangeOutcome::Completed {
                status: BridgeStatus::ProtocolError,
                payload: ResponsePayload::Empty,
            }),
            Err(ReplyError::BridgeStatus(BridgeStatus::ProtocolError))
        );
        assert_eq!(request_result(ExchangeOutcome::TimedOut), Err(ReplyError::Timeout));
        assert_eq!(request_result(ExchangeOutcome::Aborted), Err(ReplyError::Aborted));
        assert_eq!(
            request_result(ExchangeOutcome::Completed {
                status: BridgeStatus::Success,
                payload: ResponsePayload::Empty,
            }),
            Ok(vec![])
        );
    }
}
