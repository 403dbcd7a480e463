// crates/zigbee-rs/tests/boot_up_test.rs

// Rust looks for `tests/simulator/mod.rs` when we declare `mod simulator;` here.
mod simulator;

use simulator::{Harness, MemoryStorage, COORDINATOR_IEEE};
use zigbee_rs::network::{NetworkError, StartingState};
use zigbee_rs::types::ChannelMask;
use zigbee_rs::zcl::ClusterDirection;
use zigbee_rs::{BridgeCommand, BridgeStatus, CommandKind, NetworkEvent, NetworkState, Node, ZigbeeError};

#[test]
fn test_bring_up_issues_every_step_in_order() {
    let mut harness = Harness::new();
    harness.boot();

    assert_eq!(
        harness.controller.handled_kinds(),
        vec![
            CommandKind::ErasePersistentData,
            CommandKind::Reset,
            CommandKind::GetVersion,
            CommandKind::SetPanId,
            CommandKind::SetChannelMask,
            CommandKind::SetSecurity,
            CommandKind::StartNetwork,
            CommandKind::NodeDescriptorRequest,
            CommandKind::SimpleDescriptorRequest,
            CommandKind::PowerDescriptorRequest,
        ]
    );
    assert_eq!(harness.network.transport().frames.len(), 10);

    // The configuration reached the controller.
    assert!(harness.controller.handled.iter().any(|(_, c)| *c
        == BridgeCommand::SetPanId {
            pan_id: 0x1A62,
            extended_pan_id: 0xDDDD_DDDD_DDDD_DDDD
        }));
    assert!(harness
        .controller
        .handled
        .iter()
        .any(|(_, c)| *c == BridgeCommand::SetChannelMask(ChannelMask::ALL_CHANNELS)));

    assert_eq!(harness.network.last_error(), NetworkError::None);
    assert_eq!(harness.network.starting_state(), StartingState::None);
    assert_eq!(harness.network.controller_version().map(|v| v.major), Some(3));
    assert_eq!(harness.network.active_channel(), Some(15));

    let events = harness.drain_events();
    assert_eq!(
        events,
        vec![
            NetworkEvent::StateChanged(NetworkState::Starting),
            NetworkEvent::NodeAdded(COORDINATOR_IEEE),
            NetworkEvent::StateChanged(NetworkState::Running),
        ]
    );
}

#[test]
fn test_coordinator_node_is_initialized() {
    let mut harness = Harness::new();
    harness.boot();

    let coordinator = harness.network.coordinator_node().expect("no coordinator");
    assert_eq!(coordinator.extended_address, COORDINATOR_IEEE);
    assert_eq!(coordinator.short_address, 0x0000);
    assert!(coordinator.is_initialized());
    assert!(coordinator.is_coordinator());
    assert!(coordinator.power_descriptor.is_some());
    assert!(coordinator.cluster(1, 0x0000, ClusterDirection::Input).is_some());
    assert!(coordinator.cluster(1, 0x0006, ClusterDirection::Output).is_some());

    let by_short = harness.network.node_by_short_address(0x0000).map(|n| n.extended_address);
    assert_eq!(by_short, Some(COORDINATOR_IEEE));
    assert_eq!(
        harness.network.remove_node(COORDINATOR_IEEE),
        Err(ZigbeeError::CoordinatorNotRemovable)
    );
}

#[test]
fn test_set_channel_timeout_goes_offline_without_further_steps() {
    let mut harness = Harness::new();
    harness.controller.silent.insert(CommandKind::SetChannelMask);
    harness.network.start_network(harness.current_time_us).unwrap();
    harness.run();

    assert_eq!(harness.network.state(), NetworkState::Starting);
    assert_eq!(harness.network.starting_state(), StartingState::SetChannel);

    harness.advance_ms(1999);
    assert_eq!(harness.network.state(), NetworkState::Starting);

    harness.advance_ms(1);
    assert_eq!(harness.network.state(), NetworkState::Offline);
    assert_eq!(harness.network.last_error(), NetworkError::ZigbeeError);

    // Nothing after SetChannel is ever issued, not even later.
    harness.advance_ms(60_000);
    assert!(!harness.controller.has_handled(CommandKind::SetSecurity));
    assert!(!harness.controller.has_handled(CommandKind::StartNetwork));
    assert_eq!(harness.network.next_action_time(), None);

    let events = harness.drain_events();
    assert_eq!(
        events,
        vec![
            NetworkEvent::StateChanged(NetworkState::Starting),
            NetworkEvent::StateChanged(NetworkState::Offline),
            NetworkEvent::ErrorOccurred(NetworkError::ZigbeeError),
        ]
    );
}

#[test]
fn test_error_status_fails_bring_up() {
    let mut harness = Harness::new();
    harness
        .controller
        .failing
        .insert(CommandKind::GetVersion, BridgeStatus::ProtocolError);
    harness.network.start_network(harness.current_time_us).unwrap();
    harness.run();

    assert_eq!(harness.network.state(), NetworkState::Offline);
    assert_eq!(harness.network.last_error(), NetworkError::ZigbeeError);
    assert!(!harness.controller.has_handled(CommandKind::SetPanId));
    assert!(harness.network.coordinator_node().is_none());
}

#[test]
fn test_start_requires_transport() {
    let mut harness = Harness::new();
    harness.network.transport_mut().available = false;

    assert_eq!(
        harness.network.start_network(harness.current_time_us),
        Err(ZigbeeError::TransportUnavailable)
    );
    assert_eq!(harness.network.state(), NetworkState::Offline);
    assert_eq!(harness.network.last_error(), NetworkError::HardwareUnavailable);
    assert!(harness.controller.handled.is_empty());
}

#[test]
fn test_transport_loss_halts_bring_up() {
    let mut harness = Harness::new();
    harness.controller.silent.insert(CommandKind::Reset);
    harness.network.start_network(harness.current_time_us).unwrap();
    harness.run();
    assert_eq!(harness.network.starting_state(), StartingState::Reset);

    harness.network.transport_mut().available = false;
    harness
        .network
        .set_transport_available(false, harness.current_time_us);

    assert_eq!(harness.network.state(), NetworkState::Offline);
    assert_eq!(harness.network.last_error(), NetworkError::HardwareUnavailable);
    assert_eq!(harness.network.next_action_time(), None);

    // No automatic retry once the link is back.
    harness.network.transport_mut().available = true;
    harness
        .network
        .set_transport_available(true, harness.current_time_us);
    harness.advance_ms(10_000);
    assert_eq!(harness.network.state(), NetworkState::Offline);
    assert!(!harness.controller.has_handled(CommandKind::GetVersion));
}

#[test]
fn test_start_twice_is_rejected() {
    let mut harness = Harness::new();
    harness.boot();
    assert_eq!(
        harness.network.start_network(harness.current_time_us),
        Err(ZigbeeError::InvalidState)
    );
}

#[test]
fn test_stop_network_resets_controller() {
    let mut harness = Harness::new();
    harness.boot();
    harness.drain_events();
    let handled = harness.controller.handled.len();

    harness.network.stop_network(harness.current_time_us).unwrap();
    assert_eq!(harness.network.state(), NetworkState::Stopping);
    harness.run();

    assert_eq!(harness.network.state(), NetworkState::Offline);
    assert_eq!(
        harness.controller.handled[handled].1,
        BridgeCommand::Reset
    );
    assert_eq!(
        harness.drain_events(),
        vec![
            NetworkEvent::StateChanged(NetworkState::Stopping),
            NetworkEvent::StateChanged(NetworkState::Offline),
        ]
    );
}

#[test]
fn test_stop_network_gives_up_after_grace_period() {
    let mut harness = Harness::new();
    harness.boot();
    harness.controller.silent.insert(CommandKind::Reset);

    harness.network.stop_network(harness.current_time_us).unwrap();
    harness.run();
    assert_eq!(harness.network.state(), NetworkState::Stopping);

    harness.advance_ms(999);
    assert_eq!(harness.network.state(), NetworkState::Stopping);
    harness.advance_ms(1);
    assert_eq!(harness.network.state(), NetworkState::Offline);
    assert_eq!(harness.network.last_error(), NetworkError::None);
}

#[test]
fn test_stop_during_bring_up_aborts_it() {
    let mut harness = Harness::new();
    harness.controller.silent.insert(CommandKind::SetPanId);
    harness.network.start_network(harness.current_time_us).unwrap();
    harness.run();

    harness.network.stop_network(harness.current_time_us).unwrap();
    harness.run();
    assert_eq!(harness.network.state(), NetworkState::Offline);
    assert_eq!(harness.network.last_error(), NetworkError::None);

    // The aborted SetPanId exchange never times out later.
    harness.advance_ms(5000);
    assert!(!harness.controller.has_handled(CommandKind::SetChannelMask));
}

#[test]
fn test_reset_runs_a_new_bring_up() {
    let mut harness = Harness::new();
    harness.boot();

    harness.network.reset(harness.current_time_us).unwrap();
    harness.run();

    assert_eq!(harness.network.state(), NetworkState::Running);
    let erases = harness
        .controller
        .handled_kinds()
        .into_iter()
        .filter(|k| *k == CommandKind::ErasePersistentData)
        .count();
    assert_eq!(erases, 2);
}

#[test]
fn test_bring_up_persists_network_and_coordinator() {
    let storage = MemoryStorage::default();
    let mut harness = Harness::new().with_storage(storage.clone());
    harness.boot();

    let state = storage.state.borrow();
    assert_eq!(state.network.as_ref().map(|c| c.pan_id), Some(0x1A62));
    assert!(state.nodes.contains_key(&COORDINATOR_IEEE));
}

#[test]
fn test_load_network_restores_configuration_and_nodes() {
    let storage = MemoryStorage::default();
    {
        let mut state = storage.state.borrow_mut();
        let mut config = simulator::default_config();
        config.pan_id = 0x4242;
        state.network = Some(config);

        let mut node = Node::new(
            0x2222,
            zigbee_rs::ExtendedAddress(0x0017880100AABBCC),
            zigbee_rs::MacCapabilities::FULL_FUNCTION_DEVICE,
        );
        node.state = zigbee_rs::NodeState::Initialized;
        state.nodes.insert(node.extended_address, node);
    }

    let mut harness = Harness::new().with_storage(storage);
    assert_eq!(harness.network.load_network(), Ok(true));
    assert_eq!(harness.network.pan_id(), 0x4242);
    assert!(harness.network.has_node(zigbee_rs::ExtendedAddress(0x0017880100AABBCC)));
    assert_eq!(
        harness.drain_events(),
        vec![NetworkEvent::NodeAdded(zigbee_rs::ExtendedAddress(0x0017880100AABBCC))]
    );

    harness.boot();
    assert!(harness.controller.handled.iter().any(|(_, c)| matches!(
        c,
        BridgeCommand::SetPanId { pan_id: 0x4242, .. }
    )));
}

#[test]
fn test_factory_reset_clears_storage_and_nodes() {
    let storage = MemoryStorage::default();
    let mut harness = Harness::new().with_storage(storage.clone());
    harness.boot();

    harness
        .network
        .factory_reset_network(harness.current_time_us)
        .unwrap();
    assert_eq!(storage.state.borrow().clears, 1);
    assert!(harness.network.coordinator_node().is_none());

    harness.run();
    assert_eq!(harness.network.state(), NetworkState::Running);
    assert!(harness.network.coordinator_node().is_some());
    assert!(storage.state.borrow().nodes.contains_key(&COORDINATOR_IEEE));
}

#[test]
fn test_factory_reset_while_stopping_runs_one_bring_up() {
    let mut harness = Harness::new();
    harness.boot();
    harness.controller.silent.insert(CommandKind::Reset);
    harness.network.reset(harness.current_time_us).unwrap();
    harness.run();
    assert_eq!(harness.network.state(), NetworkState::Stopping);

    harness.controller.silent.clear();
    harness
        .network
        .factory_reset_network(harness.current_time_us)
        .unwrap();
    let queued: Vec<CommandKind> = harness
        .commands
        .borrow()
        .iter()
        .map(|(_, c)| c.kind())
        .collect();
    assert_eq!(queued, vec![CommandKind::ErasePersistentData]);

    harness.run();
    assert_eq!(harness.network.state(), NetworkState::Running);
    assert_eq!(harness.network.last_error(), NetworkError::None);
    let erases = harness
        .controller
        .handled_kinds()
        .into_iter()
        .filter(|k| *k == CommandKind::ErasePersistentData)
        .count();
    assert_eq!(erases, 2);
}

#[test]
fn test_configuration_changes_apply_on_next_start() {
    let mut harness = Harness::new();
    harness.boot();

    harness.network.set_pan_id(0x7777);
    harness.network.set_channel(20).unwrap();
    assert_eq!(harness.network.set_channel(30), Err(ZigbeeError::InvalidChannel(30)));
    assert_eq!(harness.network.channel(), 20);

    harness.network.reset(harness.current_time_us).unwrap();
    harness.run();
    assert!(harness.controller.handled.iter().any(|(_, c)| matches!(
        c,
        BridgeCommand::SetPanId { pan_id: 0x7777, .. }
    )));
    assert!(harness
        .controller
        .handled
        .iter()
        .any(|(_, c)| *c == BridgeCommand::SetChannelMask(ChannelMask(1 << 20))));
}
