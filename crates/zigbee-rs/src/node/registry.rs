// crates/zigbee-rs/src/node/registry.rs
use crate::hal::ZigbeeError;
use crate::node::descriptor::DescriptorSet;
use crate::node::{Node, NodeState};
use crate::types::{ExtendedAddress, MacCapabilities, UNKNOWN_SHORT_ADDRESS};
use crate::zcl::{Attribute, ClusterDirection};
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;
use log::{debug, info, warn};

/// Changes of the registry that higher layers observe.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    NodeAdded(ExtendedAddress),
    NodeRemoved {
        extended_address: ExtendedAddress,
        short_address: u16,
    },
    AttributeChanged {
        extended_address: ExtendedAddress,
        endpoint: u8,
        cluster_id: u16,
        direction: ClusterDirection,
        attribute: Attribute,
    },
}

/// Owns every known node, keyed by extended address, with a secondary index
/// by short address.
///
/// Extended addresses are unique. Short addresses are unique among reachable
/// nodes: when a new owner announces a short address, the previous owner
/// loses it.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<ExtendedAddress, Node>,
    short_index: BTreeMap<u16, ExtendedAddress>,
    uninitialized: BTreeSet<ExtendedAddress>,
    coordinator: Option<ExtendedAddress>,
    descriptor_failures: BTreeMap<ExtendedAddress, u8>,
    pub(super) events: VecDeque<RegistryEvent>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node, or updates the known node with the same extended
    /// address. New nodes start uninitialized.
    pub fn create_node(
        &mut self,
        short_address: u16,
        extended_address: ExtendedAddress,
        mac_capabilities: Option<MacCapabilities>,
    ) -> &Node {
        self.claim_short_address(short_address, extended_address);

        if let Some(node) = self.nodes.get_mut(&extended_address) {
            if node.short_address != short_address {
                info!(
                    "[REG] Node {} changed short address {:#06x} -> {:#06x}",
                    extended_address, node.short_address, short_address
                );
                if self.short_index.get(&node.short_address) == Some(&extended_address) {
                    self.short_index.remove(&node.short_address);
                }
                node.short_address = short_address;
            }
            if let Some(caps) = mac_capabilities {
                node.mac_capabilities = caps;
            }
            node.reachable = true;
        } else {
            info!(
                "[REG] New node {} with short address {:#06x}",
                extended_address, short_address
            );
            let node = Node::new(
                short_address,
                extended_address,
                mac_capabilities.unwrap_or_default(),
            );
            self.nodes.insert(extended_address, node);
            self.uninitialized.insert(extended_address);
        }

        if short_address != UNKNOWN_SHORT_ADDRESS {
            self.short_index.insert(short_address, extended_address);
        }
        &self.nodes[&extended_address]
    }

    /// Invalidates a stale short address mapping held by another node.
    fn claim_short_address(&mut self, short_address: u16, new_owner: ExtendedAddress) {
        if short_address == UNKNOWN_SHORT_ADDRESS {
            return;
        }
        let stale_owner = match self.short_index.get(&short_address) {
            Some(owner) if *owner != new_owner => *owner,
            _ => return,
        };
        warn!(
            "[REG] Short address {:#06x} moved from {} to {}",
            short_address, stale_owner, new_owner
        );
        self.short_index.remove(&short_address);
        if let Some(stale) = self.nodes.get_mut(&stale_owner) {
            stale.short_address = UNKNOWN_SHORT_ADDRESS;
            stale.reachable = false;
        }
    }

    /// Creates the coordinator node. It can never be removed.
    pub fn set_coordinator(&mut self, short_address: u16, extended_address: ExtendedAddress) -> &Node {
        if let Some(previous) = self.coordinator {
            if previous != extended_address {
                warn!(
                    "[REG] Coordinator address changed from {} to {}",
                    previous, extended_address
                );
                self.coordinator = None;
                let _ = self.remove(previous);
            }
        }
        self.coordinator = Some(extended_address);
        self.create_node(short_address, extended_address, None)
    }

    pub fn coordinator(&self) -> Option<&Node> {
        self.coordinator.and_then(|ext| self.nodes.get(&ext))
    }

    pub fn get(&self, extended_address: ExtendedAddress) -> Option<&Node> {
        self.nodes.get(&extended_address)
    }

    pub fn get_by_short(&self, short_address: u16) -> Option<&Node> {
        self.short_index
            .get(&short_address)
            .and_then(|ext| self.nodes.get(ext))
    }

    pub(crate) fn get_mut(&mut self, extended_address: ExtendedAddress) -> Option<&mut Node> {
        self.nodes.get_mut(&extended_address)
    }

    pub(crate) fn extended_address_of(&self, short_address: u16) -> Option<ExtendedAddress> {
        self.short_index.get(&short_address).copied()
    }

    pub fn contains(&self, extended_address: ExtendedAddress) -> bool {
        self.nodes.contains_key(&extended_address)
    }

    /// All nodes, including uninitialized ones, in extended address order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Nodes that completed their descriptor walk.
    pub fn initialized_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_initialized())
    }

    pub fn uninitialized_nodes(&self) -> impl Iterator<Item = &Node> {
        self.uninitialized.iter().filter_map(|ext| self.nodes.get(ext))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Removes a node together with its endpoints and clusters.
    ///
    /// A removal notification is only raised for nodes that had been added,
    /// i.e. completed initialization.
    pub fn remove(&mut self, extended_address: ExtendedAddress) -> Result<Node, ZigbeeError> {
        if self.coordinator == Some(extended_address) {
            return Err(ZigbeeError::CoordinatorNotRemovable);
        }
        let node = self
            .nodes
            .remove(&extended_address)
            .ok_or(ZigbeeError::UnknownNode)?;
        if self.short_index.get(&node.short_address) == Some(&extended_address) {
            self.short_index.remove(&node.short_address);
        }
        self.uninitialized.remove(&extended_address);
        self.descriptor_failures.remove(&extended_address);

        info!(
            "[REG] Node {} ({:#06x}) removed",
            extended_address, node.short_address
        );
        if node.is_initialized() {
            self.events.push_back(RegistryEvent::NodeRemoved {
                extended_address,
                short_address: node.short_address,
            });
        }
        Ok(node)
    }

    /// Puts a node back into the uninitialized staging set.
    pub fn mark_uninitialized(&mut self, extended_address: ExtendedAddress) -> Result<(), ZigbeeError> {
        let node = self
            .nodes
            .get_mut(&extended_address)
            .ok_or(ZigbeeError::UnknownNode)?;
        node.state = NodeState::Uninitialized;
        self.uninitialized.insert(extended_address);
        Ok(())
    }

    pub fn is_uninitialized(&self, extended_address: ExtendedAddress) -> bool {
        self.uninitialized.contains(&extended_address)
    }

    /// Installs the result of a descriptor walk and builds the endpoint and
    /// cluster tree. Clusters that already exist keep their attributes.
    pub fn apply_descriptors(
        &mut self,
        extended_address: ExtendedAddress,
        descriptors: &DescriptorSet,
    ) -> Result<(), ZigbeeError> {
        let node = self
            .nodes
            .get_mut(&extended_address)
            .ok_or(ZigbeeError::UnknownNode)?;
        node.node_descriptor = Some(descriptors.node_descriptor);
        node.mac_capabilities = descriptors.node_descriptor.mac_capabilities;
        node.power_descriptor = Some(descriptors.power_descriptor);
        for simple in descriptors.simple_descriptors.iter() {
            node.endpoint_entry(simple.endpoint, simple.profile_id)
                .merge_descriptor(simple);
        }
        debug!(
            "[REG] Node {}: {} endpoint(s) installed",
            extended_address,
            node.endpoints().len()
        );
        Ok(())
    }

    /// Promotes an uninitialized node to an active member.
    pub fn promote(&mut self, extended_address: ExtendedAddress) -> Result<(), ZigbeeError> {
        let node = self
            .nodes
            .get_mut(&extended_address)
            .ok_or(ZigbeeError::UnknownNode)?;
        if node.state == NodeState::Initialized {
            return Ok(());
        }
        node.state = NodeState::Initialized;
        self.uninitialized.remove(&extended_address);
        self.descriptor_failures.remove(&extended_address);
        info!("[REG] Node {} initialized", extended_address);
        self.events.push_back(RegistryEvent::NodeAdded(extended_address));
        Ok(())
    }

    /// Counts a failed descriptor read. Returns the number of failures so far.
    pub fn record_descriptor_failure(&mut self, extended_address: ExtendedAddress) -> u8 {
        let failures = self.descriptor_failures.entry(extended_address).or_insert(0);
        *failures = failures.saturating_add(1);
        *failures
    }

    pub fn descriptor_failures(&self, extended_address: ExtendedAddress) -> u8 {
        self.descriptor_failures
            .get(&extended_address)
            .copied()
            .unwrap_or(0)
    }

    /// Restores a persisted node. Initialized nodes are announced as added.
    pub fn restore(&mut self, mut node: Node) {
        let extended_address = node.extended_address;
        self.claim_short_address(node.short_address, extended_address);
        if let Some(previous) = self.nodes.get(&extended_address) {
            if previous.short_address != node.short_address
                && self.short_index.get(&previous.short_address) == Some(&extended_address)
            {
                self.short_index.remove(&previous.short_address);
            }
        }
        node.reachable = true;
        if node.short_address != UNKNOWN_SHORT_ADDRESS {
            self.short_index.insert(node.short_address, extended_address);
        }
        if node.is_initialized() {
            self.uninitialized.remove(&extended_address);
            self.events.push_back(RegistryEvent::NodeAdded(extended_address));
        } else {
            self.uninitialized.insert(extended_address);
        }
        self.nodes.insert(extended_address, node);
    }

    /// Drops every node, including the coordinator. No events are raised.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.short_index.clear();
        self.uninitialized.clear();
        self.descriptor_failures.clear();
        self.coordinator = None;
        self.events.clear();
    }

    /// Drains the pending registry events in the order they happened.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        self.events.drain(..).collect()
    }
}
