// crates/zigbee-rs/src/node/mod.rs
//! Nodes, their endpoints and clusters.
//!
//! A `Node` owns its endpoints, an `Endpoint` owns its clusters. Nodes
//! themselves are owned by the `NodeRegistry`; callers only ever borrow
//! them through the registry.

pub mod descriptor;
pub mod registry;
pub mod store;

pub use descriptor::{DescriptorSet, DescriptorWalk, WalkProgress};
pub use registry::{NodeRegistry, RegistryEvent};

use crate::types::{COORDINATOR_SHORT_ADDRESS, ExtendedAddress, MacCapabilities, NetworkAddress};
use crate::zcl::{Cluster, ClusterDirection};
use crate::zdp::{NodeDescriptor, PowerDescriptor, SimpleDescriptor};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// Lifecycle of a node in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeState {
    /// Seen on the network, descriptors not (yet) read.
    #[default]
    Uninitialized,
    /// All descriptors read; the node is an active member.
    Initialized,
}

/// A logical application instance within a node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint {
    pub endpoint_id: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
    input_clusters: BTreeMap<u16, Cluster>,
    output_clusters: BTreeMap<u16, Cluster>,
}

impl Endpoint {
    pub fn new(endpoint_id: u8, profile_id: u16, device_id: u16) -> Self {
        Self {
            endpoint_id,
            profile_id,
            device_id,
            device_version: 0,
            input_clusters: BTreeMap::new(),
            output_clusters: BTreeMap::new(),
        }
    }

    /// Builds an endpoint with empty clusters from its simple descriptor.
    pub fn from_descriptor(descriptor: &SimpleDescriptor) -> Self {
        let mut endpoint = Self::new(descriptor.endpoint, descriptor.profile_id, descriptor.device_id);
        endpoint.merge_descriptor(descriptor);
        endpoint
    }

    /// Updates the endpoint identity and adds missing clusters; existing
    /// clusters keep their cached attributes.
    pub fn merge_descriptor(&mut self, descriptor: &SimpleDescriptor) {
        self.profile_id = descriptor.profile_id;
        self.device_id = descriptor.device_id;
        self.device_version = descriptor.device_version;
        for id in descriptor.input_clusters.iter() {
            self.cluster_entry(*id, ClusterDirection::Input);
        }
        for id in descriptor.output_clusters.iter() {
            self.cluster_entry(*id, ClusterDirection::Output);
        }
    }

    fn clusters(&self, direction: ClusterDirection) -> &BTreeMap<u16, Cluster> {
        match direction {
            ClusterDirection::Input => &self.input_clusters,
            ClusterDirection::Output => &self.output_clusters,
        }
    }

    fn clusters_mut(&mut self, direction: ClusterDirection) -> &mut BTreeMap<u16, Cluster> {
        match direction {
            ClusterDirection::Input => &mut self.input_clusters,
            ClusterDirection::Output => &mut self.output_clusters,
        }
    }

    pub fn cluster(&self, cluster_id: u16, direction: ClusterDirection) -> Option<&Cluster> {
        self.clusters(direction).get(&cluster_id)
    }

    pub fn cluster_mut(&mut self, cluster_id: u16, direction: ClusterDirection) -> Option<&mut Cluster> {
        self.clusters_mut(direction).get_mut(&cluster_id)
    }

    pub fn has_cluster(&self, cluster_id: u16, direction: ClusterDirection) -> bool {
        self.clusters(direction).contains_key(&cluster_id)
    }

    /// Returns the cluster, creating it if it does not exist yet.
    pub fn cluster_entry(&mut self, cluster_id: u16, direction: ClusterDirection) -> &mut Cluster {
        self.clusters_mut(direction)
            .entry(cluster_id)
            .or_insert_with(|| Cluster::new(cluster_id, direction))
    }

    pub fn input_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.input_clusters.values()
    }

    pub fn output_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.output_clusters.values()
    }
}

/// One Zigbee device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub short_address: u16,
    pub extended_address: ExtendedAddress,
    pub mac_capabilities: MacCapabilities,
    pub state: NodeState,
    /// False once another node took over this node's short address.
    pub reachable: bool,
    pub node_descriptor: Option<NodeDescriptor>,
    pub power_descriptor: Option<PowerDescriptor>,
    endpoints: Vec<Endpoint>,
}

impl Node {
    pub fn new(short_address: u16, extended_address: ExtendedAddress, mac_capabilities: MacCapabilities) -> Self {
        Self {
            short_address,
            extended_address,
            mac_capabilities,
            state: NodeState::Uninitialized,
            reachable: true,
            node_descriptor: None,
            power_descriptor: None,
            endpoints: Vec::new(),
        }
    }

    pub fn address(&self) -> NetworkAddress {
        NetworkAddress::new(self.short_address, self.extended_address)
    }

    pub fn is_initialized(&self) -> bool {
        self.state == NodeState::Initialized
    }

    pub fn is_coordinator(&self) -> bool {
        self.short_address == COORDINATOR_SHORT_ADDRESS
    }

    pub fn is_router(&self) -> bool {
        self.mac_capabilities.is_router()
    }

    /// Endpoints in ascending id order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn endpoint(&self, endpoint_id: u8) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.endpoint_id == endpoint_id)
    }

    pub fn endpoint_mut(&mut self, endpoint_id: u8) -> Option<&mut Endpoint> {
        self.endpoints.iter_mut().find(|e| e.endpoint_id == endpoint_id)
    }

    pub fn has_endpoint(&self, endpoint_id: u8) -> bool {
        self.endpoint(endpoint_id).is_some()
    }

    /// Returns the endpoint, creating an empty one if it does not exist yet.
    pub fn endpoint_entry(&mut self, endpoint_id: u8, profile_id: u16) -> &mut Endpoint {
        let index = match self.endpoints.binary_search_by_key(&endpoint_id, |e| e.endpoint_id) {
            Ok(index) => index,
            Err(index) => {
                self.endpoints.insert(index, Endpoint::new(endpoint_id, profile_id, 0));
                index
            }
        };
        &mut self.endpoints[index]
    }

    /// Shortcut for a cluster lookup across the endpoint tree.
    pub fn cluster(&self, endpoint_id: u8, cluster_id: u16, direction: ClusterDirection) -> Option<&Cluster> {
        self.endpoint(endpoint_id)?.cluster(cluster_id, direction)
    }
}
