// crates/zigbee-rs/tests/simulator/storage.rs
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use zigbee_rs::network::NetworkConfiguration;
use zigbee_rs::{ExtendedAddress, NetworkStorage, Node, ZigbeeError};

#[derive(Debug, Default)]
pub struct StoredState {
    pub network: Option<NetworkConfiguration>,
    pub nodes: BTreeMap<ExtendedAddress, Node>,
    pub clears: usize,
}

/// In-memory storage. Clones share the same state so tests can inspect what
/// the network persisted after handing a clone over.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    pub state: Rc<RefCell<StoredState>>,
}

impl NetworkStorage for MemoryStorage {
    fn save_network(&mut self, config: &NetworkConfiguration) -> Result<(), ZigbeeError> {
        self.state.borrow_mut().network = Some(config.clone());
        Ok(())
    }

    fn load_network(&mut self) -> Result<Option<NetworkConfiguration>, ZigbeeError> {
        Ok(self.state.borrow().network.clone())
    }

    fn save_node(&mut self, node: &Node) -> Result<(), ZigbeeError> {
        self.state
            .borrow_mut()
            .nodes
            .insert(node.extended_address, node.clone());
        Ok(())
    }

    fn remove_node(&mut self, extended_address: ExtendedAddress) -> Result<(), ZigbeeError> {
        self.state.borrow_mut().nodes.remove(&extended_address);
        Ok(())
    }

    fn load_nodes(&mut self) -> Result<Vec<Node>, ZigbeeError> {
        Ok(self.state.borrow().nodes.values().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), ZigbeeError> {
        let mut state = self.state.borrow_mut();
        state.network = None;
        state.nodes.clear();
        state.clears += 1;
        Ok(())
    }
}
