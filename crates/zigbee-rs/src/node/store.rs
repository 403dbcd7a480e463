// crates/zigbee-rs/src/node/store.rs
//! The cluster/attribute store: applies attribute reports and structure
//! lists to the clusters of registered nodes.
//!
//! A report only raises an `AttributeChanged` event when the decoded value
//! or the status differs from the cached one, so duplicate reports over the
//! radio link are absorbed silently.

use crate::hal::ZigbeeError;
use crate::node::registry::{NodeRegistry, RegistryEvent};
use crate::node::Endpoint;
use crate::zcl::{Attribute, AttributeReport, AttributeStatus, AttributeValue, Cluster, ClusterDirection, DataType};
use log::{debug, trace, warn};

/// Finds the cluster on an endpoint, preferring the server side, and creates
/// it as an input cluster when the endpoint does not list it.
fn locate_cluster(endpoint: &mut Endpoint, cluster_id: u16) -> &mut Cluster {
    let direction = if endpoint.has_cluster(cluster_id, ClusterDirection::Input)
        || !endpoint.has_cluster(cluster_id, ClusterDirection::Output)
    {
        ClusterDirection::Input
    } else {
        ClusterDirection::Output
    };
    endpoint.cluster_entry(cluster_id, direction)
}

/// Decodes the payload of a report. Malformed payloads are kept as raw bytes
/// with a `DecodeError` status instead of failing the report.
fn decode_report(report: &AttributeReport) -> Attribute {
    let status = AttributeStatus::from(report.status);
    let decoded = DataType::try_from(report.data_type).and_then(|data_type| {
        if status != AttributeStatus::Success && report.data.is_empty() {
            Ok((data_type, AttributeValue::NoData))
        } else {
            AttributeValue::decode(data_type, &report.data).map(|value| (data_type, value))
        }
    });
    match decoded {
        Ok((data_type, value)) => Attribute {
            id: report.attribute_id,
            data_type,
            value,
            status,
        },
        Err(e) => {
            warn!(
                "[ZCL] Could not decode attribute {:#06x} of cluster {:#06x} (type {:#04x}): {}",
                report.attribute_id, report.cluster_id, report.data_type, e
            );
            Attribute {
                id: report.attribute_id,
                data_type: DataType::try_from(report.data_type).unwrap_or(DataType::Unknown),
                value: AttributeValue::Raw(report.data.clone()),
                status: AttributeStatus::DecodeError,
            }
        }
    }
}

impl NodeRegistry {
    /// Applies one attribute report to the cache of the reporting node.
    ///
    /// Returns whether the cached attribute changed. Fails only when the
    /// source node or its endpoint is unknown.
    pub fn apply_attribute_report(&mut self, report: &AttributeReport) -> Result<bool, ZigbeeError> {
        let extended_address = self
            .extended_address_of(report.source_address)
            .ok_or(ZigbeeError::UnknownNode)?;
        let attribute = decode_report(report);

        let node = self
            .get_mut(extended_address)
            .ok_or(ZigbeeError::UnknownNode)?;
        let endpoint = node
            .endpoint_mut(report.endpoint)
            .ok_or(ZigbeeError::UnknownEndpoint(report.endpoint))?;
        let cluster = locate_cluster(endpoint, report.cluster_id);
        let direction = cluster.direction;

        if !cluster.set_attribute(attribute.clone()) {
            trace!(
                "[ZCL] {} ep {} {} attr {:#06x}: unchanged",
                extended_address,
                report.endpoint,
                cluster.name(),
                report.attribute_id
            );
            return Ok(false);
        }

        debug!(
            "[ZCL] {} ep {} {} attr {:#06x} = {:?} ({:?})",
            extended_address,
            report.endpoint,
            cluster.name(),
            report.attribute_id,
            attribute.value,
            attribute.status
        );
        self.events.push_back(RegistryEvent::AttributeChanged {
            extended_address,
            endpoint: report.endpoint,
            cluster_id: report.cluster_id,
            direction,
            attribute,
        });
        Ok(true)
    }

    /// Records which clusters exist on an endpoint.
    pub fn apply_cluster_list(
        &mut self,
        source_address: u16,
        endpoint_id: u8,
        profile_id: u16,
        direction: ClusterDirection,
        cluster_ids: &[u16],
    ) -> Result<(), ZigbeeError> {
        let endpoint = self.endpoint_for(source_address, endpoint_id, profile_id)?;
        for id in cluster_ids {
            endpoint.cluster_entry(*id, direction);
        }
        debug!(
            "[ZCL] {:#06x} ep {}: {} {:?} cluster(s) listed",
            source_address,
            endpoint_id,
            cluster_ids.len(),
            direction
        );
        Ok(())
    }

    /// Records which attributes exist on a cluster.
    pub fn apply_attribute_list(
        &mut self,
        source_address: u16,
        endpoint_id: u8,
        profile_id: u16,
        cluster_id: u16,
        attribute_ids: &[u16],
    ) -> Result<(), ZigbeeError> {
        let endpoint = self.endpoint_for(source_address, endpoint_id, profile_id)?;
        locate_cluster(endpoint, cluster_id).add_supported_attributes(attribute_ids);
        Ok(())
    }

    /// Records which commands a cluster accepts.
    pub fn apply_command_id_list(
        &mut self,
        source_address: u16,
        endpoint_id: u8,
        profile_id: u16,
        cluster_id: u16,
        command_ids: &[u8],
    ) -> Result<(), ZigbeeError> {
        let endpoint = self.endpoint_for(source_address, endpoint_id, profile_id)?;
        locate_cluster(endpoint, cluster_id).add_command_ids(command_ids);
        Ok(())
    }

    fn endpoint_for(
        &mut self,
        source_address: u16,
        endpoint_id: u8,
        profile_id: u16,
    ) -> Result<&mut Endpoint, ZigbeeError> {
        let extended_address = self
            .extended_address_of(source_address)
            .ok_or(ZigbeeError::UnknownNode)?;
        let node = self
            .get_mut(extended_address)
            .ok_or(ZigbeeError::UnknownNode)?;
        Ok(node.endpoint_entry(endpoint_id, profile_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtendedAddress;
    use crate::zcl::ids;
    use alloc::vec;
    use alloc::vec::Vec;

    const EXT: ExtendedAddress = ExtendedAddress(0x0012_4B00_01AB_CDEF);

    fn registry_with_light() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.create_node(0x1234, EXT, None);
        registry
            .apply_cluster_list(0x1234, 1, 0x0104, ClusterDirection::Input, &[ids::cluster::BASIC])
            .unwrap();
        registry
    }

    fn on_off_report(data: Vec<u8>) -> AttributeReport {
        AttributeReport {
            source_address: 0x1234,
            endpoint: 1,
            cluster_id: ids::cluster::ON_OFF,
            attribute_id: ids::on_off::ON_OFF,
            status: 0x00,
            data_type: DataType::Boolean as u8,
            data,
        }
    }

    fn changed_count(registry: &mut NodeRegistry) -> usize {
        registry
            .take_events()
            .iter()
            .filter(|e| matches!(e, RegistryEvent::AttributeChanged { .. }))
            .count()
    }

    #[test]
    fn test_first_on_off_report_creates_attribute() {
        let mut registry = registry_with_light();
        assert_eq!(registry.apply_attribute_report(&on_off_report(vec![0x01])), Ok(true));

        let node = registry.get(EXT).unwrap();
        let cluster = node.cluster(1, ids::cluster::ON_OFF, ClusterDirection::Input).unwrap();
        let attribute = cluster.attribute(ids::on_off::ON_OFF).unwrap();
        assert_eq!(attribute.value, AttributeValue::Boolean(true));
        assert_eq!(attribute.status, AttributeStatus::Success);

        let events = registry.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RegistryEvent::AttributeChanged {
                extended_address,
                cluster_id,
                attribute,
                ..
            } => {
                assert_eq!(*extended_address, EXT);
                assert_eq!(*cluster_id, ids::cluster::ON_OFF);
                assert_eq!(attribute.value, AttributeValue::Boolean(true));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_report_is_silent() {
        let mut registry = registry_with_light();
        registry.apply_attribute_report(&on_off_report(vec![0x01])).unwrap();
        assert_eq!(registry.apply_attribute_report(&on_off_report(vec![0x01])), Ok(false));
        assert_eq!(changed_count(&mut registry), 1);
    }

    #[test]
    fn test_differing_reports_notify_in_order() {
        let mut registry = registry_with_light();
        registry.apply_attribute_report(&on_off_report(vec![0x01])).unwrap();
        registry.apply_attribute_report(&on_off_report(vec![0x00])).unwrap();
        let values: Vec<AttributeValue> = registry
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                RegistryEvent::AttributeChanged { attribute, .. } => Some(attribute.value),
                _ => None,
            })
            .collect();
        assert_eq!(
            values,
            vec![AttributeValue::Boolean(true), AttributeValue::Boolean(false)]
        );
    }

    #[test]
    fn test_malformed_report_downgrades_status() {
        let mut registry = registry_with_light();
        let mut report = on_off_report(vec![0x01, 0x02]);
        report.attribute_id = ids::on_off::ON_TIME;
        assert_eq!(registry.apply_attribute_report(&report), Ok(true));

        let node = registry.get(EXT).unwrap();
        let attribute = node
            .cluster(1, ids::cluster::ON_OFF, ClusterDirection::Input)
            .and_then(|c| c.attribute(ids::on_off::ON_TIME))
            .unwrap();
        assert_eq!(attribute.status, AttributeStatus::DecodeError);
        assert_eq!(attribute.value, AttributeValue::Raw(vec![0x01, 0x02]));

        // An unknown data type is a decode error as well.
        let mut report = on_off_report(vec![0x01]);
        report.data_type = 0x03;
        assert_eq!(registry.apply_attribute_report(&report), Ok(true));
    }

    #[test]
    fn test_status_change_notifies() {
        let mut registry = registry_with_light();
        let mut report = on_off_report(vec![]);
        report.status = 0x86;
        assert_eq!(registry.apply_attribute_report(&report), Ok(true));
        assert_eq!(registry.apply_attribute_report(&report), Ok(false));
        assert_eq!(registry.apply_attribute_report(&on_off_report(vec![0x00])), Ok(true));
        assert_eq!(changed_count(&mut registry), 2);
    }

    #[test]
    fn test_report_for_unknown_source_or_endpoint() {
        let mut registry = registry_with_light();
        let mut report = on_off_report(vec![0x01]);
        report.source_address = 0x9999;
        assert_eq!(registry.apply_attribute_report(&report), Err(ZigbeeError::UnknownNode));

        let mut report = on_off_report(vec![0x01]);
        report.endpoint = 7;
        assert_eq!(
            registry.apply_attribute_report(&report),
            Err(ZigbeeError::UnknownEndpoint(7))
        );
    }

    #[test]
    fn test_output_cluster_receives_report() {
        let mut registry = registry_with_light();
        registry
            .apply_cluster_list(0x1234, 1, 0x0104, ClusterDirection::Output, &[ids::cluster::ON_OFF])
            .unwrap();
        registry.apply_attribute_report(&on_off_report(vec![0x01])).unwrap();
        let node = registry.get(EXT).unwrap();
        assert!(node.cluster(1, ids::cluster::ON_OFF, ClusterDirection::Input).is_none());
        assert!(node.cluster(1, ids::cluster::ON_OFF, ClusterDirection::Output).is_some());
    }

    #[test]
    fn test_attribute_and_command_lists() {
        let mut registry = registry_with_light();
        registry
            .apply_attribute_list(0x1234, 1, 0x0104, ids::cluster::BASIC, &[0x0000, 0x0004, 0x0005])
            .unwrap();
        registry
            .apply_command_id_list(0x1234, 1, 0x0104, ids::cluster::ON_OFF, &[0x00, 0x01, 0x02])
            .unwrap();
        let node = registry.get(EXT).unwrap();
        let basic = node.cluster(1, ids::cluster::BASIC, ClusterDirection::Input).unwrap();
        assert!(basic.has_attribute(0x0005));
        let on_off = node.cluster(1, ids::cluster::ON_OFF, ClusterDirection::Input).unwrap();
        assert_eq!(on_off.command_ids().count(), 3);
        // Structure lists never raise value notifications.
        assert_eq!(changed_count(&mut registry), 0);
    }
}
