use std::collections::BTreeMap;

use packet_model::MatchExpr;

use crate::representation::{JuniperConfig, NatPacketLocation};

/// Source-interface predicate for every NAT location the device has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationMap {
    locations: BTreeMap<NatPacketLocation, MatchExpr>,
}

impl LocationMap {
    pub fn build(config: &JuniperConfig) -> Self {
        let mut locations = BTreeMap::new();
        for name in config.interfaces.keys() {
            locations.insert(
                NatPacketLocation::Interface(name.clone()),
                MatchExpr::src_interfaces([name.clone()]),
            );
        }
        for zone in config.zones.values() {
            locations.insert(
                NatPacketLocation::Zone(zone.name.clone()),
                MatchExpr::src_interfaces(zone.interfaces.iter().cloned()),
            );
        }
        for (instance, members) in config.routing_instance_members() {
            locations.insert(
                NatPacketLocation::RoutingInstance(instance),
                MatchExpr::src_interfaces(members),
            );
        }
        Self { locations }
    }

    pub fn get(&self, location: &NatPacketLocation) -> Option<&MatchExpr> {
        self.locations.get(location)
    }

    pub(crate) fn len(&self) -> usize {
        self.locations.len()
    }
}

#[cfg(test)]
mod tests {
    use packet_model::MatchExpr;
    use pretty_assertions::assert_eq;

    use super::LocationMap;
    use crate::representation::{Interface, JuniperConfig, NatPacketLocation, RoutingInstance, Zone};

    #[test]
    fn maps_interfaces_zones_and_instances() {
        let mut config = JuniperConfig::default();
        for name in ["ge-0/0/0.0", "ge-0/0/1.0", "ge-0/0/2.0"] {
            config.interfaces.insert(name.to_string(), Interface::default());
        }
        config.zones.insert(
            "untrust".to_string(),
            Zone {
                interfaces: vec!["ge-0/0/1.0".to_string(), "ge-0/0/2.0".to_string()],
                ..Zone::default()
            },
        );
        config.routing_instances.insert(
            "vr-lab".to_string(),
            RoutingInstance {
                interfaces: vec!["ge-0/0/2.0".to_string()],
            },
        );
        let config = config.normalize();
        let map = LocationMap::build(&config);

        assert_eq!(map.len(), 3 + 1 + 2);
        assert_eq!(
            map.get(&NatPacketLocation::Interface("ge-0/0/0.0".into())),
            Some(&MatchExpr::src_interfaces(["ge-0/0/0.0"]))
        );
        assert_eq!(
            map.get(&NatPacketLocation::Zone("untrust".into())),
            Some(&MatchExpr::src_interfaces(["ge-0/0/1.0", "ge-0/0/2.0"]))
        );
        assert_eq!(
            map.get(&NatPacketLocation::RoutingInstance("default".into())),
            Some(&MatchExpr::src_interfaces(["ge-0/0/0.0", "ge-0/0/1.0"]))
        );
        assert_eq!(
            map.get(&NatPacketLocation::RoutingInstance("vr-lab".into())),
            Some(&MatchExpr::src_interfaces(["ge-0/0/2.0"]))
        );
        assert!(map.get(&NatPacketLocation::Zone("dmz".into())).is_none());
    }
}
