use std::collections::BTreeMap;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::acl::{EvalContext, FilterResult, IpAccessList, LineAction};
use crate::flow::Flow;
use crate::ip_space::IpSpaces;
use crate::transformation::Transformation;

/// A compiled device: named ACLs and IP spaces plus the interfaces that
/// reference them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub hostname: String,
    #[serde(default)]
    pub acls: BTreeMap<String, IpAccessList>,
    #[serde(default)]
    pub ip_spaces: IpSpaces,
    #[serde(default)]
    pub zones: BTreeMap<String, Zone>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, Interface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub vrf: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_address: Option<IpNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outgoing_filter: Option<String>,
    /// Filter applied to traffic destined to the device itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_transformation: Option<Transformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outgoing_transformation: Option<Transformation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_host_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_host_filter: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inbound_interface_filters: BTreeMap<String, String>,
    /// Destination zone name to the compiled from-zone policy ACL name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub to_zone_policies: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    pub fn eval_context(&self) -> EvalContext<'_> {
        EvalContext::new(&self.acls, &self.ip_spaces)
    }

    /// Run `flow` through the named ACL. An unknown ACL denies.
    pub fn filter(&self, acl: &str, flow: &Flow) -> FilterResult {
        match self.acls.get(acl) {
            Some(list) => list.filter(flow, &self.eval_context()),
            None => FilterResult {
                action: LineAction::Deny,
                line: None,
            },
        }
    }

    /// ACL names referenced by interfaces or zones with no definition.
    pub fn dangling_acl_references(&self) -> Vec<String> {
        let mut referenced = Vec::new();
        for iface in self.interfaces.values() {
            referenced.extend(iface.incoming_filter.iter().cloned());
            referenced.extend(iface.outgoing_filter.iter().cloned());
            referenced.extend(iface.inbound_filter.iter().cloned());
        }
        for zone in self.zones.values() {
            referenced.extend(zone.inbound_filter.iter().cloned());
            referenced.extend(zone.from_host_filter.iter().cloned());
            referenced.extend(zone.to_host_filter.iter().cloned());
            referenced.extend(zone.inbound_interface_filters.values().cloned());
            referenced.extend(zone.to_zone_policies.values().cloned());
        }
        referenced.sort();
        referenced.dedup();
        referenced.retain(|name| !self.acls.contains_key(name));
        referenced
    }
}

#[cfg(test)]
mod tests {
    use crate::acl::{AclLine, IpAccessList, LineAction};
    use crate::expr::MatchExpr;
    use crate::flow::Flow;

    use super::{Configuration, Interface};

    #[test]
    fn filters_by_acl_name() {
        let mut config = Configuration::new("fw1");
        config.acls.insert(
            "allow".to_string(),
            IpAccessList::new("allow", vec![AclLine::permitting(MatchExpr::True)]),
        );
        let flow = Flow::default();
        assert_eq!(config.filter("allow", &flow).action, LineAction::Permit);
        assert_eq!(config.filter("missing", &flow).action, LineAction::Deny);
    }

    #[test]
    fn reports_dangling_references() {
        let mut config = Configuration::new("fw1");
        config.interfaces.insert(
            "ge-0/0/0.0".to_string(),
            Interface {
                name: "ge-0/0/0.0".to_string(),
                vrf: "default".to_string(),
                incoming_filter: Some("ghost".to_string()),
                ..Interface::default()
            },
        );
        assert_eq!(config.dangling_acl_references(), vec!["ghost".to_string()]);
    }
}
