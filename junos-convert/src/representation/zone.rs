use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::address_book::AddressBook;
use super::filter::Term;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyAction {
    Permit,
    #[default]
    Deny,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Zone {
    pub name: String,
    pub interfaces: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_book: Option<AddressBook>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbound_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_host_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_host_filter: Option<String>,
    /// Interface name to the inbound filter overriding the zone-wide one.
    pub inbound_interface_filters: BTreeMap<String, String>,
    /// Policies for traffic entering from another zone and leaving via this
    /// one, in configuration order.
    pub from_zone_policies: Vec<ZonePolicy>,
    pub screens: Vec<String>,
}

/// `from-zone <from_zone> to-zone <this zone>` policy block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonePolicy {
    pub from_zone: String,
    pub policies: Vec<Term>,
}
