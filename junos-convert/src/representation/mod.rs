//! Vendor-side object graph.
//!
//! These types mirror what the Junos grammar front end hands over after
//! parsing and linking: every cross-reference is still a string name that the
//! compile passes resolve. The graph is deserialized with `serde` and never
//! mutated once [`JuniperConfig::normalize`] has run.

pub mod address_book;
pub mod application;
pub mod filter;
pub mod interface;
pub mod nat;
pub mod screen;
pub mod zone;

use std::collections::BTreeMap;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

pub use address_book::{AddressBook, AddressBookEntry};
pub use application::{Application, ApplicationSet, ApplicationTerm};
pub use filter::{Family, FirewallFilter, FwFrom, FwThen, PrefixListModifier, Term};
pub use interface::{Interface, RoutingInstance};
pub use nat::{
    Nat, NatBlock, NatPacketLocation, NatPool, NatRule, NatRuleMatch, NatRuleSet, NatRuleThen,
    PortAddressTranslation, PortRange,
};
pub use screen::{Screen, ScreenAction, ScreenOption};
pub use zone::{PolicyAction, Zone, ZonePolicy};

/// Routing instance that holds every interface not listed elsewhere.
pub const DEFAULT_ROUTING_INSTANCE: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefixList {
    pub name: String,
    pub prefixes: Vec<IpNetwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JuniperConfig {
    pub hostname: String,
    pub interfaces: BTreeMap<String, Interface>,
    pub routing_instances: BTreeMap<String, RoutingInstance>,
    pub firewall_filters: BTreeMap<String, FirewallFilter>,
    pub prefix_lists: BTreeMap<String, PrefixList>,
    pub interface_sets: BTreeMap<String, Vec<String>>,
    pub applications: BTreeMap<String, Application>,
    pub application_sets: BTreeMap<String, ApplicationSet>,
    /// Global address books keyed by book name.
    pub address_books: BTreeMap<String, AddressBook>,
    pub zones: BTreeMap<String, Zone>,
    pub screens: BTreeMap<String, Screen>,
    /// Policies of `security policies global`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_policy: Option<Vec<Term>>,
    pub default_cross_zone_action: PolicyAction,
    pub nat: Nat,
}

impl JuniperConfig {
    /// Fill object names from their map keys where the document left them out.
    pub fn normalize(mut self) -> Self {
        fill_names(&mut self.interfaces, |i| &mut i.name);
        fill_names(&mut self.firewall_filters, |f| &mut f.name);
        fill_names(&mut self.prefix_lists, |p| &mut p.name);
        fill_names(&mut self.applications, |a| &mut a.name);
        fill_names(&mut self.application_sets, |s| &mut s.name);
        fill_names(&mut self.address_books, |b| &mut b.name);
        fill_names(&mut self.screens, |s| &mut s.name);
        fill_names(&mut self.zones, |z| &mut z.name);
        for zone in self.zones.values_mut() {
            if let Some(book) = zone.address_book.as_mut() {
                if book.name.is_empty() {
                    book.name = zone.name.clone();
                }
            }
        }
        self
    }

    /// Zone the interface is a member of, if any.
    pub fn zone_of(&self, interface: &str) -> Option<&Zone> {
        self.zones
            .values()
            .find(|zone| zone.interfaces.iter().any(|member| member == interface))
    }

    /// Routing instance the interface belongs to.
    pub fn routing_instance_of(&self, interface: &str) -> &str {
        self.routing_instances
            .iter()
            .find(|(_, instance)| instance.interfaces.iter().any(|member| member == interface))
            .map_or(DEFAULT_ROUTING_INSTANCE, |(name, _)| name.as_str())
    }

    /// Member interfaces of every routing instance, including the implicit
    /// default instance.
    pub fn routing_instance_members(&self) -> BTreeMap<String, Vec<String>> {
        let mut members: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in self.interfaces.keys() {
            members
                .entry(self.routing_instance_of(name).to_string())
                .or_default()
                .push(name.clone());
        }
        for name in self.routing_instances.keys() {
            members.entry(name.clone()).or_default();
        }
        members
    }
}

fn fill_names<T>(map: &mut BTreeMap<String, T>, name: impl Fn(&mut T) -> &mut String) {
    for (key, value) in map.iter_mut() {
        let slot = name(value);
        if slot.is_empty() {
            *slot = key.clone();
        }
    }
}
