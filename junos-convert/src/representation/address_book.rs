use std::collections::BTreeMap;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressBook {
    /// Empty for zone-local books, which take their zone's name.
    pub name: String,
    pub entries: BTreeMap<String, AddressBookEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AddressBookEntry {
    Prefix { prefix: IpNetwork },
    Range { from: IpAddr, to: IpAddr },
    /// Other entries of the same book.
    Set { members: Vec<String> },
    DnsName { name: String },
}
