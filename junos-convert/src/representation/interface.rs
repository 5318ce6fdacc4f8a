use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// A logical interface unit such as `ge-0/0/0.0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interface {
    pub name: String,
    /// Interface address with its subnet length, e.g. `192.0.2.1/24`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_address: Option<IpNetwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outgoing_filter: Option<String>,
    /// `input-list`; takes precedence over `incoming_filter`.
    pub incoming_filter_list: Vec<String>,
    /// `output-list`; takes precedence over `outgoing_filter`.
    pub outgoing_filter_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingInstance {
    pub interfaces: Vec<String>,
}
