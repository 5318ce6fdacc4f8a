use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenAction {
    #[default]
    Drop,
    AlarmWithoutDrop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Screen {
    pub name: String,
    pub action: ScreenAction,
    /// Option keywords as configured, e.g. `tcp-syn-fin`.
    pub options: Vec<String>,
}

/// Screen options with a packet-level model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenOption {
    IcmpLarge,
    IpUnknownProtocol,
    TcpFinNoAck,
    TcpSynFin,
    TcpNoFlag,
}

impl ScreenOption {
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim() {
            "icmp-large" => Some(Self::IcmpLarge),
            "ip-unknown-protocol" => Some(Self::IpUnknownProtocol),
            "tcp-fin-no-ack" => Some(Self::TcpFinNoAck),
            "tcp-syn-fin" => Some(Self::TcpSynFin),
            "tcp-no-flag" => Some(Self::TcpNoFlag),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::IcmpLarge => "icmp-large",
            Self::IpUnknownProtocol => "ip-unknown-protocol",
            Self::TcpFinNoAck => "tcp-fin-no-ack",
            Self::TcpSynFin => "tcp-syn-fin",
            Self::TcpNoFlag => "tcp-no-flag",
        }
    }
}
