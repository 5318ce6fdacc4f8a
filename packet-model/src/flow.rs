use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::expr::HeaderField;
use crate::protocol::IpProtocol;

pub const TCP_FIN: u8 = 0x01;
pub const TCP_SYN: u8 = 0x02;
pub const TCP_RST: u8 = 0x04;
pub const TCP_PSH: u8 = 0x08;
pub const TCP_ACK: u8 = 0x10;
pub const TCP_URG: u8 = 0x20;

/// Connection-tracking state of a flow as seen by a stateful device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    New,
    Established,
    Related,
}

/// A concrete packet header plus the ingress point it arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    /// `None` when the packet was originated by the device itself.
    pub ingress_interface: Option<String>,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub ip_protocol: IpProtocol,
    pub src_port: u16,
    pub dst_port: u16,
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub dscp: u8,
    pub ttl: u8,
    pub packet_length: u16,
    pub tcp_flags: u8,
    pub state: FlowState,
}

impl Default for Flow {
    fn default() -> Self {
        Self {
            ingress_interface: None,
            src_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dst_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ip_protocol: IpProtocol::TCP,
            src_port: 0,
            dst_port: 0,
            icmp_type: 0,
            icmp_code: 0,
            dscp: 0,
            ttl: 64,
            packet_length: 512,
            tcp_flags: 0,
            state: FlowState::New,
        }
    }
}

impl Flow {
    /// A TCP flow arriving on `ingress`.
    pub fn tcp(ingress: &str, src: IpAddr, src_port: u16, dst: IpAddr, dst_port: u16) -> Self {
        Self {
            ingress_interface: Some(ingress.to_string()),
            src_ip: src,
            dst_ip: dst,
            ip_protocol: IpProtocol::TCP,
            src_port,
            dst_port,
            ..Self::default()
        }
    }

    /// A UDP flow arriving on `ingress`.
    pub fn udp(ingress: &str, src: IpAddr, src_port: u16, dst: IpAddr, dst_port: u16) -> Self {
        Self {
            ip_protocol: IpProtocol::UDP,
            ..Self::tcp(ingress, src, src_port, dst, dst_port)
        }
    }

    /// An ICMP flow arriving on `ingress`.
    pub fn icmp(ingress: &str, src: IpAddr, dst: IpAddr, icmp_type: u8, icmp_code: u8) -> Self {
        Self {
            ingress_interface: Some(ingress.to_string()),
            src_ip: src,
            dst_ip: dst,
            ip_protocol: IpProtocol::ICMP,
            icmp_type,
            icmp_code,
            ..Self::default()
        }
    }

    pub fn originated_by_device(mut self) -> Self {
        self.ingress_interface = None;
        self
    }

    pub fn with_state(mut self, state: FlowState) -> Self {
        self.state = state;
        self
    }

    pub fn with_tcp_flags(mut self, flags: u8) -> Self {
        self.tcp_flags = flags;
        self
    }

    pub fn with_packet_length(mut self, length: u16) -> Self {
        self.packet_length = length;
        self
    }

    pub fn with_dscp(mut self, dscp: u8) -> Self {
        self.dscp = dscp;
        self
    }

    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// Numeric value of a header field, widened for range comparison.
    pub fn header_value(&self, field: HeaderField) -> u32 {
        match field {
            HeaderField::IpProtocol => u32::from(self.ip_protocol.number()),
            HeaderField::SrcPort => u32::from(self.src_port),
            HeaderField::DstPort => u32::from(self.dst_port),
            HeaderField::IcmpType => u32::from(self.icmp_type),
            HeaderField::IcmpCode => u32::from(self.icmp_code),
            HeaderField::Dscp => u32::from(self.dscp),
            HeaderField::Ttl => u32::from(self.ttl),
            HeaderField::PacketLength => u32::from(self.packet_length),
        }
    }
}
