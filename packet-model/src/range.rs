//! Closed address ranges and their minimal CIDR decomposition.
//!
//! Vendor constructs such as address-book ranges and NAT pools are written as
//! `low..high` pairs, while the predicate model only understands prefixes. The
//! decomposition walks the range from its low end and always emits the widest
//! prefix that both starts exactly at the current address and fits inside what
//! is left of the range, which yields the unique minimal cover.

use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::{IpNetwork, IpNetworkError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a range cannot be represented.
#[derive(Debug, Error)]
pub enum RangeError {
    /// The two ends belong to different address families.
    #[error("range {low}-{high} mixes IPv4 and IPv6 addresses")]
    MixedFamilies { low: IpAddr, high: IpAddr },
    /// The low end is greater than the high end.
    #[error("range {low}-{high} has its low end above its high end")]
    Inverted { low: IpAddr, high: IpAddr },
    /// A computed block could not be expressed as a network.
    #[error("failed to build prefix: {0}")]
    Network(#[from] IpNetworkError),
}

/// A validated closed address range `[low, high]` within one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpRange {
    pub low: IpAddr,
    pub high: IpAddr,
}

impl IpRange {
    /// Build a range, rejecting mixed families and inverted bounds.
    pub fn new(low: IpAddr, high: IpAddr) -> Result<Self, RangeError> {
        bounds(low, high)?;
        Ok(Self { low, high })
    }

    pub fn singleton(ip: IpAddr) -> Self {
        Self { low: ip, high: ip }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match (bounds(self.low, self.high), to_bits(ip)) {
            (Ok((low, high, width)), (bits, ip_width)) => {
                width == ip_width && low <= bits && bits <= high
            }
            (Err(_), _) => false,
        }
    }

    /// Minimal set of CIDR blocks covering exactly this range.
    pub fn prefixes(&self) -> Result<Vec<IpNetwork>, RangeError> {
        range_to_prefixes(self.low, self.high)
    }
}

impl Display for IpRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

/// Decompose `[low, high]` into the minimal list of CIDR-aligned blocks.
///
/// Blocks are returned in ascending address order and are pairwise disjoint.
pub fn range_to_prefixes(low: IpAddr, high: IpAddr) -> Result<Vec<IpNetwork>, RangeError> {
    let (lo, hi, width) = bounds(low, high)?;

    let mut out = Vec::new();
    let mut start = lo;
    loop {
        let alignment = if start == 0 {
            width
        } else {
            start.trailing_zeros().min(width)
        };
        // hi - start + 1 only overflows for the whole IPv6 space
        let fit = match (hi - start).checked_add(1) {
            Some(remaining) => 127 - remaining.leading_zeros(),
            None => 128,
        };
        let host_bits = alignment.min(fit);
        out.push(block(start, width - host_bits, low.is_ipv4())?);

        let Some(next) = 1u128
            .checked_shl(host_bits)
            .and_then(|size| start.checked_add(size))
        else {
            break;
        };
        if next > hi {
            break;
        }
        start = next;
    }
    Ok(out)
}

fn bounds(low: IpAddr, high: IpAddr) -> Result<(u128, u128, u32), RangeError> {
    let (lo, lo_width) = to_bits(low);
    let (hi, hi_width) = to_bits(high);
    if lo_width != hi_width {
        return Err(RangeError::MixedFamilies { low, high });
    }
    if lo > hi {
        return Err(RangeError::Inverted { low, high });
    }
    Ok((lo, hi, lo_width))
}

fn to_bits(ip: IpAddr) -> (u128, u32) {
    match ip {
        IpAddr::V4(v4) => (u128::from(u32::from(v4)), 32),
        IpAddr::V6(v6) => (u128::from(v6), 128),
    }
}

fn block(start: u128, prefix_len: u32, ipv4: bool) -> Result<IpNetwork, RangeError> {
    // prefix_len <= width <= 128, so the narrowing casts are lossless
    let ip = if ipv4 {
        IpAddr::V4(Ipv4Addr::from(start as u32))
    } else {
        IpAddr::V6(Ipv6Addr::from(start))
    };
    Ok(IpNetwork::new(ip, prefix_len as u8)?)
}
