use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Named IP spaces, keyed `<book>~<entry>` for address-book derived spaces.
pub type IpSpaces = BTreeMap<String, IpSpace>;

// bounds reference chains; converters never emit cycles
const MAX_REFERENCE_DEPTH: usize = 64;

/// A set of IP addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpSpace {
    Universe,
    Empty,
    Prefix { prefix: IpNetwork },
    Union { spaces: Vec<IpSpace> },
    /// Resolved by name through an [`IpSpaces`] registry.
    Reference { name: String },
}

impl IpSpace {
    pub fn prefix(prefix: IpNetwork) -> Self {
        Self::Prefix { prefix }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference { name: name.into() }
    }

    /// Union of `spaces`, collapsing trivial cases.
    pub fn union(spaces: impl IntoIterator<Item = IpSpace>) -> Self {
        let mut members = Vec::new();
        for space in spaces {
            match space {
                Self::Empty => {}
                Self::Universe => return Self::Universe,
                other => members.push(other),
            }
        }
        match members.len() {
            0 => Self::Empty,
            1 => members.remove(0),
            _ => Self::Union { spaces: members },
        }
    }

    pub fn contains(&self, ip: IpAddr, named: &IpSpaces) -> bool {
        self.contains_at_depth(ip, named, 0)
    }

    fn contains_at_depth(&self, ip: IpAddr, named: &IpSpaces, depth: usize) -> bool {
        match self {
            Self::Universe => true,
            Self::Empty => false,
            Self::Prefix { prefix } => prefix.contains(ip),
            Self::Union { spaces } => spaces
                .iter()
                .any(|space| space.contains_at_depth(ip, named, depth)),
            Self::Reference { name } => {
                if depth >= MAX_REFERENCE_DEPTH {
                    return false;
                }
                named
                    .get(name)
                    .is_some_and(|space| space.contains_at_depth(ip, named, depth + 1))
            }
        }
    }
}

impl From<IpNetwork> for IpSpace {
    fn from(prefix: IpNetwork) -> Self {
        Self::Prefix { prefix }
    }
}

impl Display for IpSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Universe => write!(f, "any"),
            Self::Empty => write!(f, "none"),
            Self::Prefix { prefix } => write!(f, "{prefix}"),
            Self::Union { spaces } => {
                write!(f, "{{")?;
                for (idx, space) in spaces.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{space}")?;
                }
                write!(f, "}}")
            }
            Self::Reference { name } => write!(f, "@{name}"),
        }
    }
}
