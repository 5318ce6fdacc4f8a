//! Address books to the named IP-space registry.
//!
//! Every entry of every global and zone-local book becomes one registry entry
//! keyed `<book>~<entry>`. Predicates refer to entries through
//! [`IpSpace::Reference`] so the registry is the single place an entry's
//! addresses are spelled out.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use packet_model::{range_to_prefixes, IpSpace, IpSpaces};
use tracing::debug;

use crate::convert::names;
use crate::error::ConversionError;
use crate::representation::{AddressBook, AddressBookEntry, JuniperConfig};
use crate::warnings::Warnings;

/// Name lookup across global and zone-local address books.
#[derive(Debug, Clone)]
pub struct AddressBooks<'a> {
    /// Global books in name order.
    global: Vec<&'a AddressBook>,
    by_zone: BTreeMap<&'a str, &'a AddressBook>,
}

impl<'a> AddressBooks<'a> {
    pub fn new(config: &'a JuniperConfig) -> Self {
        let global = config.address_books.values().collect();
        let by_zone = config
            .zones
            .iter()
            .filter_map(|(name, zone)| zone.address_book.as_ref().map(|book| (name.as_str(), book)))
            .collect();
        Self { global, by_zone }
    }

    /// Find `entry`, preferring the zone-local book of `zone`.
    pub fn entry(
        &self,
        zone: Option<&str>,
        entry: &str,
    ) -> Option<(&'a AddressBook, &'a AddressBookEntry)> {
        let local = zone
            .and_then(|zone| self.by_zone.get(zone))
            .into_iter()
            .copied();
        local
            .chain(self.global.iter().copied())
            .find_map(|book| book.entries.get(entry).map(|found| (book, found)))
    }

    /// IP space for an entry name; `None` when nothing by that name exists.
    pub fn resolve(&self, zone: Option<&str>, entry: &str) -> Option<IpSpace> {
        match entry {
            "any" => return Some(IpSpace::Universe),
            "any-ipv4" => {
                return Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0)
                    .ok()
                    .map(|net| IpSpace::prefix(net.into()))
            }
            "any-ipv6" => {
                return Ipv6Network::new(Ipv6Addr::UNSPECIFIED, 0)
                    .ok()
                    .map(|net| IpSpace::prefix(net.into()))
            }
            _ => {}
        }
        self.entry(zone, entry)
            .map(|(book, _)| IpSpace::reference(names::address_book_entry(&book.name, entry)))
    }

    /// The single prefix an entry stands for, when it is a prefix entry.
    pub fn prefix(&self, zone: Option<&str>, entry: &str) -> Option<IpNetwork> {
        match self.entry(zone, entry) {
            Some((_, AddressBookEntry::Prefix { prefix })) => Some(*prefix),
            _ => None,
        }
    }
}

/// Build the registry for every book in `config`.
pub fn compile_address_books(
    config: &JuniperConfig,
    warnings: &mut Warnings,
) -> Result<IpSpaces, ConversionError> {
    let mut spaces = IpSpaces::new();
    let zone_books = config
        .zones
        .values()
        .filter_map(|zone| zone.address_book.as_ref());
    for book in config.address_books.values().chain(zone_books) {
        for (entry_name, entry) in &book.entries {
            let space = compile_entry(book, entry_name, entry, warnings)?;
            spaces.insert(names::address_book_entry(&book.name, entry_name), space);
        }
    }
    debug!(entries = spaces.len(), "compiled address books");
    Ok(spaces)
}

fn compile_entry(
    book: &AddressBook,
    entry_name: &str,
    entry: &AddressBookEntry,
    warnings: &mut Warnings,
) -> Result<IpSpace, ConversionError> {
    match entry {
        AddressBookEntry::Prefix { prefix } => Ok(IpSpace::prefix(*prefix)),
        AddressBookEntry::Range { from, to } => {
            let blocks =
                range_to_prefixes(*from, *to).map_err(|source| ConversionError::InvalidRange {
                    context: format!("address-book {} entry {entry_name}", book.name),
                    source,
                })?;
            Ok(IpSpace::union(blocks.into_iter().map(IpSpace::prefix)))
        }
        AddressBookEntry::Set { members } => {
            if in_cycle(book, entry_name) {
                warnings.red_flag(
                    "address_set_cycle",
                    format!(
                        "address-set {entry_name} in address-book {} contains itself; treated as empty",
                        book.name
                    ),
                );
                return Ok(IpSpace::Empty);
            }
            let mut spaces = Vec::with_capacity(members.len());
            for member in members {
                if book.entries.contains_key(member) {
                    spaces.push(IpSpace::reference(names::address_book_entry(
                        &book.name, member,
                    )));
                } else {
                    warnings.undefined_reference(
                        "address-book entry",
                        member,
                        &format!("address-set {entry_name} in address-book {}", book.name),
                    );
                }
            }
            Ok(IpSpace::union(spaces))
        }
        AddressBookEntry::DnsName { name } => {
            warnings.unimplemented(
                "dns_name_address",
                format!(
                    "address-book {} entry {entry_name} uses dns-name {name}; treated as empty",
                    book.name
                ),
            );
            Ok(IpSpace::Empty)
        }
    }
}

/// Whether `start` can reach itself through set membership.
fn in_cycle(book: &AddressBook, start: &str) -> bool {
    let mut pending = set_members(book, start);
    let mut seen = BTreeSet::new();
    while let Some(name) = pending.pop() {
        if name == start {
            return true;
        }
        if seen.insert(name) {
            pending.extend(set_members(book, name));
        }
    }
    false
}

fn set_members<'a>(book: &'a AddressBook, name: &str) -> Vec<&'a str> {
    match book.entries.get(name) {
        Some(AddressBookEntry::Set { members }) => members.iter().map(String::as_str).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use packet_model::IpSpace;
    use pretty_assertions::assert_eq;

    use super::{compile_address_books, AddressBooks};
    use crate::error::ConversionError;
    use crate::representation::{AddressBook, AddressBookEntry, JuniperConfig, Zone};
    use crate::warnings::{WarningKind, Warnings};

    fn book(name: &str, entries: Vec<(&str, AddressBookEntry)>) -> AddressBook {
        AddressBook {
            name: name.to_string(),
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn prefix(raw: &str) -> AddressBookEntry {
        AddressBookEntry::Prefix {
            prefix: raw.parse().expect("net"),
        }
    }

    #[test]
    fn range_entry_decomposes_into_minimal_prefixes() {
        let mut config = JuniperConfig::default();
        config.address_books.insert(
            "global".to_string(),
            book(
                "global",
                vec![(
                    "servers",
                    AddressBookEntry::Range {
                        from: "10.0.0.1".parse().expect("ip"),
                        to: "10.0.0.6".parse().expect("ip"),
                    },
                )],
            ),
        );
        let spaces = compile_address_books(&config, &mut Warnings::new()).expect("compile");
        let expected = IpSpace::union(
            ["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"]
                .iter()
                .map(|raw| IpSpace::prefix(raw.parse().expect("net"))),
        );
        assert_eq!(spaces["global~servers"], expected);
    }

    #[test]
    fn inverted_range_is_structural() {
        let mut config = JuniperConfig::default();
        config.address_books.insert(
            "global".to_string(),
            book(
                "global",
                vec![(
                    "bad",
                    AddressBookEntry::Range {
                        from: "10.0.0.9".parse().expect("ip"),
                        to: "10.0.0.1".parse().expect("ip"),
                    },
                )],
            ),
        );
        let err = compile_address_books(&config, &mut Warnings::new()).expect_err("inverted");
        assert!(matches!(err, ConversionError::InvalidRange { .. }));
    }

    #[test]
    fn sets_reference_siblings_and_break_cycles() {
        let mut config = JuniperConfig::default();
        config.address_books.insert(
            "global".to_string(),
            book(
                "global",
                vec![
                    ("web", prefix("192.0.2.0/24")),
                    (
                        "dmz",
                        AddressBookEntry::Set {
                            members: vec!["web".to_string(), "ghost".to_string()],
                        },
                    ),
                    (
                        "loop-a",
                        AddressBookEntry::Set {
                            members: vec!["loop-b".to_string()],
                        },
                    ),
                    (
                        "loop-b",
                        AddressBookEntry::Set {
                            members: vec!["loop-a".to_string()],
                        },
                    ),
                ],
            ),
        );
        let mut warnings = Warnings::new();
        let spaces = compile_address_books(&config, &mut warnings).expect("compile");
        assert_eq!(spaces["global~dmz"], IpSpace::reference("global~web"));
        assert_eq!(spaces["global~loop-a"], IpSpace::Empty);
        assert_eq!(warnings.count(WarningKind::UndefinedReference), 1);
        assert_eq!(warnings.count(WarningKind::RedFlag), 2);
    }

    #[test]
    fn zone_book_shadows_global_book() {
        let mut config = JuniperConfig::default();
        config.address_books.insert(
            "global".to_string(),
            book("global", vec![("db", prefix("10.9.0.0/16"))]),
        );
        config.zones.insert(
            "trust".to_string(),
            Zone {
                address_book: Some(book("", vec![("db", prefix("10.1.0.0/16"))])),
                ..Zone::default()
            },
        );
        let config = config.normalize();
        let books = AddressBooks::new(&config);
        assert_eq!(
            books.resolve(Some("trust"), "db"),
            Some(IpSpace::reference("trust~db"))
        );
        assert_eq!(
            books.resolve(Some("untrust"), "db"),
            Some(IpSpace::reference("global~db"))
        );
        assert_eq!(books.resolve(None, "any"), Some(IpSpace::Universe));
        assert_eq!(books.resolve(None, "nope"), None);

        let spaces = compile_address_books(&config, &mut Warnings::new()).expect("compile");
        assert!(spaces.contains_key("trust~db"));
    }
}
