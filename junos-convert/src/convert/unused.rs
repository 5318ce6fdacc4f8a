//! Diagnostics for inet filters and prefix-lists that nothing references.

use std::collections::BTreeSet;

use tracing::debug;

use crate::representation::{Family, FwFrom, JuniperConfig};
use crate::warnings::Warnings;

/// Filter and prefix-list names referenced anywhere in a configuration.
#[derive(Debug, Default)]
struct References<'a> {
    filters: BTreeSet<&'a str>,
    prefix_lists: BTreeSet<&'a str>,
}

impl<'a> References<'a> {
    fn collect(config: &'a JuniperConfig) -> Self {
        let mut refs = Self::default();
        for interface in config.interfaces.values() {
            refs.filters.extend(interface.incoming_filter.as_deref());
            refs.filters.extend(interface.outgoing_filter.as_deref());
            refs.filters
                .extend(interface.incoming_filter_list.iter().map(String::as_str));
            refs.filters
                .extend(interface.outgoing_filter_list.iter().map(String::as_str));
        }
        for zone in config.zones.values() {
            refs.filters.extend(zone.inbound_filter.as_deref());
            refs.filters.extend(zone.from_host_filter.as_deref());
            refs.filters.extend(zone.to_host_filter.as_deref());
            refs.filters
                .extend(zone.inbound_interface_filters.values().map(String::as_str));
        }

        let filter_terms = config
            .firewall_filters
            .values()
            .flat_map(|filter| filter.terms.iter());
        let policy_terms = config
            .zones
            .values()
            .flat_map(|zone| zone.from_zone_policies.iter())
            .flat_map(|policy| policy.policies.iter());
        let global_terms = config.global_policy.iter().flatten();
        for term in filter_terms.chain(policy_terms).chain(global_terms) {
            refs.prefix_lists
                .extend(term.froms.iter().filter_map(prefix_list_name));
        }
        refs
    }
}

fn prefix_list_name(from: &FwFrom) -> Option<&str> {
    match from {
        FwFrom::SourcePrefixList { name, .. }
        | FwFrom::DestinationPrefixList { name, .. }
        | FwFrom::PrefixList { name, .. } => Some(name.as_str()),
        _ => None,
    }
}

/// Warn about unreferenced inet filters, and about inet prefix-lists that are
/// empty or unreferenced. Prefix-lists holding any IPv6 prefix are skipped.
pub fn warn_unreferenced(config: &JuniperConfig, warnings: &mut Warnings) {
    let refs = References::collect(config);
    debug!(
        filters = refs.filters.len(),
        prefix_lists = refs.prefix_lists.len(),
        "collected references"
    );

    for filter in config.firewall_filters.values() {
        if filter.family == Family::Inet && !refs.filters.contains(filter.name.as_str()) {
            warnings.pedantic(
                "unused_firewall_filter",
                format!("firewall filter {} is not referenced", filter.name),
            );
        }
    }

    for list in config.prefix_lists.values() {
        if list.prefixes.iter().any(|prefix| prefix.is_ipv6()) {
            continue;
        }
        if list.prefixes.is_empty() {
            warnings.red_flag(
                "empty_prefix_list",
                format!("prefix-list {} has no prefixes", list.name),
            );
        }
        if !refs.prefix_lists.contains(list.name.as_str()) {
            warnings.pedantic(
                "unused_prefix_list",
                format!("prefix-list {} is not referenced", list.name),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::warn_unreferenced;
    use crate::representation::{
        Family, FirewallFilter, FwFrom, FwThen, Interface, JuniperConfig, PrefixList,
        PrefixListModifier, Term, Zone, ZonePolicy,
    };
    use crate::warnings::{WarningKind, Warnings};

    fn prefix_list(prefixes: &[&str]) -> PrefixList {
        PrefixList {
            name: String::new(),
            prefixes: prefixes.iter().map(|p| p.parse().expect("net")).collect(),
        }
    }

    fn uses_list(name: &str, list: &str) -> Term {
        Term::new(
            name,
            vec![FwFrom::SourcePrefixList {
                name: list.to_string(),
                modifier: PrefixListModifier::Exact,
            }],
            vec![FwThen::Accept],
        )
    }

    fn codes(warnings: &Warnings) -> Vec<(String, String)> {
        warnings
            .iter()
            .map(|w| (w.code.clone(), w.message.clone()))
            .collect()
    }

    #[test]
    fn unreferenced_inet_filters_are_reported() {
        let mut config = JuniperConfig::default();
        for (name, family) in [
            ("edge", Family::Inet),
            ("lists", Family::Inet),
            ("host", Family::Inet),
            ("spare", Family::Inet),
            ("spare-v6", Family::Inet6),
        ] {
            config
                .firewall_filters
                .insert(name.to_string(), FirewallFilter::new(name, family, Vec::new()));
        }
        config.interfaces.insert(
            "ge-0/0/0.0".to_string(),
            Interface {
                incoming_filter: Some("edge".to_string()),
                outgoing_filter_list: vec!["lists".to_string()],
                ..Interface::default()
            },
        );
        config.zones.insert(
            "trust".to_string(),
            Zone {
                to_host_filter: Some("host".to_string()),
                ..Zone::default()
            },
        );
        let config = config.normalize();

        let mut warnings = Warnings::new();
        warn_unreferenced(&config, &mut warnings);
        assert_eq!(
            codes(&warnings),
            vec![(
                "unused_firewall_filter".to_string(),
                "firewall filter spare is not referenced".to_string()
            )]
        );
    }

    #[test]
    fn prefix_lists_used_by_filters_or_policies_are_quiet() {
        let mut config = JuniperConfig::default();
        for (name, prefixes) in [
            ("mgmt", vec!["10.0.0.0/24"]),
            ("partners", vec!["192.0.2.0/24"]),
            ("blackhole", vec![]),
            ("stale", vec!["198.51.100.0/24"]),
            ("v6-only", vec!["2001:db8::/32"]),
        ] {
            config
                .prefix_lists
                .insert(name.to_string(), prefix_list(&prefixes));
        }
        config.firewall_filters.insert(
            "edge".to_string(),
            FirewallFilter::new("edge", Family::Inet, vec![uses_list("ssh", "mgmt")]),
        );
        config.zones.insert(
            "untrust".to_string(),
            Zone {
                from_zone_policies: vec![ZonePolicy {
                    from_zone: "trust".to_string(),
                    policies: vec![uses_list("partners", "partners")],
                }],
                ..Zone::default()
            },
        );
        let config = config.normalize();

        let mut warnings = Warnings::new();
        warn_unreferenced(&config, &mut warnings);
        assert_eq!(warnings.count(WarningKind::RedFlag), 1);
        assert!(warnings.has_code("empty_prefix_list"));
        let unused = warnings
            .iter()
            .filter(|w| w.code == "unused_prefix_list")
            .map(|w| w.message.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            unused,
            vec![
                "prefix-list blackhole is not referenced",
                "prefix-list stale is not referenced"
            ]
        );
        // the unreferenced filter itself is reported too
        assert!(warnings.has_code("unused_firewall_filter"));
    }
}
