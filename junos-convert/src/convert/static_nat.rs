//! Static NAT validation and mirroring.
//!
//! A static rule maps destination `D` to prefix `P` for arriving traffic.
//! Departing traffic needs the mirror image: source `P` maps back to `D`.
//! The mirrored rule sets swap their from and to locations so that the
//! outgoing selection finds them on the interface the forward rules listen on.

use crate::error::ConversionError;
use crate::representation::{NatBlock, NatRule, NatRuleMatch, NatRuleSet, NatRuleThen};

/// Reject static blocks that cannot be mirrored.
pub fn validate_static(block: &NatBlock) -> Result<(), ConversionError> {
    if !block.pools.is_empty() {
        return Err(ConversionError::StaticNatWithPools {
            pools: block.pools.keys().cloned().collect(),
        });
    }
    for rule_set in &block.rule_sets {
        for rule in &rule_set.rules {
            match &rule.then {
                Some(NatRuleThen::Prefix { .. }) | Some(NatRuleThen::PrefixName { .. }) => {}
                other => {
                    return Err(ConversionError::StaticNatThen {
                        rule_set: rule_set.name.clone(),
                        rule: rule.name.clone(),
                        found: other
                            .as_ref()
                            .map_or_else(|| "nothing".to_string(), NatRuleThen::describe),
                    })
                }
            }
        }
    }
    Ok(())
}

pub fn reverse_rule(rule: &NatRule, rule_set: &str) -> Result<NatRule, ConversionError> {
    let then = rule
        .matches
        .iter()
        .find_map(|clause| match clause {
            NatRuleMatch::DestinationAddress { prefix } => {
                Some(NatRuleThen::Prefix { prefix: *prefix })
            }
            NatRuleMatch::DestinationAddressName { name } => {
                Some(NatRuleThen::PrefixName { name: name.clone() })
            }
            _ => None,
        })
        .ok_or_else(|| ConversionError::StaticNatMissingDestination {
            rule_set: rule_set.to_string(),
            rule: rule.name.clone(),
        })?;

    let mut matches = rule
        .matches
        .iter()
        .filter_map(|clause| match clause {
            NatRuleMatch::SourceAddress { prefix } => {
                Some(NatRuleMatch::DestinationAddress { prefix: *prefix })
            }
            NatRuleMatch::SourceAddressName { name } => {
                Some(NatRuleMatch::DestinationAddressName { name: name.clone() })
            }
            _ => None,
        })
        .collect::<Vec<_>>();
    match &rule.then {
        Some(NatRuleThen::Prefix { prefix }) => {
            matches.push(NatRuleMatch::SourceAddress { prefix: *prefix })
        }
        Some(NatRuleThen::PrefixName { name }) => {
            matches.push(NatRuleMatch::SourceAddressName { name: name.clone() })
        }
        other => {
            return Err(ConversionError::StaticNatThen {
                rule_set: rule_set.to_string(),
                rule: rule.name.clone(),
                found: other
                    .as_ref()
                    .map_or_else(|| "nothing".to_string(), NatRuleThen::describe),
            })
        }
    }

    Ok(NatRule {
        name: rule.name.clone(),
        matches,
        then: Some(then),
    })
}

pub fn reverse_rule_set(rule_set: &NatRuleSet) -> Result<NatRuleSet, ConversionError> {
    let rules = rule_set
        .rules
        .iter()
        .map(|rule| reverse_rule(rule, &rule_set.name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NatRuleSet {
        name: rule_set.name.clone(),
        from: rule_set.to.clone(),
        to: rule_set.from.clone(),
        rules,
    })
}

/// Validate `block` and build its mirrored counterpart.
pub fn reverse_static(block: &NatBlock) -> Result<NatBlock, ConversionError> {
    validate_static(block)?;
    let rule_sets = block
        .rule_sets
        .iter()
        .map(reverse_rule_set)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NatBlock {
        pools: Default::default(),
        rule_sets,
        pat_port_range: block.pat_port_range,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::net::IpAddr;

    use pretty_assertions::assert_eq;

    use super::{reverse_rule_set, reverse_static, validate_static};
    use crate::error::ConversionError;
    use crate::representation::{
        NatBlock, NatPacketLocation, NatPool, NatRule, NatRuleMatch, NatRuleSet, NatRuleThen,
    };

    fn forward() -> NatRuleSet {
        NatRuleSet {
            name: "from-internet".to_string(),
            from: Some(NatPacketLocation::Zone("untrust".into())),
            to: Some(NatPacketLocation::Interface("ge-0/0/0.0".into())),
            rules: vec![NatRule {
                name: "web".to_string(),
                matches: vec![
                    NatRuleMatch::SourceAddress {
                        prefix: "203.0.113.0/24".parse().expect("net"),
                    },
                    NatRuleMatch::DestinationAddress {
                        prefix: "198.51.100.10/32".parse().expect("net"),
                    },
                ],
                then: Some(NatRuleThen::Prefix {
                    prefix: "10.0.0.10/32".parse().expect("net"),
                }),
            }],
        }
    }

    #[test]
    fn reversal_mirrors_matches_and_then() {
        let reversed = reverse_rule_set(&forward()).expect("reversible");
        assert_eq!(reversed.from, Some(NatPacketLocation::Interface("ge-0/0/0.0".into())));
        assert_eq!(reversed.to, Some(NatPacketLocation::Zone("untrust".into())));
        assert_eq!(
            reversed.rules[0].matches,
            vec![
                NatRuleMatch::DestinationAddress {
                    prefix: "203.0.113.0/24".parse().expect("net"),
                },
                NatRuleMatch::SourceAddress {
                    prefix: "10.0.0.10/32".parse().expect("net"),
                },
            ]
        );
        assert_eq!(
            reversed.rules[0].then,
            Some(NatRuleThen::Prefix {
                prefix: "198.51.100.10/32".parse().expect("net"),
            })
        );
    }

    #[test]
    fn double_reversal_restores_locations() {
        let original = forward();
        let twice = reverse_rule_set(&reverse_rule_set(&original).expect("once")).expect("twice");
        assert_eq!(twice.from, original.from);
        assert_eq!(twice.to, original.to);
    }

    #[test]
    fn structural_errors() {
        let mut block = NatBlock {
            rule_sets: vec![forward()],
            ..NatBlock::default()
        };
        assert!(validate_static(&block).is_ok());
        assert_eq!(reverse_static(&block).expect("ok").rule_sets.len(), 1);

        block.rule_sets[0].rules[0].then = Some(NatRuleThen::Off);
        assert!(matches!(
            reverse_static(&block),
            Err(ConversionError::StaticNatThen { .. })
        ));

        block.rule_sets[0].rules[0].then = Some(NatRuleThen::PrefixName {
            name: "web-inside".to_string(),
        });
        block.rule_sets[0].rules[0].matches.pop();
        assert!(matches!(
            reverse_static(&block),
            Err(ConversionError::StaticNatMissingDestination { .. })
        ));

        block.pools = BTreeMap::from([(
            "p".to_string(),
            NatPool {
                from_address: "10.0.0.1".parse::<IpAddr>().expect("ip"),
                to_address: None,
                port: None,
                port_address_translation: None,
            },
        )]);
        assert!(matches!(
            validate_static(&block),
            Err(ConversionError::StaticNatWithPools { .. })
        ));
    }
}
