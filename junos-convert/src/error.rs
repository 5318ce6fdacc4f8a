use packet_model::RangeError;
use thiserror::Error;

/// Structural problems that abort compilation of one configuration.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("composite filter {name} has no member filters")]
    EmptyCompositeFilter { name: String },
    #[error("composite filter {name} mixes address families: {families}")]
    MixedFamilyCompositeFilter { name: String, families: String },
    #[error("invalid address range in {context}: {source}")]
    InvalidRange {
        context: String,
        #[source]
        source: RangeError,
    },
    #[error("static NAT must not define pools, found: {}", pools.join(", "))]
    StaticNatWithPools { pools: Vec<String> },
    #[error("static NAT rule {rule_set}/{rule} must rewrite to a prefix or prefix-name, found {found}")]
    StaticNatThen {
        rule_set: String,
        rule: String,
        found: String,
    },
    #[error("static NAT rule {rule_set}/{rule} has no destination address match to reverse")]
    StaticNatMissingDestination { rule_set: String, rule: String },
}
