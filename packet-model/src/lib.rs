//! Vendor-neutral packet predicates, access lists and address translations.
//!
//! This crate holds the target model that vendor converters emit and that
//! downstream analysis consumes. Nothing in here knows about any particular
//! vendor syntax.

pub mod acl;
pub mod configuration;
pub mod expr;
pub mod flow;
pub mod format;
pub mod ip_space;
pub mod parser;
pub mod protocol;
pub mod range;
pub mod sub_range;
pub mod transformation;
pub mod writer;

pub use acl::{AclLine, EvalContext, FilterResult, IpAccessList, LineAction};
pub use configuration::{Configuration, Interface, Zone};
pub use expr::{HeaderField, MatchExpr};
pub use flow::{Flow, FlowState};
pub use format::{format_acl, format_json, format_summary, format_transformation};
pub use ip_space::{IpSpace, IpSpaces};
pub use parser::{parse, parse_file, ParseError};
pub use protocol::IpProtocol;
pub use range::{range_to_prefixes, IpRange, RangeError};
pub use sub_range::SubRange;
pub use transformation::{
    IpField, PortField, Transformation, TransformationBuilder, TransformationResult,
    TransformationStep, TransformationType,
};
pub use writer::{write, write_file, WriteError};
