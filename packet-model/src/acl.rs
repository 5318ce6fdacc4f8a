use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::expr::MatchExpr;
use crate::flow::Flow;
use crate::ip_space::IpSpaces;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineAction {
    Permit,
    Deny,
}

/// One ordered line of an access list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub action: LineAction,
    #[serde(rename = "match")]
    pub expr: MatchExpr,
    /// Vendor construct this line was compiled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl AclLine {
    pub fn permitting(expr: MatchExpr) -> Self {
        Self {
            name: None,
            action: LineAction::Permit,
            expr,
            trace: None,
        }
    }

    pub fn denying(expr: MatchExpr) -> Self {
        Self {
            name: None,
            action: LineAction::Deny,
            expr,
            trace: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }
}

/// An ordered first-match access list with an implicit deny at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAccessList {
    pub name: String,
    pub lines: Vec<AclLine>,
}

/// Outcome of running a flow through an [`IpAccessList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterResult {
    pub action: LineAction,
    /// Index of the matching line; `None` for the implicit deny.
    pub line: Option<usize>,
}

impl IpAccessList {
    pub fn new(name: impl Into<String>, lines: Vec<AclLine>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn filter(&self, flow: &Flow, ctx: &EvalContext<'_>) -> FilterResult {
        for (idx, line) in self.lines.iter().enumerate() {
            if line.expr.matches(flow, ctx) {
                return FilterResult {
                    action: line.action,
                    line: Some(idx),
                };
            }
        }
        FilterResult {
            action: LineAction::Deny,
            line: None,
        }
    }

    pub fn permits(&self, flow: &Flow, ctx: &EvalContext<'_>) -> bool {
        self.filter(flow, ctx).action == LineAction::Permit
    }
}

/// Named lookups needed while evaluating predicates.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub acls: &'a BTreeMap<String, IpAccessList>,
    pub ip_spaces: &'a IpSpaces,
}

impl<'a> EvalContext<'a> {
    pub fn new(acls: &'a BTreeMap<String, IpAccessList>, ip_spaces: &'a IpSpaces) -> Self {
        Self { acls, ip_spaces }
    }

    /// A context with no named ACLs or IP spaces.
    pub fn empty() -> EvalContext<'static> {
        static ACLS: OnceLock<BTreeMap<String, IpAccessList>> = OnceLock::new();
        static SPACES: OnceLock<IpSpaces> = OnceLock::new();
        EvalContext {
            acls: ACLS.get_or_init(BTreeMap::new),
            ip_spaces: SPACES.get_or_init(BTreeMap::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use crate::expr::MatchExpr;
    use crate::flow::Flow;
    use crate::ip_space::IpSpace;
    use crate::protocol::IpProtocol;

    use super::{AclLine, EvalContext, IpAccessList, LineAction};

    fn ip(raw: &str) -> IpAddr {
        raw.parse().expect("ip")
    }

    fn sample() -> IpAccessList {
        IpAccessList::new(
            "edge",
            vec![
                AclLine::denying(MatchExpr::src_ip(IpSpace::prefix(
                    "10.66.0.0/16".parse().expect("net"),
                )))
                .with_name("block-lab"),
                AclLine::permitting(MatchExpr::protocols(&[IpProtocol::TCP])).with_name("tcp"),
            ],
        )
    }

    #[test]
    fn first_matching_line_wins() {
        let acl = sample();
        let ctx = EvalContext::empty();
        let lab = Flow::tcp("xe-0/0/1.0", ip("10.66.1.1"), 1000, ip("10.0.0.1"), 22);
        let result = acl.filter(&lab, &ctx);
        assert_eq!(result.action, LineAction::Deny);
        assert_eq!(result.line, Some(0));

        let other = Flow::tcp("xe-0/0/1.0", ip("10.67.1.1"), 1000, ip("10.0.0.1"), 22);
        assert_eq!(acl.filter(&other, &ctx).line, Some(1));
        assert!(acl.permits(&other, &ctx));
    }

    #[test]
    fn unmatched_flow_hits_implicit_deny() {
        let acl = sample();
        let flow = Flow::udp("xe-0/0/1.0", ip("10.67.1.1"), 1000, ip("10.0.0.1"), 53);
        let result = acl.filter(&flow, &EvalContext::empty());
        assert_eq!(result.action, LineAction::Deny);
        assert_eq!(result.line, None);
    }
}
