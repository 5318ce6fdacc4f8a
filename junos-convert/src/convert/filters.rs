use std::collections::BTreeMap;

use packet_model::{AclLine, IpAccessList, MatchExpr};
use tracing::debug;

use crate::convert::terms::compile_term;
use crate::convert::CompileContext;
use crate::error::ConversionError;
use crate::representation::{Family, FirewallFilter};
use crate::warnings::Warnings;

/// Lines of one filter, or `None` when its family does not compile.
///
/// `destination_zone` scopes destination address names for zone policies.
pub fn compile_filter_lines(
    filter: &FirewallFilter,
    destination_zone: Option<&str>,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> Option<Vec<AclLine>> {
    if !matches!(filter.family, Family::Inet | Family::Inet6) {
        warnings.unimplemented(
            "unsupported_family",
            format!(
                "filter {} has family {}; only inet and inet6 filters are compiled",
                filter.name,
                filter.family.name()
            ),
        );
        return None;
    }

    let source_zone = filter.from_zone.as_deref();
    let zone_guard = source_zone.map(|zone| match ctx.config.zones.get(zone) {
        Some(found) => MatchExpr::src_interfaces(found.interfaces.iter().cloned()),
        None => {
            warnings.undefined_reference("zone", zone, &format!("filter {}", filter.name));
            MatchExpr::False
        }
    });

    let mut lines = Vec::new();
    for term in &filter.terms {
        for mut line in compile_term(term, filter, source_zone, destination_zone, ctx, warnings) {
            if let Some(guard) = &zone_guard {
                line.expr = MatchExpr::and(vec![guard.clone(), line.expr]);
            }
            lines.push(line);
        }
    }
    Some(lines)
}

/// Compile `filter` into an ACL of the same name.
pub fn compile_filter(
    filter: &FirewallFilter,
    destination_zone: Option<&str>,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> Option<IpAccessList> {
    compile_filter_lines(filter, destination_zone, ctx, warnings)
        .map(|lines| IpAccessList::new(filter.name.clone(), lines))
}

/// Every named firewall filter, keyed by name.
pub fn compile_named_filters(
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> BTreeMap<String, IpAccessList> {
    let acls = ctx
        .config
        .firewall_filters
        .values()
        .filter_map(|filter| compile_filter(filter, None, ctx, warnings))
        .map(|acl| (acl.name.clone(), acl))
        .collect::<BTreeMap<_, _>>();
    debug!(filters = acls.len(), "compiled firewall filters");
    acls
}

/// Ordered, family-homogeneous concatenation of filters.
#[derive(Debug, Clone)]
pub struct CompositeFilter<'a> {
    name: String,
    members: Vec<&'a FirewallFilter>,
}

impl<'a> CompositeFilter<'a> {
    pub fn new(
        name: impl Into<String>,
        members: Vec<&'a FirewallFilter>,
    ) -> Result<Self, ConversionError> {
        let name = name.into();
        let Some(first) = members.first() else {
            return Err(ConversionError::EmptyCompositeFilter { name });
        };
        if members.iter().any(|member| member.family != first.family) {
            let families = members
                .iter()
                .map(|member| format!("{}={}", member.name, member.family.name()))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ConversionError::MixedFamilyCompositeFilter { name, families });
        }
        Ok(Self { name, members })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member lines in member order, under the composite's name.
    pub fn compile(
        &self,
        ctx: &CompileContext<'_>,
        warnings: &mut Warnings,
    ) -> Option<IpAccessList> {
        let mut lines = Vec::new();
        for member in &self.members {
            lines.extend(compile_filter_lines(member, None, ctx, warnings)?);
        }
        Some(IpAccessList::new(self.name.clone(), lines))
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use packet_model::{EvalContext, Flow, LineAction};
    use pretty_assertions::assert_eq;

    use super::{compile_filter, CompositeFilter};
    use crate::convert::tests::context_for;
    use crate::error::ConversionError;
    use crate::representation::{Family, FirewallFilter, FwFrom, FwThen, JuniperConfig, Term, Zone};
    use crate::warnings::{WarningKind, Warnings};

    fn ip(raw: &str) -> IpAddr {
        raw.parse().expect("ip")
    }

    fn term(name: &str, port: &str, then: FwThen) -> Term {
        Term::new(
            name,
            vec![FwFrom::DestinationPort {
                ports: port.to_string(),
                except: false,
            }],
            vec![then],
        )
    }

    #[test]
    fn composite_rejects_empty_and_mixed_members() {
        let v4 = FirewallFilter::new("v4", Family::Inet, Vec::new());
        let v6 = FirewallFilter::new("v6", Family::Inet6, Vec::new());
        assert!(matches!(
            CompositeFilter::new("c", Vec::new()),
            Err(ConversionError::EmptyCompositeFilter { .. })
        ));
        assert!(matches!(
            CompositeFilter::new("c", vec![&v4, &v6]),
            Err(ConversionError::MixedFamilyCompositeFilter { .. })
        ));
    }

    #[test]
    fn composite_concatenates_terms_in_member_order() {
        let first = FirewallFilter::new(
            "first",
            Family::Inet,
            vec![term("ssh", "22", FwThen::Accept), term("telnet", "23", FwThen::Discard)],
        );
        let second = FirewallFilter::new("second", Family::Inet, vec![term("web", "80", FwThen::Accept)]);
        let composite = CompositeFilter::new("~INPUT_FILTER_LIST~ge-0/0/0.0", vec![&first, &second])
            .expect("same family");
        assert_eq!(composite.name(), "~INPUT_FILTER_LIST~ge-0/0/0.0");

        let config = JuniperConfig::default();
        let acl = context_for(&config, |ctx| composite.compile(ctx, &mut Warnings::new()))
            .expect("compiles");
        let names = acl
            .lines
            .iter()
            .map(|line| line.name.as_deref().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["ssh", "telnet", "web"]);
        assert_eq!(acl.name, "~INPUT_FILTER_LIST~ge-0/0/0.0");
    }

    #[test]
    fn non_ip_families_are_skipped() {
        let filter = FirewallFilter::new("l2", Family::Bridge, vec![term("t", "22", FwThen::Accept)]);
        let config = JuniperConfig::default();
        let mut warnings = Warnings::new();
        let acl = context_for(&config, |ctx| compile_filter(&filter, None, ctx, &mut warnings));
        assert!(acl.is_none());
        assert_eq!(warnings.count(WarningKind::Unimplemented), 1);
    }

    #[test]
    fn zone_bound_filter_requires_member_ingress() {
        let mut config = JuniperConfig::default();
        config.zones.insert(
            "trust".to_string(),
            Zone {
                interfaces: vec!["ge-0/0/0.0".to_string()],
                ..Zone::default()
            },
        );
        let config = config.normalize();
        let mut filter = FirewallFilter::new("p", Family::Inet, vec![term("ssh", "22", FwThen::Accept)]);
        filter.from_zone = Some("trust".to_string());

        let acl = context_for(&config, |ctx| compile_filter(&filter, None, ctx, &mut Warnings::new()))
            .expect("compiles");
        let ctx = EvalContext::empty();
        let inside = Flow::tcp("ge-0/0/0.0", ip("10.0.0.1"), 4000, ip("10.0.1.1"), 22);
        let outside = Flow::tcp("ge-0/0/1.0", ip("10.0.0.1"), 4000, ip("10.0.1.1"), 22);
        assert_eq!(acl.filter(&inside, &ctx).action, LineAction::Permit);
        assert_eq!(acl.filter(&outside, &ctx).action, LineAction::Deny);

        filter.from_zone = Some("nowhere".to_string());
        let mut warnings = Warnings::new();
        let acl = context_for(&config, |ctx| compile_filter(&filter, None, ctx, &mut warnings))
            .expect("compiles");
        assert!(!acl.permits(&inside, &ctx));
        assert_eq!(warnings.count(WarningKind::UndefinedReference), 1);
    }
}
