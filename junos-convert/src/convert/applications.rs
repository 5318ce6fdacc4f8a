use std::collections::BTreeMap;

use packet_model::{HeaderField, IpProtocol, MatchExpr};

use crate::convert::match_exprs::{parse_icmp_types, parse_ports, parse_range};
use crate::representation::application::predefined_applications;
use crate::representation::{Application, ApplicationSet, ApplicationTerm, JuniperConfig};
use crate::warnings::Warnings;

/// One line-producing entry of an expanded term clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub label: String,
    pub expr: MatchExpr,
}

impl Expansion {
    pub fn new(label: impl Into<String>, expr: MatchExpr) -> Self {
        Self {
            label: label.into(),
            expr,
        }
    }
}

/// Resolves application and application-set names, user definitions first.
#[derive(Debug, Clone)]
pub struct ApplicationResolver<'a> {
    applications: &'a BTreeMap<String, Application>,
    sets: &'a BTreeMap<String, ApplicationSet>,
    predefined: BTreeMap<String, Application>,
}

impl<'a> ApplicationResolver<'a> {
    pub fn new(config: &'a JuniperConfig) -> Self {
        Self {
            applications: &config.applications,
            sets: &config.application_sets,
            predefined: predefined_applications(),
        }
    }

    /// Entries for `name`, or `None` when no application or set has that name.
    pub fn expand(
        &self,
        name: &str,
        context: &str,
        warnings: &mut Warnings,
    ) -> Option<Vec<Expansion>> {
        let mut stack = Vec::new();
        self.expand_inner(name, context, warnings, &mut stack)
    }

    fn expand_inner(
        &self,
        name: &str,
        context: &str,
        warnings: &mut Warnings,
        stack: &mut Vec<String>,
    ) -> Option<Vec<Expansion>> {
        if name == "any" {
            return Some(vec![Expansion::new("application any", MatchExpr::True)]);
        }
        if let Some(app) = self.applications.get(name).or_else(|| self.predefined.get(name)) {
            return Some(application_entries(app, context, warnings));
        }
        let set = self.sets.get(name)?;
        if stack.iter().any(|seen| seen == name) {
            warnings.red_flag(
                "application_set_cycle",
                format!("application-set {name} contains itself (via {})", stack.join(" -> ")),
            );
            return Some(Vec::new());
        }
        stack.push(name.to_string());
        let mut out = Vec::new();
        for member in &set.members {
            match self.expand_inner(member, context, warnings, stack) {
                Some(entries) => out.extend(entries),
                None => warnings.undefined_reference(
                    "application",
                    member,
                    &format!("application-set {name}"),
                ),
            }
        }
        stack.pop();
        Some(out)
    }
}

fn application_entries(
    app: &Application,
    context: &str,
    warnings: &mut Warnings,
) -> Vec<Expansion> {
    let mut out = Vec::new();
    for term in app.entries() {
        let label = if term.name == app.name {
            format!("application {}", app.name)
        } else {
            format!("application {} term {}", app.name, term.name)
        };
        match application_term_expr(&term) {
            Ok(expr) => out.push(Expansion::new(label, expr)),
            Err(reason) => warnings.red_flag(
                "invalid_application",
                format!("{label} used by {context} is skipped: {reason}"),
            ),
        }
    }
    out
}

/// Predicate for one application tuple.
pub fn application_term_expr(term: &ApplicationTerm) -> Result<MatchExpr, String> {
    let mut conjuncts = Vec::new();
    let protocol = match term.protocol.as_deref() {
        Some(raw) => {
            let protocol =
                IpProtocol::from_name(raw).ok_or_else(|| format!("unknown protocol '{raw}'"))?;
            conjuncts.push(MatchExpr::protocols(&[protocol]));
            Some(protocol)
        }
        None => None,
    };
    let has_ports = term.source_port.is_some() || term.destination_port.is_some();
    if has_ports && protocol.is_none() {
        conjuncts.push(MatchExpr::protocols(&IpProtocol::PORT_PROTOCOLS));
    }
    for (raw, field) in [
        (term.source_port.as_deref(), HeaderField::SrcPort),
        (term.destination_port.as_deref(), HeaderField::DstPort),
    ] {
        if let Some(raw) = raw {
            let range = parse_ports(raw).ok_or_else(|| format!("invalid port '{raw}'"))?;
            conjuncts.push(MatchExpr::field(field, [range]));
        }
    }
    if let Some(raw) = term.icmp_type.as_deref() {
        let range = parse_icmp_types(raw).ok_or_else(|| format!("invalid icmp-type '{raw}'"))?;
        conjuncts.push(MatchExpr::field(HeaderField::IcmpType, [range]));
    }
    if let Some(raw) = term.icmp_code.as_deref() {
        let range = parse_range(raw, &[], u32::from(u8::MAX))
            .ok_or_else(|| format!("invalid icmp-code '{raw}'"))?;
        conjuncts.push(MatchExpr::field(HeaderField::IcmpCode, [range]));
    }
    Ok(MatchExpr::and(conjuncts))
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use packet_model::{EvalContext, Flow, MatchExpr};

    use super::ApplicationResolver;
    use crate::representation::{Application, ApplicationSet, JuniperConfig};
    use crate::warnings::{WarningKind, Warnings};

    fn ip(raw: &str) -> IpAddr {
        raw.parse().expect("ip")
    }

    fn config() -> JuniperConfig {
        let mut config = JuniperConfig::default();
        config
            .applications
            .insert("web-8080".to_string(), Application::tcp("web-8080", "8080"));
        config.application_sets.insert(
            "web".to_string(),
            ApplicationSet {
                name: "web".to_string(),
                members: vec![
                    "junos-http".to_string(),
                    "web-8080".to_string(),
                    "missing".to_string(),
                ],
            },
        );
        config.application_sets.insert(
            "loop".to_string(),
            ApplicationSet {
                name: "loop".to_string(),
                members: vec!["loop".to_string()],
            },
        );
        config
    }

    #[test]
    fn sets_expand_members_in_order() {
        let config = config();
        let resolver = ApplicationResolver::new(&config);
        let mut warnings = Warnings::new();
        let entries = resolver
            .expand("web", "policy p", &mut warnings)
            .expect("resolves");
        let labels = entries.iter().map(|e| e.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["application junos-http", "application web-8080"]);
        assert_eq!(warnings.count(WarningKind::UndefinedReference), 1);

        let ctx = EvalContext::empty();
        let alt_web = Flow::tcp("ge-0/0/0.0", ip("10.0.0.1"), 3333, ip("10.0.0.2"), 8080);
        assert!(entries[1].expr.matches(&alt_web, &ctx));
        assert!(!entries[0].expr.matches(&alt_web, &ctx));
    }

    #[test]
    fn any_and_cycles() {
        let config = config();
        let resolver = ApplicationResolver::new(&config);
        let mut warnings = Warnings::new();
        let any = resolver.expand("any", "policy p", &mut warnings).expect("any");
        assert_eq!(any[0].expr, MatchExpr::True);
        let looped = resolver.expand("loop", "policy p", &mut warnings).expect("set");
        assert!(looped.is_empty());
        assert_eq!(warnings.count(WarningKind::RedFlag), 1);
        assert!(resolver.expand("nope", "policy p", &mut warnings).is_none());
    }

    #[test]
    fn multi_term_predefined_application() {
        let config = JuniperConfig::default();
        let resolver = ApplicationResolver::new(&config);
        let entries = resolver
            .expand("junos-ms-rpc", "policy p", &mut Warnings::new())
            .expect("predefined");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].label, "application junos-ms-rpc term udp");
    }
}
