use colored::Colorize;
use packet_model::{format_acl, format_summary, format_transformation, Configuration};
use serde::Serialize;

use crate::warnings::{Warning, WarningKind, Warnings};

/// Outcome of compiling one configuration, for `check` and `compile` output.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub hostname: String,
    pub source: String,
    pub settings: String,
    /// Structural error that stopped compilation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub red_flags: usize,
    pub unimplemented: usize,
    pub pedantic: usize,
    pub undefined_references: usize,
    pub dangling_acls: Vec<String>,
    pub warnings: Warnings,
}

impl CheckReport {
    pub fn new(
        hostname: impl Into<String>,
        source: impl Into<String>,
        settings: impl Into<String>,
        warnings: Warnings,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            source: source.into(),
            settings: settings.into(),
            error: None,
            red_flags: warnings.count(WarningKind::RedFlag),
            unimplemented: warnings.count(WarningKind::Unimplemented),
            pedantic: warnings.count(WarningKind::Pedantic),
            undefined_references: warnings.count(WarningKind::UndefinedReference),
            dangling_acls: Vec::new(),
            warnings,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

fn render_warning(warning: &Warning) -> String {
    let tag = format!("[{}]", warning.kind);
    let tag = match warning.kind {
        WarningKind::RedFlag => tag.red().bold(),
        WarningKind::Unimplemented => tag.magenta(),
        WarningKind::Pedantic => tag.cyan(),
        WarningKind::UndefinedReference => tag.yellow(),
    };
    format!("{tag} {}: {}", warning.code, warning.message)
}

/// Render a check report for terminal output.
pub fn render_check_text(report: &CheckReport, verbose: bool) -> String {
    let mut out = Vec::new();
    let status = if report.failed() {
        "FAIL".red().bold()
    } else if report.warning_count() > 0 {
        "WARN".yellow().bold()
    } else {
        "OK".green().bold()
    };
    out.push(format!("{status} hostname={} source={}", report.hostname, report.source));
    if verbose {
        out.push(format!("settings={}", report.settings));
    }
    if let Some(error) = &report.error {
        out.push(format!("{} {error}", "error:".red().bold()));
    }
    out.push(
        format!(
            "red_flags={} unimplemented={} pedantic={} undefined_references={}",
            report.red_flags, report.unimplemented, report.pedantic, report.undefined_references
        )
        .cyan()
        .to_string(),
    );
    for name in &report.dangling_acls {
        out.push(format!("{} {name}", "dangling acl:".yellow()));
    }
    out.extend(report.warnings.iter().map(render_warning));
    out.join("\n")
}

/// Render one compiled configuration, optionally narrowed to an interface or
/// an ACL.
pub fn render_compiled(
    target: &Configuration,
    interface: Option<&str>,
    acl: Option<&str>,
) -> Result<String, String> {
    let mut out = vec![format_summary(target).cyan().to_string()];
    if let Some(name) = acl {
        let list = target
            .acls
            .get(name)
            .ok_or_else(|| format!("no ACL named {name}"))?;
        out.push(format_acl(list));
        return Ok(out.join("\n"));
    }

    let interfaces = target
        .interfaces
        .values()
        .filter(|iface| interface.map_or(true, |wanted| wanted == iface.name));
    let mut shown = 0;
    for iface in interfaces {
        shown += 1;
        out.push(format!("interface {}", iface.name).bold().to_string());
        out.push(format!("  vrf: {}", iface.vrf));
        if let Some(zone) = &iface.zone {
            out.push(format!("  zone: {zone}"));
        }
        if let Some(address) = &iface.primary_address {
            out.push(format!("  address: {address}"));
        }
        for (label, filter) in [
            ("incoming", &iface.incoming_filter),
            ("outgoing", &iface.outgoing_filter),
            ("inbound", &iface.inbound_filter),
        ] {
            if let Some(filter) = filter {
                out.push(format!("  {label} filter: {}", filter.green()));
            }
        }
        for (label, transformation) in [
            ("incoming", &iface.incoming_transformation),
            ("outgoing", &iface.outgoing_transformation),
        ] {
            if let Some(transformation) = transformation {
                out.push(format!("  {label} transformation:"));
                out.extend(
                    format_transformation(transformation)
                        .lines()
                        .map(|line| format!("    {line}")),
                );
            }
        }
    }
    if let Some(name) = interface {
        if shown == 0 {
            return Err(format!("no interface named {name}"));
        }
    }
    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use packet_model::{AclLine, Configuration, Interface, IpAccessList, MatchExpr};

    use super::{render_check_text, render_compiled, CheckReport};
    use crate::warnings::Warnings;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn check_text_lists_counts_and_warnings() {
        plain();
        let mut warnings = Warnings::new();
        warnings.red_flag("missing_action", "filter f term t has no action; treated as discard");
        let report = CheckReport::new("fw1", "fw1.json", "embedded", warnings);
        let text = render_check_text(&report, true);
        assert!(text.starts_with("WARN hostname=fw1"));
        assert!(text.contains("settings=embedded"));
        assert!(text.contains("red_flags=1"));
        assert!(text.contains("[red-flag] missing_action: filter f term t"));
    }

    #[test]
    fn compiled_view_narrows_to_interface_or_acl() {
        plain();
        let mut target = Configuration::new("fw1");
        target.acls.insert(
            "edge".to_string(),
            IpAccessList::new("edge", vec![AclLine::permitting(MatchExpr::True)]),
        );
        target.interfaces.insert(
            "ge-0/0/0.0".to_string(),
            Interface {
                name: "ge-0/0/0.0".to_string(),
                vrf: "default".to_string(),
                incoming_filter: Some("edge".to_string()),
                ..Interface::default()
            },
        );
        let text = render_compiled(&target, Some("ge-0/0/0.0"), None).expect("interface");
        assert!(text.contains("interface ge-0/0/0.0"));
        assert!(text.contains("incoming filter: edge"));
        assert!(render_compiled(&target, Some("ge-9/9/9.0"), None).is_err());
        let acl = render_compiled(&target, None, Some("edge")).expect("acl");
        assert!(acl.contains("acl edge"));
        assert!(render_compiled(&target, None, Some("nope")).is_err());
    }
}
