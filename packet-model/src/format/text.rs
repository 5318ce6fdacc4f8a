use crate::acl::{IpAccessList, LineAction};
use crate::configuration::Configuration;
use crate::transformation::Transformation;

/// Format an access list, one line per entry.
pub fn format_acl(acl: &IpAccessList) -> String {
    let mut lines = Vec::with_capacity(acl.lines.len() + 1);
    lines.push(format!("acl {}", acl.name));
    for (idx, line) in acl.lines.iter().enumerate() {
        let action = match line.action {
            LineAction::Permit => "permit",
            LineAction::Deny => "deny",
        };
        let mut rendered = format!("  {idx:>3} {action} {}", line.expr);
        if let Some(name) = &line.name {
            rendered.push_str(&format!("  [{name}]"));
        }
        if let Some(trace) = &line.trace {
            rendered.push_str(&format!("  # {trace}"));
        }
        lines.push(rendered);
    }
    lines.push("      deny (implicit)".to_string());
    lines.join("\n")
}

/// Format a transformation tree with `then`/`else` branches indented.
pub fn format_transformation(transformation: &Transformation) -> String {
    let mut lines = Vec::new();
    render_transformation(transformation, 0, &mut lines);
    lines.join("\n")
}

fn render_transformation(transformation: &Transformation, depth: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(depth);
    lines.push(format!("{pad}when {}", transformation.guard));
    for step in &transformation.steps {
        lines.push(format!("{pad}  apply {step}"));
    }
    if let Some(next) = &transformation.and_then {
        lines.push(format!("{pad}then"));
        render_transformation(next, depth + 1, lines);
    }
    if let Some(next) = &transformation.or_else {
        lines.push(format!("{pad}else"));
        render_transformation(next, depth + 1, lines);
    }
}

/// Format a one-line summary of a compiled configuration.
pub fn format_summary(config: &Configuration) -> String {
    let acl_lines: usize = config.acls.values().map(|acl| acl.lines.len()).sum();
    let transformations = config
        .interfaces
        .values()
        .map(|iface| {
            usize::from(iface.incoming_transformation.is_some())
                + usize::from(iface.outgoing_transformation.is_some())
        })
        .sum::<usize>();
    format!(
        "hostname={} interfaces={} zones={} acls={} acl_lines={acl_lines} ip_spaces={} transformations={transformations}",
        config.hostname,
        config.interfaces.len(),
        config.zones.len(),
        config.acls.len(),
        config.ip_spaces.len(),
    )
}
