use std::collections::BTreeMap;

use packet_model::flow::{TCP_ACK, TCP_FIN, TCP_PSH, TCP_RST, TCP_SYN, TCP_URG};
use packet_model::{AclLine, HeaderField, IpAccessList, IpProtocol, MatchExpr, SubRange};
use tracing::debug;

use crate::convert::names;
use crate::convert::CompileContext;
use crate::representation::{Screen, ScreenAction, ScreenOption};
use crate::warnings::Warnings;

/// Screen ACLs and the zones they protect.
#[derive(Debug, Clone, Default)]
pub struct ScreenAcls {
    pub acls: BTreeMap<String, IpAccessList>,
    /// Zone name to its `~SCREEN_ZONE~` ACL name.
    pub zones: BTreeMap<String, String>,
}

impl ScreenAcls {
    pub fn zone_screen(&self, zone: &str) -> Option<&str> {
        self.zones.get(zone).map(String::as_str)
    }
}

/// Packets an option drops.
pub fn option_expr(option: ScreenOption) -> MatchExpr {
    match option {
        ScreenOption::IcmpLarge => MatchExpr::and(vec![
            MatchExpr::protocols(&[IpProtocol::ICMP]),
            MatchExpr::field(HeaderField::PacketLength, [SubRange::new(1025, 65535)]),
        ]),
        ScreenOption::IpUnknownProtocol => {
            MatchExpr::field(HeaderField::IpProtocol, [SubRange::new(138, 255)])
        }
        ScreenOption::TcpFinNoAck => MatchExpr::TcpFlags {
            set: TCP_FIN,
            unset: TCP_ACK,
        },
        ScreenOption::TcpSynFin => MatchExpr::TcpFlags {
            set: TCP_SYN | TCP_FIN,
            unset: 0,
        },
        ScreenOption::TcpNoFlag => MatchExpr::TcpFlags {
            set: 0,
            unset: TCP_FIN | TCP_SYN | TCP_RST | TCP_PSH | TCP_ACK | TCP_URG,
        },
    }
}

/// `~SCREEN~<name>`, or `None` when the screen drops nothing.
pub fn screen_acl(screen: &Screen, warnings: &mut Warnings) -> Option<IpAccessList> {
    let mut options = Vec::new();
    for raw in &screen.options {
        match ScreenOption::from_name(raw) {
            Some(option) => options.push(option),
            None => warnings.unimplemented(
                "unsupported_screen_option",
                format!("screen {} option {raw} is not modeled", screen.name),
            ),
        }
    }
    if screen.action == ScreenAction::AlarmWithoutDrop || options.is_empty() {
        return None;
    }
    let drop = MatchExpr::or(
        options
            .iter()
            .map(|option| MatchExpr::traced(option_expr(*option), option.name())),
    );
    Some(IpAccessList::new(
        names::screen(&screen.name),
        vec![
            AclLine::denying(drop).with_name(screen.name.clone()),
            AclLine::permitting(MatchExpr::True),
        ],
    ))
}

/// Build every defined screen and one combined screen per zone.
pub fn compile_screens(ctx: &CompileContext<'_>, warnings: &mut Warnings) -> ScreenAcls {
    let mut out = ScreenAcls::default();
    for screen in ctx.config.screens.values() {
        if let Some(acl) = screen_acl(screen, warnings) {
            out.acls.insert(acl.name.clone(), acl);
        }
    }
    for zone in ctx.config.zones.values() {
        let mut built = Vec::new();
        for name in &zone.screens {
            if !ctx.config.screens.contains_key(name) {
                warnings.undefined_reference("screen", name, &format!("zone {}", zone.name));
                continue;
            }
            let acl = names::screen(name);
            if out.acls.contains_key(&acl) {
                built.push(MatchExpr::permitted_by(acl));
            }
        }
        if built.is_empty() {
            continue;
        }
        let name = names::screen_zone(&zone.name);
        out.acls.insert(
            name.clone(),
            IpAccessList::new(name.clone(), vec![AclLine::permitting(MatchExpr::and(built))]),
        );
        out.zones.insert(zone.name.clone(), name);
    }
    debug!(acls = out.acls.len(), zones = out.zones.len(), "compiled screens");
    out
}

pub fn screen_interface_acl(interface: &str, zone_screen: &str) -> IpAccessList {
    IpAccessList::new(
        names::screen_interface(interface),
        vec![AclLine::permitting(MatchExpr::permitted_by(zone_screen))],
    )
}

/// `~COMBINED_INCOMING_FILTER~<iface>`: the screen, then the incoming filter.
pub fn combined_incoming_acl(
    interface: &str,
    screen_interface: &str,
    incoming: Option<&str>,
) -> IpAccessList {
    let mut conjuncts = vec![MatchExpr::permitted_by(screen_interface)];
    conjuncts.extend(incoming.map(MatchExpr::permitted_by));
    IpAccessList::new(
        names::combined_incoming_filter(interface),
        vec![AclLine::permitting(MatchExpr::and(conjuncts))],
    )
}
