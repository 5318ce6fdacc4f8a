//! Compile passes from [`JuniperConfig`] to [`Configuration`].
//!
//! [`convert`] runs the passes in a fixed order: static NAT is validated and
//! mirrored, address books become named IP spaces, named filters and zone
//! policies become ACLs, then screens, and finally every interface and zone
//! of the target model is assembled from what the earlier passes produced.
//! Unreferenced filters and prefix-lists are reported along the way.
//! Recoverable problems are recorded in [`Warnings`]; only structural
//! problems abort with a [`ConversionError`].

pub mod address_books;
pub mod applications;
pub mod filters;
pub mod host_inbound;
pub mod match_exprs;
pub mod names;
pub mod nat_chains;
pub mod nat_locations;
pub mod nat_rules;
pub mod screens;
pub mod static_nat;
pub mod terms;
pub mod unused;
pub mod zones;

use std::collections::BTreeMap;

use packet_model::{Configuration, Interface as TargetInterface, IpAccessList, MatchExpr};
use packet_model::{Transformation, Zone as TargetZone};
use tracing::debug;

use crate::error::ConversionError;
use crate::representation::{FirewallFilter, Interface, JuniperConfig, NatBlock};
use crate::settings::ConvertSettings;
use crate::warnings::Warnings;

use address_books::{compile_address_books, AddressBooks};
use applications::ApplicationResolver;
use filters::{compile_named_filters, CompositeFilter};
use nat_chains::{incoming_transformation, outgoing_transformation};
use nat_locations::LocationMap;
use nat_rules::NatDirection;
use screens::{combined_incoming_acl, compile_screens, screen_interface_acl, ScreenAcls};
use unused::warn_unreferenced;
use zones::{
    combined_outgoing_acl, compile_zone_policies, existing_connection_acl, security_policy_acl,
    to_zone_policies,
};

/// Read-only lookups shared by every pass.
#[derive(Debug, Clone)]
pub struct CompileContext<'a> {
    pub config: &'a JuniperConfig,
    pub books: AddressBooks<'a>,
    pub applications: ApplicationResolver<'a>,
    pub settings: &'a ConvertSettings,
}

impl<'a> CompileContext<'a> {
    pub fn new(config: &'a JuniperConfig, settings: &'a ConvertSettings) -> Self {
        Self {
            config,
            books: AddressBooks::new(config),
            applications: ApplicationResolver::new(config),
            settings,
        }
    }

    /// Wrap `expr` in a trace tag unless tags are turned off.
    pub fn traced(&self, expr: MatchExpr, label: impl FnOnce() -> String) -> MatchExpr {
        if self.settings.emit_trace_tags {
            MatchExpr::traced(expr, label())
        } else {
            expr
        }
    }
}

/// Direction of an interface filter attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    Input,
    Output,
}

impl Attachment {
    fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// Compile one configuration.
pub fn convert(
    config: &JuniperConfig,
    settings: &ConvertSettings,
    warnings: &mut Warnings,
) -> Result<Configuration, ConversionError> {
    let reversed_static = config
        .nat
        .static_nat
        .as_ref()
        .map(static_nat::reverse_static)
        .transpose()?;

    let ctx = CompileContext::new(config, settings);
    let mut target = Configuration::new(config.hostname.clone());
    target.ip_spaces = compile_address_books(config, warnings)?;
    warn_unreferenced(config, warnings);

    target.acls = compile_named_filters(&ctx, warnings);
    target.acls.extend(compile_zone_policies(&ctx, warnings));
    if !config.zones.is_empty() {
        let existing = existing_connection_acl();
        target.acls.insert(existing.name.clone(), existing);
    }
    let screens = compile_screens(&ctx, warnings);
    target
        .acls
        .extend(screens.acls.iter().map(|(name, acl)| (name.clone(), acl.clone())));

    let locations = LocationMap::build(config);
    debug!(locations = locations.len(), "built NAT location map");

    let nat = NatStages {
        source: config.nat.source.as_ref(),
        destination: config.nat.destination.as_ref(),
        static_forward: config.nat.static_nat.as_ref(),
        static_reverse: reversed_static.as_ref(),
        locations: &locations,
    };
    for interface in config.interfaces.values() {
        let built = build_interface(interface, &ctx, &screens, &nat, &mut target.acls, warnings)?;
        target.interfaces.insert(built.name.clone(), built);
    }

    for zone in config.zones.values() {
        target.zones.insert(
            zone.name.clone(),
            TargetZone {
                name: zone.name.clone(),
                interfaces: zone.interfaces.clone(),
                inbound_filter: zone.inbound_filter.clone(),
                from_host_filter: zone.from_host_filter.clone(),
                to_host_filter: zone.to_host_filter.clone(),
                inbound_interface_filters: zone.inbound_interface_filters.clone(),
                to_zone_policies: to_zone_policies(config, &zone.name),
            },
        );
    }

    debug!(
        hostname = %target.hostname,
        acls = target.acls.len(),
        interfaces = target.interfaces.len(),
        warnings = warnings.len(),
        "conversion finished"
    );
    Ok(target)
}

struct NatStages<'n> {
    source: Option<&'n NatBlock>,
    destination: Option<&'n NatBlock>,
    static_forward: Option<&'n NatBlock>,
    static_reverse: Option<&'n NatBlock>,
    locations: &'n LocationMap,
}

impl NatStages<'_> {
    /// Static NAT first, then destination NAT.
    fn incoming(
        &self,
        interface: &Interface,
        ctx: &CompileContext<'_>,
        warnings: &mut Warnings,
    ) -> Result<Option<Transformation>, ConversionError> {
        let mut acc = None;
        if let Some(block) = self.destination {
            acc = incoming_transformation(
                block,
                NatDirection::Destination,
                interface,
                ctx,
                acc,
                warnings,
            )?;
        }
        if let Some(block) = self.static_forward {
            acc = incoming_transformation(
                block,
                NatDirection::StaticForward,
                interface,
                ctx,
                acc,
                warnings,
            )?;
        }
        Ok(acc)
    }

    /// Mirrored static NAT first, then source NAT.
    fn outgoing(
        &self,
        interface: &Interface,
        ctx: &CompileContext<'_>,
        warnings: &mut Warnings,
    ) -> Result<Option<Transformation>, ConversionError> {
        let mut acc = None;
        if let Some(block) = self.source {
            acc = outgoing_transformation(
                block,
                NatDirection::Source,
                interface,
                self.locations,
                ctx,
                acc,
                warnings,
            )?;
        }
        if let Some(block) = self.static_reverse {
            acc = outgoing_transformation(
                block,
                NatDirection::StaticReverse,
                interface,
                self.locations,
                ctx,
                acc,
                warnings,
            )?;
        }
        Ok(acc)
    }
}

fn build_interface(
    interface: &Interface,
    ctx: &CompileContext<'_>,
    screens: &ScreenAcls,
    nat: &NatStages<'_>,
    acls: &mut BTreeMap<String, IpAccessList>,
    warnings: &mut Warnings,
) -> Result<TargetInterface, ConversionError> {
    let name = interface.name.as_str();
    let config = ctx.config;
    let zone = config.zone_of(name);

    let mut incoming = attach_filter(interface, Attachment::Input, ctx, acls, warnings)?;
    let mut outgoing = attach_filter(interface, Attachment::Output, ctx, acls, warnings)?;

    if let Some(zone) = zone {
        let policy = security_policy_acl(name, zone, acls, ctx);
        let policy_name = policy.name.clone();
        acls.insert(policy_name.clone(), policy);
        outgoing = Some(match outgoing {
            Some(filter) => {
                let combined = combined_outgoing_acl(name, &policy_name, &filter);
                let combined_name = combined.name.clone();
                acls.insert(combined_name.clone(), combined);
                combined_name
            }
            None => policy_name,
        });

        if let Some(zone_screen) = screens.zone_screen(&zone.name) {
            let screened = screen_interface_acl(name, zone_screen);
            let combined = combined_incoming_acl(name, &screened.name, incoming.as_deref());
            incoming = Some(combined.name.clone());
            acls.insert(screened.name.clone(), screened);
            acls.insert(combined.name.clone(), combined);
        }
    }

    let inbound_filter = zone.and_then(|zone| {
        let filter = zone
            .inbound_interface_filters
            .get(name)
            .or(zone.inbound_filter.as_ref())?;
        if acls.contains_key(filter) {
            Some(filter.clone())
        } else {
            if !config.firewall_filters.contains_key(filter) {
                let context = format!("zone {} host-inbound", zone.name);
                warnings.undefined_reference("filter", filter, &context);
            }
            None
        }
    });

    Ok(TargetInterface {
        name: name.to_string(),
        vrf: config.routing_instance_of(name).to_string(),
        zone: zone.map(|zone| zone.name.clone()),
        primary_address: interface.primary_address,
        incoming_filter: incoming,
        outgoing_filter: outgoing,
        inbound_filter,
        incoming_transformation: nat.incoming(interface, ctx, warnings)?,
        outgoing_transformation: nat.outgoing(interface, ctx, warnings)?,
    })
}

/// Name of the ACL for one direction of `interface`, compiling a filter list
/// into a composite ACL when one is configured.
fn attach_filter(
    interface: &Interface,
    attachment: Attachment,
    ctx: &CompileContext<'_>,
    acls: &mut BTreeMap<String, IpAccessList>,
    warnings: &mut Warnings,
) -> Result<Option<String>, ConversionError> {
    let (single, list, composite_name) = match attachment {
        Attachment::Input => (
            interface.incoming_filter.as_ref(),
            &interface.incoming_filter_list,
            names::input_filter_list(&interface.name),
        ),
        Attachment::Output => (
            interface.outgoing_filter.as_ref(),
            &interface.outgoing_filter_list,
            names::output_filter_list(&interface.name),
        ),
    };
    let context = format!("interface {} {}", interface.name, attachment.name());

    if list.is_empty() {
        let Some(filter) = single else {
            return Ok(None);
        };
        if acls.contains_key(filter) {
            return Ok(Some(filter.clone()));
        }
        if !ctx.config.firewall_filters.contains_key(filter) {
            warnings.undefined_reference("filter", filter, &context);
        }
        return Ok(None);
    }

    if let Some(filter) = single {
        warnings.pedantic(
            "filter_list_overrides_filter",
            format!("{context} sets both filter {filter} and a filter list; the list is used"),
        );
    }
    let members = list
        .iter()
        .filter_map(|member| match ctx.config.firewall_filters.get(member) {
            Some(filter) => Some(filter),
            None => {
                warnings.undefined_reference("filter", member, &context);
                None
            }
        })
        .collect::<Vec<&FirewallFilter>>();
    if members.is_empty() {
        warnings.red_flag(
            "empty_filter_list",
            format!("{context} filter list has no defined members; no filter attached"),
        );
        return Ok(None);
    }
    let composite = CompositeFilter::new(composite_name, members)?;
    let Some(acl) = composite.compile(ctx, warnings) else {
        return Ok(None);
    };
    acls.insert(composite.name().to_string(), acl);
    Ok(Some(composite.name().to_string()))
}
