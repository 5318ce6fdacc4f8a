//! Junos firewall filter, zone security-policy and NAT compilation.
//!
//! This library turns the linked object graph of a Junos configuration into
//! the vendor-neutral model of `packet-model`: named ACLs built from boolean
//! packet predicates, named IP spaces, and per-interface conditional address
//! translations. Downstream analysis only ever sees the target model.
//!
//! # Architecture
//!
//! ## Vendor side
//!
//! - [`representation`] - The Junos object graph (filters, terms, zones,
//!   address books, applications, screens, NAT stanzas), read with `serde`
//! - [`loader`] - JSON or TOML documents to a normalized [`representation::JuniperConfig`]
//!
//! ## Compilation
//!
//! - [`convert`] - The pass orchestrator and every compile pass
//!   - Address books to the `<book>~<entry>` IP-space registry
//!   - Filter terms to predicates, action resolution and expansions
//!   - Named, composite and zone-bound filters
//!   - Zone security policies, the global policy and the default action
//!   - Screens
//!   - NAT location routing, rule compilation, chain folding and static-NAT
//!     mirroring
//!
//! ## Diagnostics & Settings
//!
//! - [`warnings`] - Recoverable diagnostics sink
//! - [`error`] - Structural errors that abort one configuration
//! - [`settings`] - Output knobs from an embedded or user TOML profile
//! - [`report`] - Terminal-friendly colored check and inspect output
//!
//! # Examples
//!
//! ```ignore
//! use junos_convert::convert::convert;
//! use junos_convert::loader::load_config;
//! use junos_convert::settings::default_settings;
//! use junos_convert::warnings::Warnings;
//!
//! let config = load_config("branch-srx.json".as_ref())?;
//! let mut warnings = Warnings::new();
//! let compiled = convert(&config, &default_settings(), &mut warnings)?;
//! println!("{} ACLs, {} warnings", compiled.acls.len(), warnings.len());
//! ```

pub mod convert;
pub mod error;
pub mod loader;
pub mod report;
pub mod representation;
pub mod settings;
pub mod warnings;
