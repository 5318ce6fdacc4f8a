//! Synthetic ACL and IP-space names.
//!
//! Downstream analysis matches on these names verbatim, so they must not
//! change.

pub const EXISTING_CONNECTION: &str = "~EXISTING_CONNECTION~";
pub const GLOBAL_SECURITY_POLICY: &str = "~GLOBAL_SECURITY_POLICY~";

pub fn combined_incoming_filter(interface: &str) -> String {
    format!("~COMBINED_INCOMING_FILTER~{interface}")
}

pub fn combined_outgoing_filter(interface: &str) -> String {
    format!("~COMBINED_OUTGOING_FILTER~{interface}")
}

pub fn security_policy_to(interface: &str) -> String {
    format!("~SECURITY_POLICY_TO~{interface}")
}

pub fn zone_policy(from_zone: &str, to_zone: &str) -> String {
    format!("~FROM_ZONE~{from_zone}~TO_ZONE~{to_zone}")
}

pub fn screen(name: &str) -> String {
    format!("~SCREEN~{name}")
}

pub fn screen_zone(zone: &str) -> String {
    format!("~SCREEN_ZONE~{zone}")
}

pub fn screen_interface(interface: &str) -> String {
    format!("~SCREEN_INTERFACE~{interface}")
}

pub fn input_filter_list(interface: &str) -> String {
    format!("~INPUT_FILTER_LIST~{interface}")
}

pub fn output_filter_list(interface: &str) -> String {
    format!("~OUTPUT_FILTER_LIST~{interface}")
}

/// Registry key of an address-book entry.
pub fn address_book_entry(book: &str, entry: &str) -> String {
    format!("{book}~{entry}")
}

#[cfg(test)]
mod tests {
    use super::{address_book_entry, security_policy_to, zone_policy};

    #[test]
    fn names_are_stable() {
        assert_eq!(security_policy_to("ge-0/0/1.0"), "~SECURITY_POLICY_TO~ge-0/0/1.0");
        assert_eq!(zone_policy("trust", "untrust"), "~FROM_ZONE~trust~TO_ZONE~untrust");
        assert_eq!(address_book_entry("global", "web"), "global~web");
    }
}
