use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One protocol/port tuple of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationTerm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_code: Option<String>,
}

/// An application is either a single tuple or a list of named terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_code: Option<String>,
    pub terms: Vec<ApplicationTerm>,
}

impl Application {
    pub fn tcp(name: &str, destination_port: &str) -> Self {
        Self::with_protocol(name, "tcp", destination_port)
    }

    pub fn udp(name: &str, destination_port: &str) -> Self {
        Self::with_protocol(name, "udp", destination_port)
    }

    fn with_protocol(name: &str, protocol: &str, destination_port: &str) -> Self {
        Self {
            name: name.to_string(),
            protocol: Some(protocol.to_string()),
            destination_port: Some(destination_port.to_string()),
            ..Self::default()
        }
    }

    /// The tuples this application matches, one per line it compiles to.
    pub fn entries(&self) -> Vec<ApplicationTerm> {
        if !self.terms.is_empty() {
            return self.terms.clone();
        }
        vec![ApplicationTerm {
            name: self.name.clone(),
            protocol: self.protocol.clone(),
            source_port: self.source_port.clone(),
            destination_port: self.destination_port.clone(),
            icmp_type: self.icmp_type.clone(),
            icmp_code: self.icmp_code.clone(),
        }]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSet {
    pub name: String,
    /// Applications or nested application sets.
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PredefinedFile {
    application: Vec<Application>,
}

/// Built-in `junos-*` applications keyed by name.
pub fn predefined_applications() -> BTreeMap<String, Application> {
    let embedded = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/applications/predefined.toml"
    ));
    let applications = match toml::from_str::<PredefinedFile>(embedded) {
        Ok(parsed) if !parsed.application.is_empty() => parsed.application,
        _ => fallback_applications(),
    };
    applications
        .into_iter()
        .map(|app| (app.name.clone(), app))
        .collect()
}

fn fallback_applications() -> Vec<Application> {
    vec![
        Application::tcp("junos-ssh", "22"),
        Application::tcp("junos-http", "80"),
        Application::tcp("junos-https", "443"),
        Application::udp("junos-dns-udp", "53"),
        Application {
            name: "junos-ping".to_string(),
            protocol: Some("icmp".to_string()),
            icmp_type: Some("8".to_string()),
            ..Application::default()
        },
    ]
}
