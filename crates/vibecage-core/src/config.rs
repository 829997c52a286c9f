//! Sandbox configuration types.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use vibecage_runtime::PortMapping;

/// Ports exposed by the `all` preset, in publish order.
pub const ALL_PORTS: &[u16] = &[
    3000, 3001, 5173, 5174, 4200, // frontend dev servers
    8000, 8001, 8080, 8081, 3030, // backend APIs
    5432, 3306, 27017, 6379, // databases
    4000, 9000, 9090, 8888,
];

/// Ports exposed by the `minimal` preset.
pub const MINIMAL_PORTS: &[u16] = &[3000, 8080];

/// Which container ports a sandbox publishes on the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Option<RawPolicy>", into = "String")]
pub enum PortPolicy {
    /// Common development ports.
    #[default]
    All,
    /// 3000 and 8080 only.
    Minimal,
    /// Nothing published.
    None,
    /// An explicit ordered list.
    Custom(Vec<PortMapping>),
}

impl PortPolicy {
    /// Expand the policy into ordered mappings.
    pub fn expand(&self) -> Vec<PortMapping> {
        match self {
            Self::All => ALL_PORTS.iter().copied().map(PortMapping::same).collect(),
            Self::Minimal => MINIMAL_PORTS.iter().copied().map(PortMapping::same).collect(),
            Self::None => Vec::new(),
            Self::Custom(ports) => ports.clone(),
        }
    }

    /// Whether this is one of the named presets.
    pub fn is_preset(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for PortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Minimal => write!(f, "minimal"),
            Self::None => write!(f, "none"),
            Self::Custom(ports) => {
                let specs: Vec<String> = ports.iter().map(|p| format_spec(*p)).collect();
                write!(f, "{}", specs.join(","))
            }
        }
    }
}

impl FromStr for PortPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "minimal" => Ok(Self::Minimal),
            "none" => Ok(Self::None),
            _ => {
                let ports = parse_port_list(s)?;
                if ports.is_empty() {
                    Ok(Self::None)
                } else {
                    Ok(Self::Custom(ports))
                }
            }
        }
    }
}

impl From<PortPolicy> for String {
    fn from(policy: PortPolicy) -> Self {
        policy.to_string()
    }
}

/// Stored form of a policy: a string, or a list of specifiers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPolicy {
    Text(String),
    List(Vec<String>),
}

/// A stored `null` or blank string means the default preset.
impl TryFrom<Option<RawPolicy>> for PortPolicy {
    type Error = CoreError;

    fn try_from(raw: Option<RawPolicy>) -> Result<Self, Self::Error> {
        match raw {
            None => Ok(Self::All),
            Some(RawPolicy::Text(text)) if text.trim().is_empty() => Ok(Self::All),
            Some(RawPolicy::Text(text)) => text.parse(),
            Some(RawPolicy::List(items)) => items.join(",").parse(),
        }
    }
}

/// Parse one specifier: `port` or `host:container`.
pub fn parse_port_spec(spec: &str) -> Result<PortMapping, CoreError> {
    let spec = spec.trim();
    let invalid = || CoreError::InvalidPort(spec.to_string());
    let port = |s: &str| match s.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(p) => Ok(p),
    };

    match spec.split_once(':') {
        Some((host, container)) => Ok(PortMapping::new(port(host)?, port(container)?)),
        None => Ok(PortMapping::same(port(spec)?)),
    }
}

/// Parse a comma-separated list of specifiers, skipping empty entries.
pub fn parse_port_list(list: &str) -> Result<Vec<PortMapping>, CoreError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_port_spec)
        .collect()
}

fn format_spec(mapping: PortMapping) -> String {
    if mapping.host == mapping.container {
        mapping.host.to_string()
    } else {
        mapping.to_string()
    }
}

/// Per-project sandbox configuration, stored in `.vibecage/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxConfig {
    /// Sandbox name, unique in the registry.
    pub name: String,
    /// Project directory bind-mounted into the container.
    pub projects_dir: PathBuf,
    /// Port policy (applies on next container creation).
    #[serde(default)]
    pub ports: PortPolicy,
    /// Launch the assistant without permission prompts.
    #[serde(default)]
    pub yolo: bool,
}

impl SandboxConfig {
    /// Create a config with the `all` port policy and yolo off.
    pub fn new(name: impl Into<String>, projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            projects_dir: projects_dir.into(),
            ports: PortPolicy::default(),
            yolo: false,
        }
    }
}

/// Check that a name can be used in container and image names.
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit())
        && chars.all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
        })
        && name.len() <= 64;

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidName(name.to_string()))
    }
}
