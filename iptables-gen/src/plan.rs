//! TOML plan files.
//!
//! A plan names the gateway endpoints and lists rules in the order they are
//! applied:
//!
//! ```toml
//! [gateway]
//! wan_ip = "8.8.8.8"
//! wan_interface = "enp7s0"
//! lan_ip = "192.168.0.1"
//! lan_interface = "enp7s1"
//!
//! [[rule]]
//! kind = "open"
//! port = 22
//!
//! [[rule]]
//! kind = "forward"
//! port = 2222
//! to_ip = "192.168.0.2"
//! to_port = 22
//! ```
//!
//! Rules of every kind share the single `[[rule]]` array so their relative order
//! survives parsing; the order decides the order of the emitted commands.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;

use iptables_gen_core::{
    AllocationError, ConfigError, GatewayConfig, RuleGenerator, DEFAULT_PROTOCOL,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Gateway endpoint settings. Every field is optional so that command-line
/// overrides can fill in or replace what the file provides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    pub wan_ip: Option<String>,
    pub wan_interface: Option<String>,
    pub lan_ip: Option<String>,
    pub lan_interface: Option<String>,
    pub tool: Option<String>,
}

impl GatewaySection {
    /// Overlay `overrides` on top of `self`; set override fields win.
    pub fn merged(&self, overrides: &GatewaySection) -> GatewaySection {
        GatewaySection {
            wan_ip: overrides.wan_ip.clone().or_else(|| self.wan_ip.clone()),
            wan_interface: overrides
                .wan_interface
                .clone()
                .or_else(|| self.wan_interface.clone()),
            lan_ip: overrides.lan_ip.clone().or_else(|| self.lan_ip.clone()),
            lan_interface: overrides
                .lan_interface
                .clone()
                .or_else(|| self.lan_interface.clone()),
            tool: overrides.tool.clone().or_else(|| self.tool.clone()),
        }
    }

    /// Validate and convert into a [`GatewayConfig`].
    pub fn to_config(&self) -> Result<GatewayConfig, PlanBuildError> {
        let config = GatewayConfig::new(
            required(&self.wan_ip, "wan_ip")?,
            required(&self.wan_interface, "wan_interface")?,
            required(&self.lan_ip, "lan_ip")?,
            required(&self.lan_interface, "lan_interface")?,
        )?;
        match &self.tool {
            Some(tool) => Ok(config.with_tool(tool.as_str())?),
            None => Ok(config),
        }
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, PlanBuildError> {
    value
        .as_deref()
        .ok_or(PlanBuildError::MissingSetting(field))
}

/// One firewall intent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleSpec {
    /// Open a port on the gateway itself.
    Open {
        port: u16,
        #[serde(default = "default_protocol")]
        protocol: String,
    },
    /// Forward one WAN port to an internal host.
    Forward {
        port: u16,
        to_ip: String,
        to_port: u16,
        #[serde(default = "default_protocol")]
        protocol: String,
    },
    /// Forward a WAN port range to the same ports on an internal host.
    ForwardRange {
        to_ip: String,
        start: u16,
        end: u16,
        #[serde(default = "default_protocol")]
        protocol: String,
    },
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

impl RuleSpec {
    /// Apply this intent to `gen`.
    pub fn apply(&self, gen: &mut RuleGenerator) -> Result<(), AllocationError> {
        match self {
            RuleSpec::Open { port, protocol } => gen.open_port(*port, protocol),
            RuleSpec::Forward {
                port,
                to_ip,
                to_port,
                protocol,
            } => gen.forward_port(*port, to_ip, *to_port, protocol),
            RuleSpec::ForwardRange {
                to_ip,
                start,
                end,
                protocol,
            } => gen.forward_port_range(to_ip, *start, *end, protocol),
        }
    }
}

impl Display for RuleSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RuleSpec::Open { port, protocol } => write!(f, "open {port}/{protocol}"),
            RuleSpec::Forward {
                port,
                to_ip,
                to_port,
                protocol,
            } => write!(f, "forward {port}/{protocol} -> {to_ip}:{to_port}"),
            RuleSpec::ForwardRange {
                to_ip,
                start,
                end,
                protocol,
            } => write!(f, "forward-range {start}:{end}/{protocol} -> {to_ip}"),
        }
    }
}

/// A parsed plan file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Plan {
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleSpec>,
}

/// Errors returned when loading plan files.
#[derive(Debug, Error)]
pub enum PlanLoadError {
    #[error("failed to read plan file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse plan file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Errors returned when turning a plan into a generator.
#[derive(Debug, Error)]
pub enum PlanBuildError {
    #[error("gateway setting '{0}' is missing")]
    MissingSetting(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("rule #{index} ({rule}) failed: {source}")]
    Rule {
        index: usize,
        rule: String,
        source: AllocationError,
    },
}

/// Load a plan from a TOML file.
pub fn load_plan(path: &Path) -> Result<Plan, PlanLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| PlanLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_plan(&raw, path.display().to_string())
}

/// Raw text of the built-in example plan.
pub fn example_plan_toml() -> &'static str {
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/plans/example.toml"))
}

pub fn parse_plan(raw: &str, path: String) -> Result<Plan, PlanLoadError> {
    toml::from_str(raw).map_err(|source| PlanLoadError::Parse { path, source })
}

/// Build a generator from `plan` plus command-line additions.
///
/// Plan rules are applied first, then `extra_rules`. Rule indexes in errors
/// count across both lists. The first failing rule stops the build.
pub fn build_generator(
    plan: &Plan,
    overrides: &GatewaySection,
    extra_rules: &[RuleSpec],
) -> Result<RuleGenerator, PlanBuildError> {
    let config = plan.gateway.merged(overrides).to_config()?;
    let mut gen = RuleGenerator::new(config);

    for (index, rule) in plan.rules.iter().chain(extra_rules).enumerate() {
        debug!(index, %rule, "applying rule");
        rule.apply(&mut gen)
            .map_err(|source| PlanBuildError::Rule {
                index,
                rule: rule.to_string(),
                source,
            })?;
    }
    Ok(gen)
}

#[cfg(test)]
mod tests {
    use super::{
        build_generator, example_plan_toml, load_plan, parse_plan, GatewaySection, Plan,
        PlanBuildError, PlanLoadError, RuleSpec,
    };
    use iptables_gen_core::{AllocationError, Protocol};
    use std::fs;

    const BASIC: &str = r#"
[gateway]
wan_ip = "8.8.8.8"
wan_interface = "enp7s0"
lan_ip = "192.168.0.1"
lan_interface = "enp7s1"

[[rule]]
kind = "open"
port = 22

[[rule]]
kind = "forward-range"
to_ip = "192.168.0.3"
start = 5000
end = 5002
protocol = "udp"

[[rule]]
kind = "forward"
port = 2222
to_ip = "192.168.0.2"
to_port = 22
"#;

    fn basic() -> Plan {
        parse_plan(BASIC, "basic".to_string()).expect("plan should parse")
    }

    #[test]
    fn parses_rules_in_file_order_with_default_protocol() {
        let plan = basic();
        assert_eq!(plan.rules.len(), 3);
        assert_eq!(
            plan.rules[0],
            RuleSpec::Open {
                port: 22,
                protocol: "tcp".to_string()
            }
        );
        assert!(matches!(plan.rules[1], RuleSpec::ForwardRange { start: 5000, .. }));
        assert_eq!(plan.rules[2].to_string(), "forward 2222/tcp -> 192.168.0.2:22");
    }

    #[test]
    fn loads_plan_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gateway.toml");
        fs::write(&path, BASIC).expect("write plan");

        let plan = load_plan(&path).expect("plan should load");
        assert_eq!(plan.gateway.wan_interface.as_deref(), Some("enp7s0"));
    }

    #[test]
    fn reports_parse_error_for_unknown_kind() {
        let err = parse_plan("[[rule]]\nkind = \"drop\"\nport = 1\n", "bad".to_string())
            .expect_err("unknown kind");
        match err {
            PlanLoadError::Parse { path, .. } => assert_eq!(path, "bad"),
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn reports_io_error_for_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_plan(&dir.path().join("absent.toml")).expect_err("missing file");
        assert!(matches!(err, PlanLoadError::Io { .. }));
    }

    #[test]
    fn builds_generator_in_rule_order() {
        let gen = build_generator(&basic(), &GatewaySection::default(), &[]).expect("build");
        assert_eq!(gen.rules().len(), 7);
        assert!(gen.is_allocated(5001, Protocol::Udp));
        assert!(gen.is_allocated(2222, Protocol::Tcp));
    }

    #[test]
    fn overrides_replace_file_settings() {
        let overrides = GatewaySection {
            wan_interface: Some("eth9".to_string()),
            tool: Some("/usr/sbin/iptables".to_string()),
            ..GatewaySection::default()
        };
        let gen = build_generator(&basic(), &overrides, &[]).expect("build");
        assert_eq!(gen.config().wan_interface(), "eth9");
        assert_eq!(gen.config().wan_ip(), "8.8.8.8");
        assert!(gen.render().starts_with("/usr/sbin/iptables --flush\n"));
    }

    #[test]
    fn missing_gateway_setting_is_reported() {
        let plan = Plan::default();
        let err = build_generator(&plan, &GatewaySection::default(), &[]).expect_err("missing");
        assert!(matches!(err, PlanBuildError::MissingSetting("wan_ip")));
    }

    #[test]
    fn extra_rule_conflict_reports_combined_index() {
        let extra = [RuleSpec::Open {
            port: 5002,
            protocol: "udp".to_string(),
        }];
        let err = build_generator(&basic(), &GatewaySection::default(), &extra)
            .expect_err("conflict");
        match err {
            PlanBuildError::Rule {
                index,
                rule,
                source,
            } => {
                assert_eq!(index, 3);
                assert_eq!(rule, "open 5002/udp");
                assert_eq!(
                    source,
                    AllocationError::PortConflict {
                        port: 5002,
                        protocol: Protocol::Udp
                    }
                );
            }
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn invalid_protocol_in_plan_fails_build() {
        let extra = [RuleSpec::Open {
            port: 8,
            protocol: "icmp".to_string(),
        }];
        let err = build_generator(&basic(), &GatewaySection::default(), &extra)
            .expect_err("protocol");
        assert!(err.to_string().contains("unrecognized protocol: icmp"));
    }

    #[test]
    fn embedded_example_builds() {
        let plan = parse_plan(example_plan_toml(), "embedded example".to_string())
            .expect("embedded example should parse");
        let gen = build_generator(&plan, &GatewaySection::default(), &[]).expect("build");
        assert!(gen.is_allocated(443, Protocol::Tcp));
        assert!(gen.is_allocated(2222, Protocol::Tcp));
    }
}
