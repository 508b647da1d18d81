use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use iptables_gen::plan::{GatewaySection, RuleSpec};
use iptables_gen::rule_args::{parse_forward, parse_forward_range, parse_open};

#[derive(Parser, Debug)]
#[command(name = "iptables-gen")]
#[command(about = "Generate an iptables gateway script with port forwarding")]
pub struct Cli {
    /// Log rule application and port allocation to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Build the script from a plan file and command-line rules.
    Generate(GenerateArgs),
    /// Apply a plan without emitting a script and report every failing rule.
    Check(CheckArgs),
    /// Print the built-in example plan.
    Example,
}

/// Gateway settings that override the plan's `[gateway]` section.
#[derive(clap::Args, Debug)]
pub struct GatewayArgs {
    /// Public address of the gateway.
    #[arg(long)]
    pub wan_ip: Option<String>,
    /// Interface facing the public network.
    #[arg(long)]
    pub wan_interface: Option<String>,
    /// Gateway address on the LAN.
    #[arg(long)]
    pub lan_ip: Option<String>,
    /// Interface facing the trusted LAN.
    #[arg(long)]
    pub lan_interface: Option<String>,
    /// Command written at the start of every line.
    #[arg(long)]
    pub tool: Option<String>,
}

impl GatewayArgs {
    pub fn to_section(&self) -> GatewaySection {
        GatewaySection {
            wan_ip: self.wan_ip.clone(),
            wan_interface: self.wan_interface.clone(),
            lan_ip: self.lan_ip.clone(),
            lan_interface: self.lan_interface.clone(),
            tool: self.tool.clone(),
        }
    }
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Plan file (TOML). Optional when every gateway setting is given as a flag.
    pub plan: Option<PathBuf>,
    /// Write the script here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Omit the `#!/bin/bash` line from text output.
    #[arg(long)]
    pub no_shebang: bool,
    /// Open a port on the gateway: PORT[/PROTO]. Repeatable.
    #[arg(long = "open", value_name = "PORT[/PROTO]", value_parser = parse_open)]
    pub open: Vec<RuleSpec>,
    /// Forward a port: PORT:IP:PORT[/PROTO]. Repeatable.
    #[arg(long = "forward", value_name = "PORT:IP:PORT[/PROTO]", value_parser = parse_forward)]
    pub forward: Vec<RuleSpec>,
    /// Forward a port range: IP:START-END[/PROTO]. Repeatable.
    #[arg(
        long = "forward-range",
        value_name = "IP:START-END[/PROTO]",
        value_parser = parse_forward_range
    )]
    pub forward_range: Vec<RuleSpec>,
    #[command(flatten)]
    pub gateway: GatewayArgs,
}

impl GenerateArgs {
    /// Command-line rules: opens, then forwards, then ranges, each in flag order.
    pub fn extra_rules(&self) -> Vec<RuleSpec> {
        self.open
            .iter()
            .chain(&self.forward)
            .chain(&self.forward_range)
            .cloned()
            .collect()
    }
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Plan file (TOML) to check.
    pub plan: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(flatten)]
    pub gateway: GatewayArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
