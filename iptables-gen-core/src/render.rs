use crate::command::Command;
use crate::config::GatewayConfig;

/// Commands emitted before any intent rule.
///
/// Order: reset, default policies, loopback, established/related, then the
/// LAN blanket accepts. The LAN FORWARD accept is always last.
pub fn preamble(config: &GatewayConfig) -> Vec<Command> {
    let lan = config.lan_interface();
    vec![
        Command::new().flag("--flush"),
        Command::new().flag("--delete-chain"),
        Command::new().policy("INPUT", "DROP"),
        Command::new().policy("OUTPUT", "ACCEPT"),
        Command::new().policy("FORWARD", "DROP"),
        Command::new()
            .append("INPUT")
            .in_interface("lo")
            .jump("ACCEPT"),
        Command::new()
            .append("OUTPUT")
            .out_interface("lo")
            .jump("ACCEPT"),
        Command::new()
            .append("INPUT")
            .state("RELATED,ESTABLISHED")
            .jump("ACCEPT"),
        Command::new()
            .append("FORWARD")
            .state("RELATED,ESTABLISHED")
            .jump("ACCEPT"),
        Command::new().append("INPUT").in_interface(lan).jump("ACCEPT"),
        Command::new()
            .append("FORWARD")
            .in_interface(lan)
            .jump("ACCEPT"),
    ]
}

/// Commands emitted after every intent rule: masquerade out of the WAN interface.
pub fn postamble(config: &GatewayConfig) -> Vec<Command> {
    vec![Command::new()
        .table("nat")
        .append("POSTROUTING")
        .out_interface(config.wan_interface())
        .jump("MASQUERADE")]
}

/// Render preamble, `rules` and postamble, one command per line with a trailing newline.
pub fn render_script(config: &GatewayConfig, rules: &[Command]) -> String {
    let head = preamble(config);
    let tail = postamble(config);
    let mut out = String::new();
    for cmd in head.iter().chain(rules).chain(tail.iter()) {
        out.push_str(&cmd.to_line(config.tool()));
        out.push('\n');
    }
    out
}
