//! Rule accumulation for the three supported intents.
//!
//! Each intent claims its WAN port(s) from the [`PortAllocator`] before
//! building any command. If the claim fails the rule list is left untouched,
//! so one intent's commands are always present in full or not at all.

use std::fmt::{self, Display, Formatter};

use tracing::debug;

use crate::allocator::{Allocation, AllocationError, PortAllocator};
use crate::command::{Command, PortSpec};
use crate::config::GatewayConfig;
use crate::protocol::Protocol;
use crate::render::render_script;

/// States accepted on forwarded traffic toward an internal host.
const FORWARD_STATES: &str = "NEW,ESTABLISHED,RELATED";

/// Builds an ordered iptables script for one gateway.
#[derive(Debug, Clone)]
pub struct RuleGenerator {
    config: GatewayConfig,
    ports: PortAllocator,
    rules: Vec<Command>,
}

impl RuleGenerator {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            ports: PortAllocator::new(),
            rules: Vec::new(),
        }
    }

    /// Open `port` on the WAN address for services running on the gateway itself.
    ///
    /// Emits one INPUT accept rule.
    pub fn open_port(&mut self, port: u16, protocol: &str) -> Result<(), AllocationError> {
        let protocol = self.ports.allocate(port, protocol)?;

        let accept = self.wan_input_accept(protocol, PortSpec::Single { port });
        self.rules.push(accept);
        debug!(port, %protocol, "opened host port");
        Ok(())
    }

    /// Forward WAN `incoming_port` to `internal_ip:internal_port`.
    ///
    /// Emits INPUT accept, PREROUTING DNAT and FORWARD accept, in that order.
    pub fn forward_port(
        &mut self,
        incoming_port: u16,
        internal_ip: &str,
        internal_port: u16,
        protocol: &str,
    ) -> Result<(), AllocationError> {
        let protocol = self.ports.allocate(incoming_port, protocol)?;

        self.push_forward_block(
            protocol,
            PortSpec::Single {
                port: incoming_port,
            },
            internal_ip,
            PortSpec::Single {
                port: internal_port,
            },
        );
        debug!(
            incoming_port,
            internal_ip,
            internal_port,
            %protocol,
            "added port forward"
        );
        Ok(())
    }

    /// Forward the WAN range `[start_port, end_port]` to the same ports on `internal_ip`.
    ///
    /// A reversed range fails with [`AllocationError::InvalidRange`] before
    /// anything is claimed. A conflict inside the range leaves the ports below
    /// it claimed but emits no commands.
    pub fn forward_port_range(
        &mut self,
        internal_ip: &str,
        start_port: u16,
        end_port: u16,
        protocol: &str,
    ) -> Result<(), AllocationError> {
        let protocol = self.ports.allocate_range(start_port, end_port, protocol)?;

        let ports = PortSpec::Range {
            start: start_port,
            end: end_port,
        };
        self.push_forward_block(protocol, ports, internal_ip, ports);
        debug!(
            internal_ip,
            start_port,
            end_port,
            %protocol,
            "added port range forward"
        );
        Ok(())
    }

    /// Render the full script: preamble, accumulated rules in call order, postamble.
    ///
    /// Pure; rendering twice without further intents yields identical text.
    pub fn render(&self) -> String {
        render_script(&self.config, &self.rules)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Accumulated intent commands, excluding preamble and postamble.
    pub fn rules(&self) -> &[Command] {
        &self.rules
    }

    pub fn allocations(&self) -> Vec<Allocation> {
        self.ports.allocations()
    }

    pub fn is_allocated(&self, port: u16, protocol: Protocol) -> bool {
        self.ports.is_allocated(port, protocol)
    }

    fn push_forward_block(
        &mut self,
        protocol: Protocol,
        incoming: PortSpec,
        internal_ip: &str,
        internal: PortSpec,
    ) {
        let accept = self.wan_input_accept(protocol, incoming);
        let dnat = Command::new()
            .table("nat")
            .append("PREROUTING")
            .in_interface(self.config.wan_interface())
            .destination_host(self.config.wan_ip())
            .protocol(protocol)
            .dport(incoming)
            .jump("DNAT")
            .to_destination(internal_ip, internal);
        let forward = Command::new()
            .append("FORWARD")
            .protocol(protocol)
            .destination(internal_ip)
            .dport(internal)
            .state(FORWARD_STATES)
            .jump("ACCEPT");

        self.rules.extend([accept, dnat, forward]);
    }

    fn wan_input_accept(&self, protocol: Protocol, ports: PortSpec) -> Command {
        Command::new()
            .append("INPUT")
            .in_interface(self.config.wan_interface())
            .destination_host(self.config.wan_ip())
            .protocol(protocol)
            .dport(ports)
            .jump("ACCEPT")
    }
}

impl Display for RuleGenerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::RuleGenerator;
    use crate::allocator::AllocationError;
    use crate::config::GatewayConfig;
    use crate::protocol::Protocol;

    fn generator() -> RuleGenerator {
        let config =
            GatewayConfig::new("8.8.8.8", "enp7s0", "192.168.0.1", "enp7s1").expect("config");
        RuleGenerator::new(config)
    }

    fn lines(gen: &RuleGenerator) -> Vec<String> {
        gen.rules()
            .iter()
            .map(|cmd| cmd.to_line(gen.config().tool()))
            .collect()
    }

    #[test]
    fn open_port_emits_single_input_rule() {
        let mut gen = generator();
        gen.open_port(22, "tcp").expect("open");
        assert_eq!(
            lines(&gen),
            vec![
                "/sbin/iptables --append INPUT --in-interface enp7s0 --destination 8.8.8.8/32 \
                 --protocol tcp --dport 22 --jump ACCEPT"
            ]
        );
    }

    #[test]
    fn forward_port_emits_three_rules_in_order() {
        let mut gen = generator();
        gen.forward_port(2222, "192.168.0.2", 22, "tcp")
            .expect("forward");
        assert_eq!(
            lines(&gen),
            vec![
                "/sbin/iptables --append INPUT --in-interface enp7s0 --destination 8.8.8.8/32 \
                 --protocol tcp --dport 2222 --jump ACCEPT",
                "/sbin/iptables --table nat --append PREROUTING --in-interface enp7s0 \
                 --destination 8.8.8.8/32 --protocol tcp --dport 2222 --jump DNAT \
                 --to-destination 192.168.0.2:22",
                "/sbin/iptables --append FORWARD --protocol tcp --destination 192.168.0.2 \
                 --dport 22 --match state --state NEW,ESTABLISHED,RELATED --jump ACCEPT",
            ]
        );
        assert!(gen.is_allocated(2222, Protocol::Tcp));
        assert!(!gen.is_allocated(22, Protocol::Tcp));
    }

    #[test]
    fn forward_range_uses_range_syntax() {
        let mut gen = generator();
        gen.forward_port_range("192.168.0.3", 5000, 5002, "udp")
            .expect("range");
        let out = lines(&gen);
        assert_eq!(out.len(), 3);
        assert!(out[0].ends_with("--protocol udp --dport 5000:5002 --jump ACCEPT"));
        assert!(out[1].ends_with("--dport 5000:5002 --jump DNAT --to-destination 192.168.0.3:5000-5002"));
        assert!(out[2].contains("--destination 192.168.0.3 --dport 5000:5002 --match state"));
    }

    #[test]
    fn failed_intent_appends_nothing() {
        let mut gen = generator();
        gen.open_port(80, "tcp").expect("open");
        let before = gen.rules().len();

        let err = gen
            .forward_port(80, "192.168.0.2", 8080, "tcp")
            .expect_err("conflict");
        assert!(matches!(err, AllocationError::PortConflict { port: 80, .. }));
        assert_eq!(gen.rules().len(), before);

        let err = gen.open_port(81, "gre").expect_err("protocol");
        assert_eq!(err, AllocationError::InvalidProtocol("gre".to_string()));
        assert_eq!(gen.rules().len(), before);
    }

    #[test]
    fn reversed_range_emits_nothing() {
        let mut gen = generator();
        let err = gen
            .forward_port_range("192.168.0.3", 6000, 5999, "tcp")
            .expect_err("reversed");
        assert_eq!(
            err,
            AllocationError::InvalidRange {
                start: 6000,
                end: 5999
            }
        );
        assert!(gen.rules().is_empty());
        assert!(gen.allocations().is_empty());
    }

    #[test]
    fn display_matches_render() {
        let mut gen = generator();
        gen.open_port(443, "tcp").expect("open");
        assert_eq!(gen.to_string(), gen.render());
    }
}
