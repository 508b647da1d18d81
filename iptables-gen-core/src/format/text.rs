use crate::allocator::Allocation;
use crate::generator::RuleGenerator;
use crate::protocol::Protocol;

/// Format claimed ports one per line as `port/protocol`.
pub fn format_allocations(allocations: &[Allocation]) -> String {
    allocations
        .iter()
        .map(|a| format!("{}/{}", a.port, a.protocol))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a one-line count summary.
pub fn format_summary(gen: &RuleGenerator) -> String {
    let allocations = gen.allocations();
    let tcp = allocations
        .iter()
        .filter(|a| a.protocol == Protocol::Tcp)
        .count();
    let udp = allocations.len() - tcp;
    format!(
        "rules={} allocations={} tcp={tcp} udp={udp}",
        gen.rules().len(),
        allocations.len()
    )
}
