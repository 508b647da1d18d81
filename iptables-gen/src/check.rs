//! Dry-run validation of a plan.
//!
//! Unlike [`crate::plan::build_generator`], a check keeps going after a rule
//! fails so every conflict in the plan is reported at once. A failed rule
//! emits no commands, though a failed range keeps the ports it claimed before
//! the conflict, which can cause later rules to fail as well.

use colored::Colorize;
use iptables_gen_core::{format_allocations, format_summary, Allocation, RuleGenerator};
use serde::Serialize;

use crate::plan::{GatewaySection, Plan, PlanBuildError};

#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub index: usize,
    pub rule: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub source: String,
    pub wan_interface: String,
    pub lan_interface: String,
    pub outcomes: Vec<RuleOutcome>,
    pub allocations: Vec<Allocation>,
    pub commands: usize,
    pub errors: usize,
    pub summary: String,
}

/// Apply every rule of `plan` and record each outcome.
///
/// Only gateway setting problems abort the check.
pub fn build_check_report(
    plan: &Plan,
    overrides: &GatewaySection,
    source: &str,
) -> Result<CheckReport, PlanBuildError> {
    let config = plan.gateway.merged(overrides).to_config()?;
    let mut gen = RuleGenerator::new(config);

    let outcomes: Vec<RuleOutcome> = plan
        .rules
        .iter()
        .enumerate()
        .map(|(index, rule)| RuleOutcome {
            index,
            rule: rule.to_string(),
            error: rule.apply(&mut gen).err().map(|err| err.to_string()),
        })
        .collect();
    let errors = outcomes.iter().filter(|o| o.error.is_some()).count();

    Ok(CheckReport {
        source: source.to_string(),
        wan_interface: gen.config().wan_interface().to_string(),
        lan_interface: gen.config().lan_interface().to_string(),
        allocations: gen.allocations(),
        commands: gen.rules().len(),
        summary: format_summary(&gen),
        outcomes,
        errors,
    })
}

/// Render a check report for terminal output.
pub fn render_check_text(report: &CheckReport, verbose: bool) -> String {
    let mut out = Vec::new();
    if verbose {
        out.push(format!("Using plan: {}", report.source));
    }
    out.push(format!(
        "gateway wan={} lan={}",
        report.wan_interface, report.lan_interface
    ));
    for outcome in &report.outcomes {
        match &outcome.error {
            None => out.push(format!(
                "{} rule #{} {}",
                "OK".green(),
                outcome.index,
                outcome.rule
            )),
            Some(err) => out.push(format!(
                "{} rule #{} {}: {err}",
                "ERROR".red(),
                outcome.index,
                outcome.rule
            )),
        }
    }
    if verbose {
        out.push(format!("summary {}", report.summary));
    }
    if verbose && !report.allocations.is_empty() {
        out.push("allocations".to_string());
        for line in format_allocations(&report.allocations).lines() {
            out.push(format!("- {line}"));
        }
    }
    let result = format!(
        "result rules={} commands={} allocations={} errors={}",
        report.outcomes.len(),
        report.commands,
        report.allocations.len(),
        report.errors
    );
    out.push(if report.errors > 0 {
        result.red().to_string()
    } else {
        result.cyan().to_string()
    });
    out.join("\n")
}
