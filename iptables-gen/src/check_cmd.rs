use anyhow::{bail, Context, Result};
use iptables_gen::check::{build_check_report, render_check_text};
use iptables_gen::plan::load_plan;

use crate::cli::{CheckArgs, OutputFormat};

pub fn run_check(args: CheckArgs, verbose: bool) -> Result<()> {
    let plan = load_plan(&args.plan)
        .with_context(|| format!("failed to load plan {}", args.plan.display()))?;
    let source = format!("file:{}", args.plan.display());
    let report = build_check_report(&plan, &args.gateway.to_section(), &source)
        .context("failed to read gateway settings")?;

    match args.format {
        OutputFormat::Text => println!("{}", render_check_text(&report, verbose)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.errors > 0 {
        bail!("check failed: {} errors", report.errors);
    }
    Ok(())
}
