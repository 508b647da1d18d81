use std::fs;

use anyhow::{Context, Result};
use iptables_gen::plan::{build_generator, load_plan, Plan};
use iptables_gen_core::format_json;
use tracing::info;

use crate::cli::{GenerateArgs, OutputFormat};
use crate::path_guard;

const SHEBANG: &str = "#!/bin/bash\n";

pub fn run_generate(args: GenerateArgs) -> Result<()> {
    let plan = match &args.plan {
        Some(path) => {
            load_plan(path).with_context(|| format!("failed to load plan {}", path.display()))?
        }
        None => Plan::default(),
    };

    let gen = build_generator(&plan, &args.gateway.to_section(), &args.extra_rules())
        .context("failed to build firewall rules")?;

    let body = match args.format {
        OutputFormat::Text if args.no_shebang => gen.render(),
        OutputFormat::Text => format!("{SHEBANG}{}", gen.render()),
        OutputFormat::Json => format!("{}\n", format_json(&gen)),
    };

    match &args.output {
        Some(out_path) => {
            if let Some(plan_path) = &args.plan {
                path_guard::refuse_plan_overwrite(out_path, plan_path)?;
            }
            fs::write(out_path, body)
                .with_context(|| format!("failed to write script {}", out_path.display()))?;
            info!(
                path = %out_path.display(),
                commands = gen.rules().len(),
                "wrote firewall script"
            );
        }
        None => print!("{body}"),
    }

    Ok(())
}
