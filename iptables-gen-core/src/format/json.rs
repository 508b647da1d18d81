use serde::Serialize;

use crate::allocator::Allocation;
use crate::generator::RuleGenerator;

/// Machine-readable view of a built generator.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptReport {
    pub wan_interface: String,
    pub lan_interface: String,
    pub rules: usize,
    pub allocations: Vec<Allocation>,
    pub script: String,
}

impl ScriptReport {
    pub fn from_generator(gen: &RuleGenerator) -> Self {
        Self {
            wan_interface: gen.config().wan_interface().to_string(),
            lan_interface: gen.config().lan_interface().to_string(),
            rules: gen.rules().len(),
            allocations: gen.allocations(),
            script: gen.render(),
        }
    }
}

/// Format a generator's allocations and rendered script as JSON.
pub fn format_json(gen: &RuleGenerator) -> String {
    serde_json::to_string_pretty(&ScriptReport::from_generator(gen))
        .unwrap_or_else(|_| "{}".to_string())
}
