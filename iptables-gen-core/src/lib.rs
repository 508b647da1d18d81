//! Port allocation and ordered iptables rule generation for a WAN/LAN gateway.
//!
//! A [`RuleGenerator`] collects three kinds of intent (open a host port,
//! forward one port, forward a port range) and renders them inside a fixed
//! default-deny frame. Every intent claims its WAN `(port, protocol)` pairs
//! from a [`PortAllocator`] first, so conflicting rules are rejected before
//! any command is emitted.
//!
//! ```
//! use iptables_gen_core::{GatewayConfig, RuleGenerator};
//!
//! let config = GatewayConfig::new("8.8.8.8", "enp7s0", "192.168.0.1", "enp7s1")?;
//! let mut gen = RuleGenerator::new(config);
//! gen.open_port(22, "tcp")?;
//! gen.forward_port(2222, "192.168.0.2", 22, "tcp")?;
//! assert!(gen.open_port(2222, "tcp").is_err());
//!
//! let script = gen.render();
//! assert!(script.ends_with("--jump MASQUERADE\n"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod allocator;
pub mod command;
pub mod config;
pub mod format;
pub mod generator;
pub mod protocol;
pub mod render;

pub use allocator::{Allocation, AllocationError, PortAllocator};
pub use command::{Command, PortSpec};
pub use config::{ConfigError, GatewayConfig, DEFAULT_TOOL};
pub use format::{format_allocations, format_json, format_summary, ScriptReport};
pub use generator::RuleGenerator;
pub use protocol::{Protocol, DEFAULT_PROTOCOL};
pub use render::render_script;
