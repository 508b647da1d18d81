use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::protocol::Protocol;

/// A single port or an inclusive port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PortSpec {
    Single { port: u16 },
    Range { start: u16, end: u16 },
}

impl PortSpec {
    /// Destination half of a DNAT `--to-destination` value, e.g. `5000-5002`.
    pub fn nat_suffix(&self) -> String {
        match self {
            PortSpec::Single { port } => port.to_string(),
            PortSpec::Range { start, end } => format!("{start}-{end}"),
        }
    }
}

/// Match syntax used by `--dport`, e.g. `5000:5002`.
impl Display for PortSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Single { port } => write!(f, "{port}"),
            PortSpec::Range { start, end } => write!(f, "{start}:{end}"),
        }
    }
}

/// One `--flag value...` pair of a command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Arg {
    flag: &'static str,
    values: Vec<String>,
}

/// A structured iptables invocation, serialized only when rendered.
///
/// Arguments keep insertion order, which is the order they are written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Command {
    args: Vec<Arg>,
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a flag with any number of values (zero for bare flags).
    pub fn arg<I, S>(mut self, flag: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.push(Arg {
            flag,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn flag(self, flag: &'static str) -> Self {
        self.arg(flag, std::iter::empty::<String>())
    }

    pub fn table(self, table: &str) -> Self {
        self.arg("--table", [table])
    }

    pub fn append(self, chain: &str) -> Self {
        self.arg("--append", [chain])
    }

    pub fn policy(self, chain: &str, target: &str) -> Self {
        self.arg("--policy", [chain, target])
    }

    pub fn in_interface(self, interface: &str) -> Self {
        self.arg("--in-interface", [interface])
    }

    pub fn out_interface(self, interface: &str) -> Self {
        self.arg("--out-interface", [interface])
    }

    pub fn destination(self, address: &str) -> Self {
        self.arg("--destination", [address])
    }

    /// `--destination <address>/32`, a single host.
    pub fn destination_host(self, address: &str) -> Self {
        self.arg("--destination", [format!("{address}/32")])
    }

    pub fn protocol(self, protocol: Protocol) -> Self {
        self.arg("--protocol", [protocol.as_str()])
    }

    pub fn dport(self, ports: PortSpec) -> Self {
        self.arg("--dport", [ports.to_string()])
    }

    /// `--match state --state <states>` using connection tracking.
    pub fn state(self, states: &str) -> Self {
        self.arg("--match", ["state"]).arg("--state", [states])
    }

    pub fn jump(self, target: &str) -> Self {
        self.arg("--jump", [target])
    }

    pub fn to_destination(self, address: &str, ports: PortSpec) -> Self {
        self.arg(
            "--to-destination",
            [format!("{address}:{}", ports.nat_suffix())],
        )
    }

    /// Render as one line prefixed with `tool`, arguments separated by single spaces.
    pub fn to_line(&self, tool: &str) -> String {
        let mut line = String::from(tool);
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg.flag);
            for value in &arg.values {
                line.push(' ');
                line.push_str(value);
            }
        }
        line
    }
}
