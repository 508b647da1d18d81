use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::allocator::AllocationError;

/// Protocol used when an intent does not name one.
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Transport protocol a port can be claimed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Name as written on the iptables command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = AllocationError;

    /// Only the exact lowercase names are accepted, matching what iptables is given.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(AllocationError::InvalidProtocol(other.to_string())),
        }
    }
}
