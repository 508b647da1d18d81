//! Parsers for rules given on the command line.
//!
//! - `--open PORT[/PROTO]`
//! - `--forward PORT:IP:PORT[/PROTO]`
//! - `--forward-range IP:START-END[/PROTO]`
//!
//! The protocol is passed through unchecked; the generator rejects unknown
//! names the same way it does for plan files.

use iptables_gen_core::DEFAULT_PROTOCOL;
use thiserror::Error;

use crate::plan::RuleSpec;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleArgError {
    #[error("expected {expected}, got '{raw}'")]
    Shape { expected: &'static str, raw: String },
    #[error("invalid port '{0}'")]
    Port(String),
}

pub fn parse_open(raw: &str) -> Result<RuleSpec, RuleArgError> {
    let (body, protocol) = split_protocol(raw);
    Ok(RuleSpec::Open {
        port: parse_port(body)?,
        protocol,
    })
}

pub fn parse_forward(raw: &str) -> Result<RuleSpec, RuleArgError> {
    let shape = || RuleArgError::Shape {
        expected: "PORT:IP:PORT[/PROTO]",
        raw: raw.to_string(),
    };
    let (body, protocol) = split_protocol(raw);
    // Split on the outer colons so IPv6 addresses survive.
    let (port, rest) = body.split_once(':').ok_or_else(shape)?;
    let (to_ip, to_port) = rest.rsplit_once(':').ok_or_else(shape)?;
    if to_ip.is_empty() {
        return Err(shape());
    }
    Ok(RuleSpec::Forward {
        port: parse_port(port)?,
        to_ip: to_ip.to_string(),
        to_port: parse_port(to_port)?,
        protocol,
    })
}

pub fn parse_forward_range(raw: &str) -> Result<RuleSpec, RuleArgError> {
    let shape = || RuleArgError::Shape {
        expected: "IP:START-END[/PROTO]",
        raw: raw.to_string(),
    };
    let (body, protocol) = split_protocol(raw);
    let (to_ip, range) = body.rsplit_once(':').ok_or_else(shape)?;
    let (start, end) = range.split_once('-').ok_or_else(shape)?;
    if to_ip.is_empty() {
        return Err(shape());
    }
    Ok(RuleSpec::ForwardRange {
        to_ip: to_ip.to_string(),
        start: parse_port(start)?,
        end: parse_port(end)?,
        protocol,
    })
}

fn split_protocol(raw: &str) -> (&str, String) {
    match raw.rsplit_once('/') {
        Some((body, protocol)) => (body, protocol.to_string()),
        None => (raw, DEFAULT_PROTOCOL.to_string()),
    }
}

fn parse_port(raw: &str) -> Result<u16, RuleArgError> {
    raw.trim()
        .parse()
        .map_err(|_| RuleArgError::Port(raw.to_string()))
}
