// SPDX-License-Identifier: MIT OR Apache-2.0
//! Positional port labels and per-port connection lists.

use crate::link::{IncomingLink, OutgoingLink};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Which side of a node a port sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortKind {
    /// Input port (left side, receives connections)
    Input,
    /// Output port (right side, originates connections)
    Output,
}

impl PortKind {
    /// The label prefix used in the wire format (`input` / `output`)
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// A positional port label such as `input_1` or `output_3`.
///
/// Labels are contiguous and order-significant: indices are 1-based and
/// removing a port shifts every higher-numbered port down by one. The label
/// is the join key connection endpoints reference, and serializes as its
/// display form so the snapshot format stays `"input_1": {...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId {
    /// Port side
    pub kind: PortKind,
    /// 1-based position among ports of the same kind
    pub index: u32,
}

impl PortId {
    /// Label for the n-th input port (1-based)
    pub fn input(index: u32) -> Self {
        Self {
            kind: PortKind::Input,
            index,
        }
    }

    /// Label for the n-th output port (1-based)
    pub fn output(index: u32) -> Self {
        Self {
            kind: PortKind::Output,
            index,
        }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.index)
    }
}

/// Error parsing a port label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid port label: {0:?}")]
pub struct ParsePortIdError(pub String);

impl FromStr for PortId {
    type Err = ParsePortIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, index) = s.split_once('_').ok_or_else(|| ParsePortIdError(s.into()))?;
        let kind = match prefix {
            "input" => PortKind::Input,
            "output" => PortKind::Output,
            _ => return Err(ParsePortIdError(s.into())),
        };
        let index: u32 = index.parse().map_err(|_| ParsePortIdError(s.into()))?;
        if index == 0 {
            return Err(ParsePortIdError(s.into()));
        }
        Ok(Self { kind, index })
    }
}

impl Serialize for PortId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PortId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(D::Error::custom)
    }
}

/// An input port: the mirror records of every connection arriving here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputPort {
    /// Incoming endpoint records, one per connection
    pub connections: Vec<IncomingLink>,
}

/// An output port: the authoritative records of every connection leaving here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputPort {
    /// Outgoing endpoint records, one per connection (reroute points live here)
    pub connections: Vec<OutgoingLink>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        let id = PortId::input(3);
        assert_eq!(id.to_string(), "input_3");
        assert_eq!("input_3".parse::<PortId>().unwrap(), id);

        let id = PortId::output(12);
        assert_eq!(id.to_string(), "output_12");
        assert_eq!("output_12".parse::<PortId>().unwrap(), id);
    }

    #[test]
    fn test_label_rejects_malformed() {
        assert!("input".parse::<PortId>().is_err());
        assert!("input_0".parse::<PortId>().is_err());
        assert!("input_x".parse::<PortId>().is_err());
        assert!("middle_1".parse::<PortId>().is_err());
    }

    #[test]
    fn test_label_serializes_as_string() {
        let json = serde_json::to_string(&PortId::output(2)).unwrap();
        assert_eq!(json, "\"output_2\"");
        let back: PortId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PortId::output(2));
    }
}
