//! Block type/subtype enums and counterparty derivation.
//!
//! Legacy chains carry dedicated open/receive/send/change block types;
//! modern chains use a single `state` type whose operation is reported as a
//! subtype. Which wire field names the counterparty (the "other" account a
//! block interacts with) depends on that {type, subtype} combination, so
//! the mapping lives here as one exhaustive match instead of being
//! re-derived by every consumer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::BURN_ADDRESS;
use crate::Address;

/// Block type as reported by `blocks_info`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    State,
    Open,
    Receive,
    Send,
    Change,
    Epoch,
}

/// Block subtype; only meaningful for [`BlockType::State`] blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSubtype {
    Open,
    Receive,
    Send,
    Change,
    Epoch,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::State => "state",
            BlockType::Open => "open",
            BlockType::Receive => "receive",
            BlockType::Send => "send",
            BlockType::Change => "change",
            BlockType::Epoch => "epoch",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockType {
    type Err = crate::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "state" => Ok(BlockType::State),
            "open" => Ok(BlockType::Open),
            "receive" => Ok(BlockType::Receive),
            "send" => Ok(BlockType::Send),
            "change" => Ok(BlockType::Change),
            "epoch" => Ok(BlockType::Epoch),
            other => Err(crate::DecodeError::InvalidBlockKind(format!(
                "unknown block type {other:?}"
            ))),
        }
    }
}

impl BlockSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockSubtype::Open => "open",
            BlockSubtype::Receive => "receive",
            BlockSubtype::Send => "send",
            BlockSubtype::Change => "change",
            BlockSubtype::Epoch => "epoch",
        }
    }
}

impl fmt::Display for BlockSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockSubtype {
    type Err = crate::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(BlockSubtype::Open),
            "receive" => Ok(BlockSubtype::Receive),
            "send" => Ok(BlockSubtype::Send),
            "change" => Ok(BlockSubtype::Change),
            "epoch" => Ok(BlockSubtype::Epoch),
            other => Err(crate::DecodeError::InvalidBlockKind(format!(
                "unknown block subtype {other:?}"
            ))),
        }
    }
}

/// The logical operation a block performs, resolved from {type, subtype}.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Open,
    Receive,
    Send,
    Change,
    Epoch,
}

fn operation(block_type: BlockType, subtype: Option<BlockSubtype>) -> Option<Operation> {
    match block_type {
        BlockType::Open => Some(Operation::Open),
        BlockType::Receive => Some(Operation::Receive),
        BlockType::Send => Some(Operation::Send),
        BlockType::Change => Some(Operation::Change),
        BlockType::Epoch => Some(Operation::Epoch),
        BlockType::State => subtype.map(|s| match s {
            BlockSubtype::Open => Operation::Open,
            BlockSubtype::Receive => Operation::Receive,
            BlockSubtype::Send => Operation::Send,
            BlockSubtype::Change => Operation::Change,
            BlockSubtype::Epoch => Operation::Epoch,
        }),
    }
}

/// Wire fields a counterparty can be read from, as returned by
/// `blocks_info` (top-level `source_account` plus block contents).
#[derive(Clone, Copy, Debug, Default)]
pub struct CounterpartyFields<'a> {
    /// Top-level `source_account`; `"0"` when the node has no source.
    pub source_account: Option<&'a str>,
    /// `link_as_account` from state block contents.
    pub link_as_account: Option<&'a str>,
    /// `destination` from legacy send block contents.
    pub destination: Option<&'a str>,
    /// `representative` from the block contents.
    pub representative: Option<&'a str>,
}

/// Derive the counterparty account for a block.
///
/// open/receive → the sending account; send → the destination (a
/// `link_as_account` equal to the burn address means the link field was not
/// an account); change → the new representative; epoch → none.
pub fn counterparty_account(
    block_type: BlockType,
    subtype: Option<BlockSubtype>,
    fields: &CounterpartyFields<'_>,
) -> Option<Address> {
    let op = operation(block_type, subtype)?;
    let picked = match op {
        Operation::Open | Operation::Receive => {
            fields.source_account.filter(|s| *s != "0")
        }
        Operation::Send => fields
            .link_as_account
            .filter(|s| *s != BURN_ADDRESS)
            .or(fields.destination),
        Operation::Change => fields.representative,
        Operation::Epoch => None,
    };
    picked.map(Address::from)
}
