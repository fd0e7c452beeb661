//! Wire DTOs for the node's JSON RPC responses, plus conversion into the
//! store record types.
//!
//! The node serialises every numeric field as a decimal string, so DTOs
//! keep strings and the conversion functions parse them; a field that fails
//! to parse surfaces as [`RpcError::Malformed`] for that call.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use lattice_store::{AccountRecord, BlockRecord, ElectionInfo};
use lattice_types::{
    counterparty_account, Address, BlockHash, BlockSubtype, BlockType, CounterpartyFields,
    RawAmount, Timestamp,
};

use crate::RpcError;

fn malformed(field: &str, value: &str) -> RpcError {
    RpcError::Malformed(format!("bad {field}: {value:?}"))
}

fn parse_u64(field: &str, value: &str) -> Result<u64, RpcError> {
    value.parse().map_err(|_| malformed(field, value))
}

fn parse_amount(field: &str, value: &str) -> Result<RawAmount, RpcError> {
    value.parse().map_err(|_| malformed(field, value))
}

fn parse_hash(field: &str, value: &str) -> Result<BlockHash, RpcError> {
    BlockHash::from_hex(value).map_err(|_| malformed(field, value))
}

/// `frontier_count` response.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontierCountDto {
    pub count: String,
}

/// `chain` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainDto {
    #[serde(default)]
    pub blocks: Vec<String>,
}

/// Per-account body shared by `account_info` and the entries of `ledger`.
/// The `ledger` action omits the confirmation fields, so they are optional
/// here and default to zero in the record.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoDto {
    pub frontier: String,
    pub open_block: String,
    pub representative_block: String,
    pub balance: String,
    pub modified_timestamp: String,
    pub block_count: String,
    #[serde(default)]
    pub representative: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub pending: Option<String>,
    #[serde(default)]
    pub confirmation_height: Option<String>,
    #[serde(default)]
    pub confirmation_height_frontier: Option<String>,
}

pub type LedgerAccountDto = AccountInfoDto;

/// `ledger` response: accounts keyed by address, in address order.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerDto {
    #[serde(default)]
    pub accounts: BTreeMap<String, LedgerAccountDto>,
}

impl AccountInfoDto {
    /// Build the stored account record for `address`.
    pub fn to_record(&self, address: &Address) -> Result<AccountRecord, RpcError> {
        let key = address
            .public_key_hex()
            .map_err(|e| RpcError::Malformed(e.to_string()))?;
        Ok(AccountRecord {
            address: address.clone(),
            key,
            frontier: parse_hash("frontier", &self.frontier)?,
            open_block: parse_hash("open_block", &self.open_block)?,
            representative_block: parse_hash("representative_block", &self.representative_block)?,
            balance: parse_amount("balance", &self.balance)?,
            modified_timestamp: Timestamp::new(parse_u64(
                "modified_timestamp",
                &self.modified_timestamp,
            )?),
            block_count: parse_u64("block_count", &self.block_count)?,
            confirmation_height: match &self.confirmation_height {
                Some(h) => parse_u64("confirmation_height", h)?,
                None => 0,
            },
            confirmation_height_frontier: match &self.confirmation_height_frontier {
                Some(h) => parse_hash("confirmation_height_frontier", h)?,
                None => BlockHash::ZERO,
            },
            representative: self.representative.as_deref().map(Address::from),
            weight: self
                .weight
                .as_deref()
                .map(|w| parse_amount("weight", w))
                .transpose()?,
            pending: self
                .pending
                .as_deref()
                .map(|p| parse_amount("pending", p))
                .transpose()?,
        })
    }
}

/// Inner `contents` object of a `blocks_info` entry (`json_block` form).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockContentsDto {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub representative: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub link_as_account: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub work: Option<String>,
}

/// One entry of a `blocks_info` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfoDto {
    #[serde(default)]
    pub block_account: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub balance: Option<String>,
    pub height: String,
    pub local_timestamp: String,
    pub confirmed: String,
    pub contents: BlockContentsDto,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub source_account: Option<String>,
}

/// `blocks_info` response (`include_not_found` form).
#[derive(Debug, Clone, Deserialize)]
pub struct BlocksInfoDto {
    #[serde(default)]
    pub blocks: HashMap<String, BlockInfoDto>,
    #[serde(default)]
    pub blocks_not_found: Vec<String>,
}

impl BlockInfoDto {
    /// Build the stored block record for `hash`.
    ///
    /// `election` carries metadata captured off the realtime feed for this
    /// hash; the RPC path passes `None`.
    pub fn to_record(
        &self,
        hash: &BlockHash,
        election: Option<ElectionInfo>,
    ) -> Result<BlockRecord, RpcError> {
        let block_type: BlockType = self
            .contents
            .block_type
            .parse()
            .map_err(|_| malformed("type", &self.contents.block_type))?;
        let subtype: Option<BlockSubtype> = self
            .subtype
            .as_deref()
            .map(|s| s.parse().map_err(|_| malformed("subtype", s)))
            .transpose()?;

        let account = self
            .contents
            .account
            .as_deref()
            .or(self.block_account.as_deref())
            .ok_or_else(|| malformed("account", "<missing>"))?;

        let previous = match self.contents.previous.as_deref() {
            Some(p) => parse_hash("previous", p)?,
            None => BlockHash::ZERO,
        };

        let link = self
            .contents
            .link
            .clone()
            .or_else(|| self.contents.destination.clone())
            .or_else(|| self.contents.source.clone());

        let counterparty = counterparty_account(
            block_type,
            subtype,
            &CounterpartyFields {
                source_account: self.source_account.as_deref(),
                link_as_account: self.contents.link_as_account.as_deref(),
                destination: self.contents.destination.as_deref(),
                representative: self.contents.representative.as_deref(),
            },
        );

        Ok(BlockRecord {
            hash: *hash,
            account: Address::from(account),
            height: parse_u64("height", &self.height)?,
            previous,
            link,
            counterparty,
            amount: self
                .amount
                .as_deref()
                .map(|a| parse_amount("amount", a))
                .transpose()?,
            balance: self
                .balance
                .as_deref()
                .map(|b| parse_amount("balance", b))
                .transpose()?,
            block_type,
            subtype,
            local_timestamp: Timestamp::new(parse_u64(
                "local_timestamp",
                &self.local_timestamp,
            )?),
            confirmed: self.confirmed == "true",
            signature: self.contents.signature.clone(),
            work: self.contents.work.clone(),
            election,
        })
    }
}
