//! LMDB environment setup.

use std::path::Path;

use heed::types::{Bytes, SerdeBincode, Str};
use heed::{Database, Env, EnvOpenOptions};

use lattice_store::{AccountRecord, BlockRecord, StoreError};
use lattice_types::Address;

use crate::{LmdbAccountStore, LmdbBlockStore, LmdbError};

/// Number of named databases the environment hosts.
const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
///
/// Cloning is cheap (the underlying `Env` is reference-counted and the
/// database handles are `Copy`), so components can each hold their own copy.
#[derive(Clone)]
pub struct LmdbEnvironment {
    pub(crate) env: Env,
    /// hash → block record.
    pub(crate) blocks_db: Database<Bytes, SerdeBincode<BlockRecord>>,
    /// address ++ 0x00 ++ big-endian height → hash. Lets per-account counts
    /// and height lookups run as prefix scans instead of full-table scans.
    pub(crate) heights_db: Database<Bytes, Bytes>,
    /// address → account record.
    pub(crate) accounts_db: Database<Str, SerdeBincode<AccountRecord>>,
    /// Small key/value space for operational markers.
    pub(crate) meta_db: Database<Str, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(LmdbError::from)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)
                .map_err(LmdbError::from)?
        };

        let mut wtxn = env.write_txn().map_err(LmdbError::from)?;
        let blocks_db = env
            .create_database(&mut wtxn, Some("blocks"))
            .map_err(LmdbError::from)?;
        let heights_db = env
            .create_database(&mut wtxn, Some("heights"))
            .map_err(LmdbError::from)?;
        let accounts_db = env
            .create_database(&mut wtxn, Some("accounts"))
            .map_err(LmdbError::from)?;
        let meta_db = env
            .create_database(&mut wtxn, Some("meta"))
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        Ok(Self {
            env,
            blocks_db,
            heights_db,
            accounts_db,
            meta_db,
        })
    }

    /// Block store view over this environment.
    pub fn block_store(&self) -> LmdbBlockStore {
        LmdbBlockStore::new(self.clone())
    }

    /// Account store view over this environment.
    pub fn account_store(&self) -> LmdbAccountStore {
        LmdbAccountStore::new(self.clone())
    }
}

/// Composite key for the heights database. The 0x00 separator keeps one
/// account's entries from matching another account's prefix scan even if
/// one address string were a prefix of another.
pub(crate) fn height_key(account: &Address, height: u64) -> Vec<u8> {
    let addr = account.as_str().as_bytes();
    let mut key = Vec::with_capacity(addr.len() + 1 + 8);
    key.extend_from_slice(addr);
    key.push(0);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// Prefix covering every heights entry of one account.
pub(crate) fn account_prefix(account: &Address) -> Vec<u8> {
    let addr = account.as_str().as_bytes();
    let mut prefix = Vec::with_capacity(addr.len() + 1);
    prefix.extend_from_slice(addr);
    prefix.push(0);
    prefix
}
