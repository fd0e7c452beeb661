//! LMDB implementation of `BlockStore`.

use lattice_store::{BlockRecord, BlockStore, StoreError};
use lattice_types::{Address, BlockHash};

use crate::environment::{account_prefix, height_key};
use crate::{LmdbEnvironment, LmdbError};

#[derive(Clone)]
pub struct LmdbBlockStore {
    env: LmdbEnvironment,
}

impl LmdbBlockStore {
    pub fn new(env: LmdbEnvironment) -> Self {
        Self { env }
    }
}

impl BlockStore for LmdbBlockStore {
    fn upsert_blocks(&self, batch: &[BlockRecord]) -> Result<(), StoreError> {
        tracing::trace!(count = batch.len(), "upserting block batch");
        let mut wtxn = self.env.env.write_txn().map_err(LmdbError::from)?;

        for incoming in batch {
            let key = incoming.hash.as_bytes().as_slice();
            let merged = match self
                .env
                .blocks_db
                .get(&wtxn, key)
                .map_err(LmdbError::from)?
            {
                Some(existing) => {
                    // A merge can move a block's height or owner (the remote
                    // is authoritative); drop the stale index entry first.
                    if existing.height != incoming.height || existing.account != incoming.account
                    {
                        self.env
                            .heights_db
                            .delete(&mut wtxn, &height_key(&existing.account, existing.height))
                            .map_err(LmdbError::from)?;
                    }
                    BlockRecord::merged(&existing, incoming)
                }
                None => incoming.clone(),
            };

            self.env
                .heights_db
                .put(&mut wtxn, &height_key(&merged.account, merged.height), key)
                .map_err(LmdbError::from)?;
            self.env
                .blocks_db
                .put(&mut wtxn, key, &merged)
                .map_err(LmdbError::from)?;
        }

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_block(&self, hash: &BlockHash) -> Result<Option<BlockRecord>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let block = self
            .env
            .blocks_db
            .get(&rtxn, hash.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        Ok(block)
    }

    fn block_at_height(
        &self,
        account: &Address,
        height: u64,
    ) -> Result<Option<BlockRecord>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let hash_bytes = match self
            .env
            .heights_db
            .get(&rtxn, &height_key(account, height))
            .map_err(LmdbError::from)?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let hash: [u8; 32] = hash_bytes.try_into().map_err(|_| {
            StoreError::Corruption(format!(
                "heights entry for {account} at {height} is not a 32-byte hash"
            ))
        })?;
        let block = self
            .env
            .blocks_db
            .get(&rtxn, hash.as_slice())
            .map_err(LmdbError::from)?;
        Ok(block)
    }

    fn count_for_account(&self, account: &Address) -> Result<u64, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let prefix = account_prefix(account);
        let iter = self
            .env
            .heights_db
            .prefix_iter(&rtxn, prefix.as_slice())
            .map_err(LmdbError::from)?;
        let mut count = 0u64;
        for entry in iter {
            entry.map_err(LmdbError::from)?;
            count += 1;
        }
        Ok(count)
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let len = self.env.blocks_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(len)
    }
}
