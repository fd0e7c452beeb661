//! LMDB implementation of `AccountStore`.

use std::ops::Bound;

use lattice_store::{AccountRecord, AccountStore, StoreError};
use lattice_types::Address;

use crate::{LmdbEnvironment, LmdbError};

#[derive(Clone)]
pub struct LmdbAccountStore {
    env: LmdbEnvironment,
}

impl LmdbAccountStore {
    pub fn new(env: LmdbEnvironment) -> Self {
        Self { env }
    }
}

impl AccountStore for LmdbAccountStore {
    fn upsert_accounts(&self, batch: &[AccountRecord]) -> Result<(), StoreError> {
        let mut wtxn = self.env.env.write_txn().map_err(LmdbError::from)?;
        for record in batch {
            self.env
                .accounts_db
                .put(&mut wtxn, record.address.as_str(), record)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_account(&self, address: &Address) -> Result<Option<AccountRecord>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let record = self
            .env
            .accounts_db
            .get(&rtxn, address.as_str())
            .map_err(LmdbError::from)?;
        Ok(record)
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let len = self.env.accounts_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(len)
    }

    fn accounts_after(
        &self,
        cursor: Option<&Address>,
        limit: usize,
    ) -> Result<Vec<AccountRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::with_capacity(limit.min(1024));

        match cursor {
            Some(addr) => {
                let range = (Bound::Excluded(addr.as_str()), Bound::<&str>::Unbounded);
                for entry in self
                    .env
                    .accounts_db
                    .range(&rtxn, &range)
                    .map_err(LmdbError::from)?
                {
                    let (_, record) = entry.map_err(LmdbError::from)?;
                    out.push(record);
                    if out.len() >= limit {
                        break;
                    }
                }
            }
            None => {
                for entry in self.env.accounts_db.iter(&rtxn).map_err(LmdbError::from)? {
                    let (_, record) = entry.map_err(LmdbError::from)?;
                    out.push(record);
                    if out.len() >= limit {
                        break;
                    }
                }
            }
        }

        Ok(out)
    }
}
