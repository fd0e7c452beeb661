use lattice_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("lmdb error: {0}")]
    Heed(#[from] heed::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Heed(heed::Error::Decoding(inner)) => {
                StoreError::Serialization(inner.to_string())
            }
            LmdbError::Heed(heed::Error::Encoding(inner)) => {
                StoreError::Serialization(inner.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}
