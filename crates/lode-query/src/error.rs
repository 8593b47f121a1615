use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unsupported asset {0}")]
    UnsupportedAsset(String),

    #[error("redux error: {0}")]
    Redux(#[from] lode_redux::ReduxError),

    #[error("fabric error: {0}")]
    Fabric(#[from] lode_fabric::FabricError),
}

pub type QueryResult<T> = Result<T, QueryError>;
