use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("no combinations selected")]
    EmptySelection,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("store error: {0}")]
    Store(#[from] reaf_store::StoreError),

    #[error("tree error: {0}")]
    Tree(#[from] reaf_tree::TreeError),

    #[error("engine error: {0}")]
    Engine(#[from] reaf_engine::EngineError),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
