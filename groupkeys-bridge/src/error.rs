use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
