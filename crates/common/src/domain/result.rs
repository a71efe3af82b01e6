use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Reader not registered: {0}")]
    ReaderNotRegistered(String),

    #[error("Reader {0} has no gate assigned")]
    ReaderWithoutGate(String),

    #[error("Gate is inactive: {0}")]
    GateInactive(String),

    #[error("Gate has no configured location: {0}")]
    GateWithoutLocation(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Notification queue is full")]
    NotificationQueueFull,

    #[error("Notification queue is closed")]
    NotificationQueueClosed,

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Invalid tag read payload: {0}")]
    InvalidTagPayload(String),

    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

impl DomainError {
    /// Configuration errors need a human to fix the reader or gate setup, so
    /// retrying the same batch can never succeed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DomainError::ReaderNotRegistered(_)
                | DomainError::ReaderWithoutGate(_)
                | DomainError::GateInactive(_)
                | DomainError::GateWithoutLocation(_)
        )
    }
}
