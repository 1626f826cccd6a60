use thiserror::Error;

/// Fatal at startup. Nothing runs with a partial configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Upstream social API failure during a triggered cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to resolve authenticated user: {0}")]
    Identity(anyhow::Error),
    #[error("failed to list liked posts: {0}")]
    Listing(anyhow::Error),
}

/// SMTP delivery failure. Logged, never fatal to the loop.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build digest message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport failure: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Everything a triggered cycle can fail with. The scheduler logs the
/// variant and keeps running; the buffer is cleared either way.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("unexpected cycle failure: {0}")]
    Unexpected(anyhow::Error),
}

impl CycleError {
    /// Classify a collaborator error into the cycle taxonomy.
    pub fn classify(err: anyhow::Error) -> Self {
        match err.downcast::<DeliveryError>() {
            Ok(delivery) => CycleError::Delivery(delivery),
            Err(err) => match err.downcast::<FetchError>() {
                Ok(fetch) => CycleError::Fetch(fetch),
                Err(other) => CycleError::Unexpected(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_delivery_errors() {
        let err = anyhow::Error::new(DeliveryError::Address(
            "not-an-address".parse::<lettre::Address>().unwrap_err(),
        ));
        assert!(matches!(CycleError::classify(err), CycleError::Delivery(_)));
    }

    #[test]
    fn classify_falls_back_to_unexpected() {
        let err = anyhow::anyhow!("collaborator exploded");
        assert!(matches!(
            CycleError::classify(err),
            CycleError::Unexpected(_)
        ));
    }
}
