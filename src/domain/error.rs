use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("thread id must not be empty")]
    InvalidThreadId,
    #[error("message id must not be empty")]
    InvalidMessageId,
}

/// Rejects empty or whitespace-only thread identifiers.
pub fn validate_thread_id(thread_id: &str) -> Result<&str, DomainError> {
    if thread_id.trim().is_empty() {
        return Err(DomainError::InvalidThreadId);
    }
    Ok(thread_id)
}

/// Rejects empty or whitespace-only message identifiers.
pub fn validate_message_id(message_id: &str) -> Result<&str, DomainError> {
    if message_id.trim().is_empty() {
        return Err(DomainError::InvalidMessageId);
    }
    Ok(message_id)
}
