use crate::schema::Collection;

/// Rejections of record edits
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Id {id} is already used in {collection}")]
    DuplicateId { collection: Collection, id: u64 },

    #[error("{entity} #{id} is already paid")]
    AlreadyPaid { entity: &'static str, id: u64 },

    #[error("{entity} #{id} is not paid")]
    NotPaid { entity: &'static str, id: u64 },
}
