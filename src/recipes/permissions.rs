use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Author-or-read-only: anyone may read, only the author may write.
pub fn authorize(current: Option<Uuid>, access: Access, author_id: Uuid) -> Result<(), ApiError> {
    match (access, current) {
        (Access::Read, _) => Ok(()),
        (Access::Write, None) => Err(ApiError::unauthorized(
            "Authentication credentials were not provided.",
        )),
        (Access::Write, Some(id)) if id == author_id => Ok(()),
        (Access::Write, Some(_)) => Err(ApiError::Forbidden),
    }
}
