//! Status id conversion for the `reserve_project_statuses` lookup table.

use lpms_core::error::CoreError;
use lpms_core::reserve::ReserveStatus;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Decode a stored status id. An id outside the seed data means the row
/// cannot be represented in the domain.
pub fn decode_status(id: StatusId) -> Result<ReserveStatus, CoreError> {
    ReserveStatus::from_id(id)
        .ok_or_else(|| CoreError::Unmarshal(format!("Unknown reserve project status id {id}")))
}
