//! Change history operation kinds.

use serde::{Deserialize, Serialize};

/// The mutation that produced a change history record.
///
/// Inserts are never recorded, so only updates and deletions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "registry.history_operation"))]
pub enum HistoryOperation {
    /// The customer row was updated.
    #[serde(rename = "ALTERACAO")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "ALTERACAO"))]
    Update,
    /// The customer row was deleted.
    #[serde(rename = "REMOCAO")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "REMOCAO"))]
    Delete,
}

impl HistoryOperation {
    /// The persisted name of this operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "ALTERACAO",
            Self::Delete => "REMOCAO",
        }
    }
}

impl std::fmt::Display for HistoryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
