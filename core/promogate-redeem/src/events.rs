use crate::error::Rejection;
use chrono::{DateTime, Utc};
use promogate_types::CodeType;
use serde::{Deserialize, Serialize};

/// Emitted on every redemption outcome. Never carries plaintext codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RedemptionEvent {
    /// A code was redeemed and the entitlement granted.
    Redeemed {
        code_type: CodeType,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    /// A redemption was refused.
    Rejected { reason: Rejection, at: DateTime<Utc> },
    /// Too many attempts; validation is suspended.
    LockedOut { until: DateTime<Utc> },
    /// A valid redemption was abandoned because the backup write failed.
    PersistenceFailed { code_type: CodeType, at: DateTime<Utc> },
}
