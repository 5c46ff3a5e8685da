use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JustificationCategory {
    Medical,
    Personal,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JustificationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JustificationPriority {
    Normal,
    High,
}

impl JustificationPriority {
    pub fn for_category(category: JustificationCategory) -> Self {
        match category {
            JustificationCategory::Medical => JustificationPriority::High,
            JustificationCategory::Personal | JustificationCategory::Other => {
                JustificationPriority::Normal
            }
        }
    }
}

/// Outcome a reviewer can give a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOutcome {
    Approved,
    Rejected,
}

impl From<DecisionOutcome> for JustificationStatus {
    fn from(outcome: DecisionOutcome) -> Self {
        match outcome {
            DecisionOutcome::Approved => JustificationStatus::Approved,
            DecisionOutcome::Rejected => JustificationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 12,
    "person_id": 1000,
    "attendance_record_id": 1,
    "start_date": "2026-03-02",
    "end_date": "2026-03-02",
    "reason": "Medical appointment",
    "category": "medical",
    "evidence_reference": "uploads/certificate-12.pdf",
    "priority": "high",
    "status": "pending",
    "reviewer_id": null,
    "reviewer_comment": null,
    "decision_at": null,
    "created_at": "2026-03-02T15:00:00Z"
}))]
pub struct JustificationRequest {
    pub id: u64,
    pub person_id: u64,

    /// Absent when justifying a day without an attendance record
    pub attendance_record_id: Option<u64>,

    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,

    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,

    pub reason: String,
    pub category: JustificationCategory,
    pub evidence_reference: Option<String>,
    pub priority: JustificationPriority,
    pub status: JustificationStatus,
    pub reviewer_id: Option<u64>,
    pub reviewer_comment: Option<String>,

    #[schema(format = "date-time", value_type = Option<String>)]
    pub decision_at: Option<DateTime<Utc>>,

    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl JustificationRequest {
    pub fn is_pending(&self) -> bool {
        self.status == JustificationStatus::Pending
    }

    /// Inclusive date-range intersection.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}
