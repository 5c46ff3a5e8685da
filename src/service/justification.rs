use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use super::clock::Clock;
use super::error::ServiceError;
use crate::model::justification::{
    DecisionOutcome, JustificationCategory, JustificationPriority, JustificationRequest,
    JustificationStatus,
};
use crate::repository::{
    AttendanceRepository, JustificationFilter, JustificationRepository, StoreError,
};

pub const DEFAULT_MAX_SPAN_DAYS: i64 = 30;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone)]
pub struct SubmitJustification {
    pub person_id: u64,
    pub attendance_record_id: Option<u64>,
    /// Defaults to the referenced record's date
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: String,
    pub category: JustificationCategory,
    pub evidence_reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub request_id: u64,
    pub reviewer_id: u64,
    pub outcome: DecisionOutcome,
    pub comment: Option<String>,
}

/// Owner's edit of a pending request. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct AmendJustification {
    pub reason: Option<String>,
    pub category: Option<JustificationCategory>,
    pub evidence_reference: Option<String>,
}

/// Who is looking at a request.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub person_id: Option<u64>,
    pub is_reviewer: bool,
}

#[derive(Debug, Clone)]
pub struct JustificationPage {
    pub data: Vec<JustificationRequest>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

pub struct JustificationWorkflow {
    justifications: Arc<dyn JustificationRepository>,
    attendance: Arc<dyn AttendanceRepository>,
    clock: Arc<dyn Clock>,
    max_span_days: i64,
}

impl JustificationWorkflow {
    pub fn new(
        justifications: Arc<dyn JustificationRepository>,
        attendance: Arc<dyn AttendanceRepository>,
        clock: Arc<dyn Clock>,
        max_span_days: i64,
    ) -> Self {
        Self {
            justifications,
            attendance,
            clock,
            max_span_days,
        }
    }

    #[instrument(skip(self, input), fields(person_id = input.person_id, record_id = ?input.attendance_record_id))]
    pub async fn submit(
        &self,
        input: SubmitJustification,
    ) -> Result<JustificationRequest, ServiceError> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::MissingReason);
        }

        let mut record_date = None;
        if let Some(record_id) = input.attendance_record_id {
            let record = self
                .attendance
                .find_by_id(record_id)
                .await?
                .ok_or(ServiceError::RecordNotFound(record_id))?;

            if record.person_id != input.person_id {
                return Err(ServiceError::NotOwner);
            }
            if self
                .justifications
                .find_pending_by_record(record_id)
                .await?
                .is_some()
            {
                return Err(ServiceError::DuplicatePending { record_id });
            }
            record_date = Some(record.date);
        }

        let (start_date, end_date) = self.resolve_period(&input, record_date)?;

        let overlapping = self
            .justifications
            .find_active_overlapping(input.person_id, start_date, end_date)
            .await?;
        if let Some(existing) = overlapping
            .iter()
            .find(|existing| existing.overlaps(start_date, end_date))
        {
            return Err(ServiceError::OverlappingJustification {
                existing_id: existing.id,
            });
        }

        let request = JustificationRequest {
            id: 0,
            person_id: input.person_id,
            attendance_record_id: input.attendance_record_id,
            start_date,
            end_date,
            reason: reason.to_string(),
            category: input.category,
            evidence_reference: input.evidence_reference.filter(|e| !e.trim().is_empty()),
            priority: JustificationPriority::for_category(input.category),
            status: JustificationStatus::Pending,
            reviewer_id: None,
            reviewer_comment: None,
            decision_at: None,
            created_at: self.clock.now(),
        };

        let request = match self.justifications.insert(request).await {
            Ok(request) => request,
            Err(StoreError::Conflict) => {
                return Err(ServiceError::DuplicatePending {
                    record_id: input.attendance_record_id.unwrap_or_default(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!(request_id = request.id, category = %request.category, "Justification submitted");
        Ok(request)
    }

    fn resolve_period(
        &self,
        input: &SubmitJustification,
        record_date: Option<NaiveDate>,
    ) -> Result<(NaiveDate, NaiveDate), ServiceError> {
        let start = input.start_date.or(record_date);
        let end = input.end_date.or(input.start_date).or(record_date);

        let (Some(start), Some(end)) = (start, end) else {
            return Err(ServiceError::InvalidDateRange(
                "start_date is required when no attendance record is referenced".to_string(),
            ));
        };
        if start > end {
            return Err(ServiceError::InvalidDateRange(
                "start_date cannot be after end_date".to_string(),
            ));
        }
        if (end - start).num_days() > self.max_span_days {
            return Err(ServiceError::InvalidDateRange(format!(
                "a justification cannot span more than {} days",
                self.max_span_days
            )));
        }
        if let Some(date) = record_date {
            if date < start || date > end {
                return Err(ServiceError::InvalidDateRange(format!(
                    "the period must include the attendance date {date}"
                )));
            }
        }

        Ok((start, end))
    }

    #[instrument(skip(self, decision), fields(request_id = decision.request_id, reviewer_id = decision.reviewer_id))]
    pub async fn decide(&self, decision: Decision) -> Result<JustificationRequest, ServiceError> {
        let mut request = self
            .justifications
            .find_by_id(decision.request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(decision.request_id))?;

        if !request.is_pending() {
            return Err(ServiceError::AlreadyDecided {
                status: request.status,
            });
        }

        request.status = decision.outcome.into();
        request.reviewer_id = Some(decision.reviewer_id);
        request.reviewer_comment = decision.comment.filter(|c| !c.trim().is_empty());
        request.decision_at = Some(self.clock.now());

        let justify_record = match decision.outcome {
            DecisionOutcome::Approved => request.attendance_record_id,
            DecisionOutcome::Rejected => None,
        };

        match self.justifications.apply_decision(&request, justify_record).await {
            Ok(()) => {}
            Err(StoreError::Missing { id, .. }) => return Err(ServiceError::RecordNotFound(id)),
            Err(StoreError::Stale) => {
                // lost the race to another reviewer
                let status = self
                    .justifications
                    .find_by_id(request.id)
                    .await?
                    .map(|current| current.status)
                    .unwrap_or(request.status);
                return Err(ServiceError::AlreadyDecided { status });
            }
            Err(e) => return Err(e.into()),
        }

        info!(status = %request.status, justified_record = ?justify_record, "Justification decided");
        Ok(request)
    }

    pub async fn get(
        &self,
        request_id: u64,
        viewer: Viewer,
    ) -> Result<JustificationRequest, ServiceError> {
        let request = self
            .justifications
            .find_by_id(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))?;

        if !viewer.is_reviewer && viewer.person_id != Some(request.person_id) {
            return Err(ServiceError::NotOwner);
        }
        Ok(request)
    }

    pub async fn list_for_person(
        &self,
        person_id: u64,
        status: Option<JustificationStatus>,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<JustificationPage, ServiceError> {
        let filter = JustificationFilter {
            status,
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(10).clamp(1, MAX_PER_PAGE),
        };

        let (data, total) = self.justifications.list_for_person(person_id, &filter).await?;

        Ok(JustificationPage {
            data,
            page: filter.page,
            per_page: filter.per_page,
            total,
        })
    }

    #[instrument(skip(self, changes))]
    pub async fn amend(
        &self,
        request_id: u64,
        person_id: u64,
        changes: AmendJustification,
    ) -> Result<JustificationRequest, ServiceError> {
        let mut request = self
            .justifications
            .find_by_id(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))?;

        if request.person_id != person_id {
            return Err(ServiceError::NotOwner);
        }
        if !request.is_pending() {
            return Err(ServiceError::AlreadyDecided {
                status: request.status,
            });
        }

        if let Some(reason) = changes.reason {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(ServiceError::MissingReason);
            }
            request.reason = reason.to_string();
        }
        if let Some(category) = changes.category {
            request.category = category;
            request.priority = JustificationPriority::for_category(category);
        }
        if let Some(evidence) = changes.evidence_reference.filter(|e| !e.trim().is_empty()) {
            request.evidence_reference = Some(evidence);
        }

        match self.justifications.update_pending(&request).await {
            Ok(()) => {
                info!(category = %request.category, "Justification amended");
                Ok(request)
            }
            Err(StoreError::Stale) => {
                // decided or withdrawn since it was read
                let status = self
                    .justifications
                    .find_by_id(request_id)
                    .await?
                    .map(|current| current.status)
                    .ok_or(ServiceError::RequestNotFound(request_id))?;
                Err(ServiceError::AlreadyDecided { status })
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn withdraw(&self, request_id: u64, person_id: u64) -> Result<(), ServiceError> {
        let request = self
            .justifications
            .find_by_id(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))?;

        if request.person_id != person_id {
            return Err(ServiceError::NotOwner);
        }
        if !request.is_pending() {
            return Err(ServiceError::AlreadyDecided {
                status: request.status,
            });
        }

        match self.justifications.delete_pending(request_id).await {
            Ok(()) => {
                info!("Justification withdrawn");
                Ok(())
            }
            Err(StoreError::Stale) => Err(ServiceError::AlreadyDecided {
                status: JustificationStatus::Pending,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
