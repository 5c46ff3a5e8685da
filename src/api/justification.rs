use crate::auth::auth::AuthUser;
use crate::model::justification::{
    DecisionOutcome, JustificationCategory, JustificationRequest, JustificationStatus,
};
use crate::service::justification::{
    AmendJustification, Decision, JustificationWorkflow, SubmitJustification, Viewer,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateJustification {
    /// Attendance record being justified; omit for a full-day absence
    #[schema(example = 42)]
    pub attendance_record_id: Option<u64>,
    /// Defaults to the record's date
    #[schema(example = "2026-03-02", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    /// Defaults to `start_date`
    #[schema(example = "2026-03-02", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = "Medical appointment")]
    pub reason: String,
    #[schema(example = "medical")]
    pub category: JustificationCategory,
    /// Reference to an already uploaded document
    #[schema(example = "uploads/certificate-42.pdf")]
    pub evidence_reference: Option<String>,
}

/// Omitted fields keep their current value
#[derive(Deserialize, ToSchema)]
pub struct UpdateJustification {
    #[schema(example = "Medical appointment, certificate attached")]
    pub reason: Option<String>,
    #[schema(example = "medical")]
    pub category: Option<JustificationCategory>,
    #[schema(example = "uploads/certificate-42.pdf")]
    pub evidence_reference: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct DecisionPayload {
    #[schema(example = "Certificate verified")]
    pub comment: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct JustificationQuery {
    /// Filter by status
    #[schema(example = "pending")]
    pub status: Option<JustificationStatus>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Items per page, at most 100
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct JustificationListResponse {
    pub data: Vec<JustificationRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

/* =========================
Submit justification
========================= */
#[utoipa::path(
    post,
    path = "/api/justifications",
    request_body(
        content = CreateJustification,
        description = "Justification payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Justification submitted", body = JustificationRequest),
        (status = 400, description = "Missing reason or invalid period", body = Object, example = json!({
            "error": "missing_reason",
            "message": "a reason is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Record belongs to someone else"),
        (status = 404, description = "Attendance record not found"),
        (status = 409, description = "A pending or overlapping justification exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn submit_justification(
    auth: AuthUser,
    workflow: web::Data<JustificationWorkflow>,
    payload: web::Json<CreateJustification>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.person_id()?;
    let payload = payload.into_inner();

    let request = workflow
        .submit(SubmitJustification {
            person_id,
            attendance_record_id: payload.attendance_record_id,
            start_date: payload.start_date,
            end_date: payload.end_date,
            reason: payload.reason,
            category: payload.category,
            evidence_reference: payload.evidence_reference,
        })
        .await?;

    Ok(HttpResponse::Created().json(request))
}

/* =========================
List own justifications
========================= */
#[utoipa::path(
    get,
    path = "/api/justifications",
    params(JustificationQuery),
    responses(
        (status = 200, description = "Paginated justification list", body = JustificationListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn list_justifications(
    auth: AuthUser,
    workflow: web::Data<JustificationWorkflow>,
    query: web::Query<JustificationQuery>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.person_id()?;

    let page = workflow
        .list_for_person(person_id, query.status, query.page, query.per_page)
        .await?;

    Ok(HttpResponse::Ok().json(JustificationListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/justifications/{id}",
    params(
        ("id" = u64, Path, description = "ID of the justification")
    ),
    responses(
        (status = 200, description = "Justification found", body = JustificationRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither the owner nor a reviewer"),
        (status = 404, description = "Justification not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn get_justification(
    auth: AuthUser,
    workflow: web::Data<JustificationWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let viewer = Viewer {
        person_id: auth.person_id,
        is_reviewer: auth.is_reviewer(),
    };

    let request = workflow.get(path.into_inner(), viewer).await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Update pending justification
========================= */
#[utoipa::path(
    put,
    path = "/api/justifications/{id}",
    params(
        ("id" = u64, Path, description = "ID of the pending justification to update")
    ),
    request_body(
        content = UpdateJustification,
        description = "Fields to change",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Justification updated", body = JustificationRequest),
        (status = 400, description = "Blank reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Justification not found"),
        (status = 409, description = "Already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn update_justification(
    auth: AuthUser,
    workflow: web::Data<JustificationWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<UpdateJustification>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.person_id()?;
    let payload = payload.into_inner();

    let request = workflow
        .amend(
            path.into_inner(),
            person_id,
            AmendJustification {
                reason: payload.reason,
                category: payload.category,
                evidence_reference: payload.evidence_reference,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    delete,
    path = "/api/justifications/{id}",
    params(
        ("id" = u64, Path, description = "ID of the pending justification to withdraw")
    ),
    responses(
        (status = 204, description = "Justification withdrawn"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Justification not found"),
        (status = 409, description = "Already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn withdraw_justification(
    auth: AuthUser,
    workflow: web::Data<JustificationWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.person_id()?;

    workflow.withdraw(path.into_inner(), person_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn decide(
    auth: AuthUser,
    workflow: &JustificationWorkflow,
    request_id: u64,
    outcome: DecisionOutcome,
    payload: Option<web::Json<DecisionPayload>>,
) -> actix_web::Result<HttpResponse> {
    auth.require_reviewer()?;

    let comment = payload.and_then(|p| p.into_inner().comment);
    let request = workflow
        .decide(Decision {
            request_id,
            reviewer_id: auth.user_id,
            outcome,
            comment,
        })
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Approve justification (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/justifications/{id}/approve",
    params(
        ("id" = u64, Path, description = "ID of the justification to approve")
    ),
    request_body(
        content = DecisionPayload,
        description = "Optional reviewer comment",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Justification approved, the record is now justified", body = JustificationRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Justification not found"),
        (status = 409, description = "Already decided", body = Object, example = json!({
            "error": "already_decided",
            "message": "justification was already approved"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn approve_justification(
    auth: AuthUser,
    workflow: web::Data<JustificationWorkflow>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionPayload>>,
) -> actix_web::Result<impl Responder> {
    decide(auth, &workflow, path.into_inner(), DecisionOutcome::Approved, payload).await
}

/* =========================
Reject justification (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/justifications/{id}/reject",
    params(
        ("id" = u64, Path, description = "ID of the justification to reject")
    ),
    request_body(
        content = DecisionPayload,
        description = "Optional reviewer comment",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Justification rejected", body = JustificationRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Justification not found"),
        (status = 409, description = "Already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn reject_justification(
    auth: AuthUser,
    workflow: web::Data<JustificationWorkflow>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionPayload>>,
) -> actix_web::Result<impl Responder> {
    decide(auth, &workflow, path.into_inner(), DecisionOutcome::Rejected, payload).await
}
