//! Transactional approval workflow engine.
//!
//! Every operation is one atomic store transaction with the same spine:
//! read the request, require pending, require club access, read secondary
//! records, write derived records, finalize the request, append one audit
//! entry. A failure at any step discards the whole transaction, so a retry
//! after a transient failure is safe: the pending check turns the second
//! attempt into a conflict instead of a second side effect.

use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use platform_core::error::AppError;

use crate::models::{
    AuditAction, AuditLogEntry, FamilyRegistrationRequest, FamilyRole, Member, MemberCategory,
    MemberPass, MemberRegistrationRequest, MemberStatus, PassKind, PassRequest, PassRequestKind,
    PassStatus, PassTemplate, PaymentStatus, Principal, RequestStatus, UserRecord, UserStatus,
};
use crate::services::identity::IdentityService;
use crate::store::{Collection, DocRef, DocumentStore};

/// Fallback pass length when a template declares no period.
const DEFAULT_PASS_DAYS: i64 = 30;
/// Fallback session allowance for session-based templates.
const DEFAULT_SESSION_COUNT: u32 = 10;

/// Which registration collection a rejection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationKind {
    Member,
    Family,
}

impl RegistrationKind {
    fn collection(&self) -> Collection {
        match self {
            RegistrationKind::Member => Collection::MemberRegistrationRequests,
            RegistrationKind::Family => Collection::FamilyRegistrationRequests,
        }
    }

    fn target_type(&self) -> &'static str {
        match self {
            RegistrationKind::Member => "member_registration_request",
            RegistrationKind::Family => "family_registration_request",
        }
    }

    fn reject_action(&self) -> AuditAction {
        match self {
            RegistrationKind::Member => AuditAction::RejectMemberRegistration,
            RegistrationKind::Family => AuditAction::RejectFamilyRegistration,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberApproval {
    pub request_id: String,
    pub member_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyApproval {
    pub request_id: String,
    pub parent_member_ids: Vec<String>,
    pub child_member_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRejection {
    pub request_id: String,
    pub kind: RegistrationKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassApproval {
    pub request_id: String,
    pub pass_id: String,
    pub member_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRejection {
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassCancellation {
    pub pass_id: String,
    pub member_id: String,
}

/// Fields shared by every request document, used when the full shape is
/// not needed (rejections touch only the envelope).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestEnvelope {
    status: RequestStatus,
    club_id: String,
}

#[derive(Clone)]
pub struct ApprovalService {
    store: Arc<dyn DocumentStore>,
    identity: IdentityService,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn DocumentStore>, identity: IdentityService) -> Self {
        Self { store, identity }
    }

    /// Approve an individual registration: create the member, activate and
    /// link the waiting account if there is one, finalize the request.
    pub async fn approve_member(
        &self,
        request_id: &str,
        actor: &Principal,
    ) -> Result<MemberApproval, AppError> {
        let request_ref = DocRef::new(Collection::MemberRegistrationRequests, request_id);
        let mut tx = self.store.begin().await?;

        let doc = tx
            .get(&request_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Registration request not found")))?;
        let request: MemberRegistrationRequest = decode_doc(doc, "member registration request")?;
        ensure_pending(request.status)?;
        ensure_club_access(actor, &request.club_id)?;

        let now = Utc::now();
        let target_uid = request
            .user_id
            .clone()
            .unwrap_or_else(|| request.requested_by.clone());

        // Activate-and-link applies only to accounts still waiting on approval.
        let user_ref = DocRef::new(Collection::Users, &target_uid);
        let link_user = match tx.get(&user_ref).await? {
            Some(doc) => {
                let user: UserRecord = decode_doc(doc, "user")?;
                user.status == UserStatus::Pending
            }
            None => false,
        };

        let member_id = new_doc_id();
        let member = Member {
            name: request.name.clone(),
            date_of_birth: request.date_of_birth.clone(),
            gender: request.gender.clone(),
            phone_number: request.phone_number.clone(),
            email: request.email.clone(),
            club_id: request.club_id.clone(),
            club_name: request.club_name.clone(),
            member_category: MemberCategory::Adult,
            member_type: request.member_type.clone(),
            family_role: request.family_role,
            status: MemberStatus::Active,
            user_id: Some(target_uid.clone()),
            active_pass_id: None,
            guardian_ids: Vec::new(),
            guardian_user_ids: Vec::new(),
            guardian_name: None,
            guardian_phone: None,
            guardian_relation: None,
            created_at: now,
            updated_at: None,
            approved_by: actor.uid.clone(),
            approved_at: now,
        };
        tx.set(
            &DocRef::new(Collection::Members, &member_id),
            encode_doc(&member)?,
        );

        if link_user {
            tx.update(
                &user_ref,
                json!({
                    "status": UserStatus::Active,
                    "linkedMemberId": member_id,
                    "clubId": request.club_id,
                    "clubName": request.club_name,
                    "updatedAt": now,
                }),
            );
        }

        tx.update(
            &request_ref,
            json!({
                "status": RequestStatus::Approved,
                "processedBy": actor.uid,
                "processedAt": now,
            }),
        );

        let audit = AuditLogEntry::new(
            AuditAction::ApproveMemberRegistration,
            actor,
            "member_registration_request",
            request_id,
            json!({
                "memberId": member_id,
                "memberName": request.name,
                "clubId": request.club_id,
            }),
        );
        tx.set(
            &DocRef::new(Collection::AuditLogs, new_doc_id()),
            encode_doc(&audit)?,
        );

        tx.commit().await?;

        if link_user {
            self.identity.invalidate(&target_uid);
        }
        counter!("approval_operations_total", "operation" => "approve_member").increment(1);
        tracing::info!(
            request_id,
            member_id = %member_id,
            club_id = %request.club_id,
            "member registration approved"
        );

        Ok(MemberApproval {
            request_id: request_id.to_string(),
            member_id,
        })
    }

    /// Approve a family registration: one member per parent and child,
    /// children linked to their guardians, requester account updated.
    pub async fn approve_family(
        &self,
        request_id: &str,
        actor: &Principal,
    ) -> Result<FamilyApproval, AppError> {
        let request_ref = DocRef::new(Collection::FamilyRegistrationRequests, request_id);
        let mut tx = self.store.begin().await?;

        let doc = tx
            .get(&request_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Registration request not found")))?;
        let request: FamilyRegistrationRequest = decode_doc(doc, "family registration request")?;
        ensure_pending(request.status)?;
        ensure_club_access(actor, &request.club_id)?;

        let now = Utc::now();
        let requester = request.requested_by.clone();

        let mut parent_member_ids = Vec::with_capacity(request.parents.len());
        for (index, parent) in request.parents.iter().enumerate() {
            let member_id = new_doc_id();
            let member = Member {
                name: parent.name.clone(),
                date_of_birth: parent.date_of_birth.clone(),
                gender: parent.gender.clone(),
                phone_number: parent.phone_number.clone(),
                email: parent.email.clone(),
                club_id: request.club_id.clone(),
                club_name: request.club_name.clone(),
                member_category: MemberCategory::Adult,
                member_type: Some("family".to_string()),
                family_role: Some(FamilyRole::Parent),
                status: MemberStatus::Active,
                // The requester's own account maps onto the first parent.
                user_id: (index == 0).then(|| requester.clone()),
                active_pass_id: None,
                guardian_ids: Vec::new(),
                guardian_user_ids: Vec::new(),
                guardian_name: None,
                guardian_phone: None,
                guardian_relation: None,
                created_at: now,
                updated_at: None,
                approved_by: actor.uid.clone(),
                approved_at: now,
            };
            tx.set(
                &DocRef::new(Collection::Members, &member_id),
                encode_doc(&member)?,
            );
            parent_member_ids.push(member_id);
        }

        // Guardian contact shown on each child: first parent, else the
        // request's external guardian.
        let (guardian_name, guardian_phone) = match request.parents.first() {
            Some(parent) => (Some(parent.name.clone()), parent.phone_number.clone()),
            None => match &request.external_guardian {
                Some(guardian) => (Some(guardian.name.clone()), guardian.phone_number.clone()),
                None => (None, None),
            },
        };

        let mut child_member_ids = Vec::with_capacity(request.children.len());
        for child in &request.children {
            let member_id = new_doc_id();
            let member = Member {
                name: child.name.clone(),
                date_of_birth: child.date_of_birth.clone(),
                gender: child.gender.clone(),
                phone_number: None,
                email: None,
                club_id: request.club_id.clone(),
                club_name: request.club_name.clone(),
                member_category: MemberCategory::Child,
                member_type: Some("family".to_string()),
                family_role: Some(FamilyRole::Child),
                status: MemberStatus::Active,
                user_id: None,
                active_pass_id: None,
                guardian_ids: parent_member_ids.clone(),
                guardian_user_ids: vec![requester.clone()],
                guardian_name: guardian_name.clone(),
                guardian_phone: guardian_phone.clone(),
                guardian_relation: request.guardian_relation.clone(),
                created_at: now,
                updated_at: None,
                approved_by: actor.uid.clone(),
                approved_at: now,
            };
            tx.set(
                &DocRef::new(Collection::Members, &member_id),
                encode_doc(&member)?,
            );
            child_member_ids.push(member_id);
        }

        // Requester account always adopts the family's club; linking and
        // activation depend on its current state.
        let user_ref = DocRef::new(Collection::Users, &requester);
        let requester_updated = match tx.get(&user_ref).await? {
            Some(doc) => {
                let user: UserRecord = decode_doc(doc, "user")?;
                let mut partial = json!({
                    "clubId": request.club_id,
                    "clubName": request.club_name,
                    "updatedAt": now,
                });
                if let Some(first_parent) = parent_member_ids.first() {
                    partial["linkedMemberId"] = json!(first_parent);
                }
                if user.status == UserStatus::Pending {
                    partial["status"] = json!(UserStatus::Active);
                }
                tx.update(&user_ref, partial);
                true
            }
            None => false,
        };

        let mut created_member_ids = parent_member_ids.clone();
        created_member_ids.extend(child_member_ids.iter().cloned());
        tx.update(
            &request_ref,
            json!({
                "status": RequestStatus::Approved,
                "processedBy": actor.uid,
                "processedAt": now,
                "createdMemberIds": created_member_ids,
            }),
        );

        let audit = AuditLogEntry::new(
            AuditAction::ApproveFamilyRegistration,
            actor,
            "family_registration_request",
            request_id,
            json!({
                "parentMemberIds": parent_member_ids,
                "childMemberIds": child_member_ids,
                "clubId": request.club_id,
            }),
        );
        tx.set(
            &DocRef::new(Collection::AuditLogs, new_doc_id()),
            encode_doc(&audit)?,
        );

        tx.commit().await?;

        if requester_updated {
            self.identity.invalidate(&requester);
        }
        counter!("approval_operations_total", "operation" => "approve_family").increment(1);
        tracing::info!(
            request_id,
            parents = parent_member_ids.len(),
            children = child_member_ids.len(),
            club_id = %request.club_id,
            "family registration approved"
        );

        Ok(FamilyApproval {
            request_id: request_id.to_string(),
            parent_member_ids,
            child_member_ids,
        })
    }

    /// Reject an individual or family registration request.
    pub async fn reject_registration(
        &self,
        kind: RegistrationKind,
        request_id: &str,
        reason: Option<&str>,
        actor: &Principal,
    ) -> Result<RegistrationRejection, AppError> {
        let request_ref = DocRef::new(kind.collection(), request_id);
        let mut tx = self.store.begin().await?;

        let doc = tx
            .get(&request_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Registration request not found")))?;
        let envelope: RequestEnvelope = decode_doc(doc, "registration request")?;
        ensure_pending(envelope.status)?;
        ensure_club_access(actor, &envelope.club_id)?;

        let now = Utc::now();
        tx.update(
            &request_ref,
            json!({
                "status": RequestStatus::Rejected,
                "processedBy": actor.uid,
                "processedAt": now,
                "rejectionReason": reason,
            }),
        );

        let audit = AuditLogEntry::new(
            kind.reject_action(),
            actor,
            kind.target_type(),
            request_id,
            json!({
                "reason": reason,
                "clubId": envelope.club_id,
            }),
        );
        tx.set(
            &DocRef::new(Collection::AuditLogs, new_doc_id()),
            encode_doc(&audit)?,
        );

        tx.commit().await?;

        counter!("approval_operations_total", "operation" => "reject_registration").increment(1);
        tracing::info!(request_id, kind = ?kind, "registration request rejected");

        Ok(RegistrationRejection {
            request_id: request_id.to_string(),
            kind,
        })
    }

    /// Approve a pass request: issue the pass, link it to the member,
    /// retire a superseded pass on renewal.
    pub async fn approve_pass(
        &self,
        request_id: &str,
        actor: &Principal,
    ) -> Result<PassApproval, AppError> {
        let request_ref = DocRef::new(Collection::PassRequests, request_id);
        let mut tx = self.store.begin().await?;

        let doc = tx
            .get(&request_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Pass request not found")))?;
        let request: PassRequest = decode_doc(doc, "pass request")?;
        ensure_pending(request.status)?;
        ensure_club_access(actor, &request.club_id)?;

        let template_doc = tx
            .get(&DocRef::new(Collection::PassTemplates, &request.template_id))
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Pass template not found")))?;
        let template: PassTemplate = decode_doc(template_doc, "pass template")?;

        let member_ref = DocRef::new(Collection::Members, &request.member_id);
        tx.get(&member_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Member not found")))?;

        let now = Utc::now();
        let start_date = request.requested_start_date.unwrap_or(now);
        let end_date = pass_end_date(template.kind, template.duration_days, start_date)
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("pass end date out of range")))?;
        let remaining_sessions = (template.kind == PassKind::SessionBased)
            .then(|| template.session_count.unwrap_or(DEFAULT_SESSION_COUNT));

        let pass_id = new_doc_id();
        let pass = MemberPass {
            template_id: request.template_id.clone(),
            template_name: template.name.clone(),
            member_id: request.member_id.clone(),
            member_name: request.member_name.clone(),
            club_id: request.club_id.clone(),
            kind: template.kind,
            start_date,
            end_date,
            remaining_sessions,
            price: template.price.unwrap_or(0),
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method.clone(),
            status: PassStatus::Active,
            usage_count: 0,
            created_at: now,
            approved_by: actor.uid.clone(),
            approved_at: now,
            expired_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            updated_at: None,
        };
        tx.set(
            &DocRef::new(Collection::MemberPasses, &pass_id),
            encode_doc(&pass)?,
        );

        // A renewal retires the pass it supersedes.
        if request.kind == PassRequestKind::Renewal {
            if let Some(current_pass_id) = &request.current_pass_id {
                let current_ref = DocRef::new(Collection::MemberPasses, current_pass_id);
                if tx.get(&current_ref).await?.is_some() {
                    tx.update(
                        &current_ref,
                        json!({
                            "status": PassStatus::Expired,
                            "expiredAt": now,
                            "updatedAt": now,
                        }),
                    );
                }
            }
        }

        tx.update(
            &member_ref,
            json!({
                "activePassId": pass_id,
                "updatedAt": now,
            }),
        );

        tx.update(
            &request_ref,
            json!({
                "status": RequestStatus::Approved,
                "processedBy": actor.uid,
                "processedAt": now,
                "createdPassId": pass_id,
            }),
        );

        let audit = AuditLogEntry::new(
            AuditAction::ApprovePassRequest,
            actor,
            "pass_request",
            request_id,
            json!({
                "passId": pass_id,
                "memberId": request.member_id,
                "templateId": request.template_id,
                "endDate": end_date,
            }),
        );
        tx.set(
            &DocRef::new(Collection::AuditLogs, new_doc_id()),
            encode_doc(&audit)?,
        );

        tx.commit().await?;

        counter!("approval_operations_total", "operation" => "approve_pass").increment(1);
        tracing::info!(
            request_id,
            pass_id = %pass_id,
            member_id = %request.member_id,
            "pass request approved"
        );

        Ok(PassApproval {
            request_id: request_id.to_string(),
            pass_id,
            member_id: request.member_id,
        })
    }

    /// Reject a pass request.
    pub async fn reject_pass(
        &self,
        request_id: &str,
        reason: Option<&str>,
        actor: &Principal,
    ) -> Result<PassRejection, AppError> {
        let request_ref = DocRef::new(Collection::PassRequests, request_id);
        let mut tx = self.store.begin().await?;

        let doc = tx
            .get(&request_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Pass request not found")))?;
        let request: PassRequest = decode_doc(doc, "pass request")?;
        ensure_pending(request.status)?;
        ensure_club_access(actor, &request.club_id)?;

        let now = Utc::now();
        tx.update(
            &request_ref,
            json!({
                "status": RequestStatus::Rejected,
                "processedBy": actor.uid,
                "processedAt": now,
                "rejectionReason": reason,
            }),
        );

        let audit = AuditLogEntry::new(
            AuditAction::RejectPassRequest,
            actor,
            "pass_request",
            request_id,
            json!({
                "reason": reason,
                "memberId": request.member_id,
                "clubId": request.club_id,
            }),
        );
        tx.set(
            &DocRef::new(Collection::AuditLogs, new_doc_id()),
            encode_doc(&audit)?,
        );

        tx.commit().await?;

        counter!("approval_operations_total", "operation" => "reject_pass").increment(1);
        tracing::info!(request_id, "pass request rejected");

        Ok(PassRejection {
            request_id: request_id.to_string(),
        })
    }

    /// Cancel an issued pass and detach it from its member.
    pub async fn cancel_pass(
        &self,
        pass_id: &str,
        reason: &str,
        actor: &Principal,
    ) -> Result<PassCancellation, AppError> {
        let pass_ref = DocRef::new(Collection::MemberPasses, pass_id);
        let mut tx = self.store.begin().await?;

        let doc = tx
            .get(&pass_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Pass not found")))?;
        let pass: MemberPass = decode_doc(doc, "member pass")?;

        if pass.status != PassStatus::Active {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Pass already {}",
                pass.status
            )));
        }
        ensure_club_access(actor, &pass.club_id)?;

        let now = Utc::now();
        tx.update(
            &pass_ref,
            json!({
                "status": PassStatus::Cancelled,
                "cancelledBy": actor.uid,
                "cancelledAt": now,
                "cancellationReason": reason,
                "updatedAt": now,
            }),
        );

        // Detach only while this is still the member's active pass.
        let member_ref = DocRef::new(Collection::Members, &pass.member_id);
        if let Some(member_doc) = tx.get(&member_ref).await? {
            let member: Member = decode_doc(member_doc, "member")?;
            if member.active_pass_id.as_deref() == Some(pass_id) {
                tx.update(
                    &member_ref,
                    json!({
                        "activePassId": null,
                        "updatedAt": now,
                    }),
                );
            }
        }

        let audit = AuditLogEntry::new(
            AuditAction::CancelPass,
            actor,
            "member_pass",
            pass_id,
            json!({
                "memberId": pass.member_id,
                "reason": reason,
                "clubId": pass.club_id,
            }),
        );
        tx.set(
            &DocRef::new(Collection::AuditLogs, new_doc_id()),
            encode_doc(&audit)?,
        );

        tx.commit().await?;

        counter!("approval_operations_total", "operation" => "cancel_pass").increment(1);
        tracing::info!(pass_id, member_id = %pass.member_id, "pass cancelled");

        Ok(PassCancellation {
            pass_id: pass_id.to_string(),
            member_id: pass.member_id,
        })
    }
}

fn new_doc_id() -> String {
    Uuid::new_v4().to_string()
}

fn decode_doc<T: serde::de::DeserializeOwned>(doc: Value, what: &str) -> Result<T, AppError> {
    serde_json::from_value(doc).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("malformed {} document: {}", what, e))
    })
}

fn encode_doc<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("document serialization: {}", e)))
}

fn ensure_pending(status: RequestStatus) -> Result<(), AppError> {
    if status != RequestStatus::Pending {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Request already {}",
            status
        )));
    }
    Ok(())
}

fn ensure_club_access(actor: &Principal, club_id: &str) -> Result<(), AppError> {
    if !actor.belongs_to_club(club_id) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Access denied to this club"
        )));
    }
    Ok(())
}

/// End date for a pass issued from a template, per the period rule:
/// monthly +1 month, quarterly +3, yearly +12, otherwise an explicit day
/// count or the 30-day default. Session-based templates always use the
/// default period; their real budget is the session count.
pub fn pass_end_date(
    kind: PassKind,
    duration_days: Option<i64>,
    start: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match kind {
        PassKind::Monthly => start.checked_add_months(Months::new(1)),
        PassKind::Quarterly => start.checked_add_months(Months::new(3)),
        PassKind::Yearly => start.checked_add_months(Months::new(12)),
        PassKind::SessionBased => start.checked_add_signed(Duration::days(DEFAULT_PASS_DAYS)),
        PassKind::Custom => {
            start.checked_add_signed(Duration::days(duration_days.unwrap_or(DEFAULT_PASS_DAYS)))
        }
    }
}
