//! Account management: status updates and user–member linking.
//!
//! Both operations mutate identity fields, so they run transactionally and
//! invalidate the identity cache after commit.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use platform_core::error::AppError;

use crate::models::{AuditAction, AuditLogEntry, Member, Principal, UserRecord, UserStatus};
use crate::services::identity::IdentityService;
use crate::services::status::{apply_status_update, TransitionDenial};
use crate::store::{Collection, DocRef, DocumentStore};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub user_id: String,
    pub previous_status: UserStatus,
    pub new_status: UserStatus,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberLink {
    pub user_id: String,
    pub member_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_member_id: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    identity: IdentityService,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>, identity: IdentityService) -> Self {
        Self { store, identity }
    }

    /// Move a user to a new lifecycle status after running the transition
    /// validator with the caller as actor.
    pub async fn update_status(
        &self,
        user_id: &str,
        new_status: UserStatus,
        reason: Option<&str>,
        actor: &Principal,
    ) -> Result<StatusChange, AppError> {
        let user_ref = DocRef::new(Collection::Users, user_id);
        let mut tx = self.store.begin().await?;

        let doc = tx
            .get(&user_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
        let user: UserRecord = decode_doc(doc, "user")?;

        let update = apply_status_update(user_id, &user, new_status, reason, actor)
            .map_err(denial_to_error)?;

        tx.update(
            &user_ref,
            json!({
                "status": update.new_status,
                "updatedAt": update.user.updated_at,
            }),
        );
        tx.set(
            &DocRef::new(Collection::AuditLogs, new_doc_id()),
            encode_doc(&update.audit)?,
        );

        tx.commit().await?;

        self.identity.invalidate(user_id);
        counter!("account_operations_total", "operation" => "update_status").increment(1);
        tracing::info!(
            user_id,
            previous = %update.previous_status,
            new = %update.new_status,
            "user status updated"
        );

        Ok(StatusChange {
            user_id: user_id.to_string(),
            previous_status: update.previous_status,
            new_status: update.new_status,
            warnings: update.warnings.iter().map(ToString::to_string).collect(),
        })
    }

    /// Link a user account to a member record, both directions.
    ///
    /// An existing link on either side to somebody else is a conflict unless
    /// `force_update` is set, in which case the stale counterpart links are
    /// cleared inside the same transaction.
    pub async fn link_member(
        &self,
        user_id: &str,
        member_id: &str,
        force_update: bool,
        actor: &Principal,
    ) -> Result<MemberLink, AppError> {
        let user_ref = DocRef::new(Collection::Users, user_id);
        let member_ref = DocRef::new(Collection::Members, member_id);
        let mut tx = self.store.begin().await?;

        let doc = tx
            .get(&user_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
        let user: UserRecord = decode_doc(doc, "user")?;

        let doc = tx
            .get(&member_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Member not found")))?;
        let member: Member = decode_doc(doc, "member")?;

        if !actor.belongs_to_club(&member.club_id) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Access denied to this club"
            )));
        }

        let previous_member_id = user.linked_member_id.clone();
        let now = Utc::now();

        if force_update {
            // Clear stale counterpart links so no record keeps a dangling id.
            if let Some(old_member_id) = user.linked_member_id.as_deref() {
                if old_member_id != member_id {
                    let old_ref = DocRef::new(Collection::Members, old_member_id);
                    if tx.get(&old_ref).await?.is_some() {
                        tx.update(&old_ref, json!({ "userId": null, "updatedAt": now }));
                    }
                }
            }
            if let Some(old_user_id) = member.user_id.as_deref() {
                if old_user_id != user_id {
                    let old_ref = DocRef::new(Collection::Users, old_user_id);
                    if tx.get(&old_ref).await?.is_some() {
                        tx.update(
                            &old_ref,
                            json!({ "linkedMemberId": null, "updatedAt": now }),
                        );
                    }
                }
            }
        } else {
            if let Some(existing) = user.linked_member_id.as_deref() {
                if existing != member_id {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "User is already linked to another member; set forceUpdate to relink"
                    )));
                }
            }
            if let Some(existing) = member.user_id.as_deref() {
                if existing != user_id {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Member is already linked to another user; set forceUpdate to relink"
                    )));
                }
            }
        }

        tx.update(
            &user_ref,
            json!({
                "linkedMemberId": member_id,
                "clubId": member.club_id,
                "clubName": member.club_name,
                "updatedAt": now,
            }),
        );
        tx.update(&member_ref, json!({ "userId": user_id, "updatedAt": now }));

        let audit = AuditLogEntry::new(
            AuditAction::LinkUserMember,
            actor,
            "user",
            user_id,
            json!({
                "memberId": member_id,
                "previousMemberId": previous_member_id,
                "previousUserId": member.user_id,
                "forceUpdate": force_update,
                "clubId": member.club_id,
            }),
        );
        tx.set(
            &DocRef::new(Collection::AuditLogs, new_doc_id()),
            encode_doc(&audit)?,
        );

        tx.commit().await?;

        // The link rewrites the user's club, so the cached slice is stale.
        self.identity.invalidate(user_id);
        counter!("account_operations_total", "operation" => "link_member").increment(1);
        tracing::info!(user_id, member_id, force_update, "user linked to member");

        Ok(MemberLink {
            user_id: user_id.to_string(),
            member_id: member_id.to_string(),
            previous_member_id,
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

fn denial_to_error(denial: TransitionDenial) -> AppError {
    if denial.is_conflict() {
        AppError::Conflict(anyhow::anyhow!("{}", denial))
    } else {
        AppError::Forbidden(anyhow::anyhow!("{}", denial))
    }
}
