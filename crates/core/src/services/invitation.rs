//! Invitations: how hosts and admins bring in new hosts.

use chrono::{Duration, Utc};
use sea_orm::Set;
use serde::Deserialize;
use talentvote_common::{AppError, AppResult, IdGenerator};
use talentvote_db::{
    entities::{
        invitation::{self, InvitationStatus},
        user::{self, UserRole},
    },
    repositories::InvitationRepository,
};
use validator::Validate;

const DEFAULT_EXPIRY_DAYS: i64 = 7;

/// Input for creating an invitation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationInput {
    #[validate(email)]
    pub email: String,
    pub target_level: UserRole,
    #[validate(range(min = 1, max = 30))]
    pub expires_in_days: Option<i64>,
}

/// Service for invitations.
#[derive(Clone)]
pub struct InvitationService {
    invitation_repo: InvitationRepository,
    id_gen: IdGenerator,
}

impl InvitationService {
    /// Create a new invitation service.
    #[must_use]
    pub const fn new(invitation_repo: InvitationRepository) -> Self {
        Self {
            invitation_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Invite someone by email.
    pub async fn create(
        &self,
        actor: &user::Model,
        input: CreateInvitationInput,
    ) -> AppResult<invitation::Model> {
        if !actor.role.can_host() {
            return Err(AppError::Forbidden(
                "Only hosts and admins can send invitations".to_string(),
            ));
        }
        if input.target_level == UserRole::Admin && !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Only admins can invite admins".to_string(),
            ));
        }
        input.validate()?;

        let now = Utc::now();
        let days = input.expires_in_days.unwrap_or(DEFAULT_EXPIRY_DAYS);
        let model = invitation::ActiveModel {
            id: Set(self.id_gen.generate()),
            token: Set(self.id_gen.generate_token()),
            inviter_id: Set(actor.id.clone()),
            invitee_email: Set(input.email.trim().to_string()),
            target_level: Set(input.target_level),
            status: Set(InvitationStatus::Pending),
            expires_at: Set((now + Duration::days(days)).into()),
            accepted_by: Set(None),
            accepted_at: Set(None),
            created_at: Set(now.into()),
        };

        let invitation = self.invitation_repo.create(model).await?;
        tracing::info!(
            invitation_id = %invitation.id,
            inviter_id = %actor.id,
            target_level = ?invitation.target_level,
            "Created invitation"
        );
        Ok(invitation)
    }

    /// Persist the expiry of a pending invitation that has run out.
    async fn refresh(&self, invitation: invitation::Model) -> AppResult<invitation::Model> {
        let effective = invitation.effective_status(Utc::now().into());
        if effective == invitation.status {
            return Ok(invitation);
        }
        self.invitation_repo
            .set_status(invitation, effective)
            .await
    }

    /// Look up an invitation by token.
    pub async fn get(&self, token: &str) -> AppResult<invitation::Model> {
        let invitation = self
            .invitation_repo
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;
        self.refresh(invitation).await
    }

    /// Invitations the actor has sent.
    pub async fn list(&self, actor: &user::Model) -> AppResult<Vec<invitation::Model>> {
        let invitations = self.invitation_repo.find_by_inviter(&actor.id).await?;
        let mut refreshed = Vec::with_capacity(invitations.len());
        for invitation in invitations {
            refreshed.push(self.refresh(invitation).await?);
        }
        Ok(refreshed)
    }

    /// Accept an invitation as the signed-in user.
    ///
    /// The user's email must be verified by the identity provider and match
    /// the invitee. Raises the user's role to the invitation's level, never
    /// lowers it.
    pub async fn accept(
        &self,
        user: user::Model,
        token: &str,
    ) -> AppResult<(invitation::Model, user::Model)> {
        let invitation = self.get(token).await?;
        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Invitation is {}",
                match invitation.status {
                    InvitationStatus::Accepted => "already accepted",
                    _ => "expired",
                }
            )));
        }

        let matches = user
            .email
            .as_deref()
            .is_some_and(|email| email.eq_ignore_ascii_case(invitation.invitee_email.trim()));
        if !matches {
            return Err(AppError::Forbidden(
                "This invitation was sent to a different email address".to_string(),
            ));
        }

        if !user.email_verified {
            return Err(AppError::Forbidden(
                "Verify your email address before accepting this invitation".to_string(),
            ));
        }

        let target = invitation.target_level;
        let raise = (target.rank() > user.role.rank()).then_some(target);
        let (invitation, user) = self.invitation_repo.accept(invitation, user, raise).await?;

        tracing::info!(
            invitation_id = %invitation.id,
            user_id = %user.id,
            role = ?user.role,
            "Invitation accepted"
        );
        Ok((invitation, user))
    }
}
