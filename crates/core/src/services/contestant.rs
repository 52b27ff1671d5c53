//! Contestant applications and review.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use talentvote_common::{AppError, AppResult, IdGenerator};
use talentvote_db::{
    entities::{
        competition::CompetitionStatus,
        contestant::{self, ApplicationStatus},
        user,
    },
    repositories::{CompetitionRepository, ContestantRepository},
};
use validator::Validate;

use super::competition::ensure_can_manage;

/// Input for applying to a competition.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyInput {
    pub competition_id: String,
    /// Stage name shown on the leaderboard
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
}

/// Service for contestant entries.
#[derive(Clone)]
pub struct ContestantService {
    competition_repo: CompetitionRepository,
    contestant_repo: ContestantRepository,
    id_gen: IdGenerator,
}

impl ContestantService {
    /// Create a new contestant service.
    #[must_use]
    pub const fn new(
        competition_repo: CompetitionRepository,
        contestant_repo: ContestantRepository,
    ) -> Self {
        Self {
            competition_repo,
            contestant_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Apply to a competition as the actor's talent profile.
    pub async fn apply(&self, actor: &user::Model, input: ApplyInput) -> AppResult<contestant::Model> {
        input.validate()?;

        let competition = self.competition_repo.get_by_id(&input.competition_id).await?;
        if competition.status == CompetitionStatus::Completed {
            return Err(AppError::InvalidState(
                "This competition has ended".to_string(),
            ));
        }

        if self
            .contestant_repo
            .find_by_competition_and_profile(&competition.id, &actor.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "You have already applied to this competition".to_string(),
            ));
        }

        let model = contestant::ActiveModel {
            id: Set(self.id_gen.generate()),
            competition_id: Set(competition.id.clone()),
            talent_profile_id: Set(actor.id.clone()),
            display_name: Set(input.display_name.trim().to_string()),
            application_status: Set(ApplicationStatus::Pending),
            vote_count: Set(0),
            online_vote_count: Set(0),
            in_person_vote_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        let contestant = self.contestant_repo.create(model).await?;
        tracing::info!(
            competition_id = %competition.id,
            contestant_id = %contestant.id,
            "New contestant application"
        );
        Ok(contestant)
    }

    /// Approve or reject a pending application.
    pub async fn review(
        &self,
        actor: &user::Model,
        contestant_id: &str,
        decision: ApplicationStatus,
    ) -> AppResult<contestant::Model> {
        if decision == ApplicationStatus::Pending {
            return Err(AppError::Validation(
                "Decision must be approved or rejected".to_string(),
            ));
        }

        let contestant = self.contestant_repo.get_by_id(contestant_id).await?;
        let competition = self
            .competition_repo
            .get_by_id(&contestant.competition_id)
            .await?;
        ensure_can_manage(actor, &competition)?;

        if contestant.application_status != ApplicationStatus::Pending {
            return Err(AppError::InvalidState(
                "Application has already been reviewed".to_string(),
            ));
        }

        let mut active: contestant::ActiveModel = contestant.into();
        active.application_status = Set(decision);
        self.contestant_repo.update(active).await
    }

    /// Contestants of a competition.
    ///
    /// Managers see every application; everyone else sees approved entrants only.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        competition_id: &str,
        status: Option<ApplicationStatus>,
    ) -> AppResult<Vec<contestant::Model>> {
        let competition = self.competition_repo.get_by_id(competition_id).await?;
        let manager = viewer.is_some_and(|v| ensure_can_manage(v, &competition).is_ok());
        let status = if manager {
            status
        } else {
            Some(ApplicationStatus::Approved)
        };

        self.contestant_repo
            .find_by_competition(&competition.id, status)
            .await
    }

    /// Get one contestant.
    pub async fn get(&self, contestant_id: &str) -> AppResult<contestant::Model> {
        self.contestant_repo.get_by_id(contestant_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::{test_competition, test_contestant, test_user};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use talentvote_db::entities::user::UserRole;

    fn service(db: MockDatabase) -> ContestantService {
        let db = Arc::new(db.into_connection());
        ContestantService::new(CompetitionRepository::new(db.clone()), ContestantRepository::new(db))
    }

    fn pending(id: &str) -> contestant::Model {
        let mut c = test_contestant(id, "c1");
        c.application_status = ApplicationStatus::Pending;
        c
    }

    fn apply_input() -> ApplyInput {
        ApplyInput {
            competition_id: "c1".to_string(),
            display_name: "The Harmonies".to_string(),
        }
    }

    #[tokio::test]
    async fn test_apply_creates_pending_entry() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_competition("c1", CompetitionStatus::Active)]])
                .append_query_results([Vec::<contestant::Model>::new()])
                .append_query_results([[pending("k1")]]),
        );

        let entry = svc
            .apply(&test_user("u1", UserRole::Voter), apply_input())
            .await
            .unwrap();

        assert_eq!(entry.application_status, ApplicationStatus::Pending);
        assert_eq!(entry.vote_count, 0);
    }

    #[tokio::test]
    async fn test_second_application_conflicts() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_competition("c1", CompetitionStatus::Active)]])
                .append_query_results([[pending("k1")]]),
        );

        let result = svc.apply(&test_user("u1", UserRole::Voter), apply_input()).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cannot_apply_to_completed() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_competition("c1", CompetitionStatus::Completed)]]),
        );

        let result = svc.apply(&test_user("u1", UserRole::Voter), apply_input()).await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_owner_approves_pending() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending("k1")]])
                .append_query_results([[test_competition("c1", CompetitionStatus::Active)]])
                .append_query_results([[test_contestant("k1", "c1")]]),
        );

        let reviewed = svc
            .review(&test_user("host1", UserRole::Host), "k1", ApplicationStatus::Approved)
            .await
            .unwrap();

        assert_eq!(reviewed.application_status, ApplicationStatus::Approved);
    }

    #[tokio::test]
    async fn test_review_twice_is_invalid() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_contestant("k1", "c1")]])
                .append_query_results([[test_competition("c1", CompetitionStatus::Active)]]),
        );

        let result = svc
            .review(&test_user("host1", UserRole::Host), "k1", ApplicationStatus::Rejected)
            .await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_stranger_cannot_review() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending("k1")]])
                .append_query_results([[test_competition("c1", CompetitionStatus::Active)]]),
        );

        let result = svc
            .review(&test_user("u9", UserRole::Voter), "k1", ApplicationStatus::Approved)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
