//! Vote packages.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use talentvote_common::{AppError, AppResult, IdGenerator};
use talentvote_db::{
    entities::{user, vote_package},
    repositories::{CompetitionRepository, VotePackageRepository},
};
use validator::Validate;

use super::competition::ensure_can_manage;

/// Input for creating a vote package.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackageInput {
    /// `None` creates a platform-wide package
    pub competition_id: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(range(min = 1, max = 100_000))]
    pub vote_count: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 100_000))]
    pub bonus_votes: i32,
    #[validate(range(min = 1, max = 100_000_000))]
    pub price_cents: i64,
}

/// Service for vote packages.
#[derive(Clone)]
pub struct VotePackageService {
    competition_repo: CompetitionRepository,
    package_repo: VotePackageRepository,
    id_gen: IdGenerator,
}

impl VotePackageService {
    /// Create a new vote package service.
    #[must_use]
    pub const fn new(
        competition_repo: CompetitionRepository,
        package_repo: VotePackageRepository,
    ) -> Self {
        Self {
            competition_repo,
            package_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Active packages buyable in a competition, cheapest first.
    pub async fn list_offered(&self, competition_id: &str) -> AppResult<Vec<vote_package::Model>> {
        let competition = self.competition_repo.get_by_id(competition_id).await?;
        self.package_repo.find_offered(&competition.id).await
    }

    /// Create a package. Platform-wide packages are admin-only.
    pub async fn create(
        &self,
        actor: &user::Model,
        input: CreatePackageInput,
    ) -> AppResult<vote_package::Model> {
        input.validate()?;

        match &input.competition_id {
            Some(id) => {
                let competition = self.competition_repo.get_by_id(id).await?;
                ensure_can_manage(actor, &competition)?;
            }
            None if !actor.is_admin() => {
                return Err(AppError::Forbidden(
                    "Only admins can create platform-wide packages".to_string(),
                ));
            }
            None => {}
        }

        let model = vote_package::ActiveModel {
            id: Set(self.id_gen.generate()),
            competition_id: Set(input.competition_id),
            name: Set(input.name.trim().to_string()),
            vote_count: Set(input.vote_count),
            bonus_votes: Set(input.bonus_votes),
            price_cents: Set(input.price_cents),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        self.package_repo.create(model).await
    }

    /// Withdraw or re-offer a package.
    pub async fn set_active(
        &self,
        actor: &user::Model,
        package_id: &str,
        is_active: bool,
    ) -> AppResult<vote_package::Model> {
        let package = self.package_repo.get_by_id(package_id).await?;
        match &package.competition_id {
            Some(id) => {
                let competition = self.competition_repo.get_by_id(id).await?;
                ensure_can_manage(actor, &competition)?;
            }
            None if !actor.is_admin() => {
                return Err(AppError::Forbidden(
                    "Only admins can change platform-wide packages".to_string(),
                ));
            }
            None => {}
        }

        let mut active: vote_package::ActiveModel = package.into();
        active.is_active = Set(is_active);
        self.package_repo.update(active).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::{test_competition, test_package, test_user};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use talentvote_db::entities::{competition::CompetitionStatus, user::UserRole};

    fn service(db: MockDatabase) -> VotePackageService {
        let db = Arc::new(db.into_connection());
        VotePackageService::new(CompetitionRepository::new(db.clone()), VotePackageRepository::new(db))
    }

    fn input(competition_id: Option<&str>) -> CreatePackageInput {
        CreatePackageInput {
            competition_id: competition_id.map(str::to_string),
            name: "Fan Pack".to_string(),
            vote_count: 10,
            bonus_votes: 0,
            price_cents: 1000,
        }
    }

    #[tokio::test]
    async fn test_list_offered() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_competition("c1", CompetitionStatus::Active)]])
                .append_query_results([[test_package("pk0", None), test_package("pk1", Some("c1"))]]),
        );

        let packages = svc.list_offered("c1").await.unwrap();

        assert_eq!(packages.len(), 2);
    }

    #[tokio::test]
    async fn test_host_cannot_create_global_package() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc.create(&test_user("host1", UserRole::Host), input(None)).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_owner_creates_competition_package() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_competition("c1", CompetitionStatus::Active)]])
                .append_query_results([[test_package("pk1", Some("c1"))]]),
        );

        let package = svc
            .create(&test_user("host1", UserRole::Host), input(Some("c1")))
            .await
            .unwrap();

        assert_eq!(package.competition_id.as_deref(), Some("c1"));
        assert!(package.is_active);
    }

    #[tokio::test]
    async fn test_price_bounds() {
        for price in [0, 100_000_001] {
            let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
            let mut bad = input(None);
            bad.price_cents = price;

            let result = svc.create(&test_user("a1", UserRole::Admin), bad).await;

            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }
}
