//! Competition service.

use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use talentvote_common::{AppError, AppResult, IdGenerator};
use talentvote_db::{
    entities::{
        competition::{self, CompetitionStatus},
        contestant, user,
    },
    repositories::{CompetitionRepository, ContestantRepository},
};
use validator::Validate;

/// Owners and admins may manage a competition.
pub(crate) fn ensure_can_manage(
    actor: &user::Model,
    competition: &competition::Model,
) -> AppResult<()> {
    if actor.is_admin() || competition.host_id == actor.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the host or an admin can manage this competition".to_string(),
        ))
    }
}

/// Input for creating a competition.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompetitionInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    #[validate(length(max = 4096))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 10_000_000))]
    pub vote_cost_cents: i64,
    #[validate(range(min = 1, max = 1000))]
    pub max_votes_per_day: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub online_vote_weight: Option<i32>,
    #[serde(default)]
    pub in_person_only: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Input for updating a competition. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompetitionInput {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub category: Option<String>,
    pub description: Option<Option<String>>,
    #[validate(range(min = 0, max = 10_000_000))]
    pub vote_cost_cents: Option<i64>,
    #[validate(range(min = 1, max = 1000))]
    pub max_votes_per_day: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub online_vote_weight: Option<i32>,
    pub in_person_only: Option<bool>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
}

/// One leaderboard row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub contestant: contestant::Model,
    pub weighted_score: f64,
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> AppResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => Err(AppError::Validation(
            "End date must be after start date".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Service for managing competitions.
#[derive(Clone)]
pub struct CompetitionService {
    competition_repo: CompetitionRepository,
    contestant_repo: ContestantRepository,
    default_max_votes_per_day: i32,
    id_gen: IdGenerator,
}

impl CompetitionService {
    /// Create a new competition service.
    #[must_use]
    pub const fn new(
        competition_repo: CompetitionRepository,
        contestant_repo: ContestantRepository,
        default_max_votes_per_day: i32,
    ) -> Self {
        Self {
            competition_repo,
            contestant_repo,
            default_max_votes_per_day,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Queries ====================

    /// Get a competition. Drafts are only visible to whoever can manage them.
    pub async fn get(
        &self,
        viewer: Option<&user::Model>,
        id: &str,
    ) -> AppResult<competition::Model> {
        let competition = self.competition_repo.get_by_id(id).await?;
        if competition.status == CompetitionStatus::Draft
            && !viewer.is_some_and(|v| ensure_can_manage(v, &competition).is_ok())
        {
            return Err(AppError::NotFound(format!("Competition {id} not found")));
        }
        Ok(competition)
    }

    /// List published competitions, optionally narrowed to some statuses.
    pub async fn list(
        &self,
        statuses: &[CompetitionStatus],
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<competition::Model>> {
        let published: Vec<CompetitionStatus> = if statuses.is_empty() {
            vec![
                CompetitionStatus::Active,
                CompetitionStatus::Voting,
                CompetitionStatus::Completed,
            ]
        } else {
            statuses
                .iter()
                .copied()
                .filter(|s| *s != CompetitionStatus::Draft)
                .collect()
        };
        if published.is_empty() {
            return Ok(Vec::new());
        }
        self.competition_repo
            .list(&published, limit.min(100), until_id)
            .await
    }

    /// Competitions hosted by the actor, drafts included.
    pub async fn list_hosted(&self, actor: &user::Model) -> AppResult<Vec<competition::Model>> {
        self.competition_repo.find_by_host(&actor.id).await
    }

    /// Approved contestants ranked by weighted score.
    pub async fn leaderboard(
        &self,
        competition_id: &str,
        limit: u64,
    ) -> AppResult<Vec<LeaderboardEntry>> {
        let competition = self.get(None, competition_id).await?;
        let weight = competition.online_vote_weight;

        let contestants = self
            .contestant_repo
            .leaderboard(&competition.id, weight, limit.min(500))
            .await?;

        Ok(contestants
            .into_iter()
            .enumerate()
            .map(|(i, contestant)| LeaderboardEntry {
                rank: i + 1,
                weighted_score: contestant.weighted_score(weight),
                contestant,
            })
            .collect())
    }

    // ==================== Management ====================

    /// Create a competition owned by the actor, in `draft`.
    pub async fn create(
        &self,
        actor: &user::Model,
        input: CreateCompetitionInput,
    ) -> AppResult<competition::Model> {
        if !actor.role.can_host() {
            return Err(AppError::Forbidden(
                "Only hosts can create competitions".to_string(),
            ));
        }
        input.validate()?;
        check_dates(input.start_date, input.end_date)?;

        let now = Utc::now();
        let model = competition::ActiveModel {
            id: Set(self.id_gen.generate()),
            host_id: Set(actor.id.clone()),
            title: Set(input.title.trim().to_string()),
            category: Set(input.category.trim().to_string()),
            description: Set(input.description),
            status: Set(CompetitionStatus::Draft),
            vote_cost_cents: Set(input.vote_cost_cents),
            max_votes_per_day: Set(input
                .max_votes_per_day
                .unwrap_or(self.default_max_votes_per_day)),
            online_vote_weight: Set(input.online_vote_weight.unwrap_or(100)),
            in_person_only: Set(input.in_person_only),
            start_date: Set(input.start_date.map(Into::into)),
            end_date: Set(input.end_date.map(Into::into)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let competition = self.competition_repo.create(model).await?;
        tracing::info!(competition_id = %competition.id, host_id = %actor.id, "Created competition");
        Ok(competition)
    }

    /// Update settings. Completed competitions only take corrections from admins.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdateCompetitionInput,
    ) -> AppResult<competition::Model> {
        input.validate()?;
        let competition = self.competition_repo.get_by_id(id).await?;
        ensure_can_manage(actor, &competition)?;
        if competition.status == CompetitionStatus::Completed && !actor.is_admin() {
            return Err(AppError::InvalidState(
                "Completed competitions can only be corrected by an admin".to_string(),
            ));
        }

        let start = input
            .start_date
            .unwrap_or_else(|| competition.start_date.map(|d| d.with_timezone(&Utc)));
        let end = input
            .end_date
            .unwrap_or_else(|| competition.end_date.map(|d| d.with_timezone(&Utc)));
        check_dates(start, end)?;

        let mut active: competition::ActiveModel = competition.into();
        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(category) = input.category {
            active.category = Set(category.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(cost) = input.vote_cost_cents {
            active.vote_cost_cents = Set(cost);
        }
        if let Some(max) = input.max_votes_per_day {
            active.max_votes_per_day = Set(max);
        }
        if let Some(weight) = input.online_vote_weight {
            active.online_vote_weight = Set(weight);
        }
        if let Some(in_person_only) = input.in_person_only {
            active.in_person_only = Set(in_person_only);
        }
        active.start_date = Set(start.map(Into::into));
        active.end_date = Set(end.map(Into::into));
        active.updated_at = Set(Utc::now().into());

        self.competition_repo.update(active).await
    }

    /// Move a competition to another status.
    ///
    /// Admins may also reopen a completed competition for voting.
    pub async fn transition(
        &self,
        actor: &user::Model,
        id: &str,
        next: CompetitionStatus,
    ) -> AppResult<competition::Model> {
        let competition = self.competition_repo.get_by_id(id).await?;
        ensure_can_manage(actor, &competition)?;

        let current = competition.status;
        let reopen = actor.is_admin()
            && current == CompetitionStatus::Completed
            && next == CompetitionStatus::Voting;
        if !current.can_transition_to(next) && !reopen {
            return Err(AppError::InvalidState(format!(
                "Cannot move a competition from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }

        let mut active: competition::ActiveModel = competition.into();
        active.status = Set(next);
        active.updated_at = Set(Utc::now().into());
        let updated = self.competition_repo.update(active).await?;

        tracing::info!(
            competition_id = %updated.id,
            from = current.as_str(),
            to = next.as_str(),
            actor_id = %actor.id,
            "Competition status changed"
        );
        Ok(updated)
    }
}
