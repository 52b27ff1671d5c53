//! Free-vote eligibility.
//!
//! Read-only gate run before a free vote is recorded. The recorder repeats
//! the daily-cap check inside its transaction, so a stale answer here can
//! only let a request through to be rejected there.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use talentvote_common::{AppError, AppResult};
use talentvote_db::{
    entities::{
        competition,
        contestant::{self, ApplicationStatus},
        vote::VoteSource,
    },
    repositories::{CompetitionRepository, ContestantRepository, VoteRepository},
};

/// Who is casting a vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Voter {
    /// Signed-in user; counted per account regardless of IP.
    User { id: String, ip: Option<String> },
    /// Anonymous visitor, counted per client IP.
    Anonymous { ip: String },
}

impl Voter {
    /// Key the daily cap is counted against.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::User { id, .. } => format!("user:{id}"),
            Self::Anonymous { ip } => format!("ip:{ip}"),
        }
    }

    #[must_use]
    pub fn ip(&self) -> Option<&str> {
        match self {
            Self::User { ip, .. } => ip.as_deref(),
            Self::Anonymous { ip } => Some(ip),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User { id, .. } => Some(id),
            Self::Anonymous { .. } => None,
        }
    }
}

/// Calendar day of `now` in the voting timezone.
#[must_use]
pub fn voting_day(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// A vote that passed every gate.
#[derive(Debug, Clone)]
pub struct EligibleVote {
    pub competition: competition::Model,
    pub contestant: contestant::Model,
    pub voter_key: String,
    pub vote_day: NaiveDate,
    /// Free votes already used today, before this one
    pub used_today: u64,
}

/// Competition must be open and the contestant an approved entrant of it.
pub(crate) fn ensure_votable(
    competition: &competition::Model,
    contestant: &contestant::Model,
) -> AppResult<()> {
    if !competition.status.accepts_votes() {
        return Err(AppError::InvalidState(format!(
            "Competition is {} and not accepting votes",
            competition.status.as_str()
        )));
    }
    if contestant.competition_id != competition.id {
        return Err(AppError::InvalidState(
            "Contestant is not part of this competition".to_string(),
        ));
    }
    if contestant.application_status != ApplicationStatus::Approved {
        return Err(AppError::InvalidState(
            "Contestant is not approved for voting".to_string(),
        ));
    }
    Ok(())
}

/// In-person-only competitions refuse online votes.
pub(crate) fn ensure_source_allowed(
    competition: &competition::Model,
    source: VoteSource,
) -> AppResult<()> {
    if competition.in_person_only && source == VoteSource::Online {
        return Err(AppError::PolicyViolation(
            "This competition only accepts in-person votes".to_string(),
        ));
    }
    Ok(())
}

/// Eligibility checks for free votes.
#[derive(Clone)]
pub struct EligibilityService {
    competition_repo: CompetitionRepository,
    contestant_repo: ContestantRepository,
    vote_repo: VoteRepository,
    timezone: Tz,
}

impl EligibilityService {
    /// Create a new eligibility service.
    #[must_use]
    pub const fn new(
        competition_repo: CompetitionRepository,
        contestant_repo: ContestantRepository,
        vote_repo: VoteRepository,
        timezone: Tz,
    ) -> Self {
        Self {
            competition_repo,
            contestant_repo,
            vote_repo,
            timezone,
        }
    }

    /// Timezone whose calendar day bounds the cap.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Run every gate for a free vote, in order.
    pub async fn check(
        &self,
        competition_id: &str,
        contestant_id: &str,
        voter: &Voter,
        source: VoteSource,
        now: DateTime<Utc>,
    ) -> AppResult<EligibleVote> {
        let competition = self.competition_repo.get_by_id(competition_id).await?;
        let contestant = self.contestant_repo.get_by_id(contestant_id).await?;

        ensure_votable(&competition, &contestant)?;
        ensure_source_allowed(&competition, source)?;

        let voter_key = voter.key();
        let vote_day = voting_day(now, self.timezone);
        let used_today = self
            .vote_repo
            .count_free_votes_on_day(&competition.id, &voter_key, vote_day)
            .await?;

        let cap = u64::try_from(competition.max_votes_per_day.max(0)).unwrap_or(0);
        if used_today >= cap {
            tracing::debug!(
                competition_id = %competition.id,
                voter_key = %voter_key,
                used_today,
                "Daily free-vote cap reached"
            );
            return Err(AppError::RateLimited(format!(
                "You have reached the limit of {} free vote(s) for today",
                competition.max_votes_per_day
            )));
        }

        Ok(EligibleVote {
            competition,
            contestant,
            voter_key,
            vote_day,
            used_today,
        })
    }
}
