//! Free vote casting.

use chrono::Utc;
use talentvote_common::AppResult;
use talentvote_db::entities::vote::{self, VoteSource};

use super::eligibility::{EligibilityService, Voter};
use super::recorder::VoteRecorder;

/// Input for casting a free vote.
#[derive(Debug, Clone)]
pub struct CastVoteInput {
    pub competition_id: String,
    pub contestant_id: String,
    pub voter: Voter,
    pub source: VoteSource,
    pub ref_code: Option<String>,
}

/// Result of a recorded free vote.
#[derive(Debug, Clone)]
pub struct CastVoteResult {
    pub vote: vote::Model,
    /// Free votes the voter still has today in this competition
    pub remaining_today: i64,
}

/// Voting service: eligibility, then the recorder.
#[derive(Clone)]
pub struct VotingService {
    eligibility: EligibilityService,
    recorder: VoteRecorder,
}

impl VotingService {
    /// Create a new voting service.
    #[must_use]
    pub const fn new(eligibility: EligibilityService, recorder: VoteRecorder) -> Self {
        Self {
            eligibility,
            recorder,
        }
    }

    /// Cast one free vote.
    pub async fn cast_vote(&self, input: CastVoteInput) -> AppResult<CastVoteResult> {
        let now = Utc::now();
        let eligible = self
            .eligibility
            .check(
                &input.competition_id,
                &input.contestant_id,
                &input.voter,
                input.source,
                now,
            )
            .await?;

        let vote = self
            .recorder
            .record_free(&eligible, &input.voter, input.source, input.ref_code, now)
            .await?;

        let used = i64::from(vote.daily_slot.unwrap_or(0)) + 1;
        let remaining_today = (i64::from(eligible.competition.max_votes_per_day) - used).max(0);

        Ok(CastVoteResult {
            vote,
            remaining_today,
        })
    }
}
