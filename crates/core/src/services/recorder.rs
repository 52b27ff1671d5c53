//! Vote recorder: the only code path that changes vote counters.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::{ActiveValue::NotSet, Set};
use talentvote_common::{AppResult, IdGenerator};
use talentvote_db::{
    entities::{
        vote::{self, VoteSource},
        vote_purchase,
    },
    repositories::VoteRepository,
};

use super::eligibility::{EligibleVote, Voter, voting_day};

/// Appends ledger rows and bumps contestant counters in one transaction.
#[derive(Clone)]
pub struct VoteRecorder {
    vote_repo: VoteRepository,
    timezone: Tz,
    id_gen: IdGenerator,
}

impl VoteRecorder {
    /// Create a new vote recorder.
    #[must_use]
    pub const fn new(vote_repo: VoteRepository, timezone: Tz) -> Self {
        Self {
            vote_repo,
            timezone,
            id_gen: IdGenerator::new(),
        }
    }

    fn ledger_row(
        &self,
        competition_id: &str,
        contestant_id: &str,
        voter: &Voter,
        source: VoteSource,
        ref_code: Option<String>,
        now: DateTime<Utc>,
    ) -> vote::ActiveModel {
        vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            contestant_id: Set(contestant_id.to_string()),
            competition_id: Set(competition_id.to_string()),
            voter_key: Set(voter.key()),
            voter_ip: Set(voter.ip().map(str::to_string)),
            voter_user_id: Set(voter.user_id().map(str::to_string)),
            source: Set(source),
            kind: NotSet,
            quantity: NotSet,
            vote_day: Set(voting_day(now, self.timezone)),
            daily_slot: NotSet,
            purchase_id: NotSet,
            ref_code: Set(ref_code),
            voted_at: Set(now.into()),
        }
    }

    /// Record one free vote that passed eligibility.
    ///
    /// Returns `RateLimited` if a concurrent vote used the last slot.
    pub async fn record_free(
        &self,
        eligible: &EligibleVote,
        voter: &Voter,
        source: VoteSource,
        ref_code: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<vote::Model> {
        let mut row = self.ledger_row(
            &eligible.competition.id,
            &eligible.contestant.id,
            voter,
            source,
            ref_code,
            now,
        );
        row.vote_day = Set(eligible.vote_day);
        row.purchase_id = Set(None);

        let vote = self
            .vote_repo
            .record_free_vote(row, eligible.competition.max_votes_per_day)
            .await?;

        tracing::info!(
            vote_id = %vote.id,
            competition_id = %vote.competition_id,
            contestant_id = %vote.contestant_id,
            source = ?vote.source,
            "Recorded free vote"
        );
        Ok(vote)
    }

    /// Record a purchase and credit its votes as online purchased votes.
    ///
    /// Returns `Conflict` if the purchase's transaction was already credited.
    pub async fn record_purchase(
        &self,
        purchase: vote_purchase::ActiveModel,
        competition_id: &str,
        contestant_id: &str,
        voter: &Voter,
        ref_code: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<(vote_purchase::Model, vote::Model)> {
        let row = self.ledger_row(
            competition_id,
            contestant_id,
            voter,
            VoteSource::Online,
            ref_code,
            now,
        );

        let (purchase, vote) = self.vote_repo.record_purchase(purchase, row).await?;

        tracing::info!(
            purchase_id = %purchase.id,
            transaction_id = %purchase.transaction_id,
            contestant_id = %vote.contestant_id,
            votes = vote.quantity,
            "Credited purchased votes"
        );
        Ok((purchase, vote))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::{
        count_row, exec_ok, test_competition, test_contestant, test_vote,
    };
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use talentvote_common::AppError;
    use talentvote_db::entities::{competition::CompetitionStatus, vote::VoteKind};

    fn eligible() -> EligibleVote {
        EligibleVote {
            competition: test_competition("c1", CompetitionStatus::Voting),
            contestant: test_contestant("k1", "c1"),
            voter_key: "ip:203.0.113.9".to_string(),
            vote_day: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            used_today: 0,
        }
    }

    fn voter() -> Voter {
        Voter::Anonymous {
            ip: "203.0.113.9".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_free() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .append_query_results([[test_vote(VoteKind::Free, 1, Some(0))]])
                .append_exec_results([exec_ok(1)])
                .into_connection(),
        );

        let recorder = VoteRecorder::new(VoteRepository::new(db), chrono_tz::UTC);
        let vote = recorder
            .record_free(&eligible(), &voter(), VoteSource::Online, None, Utc::now())
            .await
            .unwrap();

        assert_eq!(vote.quantity, 1);
        assert_eq!(vote.daily_slot, Some(0));
    }

    #[tokio::test]
    async fn test_record_free_lost_race() {
        // Eligibility saw 0 used, but the slot was taken before the write
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );

        let recorder = VoteRecorder::new(VoteRepository::new(db), chrono_tz::UTC);
        let result = recorder
            .record_free(&eligible(), &voter(), VoteSource::Online, None, Utc::now())
            .await;

        assert!(matches!(result, Err(AppError::RateLimited(_))));
    }
}
