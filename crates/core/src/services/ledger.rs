//! Read side of the purchase ledger: buyer lookup and host analytics.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use talentvote_common::{AppError, AppResult};
use talentvote_db::{
    entities::{
        contestant::ApplicationStatus,
        user,
        vote::{VoteKind, VoteSource},
        vote_purchase,
    },
    repositories::{
        CompetitionRepository, ContestantRepository, VotePurchaseRepository, VoteRepository,
    },
};

use super::competition::ensure_can_manage;

/// Most purchases returned by one lookup.
const LOOKUP_LIMIT: u64 = 200;

/// A purchase with the names a buyer recognises.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    pub purchase: vote_purchase::Model,
    pub competition_title: Option<String>,
    pub contestant_name: Option<String>,
}

/// Everything a buyer has purchased.
///
/// `purchases` holds at most the newest 200; the counts and totals cover
/// every matching purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLookup {
    pub purchases: Vec<PurchaseSummary>,
    pub purchase_count: i64,
    pub total_votes_purchased: i64,
    pub total_spent_cents: i64,
}

/// Per-contestant counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestantBreakdown {
    pub contestant_id: String,
    pub display_name: String,
    pub vote_count: i64,
    pub online_vote_count: i64,
    pub in_person_vote_count: i64,
    pub weighted_score: f64,
}

/// Purchase and vote figures for one competition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionAnalytics {
    pub competition_id: String,
    pub purchase_count: i64,
    pub votes_purchased: i64,
    pub revenue_cents: i64,
    pub tax_cents: i64,
    pub free_online_votes: i64,
    pub free_in_person_votes: i64,
    pub unique_free_voters: i64,
    pub contestants: Vec<ContestantBreakdown>,
}

/// Ledger queries.
#[derive(Clone)]
pub struct LedgerService {
    competition_repo: CompetitionRepository,
    contestant_repo: ContestantRepository,
    purchase_repo: VotePurchaseRepository,
    vote_repo: VoteRepository,
}

impl LedgerService {
    /// Create a new ledger service.
    #[must_use]
    pub const fn new(
        competition_repo: CompetitionRepository,
        contestant_repo: ContestantRepository,
        purchase_repo: VotePurchaseRepository,
        vote_repo: VoteRepository,
    ) -> Self {
        Self {
            competition_repo,
            contestant_repo,
            purchase_repo,
            vote_repo,
        }
    }

    /// Purchases made under a name and email, newest first.
    ///
    /// Both are matched case-insensitively, the name after trimming.
    pub async fn lookup(&self, name: &str, email: &str) -> AppResult<PurchaseLookup> {
        let name = name.trim().to_lowercase();
        let email = email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() {
            return Err(AppError::Validation(
                "Name and email are required".to_string(),
            ));
        }

        let purchases = self
            .purchase_repo
            .find_by_buyer(&email, &name, LOOKUP_LIMIT)
            .await?;

        if purchases.is_empty() {
            return Ok(PurchaseLookup {
                purchases: Vec::new(),
                purchase_count: 0,
                total_votes_purchased: 0,
                total_spent_cents: 0,
            });
        }

        let totals = self.purchase_repo.totals_for_buyer(&email, &name).await?;

        let competition_ids: Vec<String> = purchases
            .iter()
            .map(|p| p.competition_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let contestant_ids: Vec<String> = purchases
            .iter()
            .map(|p| p.contestant_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let titles: HashMap<String, String> = self
            .competition_repo
            .find_by_ids(&competition_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.title))
            .collect();
        let names: HashMap<String, String> = self
            .contestant_repo
            .find_by_ids(&contestant_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.display_name))
            .collect();

        let purchases = purchases
            .into_iter()
            .map(|purchase| PurchaseSummary {
                competition_title: titles.get(&purchase.competition_id).cloned(),
                contestant_name: names.get(&purchase.contestant_id).cloned(),
                purchase,
            })
            .collect();

        Ok(PurchaseLookup {
            purchases,
            purchase_count: totals.purchases,
            total_votes_purchased: totals.votes.unwrap_or(0),
            total_spent_cents: totals.revenue_cents.unwrap_or(0),
        })
    }

    /// Analytics for the competition's host or an admin.
    pub async fn analytics(
        &self,
        actor: &user::Model,
        competition_id: &str,
    ) -> AppResult<CompetitionAnalytics> {
        let competition = self.competition_repo.get_by_id(competition_id).await?;
        ensure_can_manage(actor, &competition)?;

        let totals = self
            .purchase_repo
            .totals_for_competition(&competition.id)
            .await?;
        let tallies = self.vote_repo.tally_by_source(&competition.id).await?;
        let unique_free_voters = self.vote_repo.count_unique_voters(&competition.id).await?;
        let contestants = self
            .contestant_repo
            .find_by_competition(&competition.id, Some(ApplicationStatus::Approved))
            .await?;

        let free = |source: VoteSource| {
            tallies
                .iter()
                .filter(|t| t.kind == VoteKind::Free && t.source == source)
                .map(|t| t.total)
                .sum::<i64>()
        };

        let weight = competition.online_vote_weight;
        let contestants = contestants
            .into_iter()
            .map(|c| ContestantBreakdown {
                weighted_score: c.weighted_score(weight),
                contestant_id: c.id,
                display_name: c.display_name,
                vote_count: c.vote_count,
                online_vote_count: c.online_vote_count,
                in_person_vote_count: c.in_person_vote_count,
            })
            .collect();

        Ok(CompetitionAnalytics {
            competition_id: competition.id,
            purchase_count: totals.purchases,
            votes_purchased: totals.votes.unwrap_or(0),
            revenue_cents: totals.revenue_cents.unwrap_or(0),
            tax_cents: totals.tax_cents.unwrap_or(0),
            free_online_votes: free(VoteSource::Online),
            free_in_person_votes: free(VoteSource::InPerson),
            unique_free_voters,
            contestants,
        })
    }
}
