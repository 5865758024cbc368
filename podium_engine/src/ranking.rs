//! The ranking and tie engine.
//!
//! Produces a deterministic leaderboard ordering from a set of submissions. The engine is pure
//! and is reused verbatim by the admin operational leaderboard and the public post-completion
//! results view; the call sites only differ in which statuses they feed in and whether
//! identifying fields get redacted afterwards.

use serde::Serialize;

use crate::db_types::SubmissionStatus;

/// Sentinel rank for submissions that have no final score yet. They are listed, but never ranked
/// and never tied.
pub const UNRANKED: u32 = 999;

/// The statuses that participate in ranking. Draft, PendingPayment and Rejected submissions never
/// appear on a leaderboard.
pub const LEADERBOARD_STATUSES: [SubmissionStatus; 4] = [
    SubmissionStatus::Submitted,
    SubmissionStatus::UnderReview,
    SubmissionStatus::Winner,
    SubmissionStatus::NotSelected,
];

//--------------------------------------  JudgingProgress     --------------------------------------------------------
/// How far judging has progressed for one submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JudgingProgress {
    pub assigned: usize,
    pub completed: usize,
}

impl JudgingProgress {
    pub fn new(assigned: usize, completed: usize) -> Self {
        Self { assigned, completed }
    }

    /// A submission is judging-complete when at least one judge is assigned and every assigned
    /// judge has recorded a score.
    pub fn is_complete(&self) -> bool {
        self.assigned > 0 && self.completed == self.assigned
    }
}

//--------------------------------------     RankSource       --------------------------------------------------------
/// One submission's input into the ranking engine.
#[derive(Debug, Clone)]
pub struct RankSource {
    pub submission_id: i64,
    pub user_id: i64,
    pub title: String,
    pub final_score: Option<f64>,
    pub human_scores_average: Option<f64>,
    pub placement: Option<String>,
    pub is_public: bool,
    pub progress: JudgingProgress,
}

//--------------------------------------     RankedEntry      --------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub submission_id: i64,
    /// `None` after privacy redaction on the public results view.
    pub user_id: Option<i64>,
    pub title: String,
    pub final_score: Option<f64>,
    pub human_scores_average: Option<f64>,
    pub num_judges_assigned: usize,
    pub num_judges_completed: usize,
    pub judging_complete: bool,
    pub has_tie: bool,
    pub placement: Option<String>,
}

//--------------------------------------        rank          --------------------------------------------------------
/// Orders the given submissions and assigns ranks.
///
/// Ordering: judging-complete submissions first; within each group, final score descending with
/// null scores last; submission id ascending as the final tie-break (ordering only — it never
/// affects the rank number).
///
/// Rank assignment applies only to scored submissions. Equal consecutive scores share a rank and
/// are flagged `has_tie`; the next distinct score receives its 1-based position among the scored
/// entries, so a sequence of scores 90, 90, 85 ranks as 1, 1, 3.
pub fn rank(mut sources: Vec<RankSource>) -> Vec<RankedEntry> {
    sources.sort_by(|a, b| {
        let complete_a = a.progress.is_complete();
        let complete_b = b.progress.is_complete();
        complete_b
            .cmp(&complete_a)
            .then_with(|| match (a.final_score, b.final_score) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.submission_id.cmp(&b.submission_id))
    });

    let mut entries: Vec<RankedEntry> = Vec::with_capacity(sources.len());
    let mut scored_position = 0u32;
    let mut current_rank = 1u32;
    let mut previous_score: Option<f64> = None;
    let mut previous_ranked_index: Option<usize> = None;

    for source in sources {
        let judging_complete = source.progress.is_complete();
        let (rank, has_tie) = match source.final_score {
            Some(score) => {
                scored_position += 1;
                let tied = previous_score == Some(score);
                if tied {
                    if let Some(idx) = previous_ranked_index {
                        entries[idx].has_tie = true;
                    }
                } else {
                    current_rank = scored_position;
                }
                previous_score = Some(score);
                previous_ranked_index = Some(entries.len());
                (current_rank, tied)
            },
            None => (UNRANKED, false),
        };
        entries.push(RankedEntry {
            rank,
            submission_id: source.submission_id,
            user_id: Some(source.user_id),
            title: source.title,
            final_score: source.final_score,
            human_scores_average: source.human_scores_average,
            num_judges_assigned: source.progress.assigned,
            num_judges_completed: source.progress.completed,
            judging_complete,
            has_tie,
            placement: source.placement,
        });
    }
    entries
}

#[cfg(test)]
mod test {
    use super::{rank, JudgingProgress, RankSource, UNRANKED};

    fn source(id: i64, score: Option<f64>, assigned: usize, completed: usize) -> RankSource {
        RankSource {
            submission_id: id,
            user_id: id * 10,
            title: format!("entry-{id}"),
            final_score: score,
            human_scores_average: score,
            placement: None,
            is_public: false,
            progress: JudgingProgress::new(assigned, completed),
        }
    }

    #[test]
    fn ties_share_a_rank_and_the_next_score_gets_its_position() {
        let ranked = rank(vec![
            source(1, Some(85.0), 2, 2),
            source(2, Some(90.0), 2, 2),
            source(3, Some(90.0), 2, 2),
        ]);
        let summary: Vec<(i64, u32, bool)> =
            ranked.iter().map(|e| (e.submission_id, e.rank, e.has_tie)).collect();
        // 90, 90, 85 → ranks 1, 1, 3: the tie consumes the second position
        assert_eq!(summary, vec![(2, 1, true), (3, 1, true), (1, 3, false)]);
    }

    #[test]
    fn three_way_tie_flags_all_entries() {
        let ranked = rank(vec![
            source(1, Some(7.5), 1, 1),
            source(2, Some(7.5), 1, 1),
            source(3, Some(7.5), 1, 1),
            source(4, Some(7.0), 1, 1),
        ]);
        assert!(ranked[..3].iter().all(|e| e.rank == 1 && e.has_tie));
        assert_eq!(ranked[3].rank, 4);
        assert!(!ranked[3].has_tie);
    }

    #[test]
    fn incomplete_judging_sorts_after_complete() {
        let ranked = rank(vec![
            source(1, Some(9.0), 2, 1), // higher score, but judging incomplete
            source(2, Some(5.0), 2, 2),
        ]);
        assert_eq!(ranked[0].submission_id, 2);
        assert_eq!(ranked[0].rank, 1);
        assert!(ranked[0].judging_complete);
        // the incomplete submission is still scored, so it still gets a rank
        assert_eq!(ranked[1].submission_id, 1);
        assert_eq!(ranked[1].rank, 2);
        assert!(!ranked[1].judging_complete);
    }

    #[test]
    fn unscored_submissions_get_the_sentinel_rank() {
        let ranked = rank(vec![source(1, None, 0, 0), source(2, Some(6.0), 1, 1)]);
        assert_eq!(ranked[0].submission_id, 2);
        assert_eq!(ranked[1].submission_id, 1);
        assert_eq!(ranked[1].rank, UNRANKED);
        assert!(!ranked[1].has_tie);
    }

    #[test]
    fn zero_assigned_judges_is_not_complete() {
        assert!(!JudgingProgress::new(0, 0).is_complete());
        assert!(!JudgingProgress::new(2, 1).is_complete());
        assert!(JudgingProgress::new(2, 2).is_complete());
    }

    #[test]
    fn identity_breaks_ordering_ties_deterministically() {
        let ranked = rank(vec![source(9, Some(8.0), 1, 1), source(3, Some(8.0), 1, 1)]);
        assert_eq!(ranked[0].submission_id, 3);
        assert_eq!(ranked[1].submission_id, 9);
        assert!(ranked.iter().all(|e| e.rank == 1 && e.has_tie));
    }
}
