//! Time-bounded repository wrapper
//!
//! Every call gets a deadline. Reads that fail transiently are attempted
//! once more; writes never are, since they may already have landed.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use uuid::Uuid;

use super::EngineRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        Hackathon, JudgeAssignment, ProblemStatement, Round, RoundProgress, Score, Submission,
        Team, User, WinnerBoard,
    },
};

pub struct BoundedRepository<R> {
    inner: R,
    timeout: Duration,
}

impl<R: EngineRepository> BoundedRepository<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn write<T, Fut>(&self, op: &'static str, call: Fut) -> AppResult<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    op,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Repository call timed out"
                );
                Err(AppError::Timeout(format!("repository call '{}'", op)))
            }
        }
    }

    async fn read<T, F, Fut>(&self, op: &'static str, call: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match self.write(op, call()).await {
            Err(e) if e.is_transient() => {
                tracing::debug!(op, error = %e, "Retrying repository read");
                self.write(op, call()).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl<R: EngineRepository> EngineRepository for BoundedRepository<R> {
    async fn find_hackathon(&self, id: Uuid) -> AppResult<Option<Hackathon>> {
        self.read("find_hackathon", || self.inner.find_hackathon(id))
            .await
    }

    async fn update_round(&self, hackathon_id: Uuid, round: &Round) -> AppResult<()> {
        self.write("update_round", self.inner.update_round(hackathon_id, round))
            .await
    }

    async fn update_problem_statement(
        &self,
        hackathon_id: Uuid,
        problem_statement: &ProblemStatement,
    ) -> AppResult<()> {
        self.write(
            "update_problem_statement",
            self.inner
                .update_problem_statement(hackathon_id, problem_statement),
        )
        .await
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        self.read("find_user", || self.inner.find_user(id)).await
    }

    async fn list_teams(&self, hackathon_id: Uuid) -> AppResult<Vec<Team>> {
        self.read("list_teams", || self.inner.list_teams(hackathon_id))
            .await
    }

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
        self.read("find_submission", || self.inner.find_submission(id))
            .await
    }

    async fn list_submissions(&self, hackathon_id: Uuid) -> AppResult<Vec<Submission>> {
        self.read("list_submissions", || {
            self.inner.list_submissions(hackathon_id)
        })
        .await
    }

    async fn find_assignment(&self, id: Uuid) -> AppResult<Option<JudgeAssignment>> {
        self.read("find_assignment", || self.inner.find_assignment(id))
            .await
    }

    async fn list_assignments(&self, hackathon_id: Uuid) -> AppResult<Vec<JudgeAssignment>> {
        self.read("list_assignments", || {
            self.inner.list_assignments(hackathon_id)
        })
        .await
    }

    async fn list_assignments_for_judge(&self, judge_id: Uuid) -> AppResult<Vec<JudgeAssignment>> {
        self.read("list_assignments_for_judge", || {
            self.inner.list_assignments_for_judge(judge_id)
        })
        .await
    }

    async fn insert_assignment(&self, assignment: &JudgeAssignment) -> AppResult<()> {
        self.write("insert_assignment", self.inner.insert_assignment(assignment))
            .await
    }

    async fn save_assignments(
        &self,
        assignments: &[JudgeAssignment],
    ) -> AppResult<Vec<JudgeAssignment>> {
        self.write("save_assignments", self.inner.save_assignments(assignments))
            .await
    }

    async fn delete_assignments(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.write("delete_assignments", self.inner.delete_assignments(ids))
            .await
    }

    async fn list_scores(&self, hackathon_id: Uuid, round_index: i32) -> AppResult<Vec<Score>> {
        self.read("list_scores", || {
            self.inner.list_scores(hackathon_id, round_index)
        })
        .await
    }

    async fn count_scores(&self, hackathon_id: Uuid, round_index: i32) -> AppResult<i64> {
        self.read("count_scores", || {
            self.inner.count_scores(hackathon_id, round_index)
        })
        .await
    }

    async fn replace_scores(
        &self,
        hackathon_id: Uuid,
        round_index: i32,
        submission_id: Uuid,
        judge_id: Uuid,
        scores: &[Score],
    ) -> AppResult<()> {
        self.write(
            "replace_scores",
            self.inner
                .replace_scores(hackathon_id, round_index, submission_id, judge_id, scores),
        )
        .await
    }

    async fn find_round_progress(
        &self,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<Option<RoundProgress>> {
        self.read("find_round_progress", || {
            self.inner.find_round_progress(hackathon_id, round_index)
        })
        .await
    }

    async fn list_round_progress(&self, hackathon_id: Uuid) -> AppResult<Vec<RoundProgress>> {
        self.read("list_round_progress", || {
            self.inner.list_round_progress(hackathon_id)
        })
        .await
    }

    async fn save_round_progress(&self, progress: &RoundProgress) -> AppResult<RoundProgress> {
        self.write("save_round_progress", self.inner.save_round_progress(progress))
            .await
    }

    async fn find_winners(&self, hackathon_id: Uuid) -> AppResult<Option<WinnerBoard>> {
        self.read("find_winners", || self.inner.find_winners(hackathon_id))
            .await
    }

    async fn save_winners(&self, board: &WinnerBoard) -> AppResult<WinnerBoard> {
        self.write("save_winners", self.inner.save_winners(board))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::db::repositories::MemoryRepository;

    /// Fails the first `failures` hackathon reads, sleeps on writes
    struct Flaky {
        inner: MemoryRepository,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl EngineRepository for Flaky {
        async fn find_hackathon(&self, id: Uuid) -> AppResult<Option<Hackathon>> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Database("connection reset".into()));
            }
            self.inner.find_hackathon(id).await
        }
        async fn update_round(&self, _: Uuid, _: &Round) -> AppResult<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        async fn update_problem_statement(&self, h: Uuid, p: &ProblemStatement) -> AppResult<()> {
            self.inner.update_problem_statement(h, p).await
        }
        async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
            self.inner.find_user(id).await
        }
        async fn list_teams(&self, h: Uuid) -> AppResult<Vec<Team>> {
            self.inner.list_teams(h).await
        }
        async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
            self.inner.find_submission(id).await
        }
        async fn list_submissions(&self, h: Uuid) -> AppResult<Vec<Submission>> {
            self.inner.list_submissions(h).await
        }
        async fn find_assignment(&self, id: Uuid) -> AppResult<Option<JudgeAssignment>> {
            self.inner.find_assignment(id).await
        }
        async fn list_assignments(&self, h: Uuid) -> AppResult<Vec<JudgeAssignment>> {
            self.inner.list_assignments(h).await
        }
        async fn list_assignments_for_judge(&self, j: Uuid) -> AppResult<Vec<JudgeAssignment>> {
            self.inner.list_assignments_for_judge(j).await
        }
        async fn insert_assignment(&self, a: &JudgeAssignment) -> AppResult<()> {
            self.inner.insert_assignment(a).await
        }
        async fn save_assignments(&self, a: &[JudgeAssignment]) -> AppResult<Vec<JudgeAssignment>> {
            self.inner.save_assignments(a).await
        }
        async fn delete_assignments(&self, ids: &[Uuid]) -> AppResult<u64> {
            self.inner.delete_assignments(ids).await
        }
        async fn list_scores(&self, h: Uuid, r: i32) -> AppResult<Vec<Score>> {
            self.inner.list_scores(h, r).await
        }
        async fn count_scores(&self, h: Uuid, r: i32) -> AppResult<i64> {
            self.inner.count_scores(h, r).await
        }
        async fn replace_scores(
            &self,
            h: Uuid,
            r: i32,
            s: Uuid,
            j: Uuid,
            scores: &[Score],
        ) -> AppResult<()> {
            self.inner.replace_scores(h, r, s, j, scores).await
        }
        async fn find_round_progress(&self, h: Uuid, r: i32) -> AppResult<Option<RoundProgress>> {
            self.inner.find_round_progress(h, r).await
        }
        async fn list_round_progress(&self, h: Uuid) -> AppResult<Vec<RoundProgress>> {
            self.inner.list_round_progress(h).await
        }
        async fn save_round_progress(&self, p: &RoundProgress) -> AppResult<RoundProgress> {
            self.inner.save_round_progress(p).await
        }
        async fn find_winners(&self, h: Uuid) -> AppResult<Option<WinnerBoard>> {
            self.inner.find_winners(h).await
        }
        async fn save_winners(&self, b: &WinnerBoard) -> AppResult<WinnerBoard> {
            self.inner.save_winners(b).await
        }
    }

    fn flaky(failures: usize) -> BoundedRepository<Flaky> {
        BoundedRepository::new(
            Flaky {
                inner: MemoryRepository::new(),
                failures: AtomicUsize::new(failures),
            },
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_transient_read_is_retried_once() {
        let repo = flaky(1);
        assert!(repo.find_hackathon(Uuid::new_v4()).await.unwrap().is_none());

        let repo = flaky(2);
        let err = repo.find_hackathon(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_slow_write_times_out() {
        let repo = flaky(0);
        let h = crate::test_utils::fixtures::hackathon(1);
        let err = repo.update_round(h.id, &h.rounds[0]).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }
}
