//! Shared test fixtures

pub mod fixtures {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use crate::{
        config::{
            Config, DatabaseConfig, EngineConfig, JwtConfig, NotificationConfig, RedisConfig,
            ServerConfig,
        },
        constants::{notification_backends, roles, storage_backends},
        db::repositories::MemoryRepository,
        middleware::AuthenticatedUser,
        models::{
            AssignmentMode, AssignmentStatus, Criterion, Hackathon, JudgeAssignment,
            JudgingCriteria, ProblemStatement, Round, Scope, Submission, SubmissionStatus, Team,
            User,
        },
        notify::{LogNotifier, Notifier},
        state::AppState,
    };

    pub const JWT_SECRET: &str = "test-secret";

    fn criterion(id: &str, weight: f64) -> Criterion {
        Criterion {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            max_score: 10.0,
            weight,
        }
    }

    /// Hackathon with `rounds` open rounds and two open problem statements.
    /// Every round is scored on "impact" (weight 2) and "demo" (weight 1).
    pub fn hackathon(rounds: i32) -> Hackathon {
        let now = Utc::now();
        Hackathon {
            id: Uuid::new_v4(),
            title: "Test Hack".to_string(),
            organizer_id: Uuid::new_v4(),
            start_date: now,
            end_date: now + chrono::Duration::days(2),
            rounds: (0..rounds)
                .map(|index| Round {
                    index,
                    name: format!("Round {}", index + 1),
                    round_type: None,
                    description: None,
                    start_date: None,
                    end_date: None,
                    assignment_mode: AssignmentMode::Open,
                    judging_criteria: JudgingCriteria {
                        project: vec![criterion("impact", 2.0)],
                        presentation: vec![criterion("demo", 1.0)],
                    },
                })
                .collect(),
            problem_statements: (0..2)
                .map(|index| ProblemStatement {
                    index,
                    statement: format!("Problem {}", index + 1),
                    ps_type: "open".to_string(),
                    assignment_mode: AssignmentMode::Open,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Submitted round-0 entry by a fresh participant
    pub fn submission(hackathon_id: Uuid, team_id: Option<Uuid>) -> Submission {
        let now = Utc::now();
        Submission {
            id: Uuid::new_v4(),
            hackathon_id,
            team_id,
            submitted_by: Uuid::new_v4(),
            title: "Project".to_string(),
            status: SubmissionStatus::Submitted,
            round_index: 0,
            problem_statement_index: None,
            submitted_at: Some(now),
            created_at: now,
        }
    }

    pub fn team(hackathon_id: Uuid, members: usize) -> Team {
        let leader_id = Uuid::new_v4();
        let mut all = vec![leader_id];
        all.extend((1..members.max(1)).map(|_| Uuid::new_v4()));
        Team {
            id: Uuid::new_v4(),
            hackathon_id,
            name: "Team".to_string(),
            leader_id,
            members: all,
        }
    }

    /// Accepted assignment covering one scope
    pub fn accepted(hackathon_id: Uuid, scope: Scope) -> JudgeAssignment {
        let mut assignment = JudgeAssignment::invite(hackathon_id, Uuid::new_v4(), scope);
        assignment.status = AssignmentStatus::Accepted;
        assignment.responded_at = Some(Utc::now());
        assignment
    }

    pub fn judge_record(id: Uuid) -> User {
        User {
            id,
            email: format!("{}@judges.test", id.simple()),
            name: "Judge".to_string(),
            role: roles::JUDGE.to_string(),
        }
    }

    pub fn caller(id: Uuid, role: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            id,
            email: format!("{}@users.test", id.simple()),
            role: role.to_string(),
        }
    }

    pub fn organizer_of(hackathon: &Hackathon) -> AuthenticatedUser {
        caller(hackathon.organizer_id, roles::ORGANIZER)
    }

    pub fn judge(id: Uuid) -> AuthenticatedUser {
        caller(id, roles::JUDGE)
    }

    pub fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                rust_log: "debug".to_string(),
                json_logs: false,
                request_timeout_secs: 5,
            },
            database: DatabaseConfig {
                backend: storage_backends::MEMORY.to_string(),
                url: None,
                max_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
            },
            jwt: JwtConfig {
                secret: JWT_SECRET.to_string(),
            },
            engine: EngineConfig {
                repository_timeout_ms: 1_000,
                notification_timeout_ms: 200,
            },
            notifications: NotificationConfig {
                backend: notification_backends::LOG.to_string(),
                channel: "test".to_string(),
            },
        }
    }

    /// State over an empty memory repository with a log notifier
    pub fn test_state() -> (AppState, Arc<MemoryRepository>) {
        state_with_notifier(Arc::new(LogNotifier))
    }

    pub fn state_with_notifier(notifier: Arc<dyn Notifier>) -> (AppState, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let state = AppState::new(repo.clone(), notifier, test_config());
        (state, repo)
    }

    /// Store `n` judges, invite them to `scope` and accept on their behalf
    pub async fn seed_accepted_judges(
        repo: &MemoryRepository,
        hackathon_id: Uuid,
        scope: Scope,
        n: usize,
    ) -> Vec<JudgeAssignment> {
        use crate::db::EngineRepository;

        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let assignment = accepted(hackathon_id, scope);
            repo.insert_user(judge_record(assignment.judge_id)).await;
            repo.insert_assignment(&assignment).await.unwrap();
            out.push(repo.find_assignment(assignment.id).await.unwrap().unwrap());
        }
        out
    }
}
