use crate::config::RetryPolicy;
use crate::github::{StatsResponse, StatsSource};
use crate::model::ContributorStats;
use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::{info, warn};

/// How a poll ended. Callers that only care about the data use [`StatsPoller::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready {
        stats: Vec<ContributorStats>,
        attempts: u32,
    },
    /// Still computing after every attempt.
    Exhausted { attempts: u32 },
    Failed { status: Option<StatusCode> },
}

impl PollOutcome {
    pub fn into_stats(self) -> Option<Vec<ContributorStats>> {
        match self {
            PollOutcome::Ready { stats, .. } => Some(stats),
            PollOutcome::Exhausted { .. } | PollOutcome::Failed { .. } => None,
        }
    }
}

pub struct StatsPoller<'a, S: ?Sized> {
    source: &'a S,
    username: &'a str,
    policy: RetryPolicy,
}

impl<'a, S: StatsSource + ?Sized> StatsPoller<'a, S> {
    pub fn new(source: &'a S, username: &'a str, policy: RetryPolicy) -> Self {
        Self {
            source,
            username,
            policy,
        }
    }

    #[cfg(test)]
    pub fn username(&self) -> &'a str {
        self.username
    }

    /// Contributor stats for `repo`, or `None` when they are not available.
    pub async fn poll(&self, repo: &str) -> Option<Vec<ContributorStats>> {
        self.poll_outcome(repo).await.into_stats()
    }

    pub async fn poll_outcome(&self, repo: &str) -> PollOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.source.contributor_stats(self.username, repo).await {
                Ok(StatsResponse::Ready(stats)) => {
                    return PollOutcome::Ready {
                        stats,
                        attempts: attempt,
                    };
                }
                Ok(StatsResponse::Processing) => {
                    if attempt >= max_attempts {
                        warn!(repo, attempts = attempt, "stats still being computed; giving up");
                        return PollOutcome::Exhausted { attempts: attempt };
                    }
                    info!(
                        repo,
                        attempt,
                        delay_secs = self.policy.delay.as_secs_f64(),
                        "stats are being computed, retrying"
                    );
                    sleep(self.policy.delay).await;
                }
                Ok(StatsResponse::Failed { status, body }) => {
                    warn!(repo, status = status.as_u16(), %body, "skipping repository");
                    return PollOutcome::Failed {
                        status: Some(status),
                    };
                }
                Err(e) => {
                    warn!(repo, "skipping repository: {e:#}");
                    return PollOutcome::Failed { status: None };
                }
            }
        }
    }
}
