use crate::github::StatsSource;
use crate::model::{
    AggregateBucket, ContributorStats, Totals, UpdatedFormula, WeeklyRecord, YearBucket,
};
use crate::poller::StatsPoller;
use tracing::{debug, info};

/// Folds weekly records into lifetime and per-year buckets.
///
/// The reference year is supplied by the caller so runs are reproducible;
/// the binary passes the current UTC year.
#[derive(Debug, Clone)]
pub struct Aggregator {
    formula: UpdatedFormula,
    lifetime: AggregateBucket,
    current_year: YearBucket,
    previous_year: Option<YearBucket>,
    repos_seen: usize,
    repos_skipped: usize,
}

impl Aggregator {
    pub fn new(reference_year: i32, formula: UpdatedFormula, track_previous_year: bool) -> Self {
        Self {
            formula,
            lifetime: AggregateBucket::default(),
            current_year: YearBucket::new(reference_year),
            previous_year: track_previous_year.then(|| YearBucket::new(reference_year - 1)),
            repos_seen: 0,
            repos_skipped: 0,
        }
    }

    pub fn add_week(&mut self, week: &WeeklyRecord) {
        self.lifetime.record(week, self.formula);

        let Some(year) = week.utc_year() else {
            return;
        };

        if year == self.current_year.year {
            self.current_year.bucket.record(week, self.formula);
        } else if let Some(prev) = self.previous_year.as_mut().filter(|p| p.year == year) {
            prev.bucket.record(week, self.formula);
        }
    }

    pub fn add_contributors(&mut self, contributors: &[ContributorStats]) {
        for contributor in contributors {
            for week in &contributor.weeks {
                self.add_week(week);
            }
        }
    }

    /// Count one repository; `None` means its stats were not available.
    pub fn add_repo(&mut self, stats: Option<&[ContributorStats]>) {
        self.repos_seen += 1;
        match stats {
            Some(contributors) => self.add_contributors(contributors),
            None => self.repos_skipped += 1,
        }
    }

    /// Poll every repository in order and fold whatever comes back.
    pub async fn aggregate_repos<S>(&mut self, repos: &[String], poller: &StatsPoller<'_, S>)
    where
        S: StatsSource + ?Sized,
    {
        for (i, repo) in repos.iter().enumerate() {
            info!("Processing {repo} ({}/{})...", i + 1, repos.len());
            let stats = poller.poll(repo).await;
            if let Some(contributors) = &stats {
                let authors: Vec<&str> = contributors
                    .iter()
                    .map(|c| c.author.as_deref().unwrap_or("ghost"))
                    .collect();
                let commits: i64 = contributors.iter().map(|c| c.total).sum();
                debug!(repo, commits, ?authors, "contributor stats ready");
            }
            self.add_repo(stats.as_deref());
        }
    }

    pub fn finish(self, username: &str) -> Totals {
        Totals {
            username: username.to_string(),
            formula: self.formula,
            lifetime: self.lifetime,
            current_year: self.current_year,
            previous_year: self.previous_year,
            repos_seen: self.repos_seen,
            repos_skipped: self.repos_skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::StatsResponse;
    use crate::poller::tests::{FakeSource, instant, ready};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const YEAR: i32 = 2026;

    fn week_in(year: i32, additions: i64, deletions: i64) -> WeeklyRecord {
        let ts = Utc
            .with_ymd_and_hms(year, 3, 1, 0, 0, 0)
            .single()
            .unwrap()
            .timestamp();
        WeeklyRecord::new(ts, additions, deletions)
    }

    fn synthetic_source() -> FakeSource {
        FakeSource::default()
            .with_repo("first", vec![ready(vec![week_in(YEAR, 10, 4)])])
            .with_repo("second", vec![ready(vec![week_in(YEAR - 1, 5, 5)])])
    }

    async fn run(source: &FakeSource, formula: UpdatedFormula) -> Totals {
        let repos = source.list_repos("mkr302").await.unwrap();
        let poller = StatsPoller::new(source, "mkr302", instant());
        let mut agg = Aggregator::new(YEAR, formula, true);
        agg.aggregate_repos(&repos, &poller).await;
        agg.finish(poller.username())
    }

    #[tokio::test]
    async fn synthetic_two_repo_overlap() {
        let totals = run(&synthetic_source(), UpdatedFormula::Overlap).await;

        assert_eq!(
            totals.lifetime,
            AggregateBucket {
                added: 15,
                removed: 9,
                updated: 9,
            }
        );
        assert_eq!(
            totals.current_year,
            YearBucket {
                year: YEAR,
                bucket: AggregateBucket {
                    added: 10,
                    removed: 4,
                    updated: 4,
                },
            }
        );
        assert_eq!(
            totals.previous_year.unwrap().bucket,
            AggregateBucket {
                added: 5,
                removed: 5,
                updated: 5,
            }
        );
        assert_eq!(totals.repos_seen, 2);
        assert_eq!(totals.repos_skipped, 0);
    }

    #[tokio::test]
    async fn synthetic_two_repo_net() {
        let totals = run(&synthetic_source(), UpdatedFormula::Net).await;

        assert_eq!(totals.lifetime.updated, 6);
        assert_eq!(totals.current_year.bucket.updated, 6);
        assert_eq!(totals.previous_year.unwrap().bucket.updated, 0);
        assert_eq!(totals.formula, UpdatedFormula::Net);
    }

    #[tokio::test]
    async fn exhausted_repo_contributes_nothing() {
        let source = synthetic_source().with_repo("busy", vec![StatsResponse::Processing]);
        let totals = run(&source, UpdatedFormula::Overlap).await;

        assert_eq!(source.calls("busy"), 5);
        assert_eq!(totals.lifetime.added, 15);
        assert_eq!(totals.repos_seen, 3);
        assert_eq!(totals.repos_skipped, 1);
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let a = run(&synthetic_source(), UpdatedFormula::Overlap).await;
        let b = run(&synthetic_source(), UpdatedFormula::Overlap).await;
        assert_eq!(a, b);
    }

    #[test]
    fn only_reference_year_lands_in_current_bucket() {
        let weeks = [
            week_in(YEAR, 1, 0),
            week_in(YEAR, 2, 0),
            week_in(YEAR - 1, 4, 0),
            week_in(YEAR - 2, 8, 0),
            week_in(YEAR + 1, 16, 0),
        ];
        let mut agg = Aggregator::new(YEAR, UpdatedFormula::Overlap, true);
        for w in &weeks {
            agg.add_week(w);
        }
        let totals = agg.finish("u");

        assert_eq!(totals.lifetime.added, 31);
        assert_eq!(totals.current_year.bucket.added, 3);
        assert_eq!(totals.previous_year.unwrap().bucket.added, 4);
    }

    #[test]
    fn sum_is_order_independent() {
        let mut weeks: Vec<WeeklyRecord> = (0..20)
            .map(|i| week_in(YEAR - (i % 3), i as i64 * 7 % 13, i as i64 * 5 % 11))
            .collect();

        let mut forward = Aggregator::new(YEAR, UpdatedFormula::Overlap, true);
        weeks.iter().for_each(|w| forward.add_week(w));

        weeks.reverse();
        weeks.rotate_left(7);
        let mut shuffled = Aggregator::new(YEAR, UpdatedFormula::Overlap, true);
        weeks.iter().for_each(|w| shuffled.add_week(w));

        let expected: i64 = weeks.iter().map(|w| w.additions).sum();
        let forward = forward.finish("u");
        assert_eq!(forward.lifetime.added, expected);
        assert_eq!(forward, shuffled.finish("u"));
    }

    #[test]
    fn previous_year_untracked() {
        let mut agg = Aggregator::new(YEAR, UpdatedFormula::Overlap, false);
        agg.add_week(&week_in(YEAR - 1, 3, 1));
        let totals = agg.finish("u");

        assert_eq!(totals.previous_year, None);
        assert_eq!(totals.lifetime.added, 3);
        assert!(totals.current_year.bucket.is_empty());
    }

    #[test]
    fn empty_and_missing_contribute_zero() {
        let mut agg = Aggregator::new(YEAR, UpdatedFormula::Overlap, true);
        agg.add_repo(None);
        agg.add_repo(Some(&[ContributorStats {
            author: None,
            total: 0,
            weeks: Vec::new(),
        }]));
        let totals = agg.finish("u");

        assert!(totals.lifetime.is_empty());
        assert_eq!(totals.repos_seen, 2);
        assert_eq!(totals.repos_skipped, 1);
    }

    #[test]
    fn negative_counts_flow_through() {
        let mut agg = Aggregator::new(YEAR, UpdatedFormula::Net, true);
        agg.add_week(&week_in(YEAR, -3, 2));
        let totals = agg.finish("u");

        assert_eq!(totals.lifetime.added, -3);
        assert_eq!(totals.lifetime.updated, -5);
    }

    #[test]
    fn oversized_week_does_not_abort_the_run() {
        let mut agg = Aggregator::new(YEAR, UpdatedFormula::Overlap, true);
        agg.add_week(&WeeklyRecord::new(0, i64::MAX, 0));
        agg.add_week(&WeeklyRecord::new(0, 1, 0));
        let totals = agg.finish("u");

        assert_eq!(totals.lifetime.added, i64::MAX);
    }

    #[test]
    fn unrepresentable_timestamp_counts_lifetime_only() {
        let mut agg = Aggregator::new(YEAR, UpdatedFormula::Overlap, true);
        agg.add_week(&WeeklyRecord::new(i64::MAX, 4, 2));
        let totals = agg.finish("u");

        assert_eq!(totals.lifetime.added, 4);
        assert!(totals.current_year.bucket.is_empty());
        assert!(totals.previous_year.unwrap().bucket.is_empty());
    }
}
