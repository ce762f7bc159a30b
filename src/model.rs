use chrono::{DateTime, Datelike};
use serde::Deserialize;
use std::str::FromStr;

/// One contributor's activity for one week, as GitHub reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WeeklyRecord {
    /// Start of the week, unix seconds.
    #[serde(rename = "w")]
    pub week_start: i64,
    #[serde(rename = "a")]
    pub additions: i64,
    #[serde(rename = "d")]
    pub deletions: i64,
}

impl WeeklyRecord {
    #[cfg(test)]
    pub fn new(week_start: i64, additions: i64, deletions: i64) -> Self {
        Self {
            week_start,
            additions,
            deletions,
        }
    }

    /// Calendar year (UTC) the week starts in, if the timestamp is representable.
    pub fn utc_year(&self) -> Option<i32> {
        DateTime::from_timestamp(self.week_start, 0).map(|dt| dt.year())
    }
}

#[derive(Debug, Deserialize)]
struct Author {
    login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContributorStats {
    #[serde(default, deserialize_with = "author_login")]
    pub author: Option<String>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub weeks: Vec<WeeklyRecord>,
}

fn author_login<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let author: Option<Author> = Option::deserialize(deserializer)?;
    Ok(author.map(|a| a.login))
}

/// How the "updated" metric is derived from a week's additions and deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatedFormula {
    /// `min(additions, deletions)`: lines touched in both directions.
    #[default]
    Overlap,
    /// `additions - deletions`: net line delta. May be negative.
    Net,
}

impl UpdatedFormula {
    pub fn updated(self, additions: i64, deletions: i64) -> i64 {
        match self {
            UpdatedFormula::Overlap => additions.min(deletions),
            UpdatedFormula::Net => additions.saturating_sub(deletions),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UpdatedFormula::Overlap => "min(added, removed)",
            UpdatedFormula::Net => "added - removed",
        }
    }
}

impl FromStr for UpdatedFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overlap" | "min" => Ok(UpdatedFormula::Overlap),
            "net" => Ok(UpdatedFormula::Net),
            other => Err(format!("unknown updated formula `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateBucket {
    pub added: i64,
    pub removed: i64,
    pub updated: i64,
}

impl AggregateBucket {
    pub fn record(&mut self, week: &WeeklyRecord, formula: UpdatedFormula) {
        self.added = self.added.saturating_add(week.additions);
        self.removed = self.removed.saturating_add(week.deletions);
        self.updated = self
            .updated
            .saturating_add(formula.updated(week.additions, week.deletions));
    }

    /// Metric name/value pairs in display order.
    pub fn metrics(&self) -> [(&'static str, i64); 3] {
        [
            ("Added", self.added),
            ("Removed", self.removed),
            ("Updated", self.updated),
        ]
    }

    pub fn is_empty(&self) -> bool {
        *self == AggregateBucket::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearBucket {
    pub year: i32,
    pub bucket: AggregateBucket,
}

impl YearBucket {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            bucket: AggregateBucket::default(),
        }
    }
}

/// Everything the renderer needs from one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    pub username: String,
    pub formula: UpdatedFormula,
    pub lifetime: AggregateBucket,
    pub current_year: YearBucket,
    pub previous_year: Option<YearBucket>,
    pub repos_seen: usize,
    pub repos_skipped: usize,
}

impl Totals {
    /// Buckets with their display labels: lifetime first, then the years.
    pub fn labelled_buckets(&self) -> Vec<(String, AggregateBucket)> {
        let mut out = vec![("Lifetime".to_string(), self.lifetime)];
        out.push((self.current_year.year.to_string(), self.current_year.bucket));
        if let Some(prev) = &self.previous_year {
            out.push((prev.year.to_string(), prev.bucket));
        }
        out
    }
}
