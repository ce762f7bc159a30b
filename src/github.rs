use crate::config::Config;
use crate::error::GithubError;
use crate::model::ContributorStats;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const PER_PAGE: usize = 100;

/// What the contributor stats endpoint said about one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsResponse {
    Ready(Vec<ContributorStats>),
    /// GitHub is still computing the stats (HTTP 202).
    Processing,
    Failed { status: StatusCode, body: String },
}

/// Source of repository names and per-repository contributor stats.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn list_repos(&self, username: &str) -> Result<Vec<String>, GithubError>;

    async fn contributor_stats(
        &self,
        username: &str,
        repo: &str,
    ) -> Result<StatsResponse, GithubError>;
}

#[derive(Clone)]
pub struct GithubClient {
    base: Arc<String>,
    http: Arc<Client>,
}

impl GithubClient {
    /// Create a REST client. The token, when present, is sent on every request.
    pub fn new(config: &Config) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("loc-chart"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        if let Some(token) = &config.token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("GITHUB_TOKEN contains invalid header characters; ignoring it"),
            }
        }

        let http = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            base: Arc::new(config.api_base.trim_end_matches('/').to_string()),
            http: Arc::new(http),
        })
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, String), GithubError> {
        let url = format!("{}{path}", self.base);
        debug!(%url, "GET");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        Ok((status, body))
    }
}

#[async_trait]
impl StatsSource for GithubClient {
    /// List every repository name owned by `username`, following pages.
    async fn list_repos(&self, username: &str) -> Result<Vec<String>, GithubError> {
        let mut out = Vec::new();
        let mut page = 1usize;

        loop {
            let (status, body) = self
                .get(&format!(
                    "/users/{username}/repos?per_page={PER_PAGE}&page={page}"
                ))
                .await?;

            let repo_page = parse_repo_page(status, body)?;
            out.extend(repo_page.names);

            if !repo_page.has_next {
                break;
            }
            page += 1;
        }

        Ok(out)
    }

    async fn contributor_stats(
        &self,
        username: &str,
        repo: &str,
    ) -> Result<StatsResponse, GithubError> {
        let (status, body) = self
            .get(&format!("/repos/{username}/{repo}/stats/contributors"))
            .await?;

        classify_stats_response(status, body)
    }
}

/// One page of `/users/{username}/repos`.
#[derive(Debug, PartialEq, Eq)]
pub struct RepoPage {
    pub names: Vec<String>,
    /// A full page means there may be another one after it.
    pub has_next: bool,
}

pub fn parse_repo_page(status: StatusCode, body: String) -> Result<RepoPage, GithubError> {
    #[derive(Deserialize)]
    struct RepoNode {
        name: String,
    }

    if status != StatusCode::OK {
        return Err(GithubError::Status { status, body });
    }

    let nodes: Vec<RepoNode> = serde_json::from_str(&body)?;
    let has_next = nodes.len() >= PER_PAGE;

    Ok(RepoPage {
        names: nodes.into_iter().map(|n| n.name).collect(),
        has_next,
    })
}

/// Map a raw stats response onto ready / still-computing / failed.
pub fn classify_stats_response(
    status: StatusCode,
    body: String,
) -> Result<StatsResponse, GithubError> {
    match status {
        StatusCode::OK => Ok(StatsResponse::Ready(serde_json::from_str(&body)?)),
        StatusCode::ACCEPTED => Ok(StatsResponse::Processing),
        // Empty repository: nothing to count.
        StatusCode::NO_CONTENT => Ok(StatsResponse::Ready(Vec::new())),
        status => Ok(StatsResponse::Failed { status, body }),
    }
}
