use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GithubError {
    #[error("Network error talking to GitHub: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitHub API returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Failed to parse JSON from GitHub: {0}")]
    Decode(#[from] serde_json::Error),
}
