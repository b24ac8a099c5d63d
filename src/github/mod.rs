pub mod error;
pub mod ops;
pub mod runner;

pub use error::GitHubError;
pub use ops::{AuthStatus, CreatePullRequestOptions, PullRequestInfo};
pub use runner::GitHub;
