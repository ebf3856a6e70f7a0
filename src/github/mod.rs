//! Access to the hosting service: repositories, search, pull requests,
//! classic project boards, branches and tags.
//!
//! Workflow code only talks to [`Hosting`]; [`GitHubClient`] is the real
//! implementation and tests use an in-memory one.

mod client;
#[cfg(test)]
pub mod fake;
mod types;

pub use client::{GitHubClient, parse_next_link};
pub use types::{
    Branch, Card, Column, Commit, CommitDetail, CommitRef, Comparison, IssueHit, Label, Project,
    PullRequest, RepoId, RepoIdError, SearchResults, Signature, Tag,
};

/// Operations the release-notes workflow needs from the hosting service.
///
/// Every call is a blocking request; list operations return all pages.
pub trait Hosting {
    /// Repository the implementation is bound to.
    fn repo(&self) -> &RepoId;

    /// All project boards of the repository, open and closed.
    fn projects(&self) -> anyhow::Result<Vec<Project>>;
    fn create_project(&self, name: &str) -> anyhow::Result<Project>;

    fn columns(&self, project: &Project) -> anyhow::Result<Vec<Column>>;
    fn create_column(&self, project: &Project, name: &str) -> anyhow::Result<Column>;

    /// Cards of a column in board order.
    fn cards(&self, column: &Column) -> anyhow::Result<Vec<Card>>;
    /// Append a card referencing `pr` to `column`.
    fn create_card(&self, column: &Column, pr: &PullRequest) -> anyhow::Result<Card>;
    /// Move `card` to the bottom of `column`.
    fn move_card(&self, card: &Card, column: &Column) -> anyhow::Result<()>;

    fn search_issues(&self, query: &str) -> anyhow::Result<SearchResults>;
    fn pull_request(&self, number: u64) -> anyhow::Result<PullRequest>;
    /// Raw unified diff of a pull request.
    fn pull_request_diff(&self, pr: &PullRequest) -> anyhow::Result<String>;

    fn branches(&self) -> anyhow::Result<Vec<Branch>>;
    fn compare(&self, base: &str, head: &str) -> anyhow::Result<Comparison>;
    /// Commit for any ref the API accepts, including `sha~N`.
    fn commit(&self, reference: &str) -> anyhow::Result<Commit>;
    fn tags(&self) -> anyhow::Result<Vec<Tag>>;
}
