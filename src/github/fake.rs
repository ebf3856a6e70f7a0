//! In-memory [`Hosting`] used by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::types::{
    Branch, Card, Column, Commit, CommitDetail, CommitRef, Comparison, IssueHit, Label, Project,
    PullRequest, RepoId, SearchResults, Signature, Tag,
};
use super::Hosting;
use crate::error::ExitError;

#[derive(Default)]
struct State {
    projects: Vec<Project>,
    columns: BTreeMap<u64, Vec<Column>>,
    cards: BTreeMap<u64, Vec<Card>>,
    pulls: BTreeMap<u64, PullRequest>,
    search_hits: Vec<u64>,
    branches: Vec<Branch>,
    tags: Vec<Tag>,
    commits: BTreeMap<String, Commit>,
    ahead_by: BTreeMap<String, u64>,
}

/// Board service held entirely in memory. Records every call so tests can
/// assert which endpoints were touched.
pub struct FakeHosting {
    repo: RepoId,
    state: RefCell<State>,
    next_id: Cell<u64>,
    pub calls: RefCell<Vec<String>>,
    pub queries: RefCell<Vec<String>>,
}

impl FakeHosting {
    pub fn new() -> Self {
        Self {
            repo: "apache/incubator-nuttx".parse().expect("valid repo"),
            state: RefCell::new(State::default()),
            next_id: Cell::new(10_000),
            calls: RefCell::new(Vec::new()),
            queries: RefCell::new(Vec::new()),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    /// Add a board with the given columns; returns the board.
    pub fn add_board(&self, name: &str, columns: &[&str]) -> Project {
        let project = Project {
            id: self.next_id(),
            name: name.to_string(),
        };
        let cols: Vec<Column> = columns
            .iter()
            .map(|c| Column {
                id: self.next_id(),
                name: (*c).to_string(),
            })
            .collect();
        let mut state = self.state.borrow_mut();
        for col in &cols {
            state.cards.insert(col.id, Vec::new());
        }
        state.columns.insert(project.id, cols);
        state.projects.push(project.clone());
        project
    }

    pub fn column(&self, project: &Project, name: &str) -> Column {
        self.state.borrow().columns[&project.id]
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .expect("column exists")
    }

    /// Put a card referencing PR `number` into a column.
    pub fn add_pr_card(&self, project: &Project, column: &str, number: u64) -> Card {
        let url = format!(
            "https://api.github.com/repos/{}/issues/{number}",
            self.repo
        );
        self.add_card(project, column, Some(url), None)
    }

    pub fn add_card(
        &self,
        project: &Project,
        column: &str,
        content_url: Option<String>,
        note: Option<String>,
    ) -> Card {
        let col = self.column(project, column);
        let card = Card {
            id: self.next_id(),
            content_url,
            note,
        };
        self.state
            .borrow_mut()
            .cards
            .get_mut(&col.id)
            .expect("column cards")
            .push(card.clone());
        card
    }

    /// Register a pull request; `merged` also makes it a search hit.
    pub fn add_pull(&self, number: u64, title: &str, labels: &[&str], merged: bool) {
        let pr = PullRequest {
            id: 900_000 + number,
            number,
            title: title.to_string(),
            body: Some(format!("Body of {title}")),
            labels: labels
                .iter()
                .map(|l| Label {
                    name: (*l).to_string(),
                })
                .collect(),
            html_url: None,
            merged_at: Some(Utc::now()),
        };
        let mut state = self.state.borrow_mut();
        state.pulls.insert(number, pr);
        if merged {
            state.search_hits.push(number);
        }
    }

    /// PR numbers currently referenced by a column, in order.
    pub fn column_numbers(&self, project: &Project, name: &str) -> Vec<u64> {
        let col = self.column(project, name);
        self.state.borrow().cards[&col.id]
            .iter()
            .filter_map(|c| c.content_url.as_deref())
            .filter_map(crate::reconcile::parse_issue_id)
            .collect()
    }

    pub fn add_branch(&self, name: &str, sha: &str) {
        self.state.borrow_mut().branches.push(Branch {
            name: name.to_string(),
            commit: CommitRef {
                sha: sha.to_string(),
            },
        });
    }

    pub fn add_tag(&self, name: &str, sha: &str) {
        self.state.borrow_mut().tags.push(Tag {
            name: name.to_string(),
            commit: CommitRef {
                sha: sha.to_string(),
            },
        });
    }

    /// Register a commit reachable under `reference` (a sha or `sha~N`).
    pub fn add_commit(&self, reference: &str, sha: &str, date: DateTime<Utc>) {
        self.state.borrow_mut().commits.insert(
            reference.to_string(),
            Commit {
                sha: sha.to_string(),
                commit: CommitDetail {
                    committer: Some(Signature { date }),
                },
            },
        );
    }

    pub fn set_ahead_by(&self, head: &str, ahead_by: u64) {
        self.state
            .borrow_mut()
            .ahead_by
            .insert(head.to_string(), ahead_by);
    }

    fn find_column(&self, column_id: u64) -> anyhow::Result<()> {
        let known = self
            .state
            .borrow()
            .columns
            .values()
            .flatten()
            .any(|c| c.id == column_id);
        if known {
            Ok(())
        } else {
            Err(not_found(&format!("/projects/columns/{column_id}")))
        }
    }
}

fn not_found(endpoint: &str) -> anyhow::Error {
    ExitError::Api {
        status: 404,
        endpoint: endpoint.to_string(),
        message: "resource not found".to_string(),
    }
    .into()
}

impl Hosting for FakeHosting {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    fn projects(&self) -> anyhow::Result<Vec<Project>> {
        self.record("projects".to_string());
        Ok(self.state.borrow().projects.clone())
    }

    fn create_project(&self, name: &str) -> anyhow::Result<Project> {
        self.record(format!("create_project {name}"));
        if self.state.borrow().projects.iter().any(|p| p.name == name) {
            return Err(ExitError::Api {
                status: 422,
                endpoint: "/projects".to_string(),
                message: "Validation Failed".to_string(),
            }
            .into());
        }
        Ok(self.add_board(name, &[]))
    }

    fn columns(&self, project: &Project) -> anyhow::Result<Vec<Column>> {
        self.record(format!("columns {}", project.name));
        self.state
            .borrow()
            .columns
            .get(&project.id)
            .cloned()
            .ok_or_else(|| not_found(&format!("/projects/{}/columns", project.id)))
    }

    fn create_column(&self, project: &Project, name: &str) -> anyhow::Result<Column> {
        self.record(format!("create_column {name}"));
        let column = Column {
            id: self.next_id(),
            name: name.to_string(),
        };
        let mut state = self.state.borrow_mut();
        state.cards.insert(column.id, Vec::new());
        state
            .columns
            .get_mut(&project.id)
            .ok_or_else(|| not_found(&format!("/projects/{}/columns", project.id)))?
            .push(column.clone());
        Ok(column)
    }

    fn cards(&self, column: &Column) -> anyhow::Result<Vec<Card>> {
        self.record(format!("cards {}", column.name));
        self.find_column(column.id)?;
        Ok(self.state.borrow().cards[&column.id].clone())
    }

    fn create_card(&self, column: &Column, pr: &PullRequest) -> anyhow::Result<Card> {
        self.record(format!("create_card {} {}", column.name, pr.number));
        self.find_column(column.id)?;
        let card = Card {
            id: self.next_id(),
            content_url: Some(format!(
                "https://api.github.com/repos/{}/issues/{}",
                self.repo, pr.number
            )),
            note: None,
        };
        self.state
            .borrow_mut()
            .cards
            .get_mut(&column.id)
            .expect("column cards")
            .push(card.clone());
        Ok(card)
    }

    fn move_card(&self, card: &Card, column: &Column) -> anyhow::Result<()> {
        self.record(format!("move_card {} {}", card.id, column.name));
        self.find_column(column.id)?;
        let mut state = self.state.borrow_mut();
        for cards in state.cards.values_mut() {
            cards.retain(|c| c.id != card.id);
        }
        state
            .cards
            .get_mut(&column.id)
            .expect("column cards")
            .push(card.clone());
        Ok(())
    }

    fn search_issues(&self, query: &str) -> anyhow::Result<SearchResults> {
        self.record("search_issues".to_string());
        self.queries.borrow_mut().push(query.to_string());
        let state = self.state.borrow();
        let items: Vec<IssueHit> = state
            .search_hits
            .iter()
            .map(|n| IssueHit { number: *n })
            .collect();
        Ok(SearchResults {
            total_count: items.len() as u64,
            items,
        })
    }

    fn pull_request(&self, number: u64) -> anyhow::Result<PullRequest> {
        self.record(format!("pull_request {number}"));
        self.state
            .borrow()
            .pulls
            .get(&number)
            .cloned()
            .ok_or_else(|| not_found(&format!("/pulls/{number}")))
    }

    fn pull_request_diff(&self, pr: &PullRequest) -> anyhow::Result<String> {
        self.record(format!("diff {}", pr.number));
        Ok(format!(
            "diff --git a/pr{0}.c b/pr{0}.c\n--- a/pr{0}.c\n+++ b/pr{0}.c\n@@ -1 +1 @@\n-old\n+new\n",
            pr.number
        ))
    }

    fn branches(&self) -> anyhow::Result<Vec<Branch>> {
        self.record("branches".to_string());
        Ok(self.state.borrow().branches.clone())
    }

    fn compare(&self, base: &str, head: &str) -> anyhow::Result<Comparison> {
        self.record(format!("compare {base}...{head}"));
        let ahead_by = self
            .state
            .borrow()
            .ahead_by
            .get(head)
            .copied()
            .ok_or_else(|| not_found(&format!("/compare/{base}...{head}")))?;
        Ok(Comparison { ahead_by })
    }

    fn commit(&self, reference: &str) -> anyhow::Result<Commit> {
        self.record(format!("commit {reference}"));
        self.state
            .borrow()
            .commits
            .get(reference)
            .cloned()
            .ok_or_else(|| not_found(&format!("/commits/{reference}")))
    }

    fn tags(&self) -> anyhow::Result<Vec<Tag>> {
        self.record("tags".to_string());
        Ok(self.state.borrow().tags.clone())
    }
}
