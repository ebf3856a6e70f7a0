//! Which merged pull requests still need a card.
//!
//! The "of interest" set is every PR merged inside the operator's window
//! minus every PR already referenced by a card on some release board, cards
//! in "Not Applicable" excepted. Nothing here is persisted, so running it
//! again against the same boards gives the same answer.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::board::{BoardNaming, ColumnKind};
use crate::github::{Hosting, RepoId};

/// One end of a merge window, kept exactly as typed so the search query
/// carries the operator's own syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowBound {
    Unbounded,
    At(String),
}

impl WindowBound {
    /// Accepts `*`, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]`, or RFC 3339.
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        if input == "*" {
            return Ok(Self::Unbounded);
        }
        if instant(input).is_none() {
            anyhow::bail!(
                "{input:?} is not a date; use YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS+00:00 or *"
            );
        }
        Ok(Self::At(input.to_string()))
    }
}

impl fmt::Display for WindowBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("*"),
            Self::At(s) => f.write_str(s),
        }
    }
}

fn instant(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Inclusive merge-date window.
///
/// Bounds are not ordered against each other: they may carry different
/// offsets, and the search service is the judge of an empty range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub start: WindowBound,
    pub end: WindowBound,
}

impl DateWindow {
    pub fn new(start: WindowBound, end: WindowBound) -> Self {
        Self { start, end }
    }

    pub fn parse(start: &str, end: &str) -> anyhow::Result<Self> {
        Ok(Self::new(WindowBound::parse(start)?, WindowBound::parse(end)?))
    }
}

/// Search query for PRs of `repo` merged inside `window`.
pub fn search_query(repo: &RepoId, window: &DateWindow) -> String {
    format!(
        "repo:{repo} is:pr is:merged merged:{}..{}",
        window.start, window.end
    )
}

fn re_issue_url() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"/issues/(\d+)$").expect("valid regex"))
}

/// Number referenced by a card content URL (`.../issues/{n}`), if any.
pub fn parse_issue_id(url: &str) -> Option<u64> {
    re_issue_url()
        .captures(url.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// PR numbers matching a [`search_query`], plus the total the search reported.
pub fn merged_in_window<H: Hosting + ?Sized>(
    hosting: &H,
    query: &str,
) -> anyhow::Result<(BTreeSet<u64>, u64)> {
    let results = hosting.search_issues(query)?;
    let numbers: BTreeSet<u64> = results.items.iter().map(|hit| hit.number).collect();
    if (results.items.len() as u64) < results.total_count {
        tracing::warn!(
            returned = results.items.len(),
            total = results.total_count,
            "search results truncated; narrow the window"
        );
    }
    Ok((numbers, results.total_count))
}

/// Numbers already carried by a card on any release board, ignoring
/// "Not Applicable" columns and cards that do not reference an issue.
pub fn tracked_ids<H: Hosting + ?Sized>(
    hosting: &H,
    naming: &BoardNaming,
) -> anyhow::Result<BTreeSet<u64>> {
    let mut tracked = BTreeSet::new();
    for project in hosting.projects()? {
        if !naming.is_release_board(&project.name) {
            tracing::debug!(board = %project.name, "skipping board");
            continue;
        }
        tracing::debug!(board = %project.name, "loading board");
        for column in hosting.columns(&project)? {
            if column.name == ColumnKind::NotApplicable.name() {
                continue;
            }
            for card in hosting.cards(&column)? {
                if let Some(id) = card.content_url.as_deref().and_then(parse_issue_id) {
                    tracked.insert(id);
                }
            }
        }
    }
    Ok(tracked)
}

/// `merged − tracked`, ascending.
pub fn of_interest(merged: &BTreeSet<u64>, tracked: &BTreeSet<u64>) -> Vec<u64> {
    merged.difference(tracked).copied().collect()
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub query: String,
    pub total_count: u64,
    pub merged: BTreeSet<u64>,
    pub tracked: BTreeSet<u64>,
    pub of_interest: Vec<u64>,
}

impl Reconciliation {
    /// PRs merged in the window that some release board already carries.
    pub fn already_tracked(&self) -> usize {
        self.merged.intersection(&self.tracked).count()
    }
}

pub fn reconcile<H: Hosting + ?Sized>(
    hosting: &H,
    naming: &BoardNaming,
    window: &DateWindow,
) -> anyhow::Result<Reconciliation> {
    let query = search_query(hosting.repo(), window);
    let (merged, total_count) = merged_in_window(hosting, &query)?;
    let tracked = tracked_ids(hosting, naming)?;
    let of_interest = of_interest(&merged, &tracked);
    tracing::info!(
        merged = merged.len(),
        tracked = tracked.len(),
        of_interest = of_interest.len(),
        "reconciled"
    );
    Ok(Reconciliation {
        query,
        total_count,
        merged,
        tracked,
        of_interest,
    })
}
