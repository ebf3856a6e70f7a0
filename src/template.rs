//! Markdown rendering for the terminal views.

use minijinja::{Environment, context};
use serde::Serialize;

use crate::github::PullRequest;
use crate::history::ReleasePoints;

const PR_TEMPLATE: &str = include_str!("templates/pr.md.jinja");
const SYNC_INTRO_TEMPLATE: &str = include_str!("templates/sync_intro.md.jinja");
const RELEASE_POINTS_TEMPLATE: &str = include_str!("templates/release_points.md.jinja");

/// Context for the pull request panel
#[derive(Debug, Serialize)]
pub struct PrContext<'a> {
    pub number: u64,
    pub title: &'a str,
    /// Comma-joined label names
    pub labels: String,
    pub body: &'a str,
    pub url: Option<&'a str>,
    /// Merge date, `YYYY-MM-DD`
    pub merged: Option<String>,
}

impl<'a> PrContext<'a> {
    pub fn from_pr(pr: &'a PullRequest) -> Self {
        Self {
            number: pr.number,
            title: &pr.title,
            labels: pr.label_list(),
            body: pr.body.as_deref().unwrap_or("").trim(),
            url: pr.html_url.as_deref(),
            merged: pr.merged_at.map(|at| at.format("%Y-%m-%d").to_string()),
        }
    }
}

fn render(name: &str, source: &str, ctx: impl Serialize) -> anyhow::Result<String> {
    let mut env = Environment::new();
    env.add_template(name, source)?;
    let template = env.get_template(name)?;
    Ok(template.render(ctx)?)
}

/// Render the pull request panel shown during triage
pub fn render_pr(pr: &PullRequest) -> anyhow::Result<String> {
    render("pr", PR_TEMPLATE, PrContext::from_pr(pr))
}

pub fn render_sync_intro(board: &str) -> anyhow::Result<String> {
    render("sync-intro", SYNC_INTRO_TEMPLATE, context! { board })
}

/// Render branch and tag tables plus the date-syntax help
pub fn render_release_points(points: &ReleasePoints, lookback_days: u32) -> anyhow::Result<String> {
    render(
        "release-points",
        RELEASE_POINTS_TEMPLATE,
        context! {
            branches => &points.branches,
            tags => &points.tags,
            lookback_days,
        },
    )
}
