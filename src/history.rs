//! Recent release points (branch fork points and tags) that help pick the
//! merge window.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::HistoryConfig;
use crate::github::Hosting;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BranchPoint {
    pub branch: String,
    /// For release branches, the commit where they left the default branch.
    pub sha: String,
    pub committed_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagPoint {
    pub tag: String,
    pub committed_at: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleasePoints {
    pub branches: Vec<BranchPoint>,
    pub tags: Vec<TagPoint>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Default and release branches touched within the lookback period.
pub fn branch_points<H: Hosting + ?Sized>(
    hosting: &H,
    config: &HistoryConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<BranchPoint>> {
    let pattern = regex::Regex::new(&config.release_branch_pattern)?;
    let cutoff = now - Duration::days(i64::from(config.lookback_days));
    let mut points = Vec::new();

    for branch in hosting.branches()? {
        let is_default = branch.name == config.default_branch;
        if !is_default && !pattern.is_match(&branch.name) {
            continue;
        }

        let commit = if is_default {
            hosting.commit(&branch.commit.sha)?
        } else {
            // Walk back past the commits unique to the release branch.
            let comparison = hosting.compare(&config.default_branch, &branch.commit.sha)?;
            hosting.commit(&format!("{}~{}", branch.commit.sha, comparison.ahead_by))?
        };

        let Some(committed_at) = commit.committed_at() else {
            tracing::debug!(branch = %branch.name, "commit has no committer date");
            continue;
        };
        if committed_at < cutoff {
            continue;
        }
        points.push(BranchPoint {
            branch: branch.name,
            sha: commit.sha,
            committed_at: timestamp(committed_at),
        });
    }
    Ok(points)
}

/// Release tags created within the lookback period.
pub fn tag_points<H: Hosting + ?Sized>(
    hosting: &H,
    config: &HistoryConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<TagPoint>> {
    let pattern = regex::Regex::new(&config.tag_pattern)?;
    let cutoff = now - Duration::days(i64::from(config.lookback_days));
    let mut points = Vec::new();

    // One commit lookup per matching tag; the pattern keeps this small.
    for tag in hosting.tags()? {
        if !pattern.is_match(&tag.name) {
            continue;
        }
        let commit = hosting.commit(&tag.commit.sha)?;
        match commit.committed_at() {
            Some(at) if at >= cutoff => points.push(TagPoint {
                tag: tag.name,
                committed_at: timestamp(at),
            }),
            _ => {}
        }
    }
    Ok(points)
}

pub fn release_points<H: Hosting + ?Sized>(
    hosting: &H,
    config: &HistoryConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<ReleasePoints> {
    Ok(ReleasePoints {
        branches: branch_points(hosting, config, now)?,
        tags: tag_points(hosting, config, now)?,
    })
}
