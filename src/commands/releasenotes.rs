use std::fmt;

use anyhow::Context;
use clap::Args;

use super::triage::run_triage;
use super::{ConnectArgs, Session, cancelled, progress_bar, spinner};
use crate::board::create_release_board;
use crate::github::{Hosting, Project};
use crate::history::release_points;
use crate::import::bulk_import;
use crate::reconcile::{DateWindow, WindowBound, reconcile, search_query};
use crate::template;
use crate::ui::{prompt_confirm, prompt_input, prompt_select};

#[derive(Debug, Args)]
pub struct ReleaseNotesArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// Board menu entry.
enum BoardChoice<'a> {
    Existing(&'a Project),
    New,
}

impl fmt::Display for BoardChoice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardChoice::Existing(p) => f.write_str(&p.name),
            BoardChoice::New => f.write_str("New Project"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Sync,
    Triage,
    Done,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Sync => "Sync new pull requests",
            Action::Triage => "Triage existing PRs",
            Action::Done => "Done",
        })
    }
}

impl ReleaseNotesArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let session = self.connect.open()?;
        let Some(board) = choose_board(&session)? else {
            return cancelled(&session);
        };

        let actions = [Action::Sync, Action::Triage, Action::Done];
        let Some(index) = prompt_select("What would you like to do", &actions)? else {
            return cancelled(&session);
        };
        match actions.get(index).copied().unwrap_or(Action::Done) {
            Action::Sync => sync(&session, &board),
            Action::Triage => run_triage(&session, &board),
            Action::Done => Ok(()),
        }
    }
}

/// Pick any board of the repository, or bootstrap a new release board.
/// `None` when the operator backs out.
fn choose_board(session: &Session) -> anyhow::Result<Option<Project>> {
    let projects = session.client.projects()?;
    let mut choices: Vec<BoardChoice<'_>> = projects.iter().map(BoardChoice::Existing).collect();
    choices.push(BoardChoice::New);

    let Some(index) = prompt_select("Which project?", &choices)? else {
        return Ok(None);
    };
    match choices.get(index) {
        Some(BoardChoice::Existing(project)) => Ok(Some((*project).clone())),
        Some(BoardChoice::New) => {
            session.screen.line("Creating a new Project");
            let Some(version) = prompt_input("What release version", |v| {
                if v.trim().is_empty() {
                    Err("version must not be empty".to_string())
                } else {
                    Ok(())
                }
            })?
            else {
                return Ok(None);
            };
            let project = create_release_board(&session.client, &session.naming, &version)
                .with_context(|| format!("creating board for {}", version.trim()))?;
            Ok(Some(project))
        }
        None => Ok(None),
    }
}

fn prompt_bound(prompt: &str) -> anyhow::Result<Option<WindowBound>> {
    let answer = prompt_input(prompt, |s| {
        WindowBound::parse(s).map(|_| ()).map_err(|e| e.to_string())
    })?;
    answer.map(|s| WindowBound::parse(&s)).transpose()
}

fn prompt_window() -> anyhow::Result<Option<DateWindow>> {
    let Some(start) = prompt_bound("PR range start")? else {
        return Ok(None);
    };
    let Some(end) = prompt_bound("PR range end")? else {
        return Ok(None);
    };
    Ok(Some(DateWindow::new(start, end)))
}

/// Find merged PRs not yet on any release board, optionally card them, then
/// optionally triage.
fn sync(session: &Session, board: &Project) -> anyhow::Result<()> {
    let screen = &session.screen;
    screen.markdown(&template::render_sync_intro(&board.name)?);

    let bar = spinner("Fetching branches and tags...");
    let points = release_points(&session.client, &session.config.history, chrono::Utc::now());
    bar.finish_and_clear();
    screen.markdown(&template::render_release_points(
        &points?,
        session.config.history.lookback_days,
    )?);

    let Some(window) = prompt_window()? else {
        return cancelled(session);
    };
    screen.highlight(&format!("Query {}", search_query(session.client.repo(), &window)));

    let bar = spinner("Searching merged pull requests...");
    let result = reconcile(&session.client, &session.naming, &window);
    bar.finish_and_clear();
    let result = result?;

    screen.line(&format!(
        "Found {} PRs that could be part of this",
        result.total_count
    ));
    screen.line(&format!(
        "{} already on a release board",
        result.already_tracked()
    ));
    screen.line(&format!("Need to sort {} PRs", result.of_interest.len()));

    if !result.of_interest.is_empty() {
        match prompt_confirm("Bulk add all PRs", false)? {
            Some(true) => {
                let bar = progress_bar("Creating cards");
                let created = bulk_import(&session.client, board, &result.of_interest, &bar)?;
                screen.line(&format!("Added {} cards to To-Add", created.len()));
            }
            Some(false) => {}
            None => return cancelled(session),
        }
    }

    match prompt_confirm("Triage board cards", true)? {
        Some(true) => run_triage(session, board),
        Some(false) => Ok(()),
        None => cancelled(session),
    }
}
