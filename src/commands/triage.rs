use clap::Args;

use super::{ConnectArgs, Session, cancelled};
use crate::error::ExitError;
use crate::github::{Hosting, Project};
use crate::pager::Pager;
use crate::triage::{Outcome, TriageReport, triage_board};
use crate::ui::{TerminalTriage, prompt_select};

#[derive(Debug, Args)]
pub struct TriageArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl TriageArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let session = self.connect.open()?;

        let boards: Vec<Project> = session
            .client
            .projects()?
            .into_iter()
            .filter(|p| session.naming.is_release_board(&p.name))
            .collect();
        if boards.is_empty() {
            return Err(ExitError::Other(format!(
                "no release-notes boards on {}",
                session.client.repo()
            ))
            .into());
        }

        let names: Vec<&str> = boards.iter().map(|p| p.name.as_str()).collect();
        let Some(index) = prompt_select("Which project?", &names)? else {
            return cancelled(&session);
        };
        run_triage(&session, &boards[index])
    }
}

/// Triage `board` interactively and print a summary.
pub fn run_triage(session: &Session, board: &Project) -> anyhow::Result<()> {
    let pager = Pager::new(&session.config.pager_command())?;
    let mut ui = TerminalTriage::new(&session.screen, pager);
    let report = triage_board(&session.client, board, &mut ui)?;
    session.screen.line(&summary(&report));
    Ok(())
}

fn summary(report: &TriageReport) -> String {
    let head = match report.outcome {
        Outcome::Done => "No more cards.".to_string(),
        Outcome::Aborted => format!("Stopped with {} card(s) left to triage.", report.remaining),
    };
    let mut line = format!(
        "{head} Moved {} of {}, skipped {}.",
        report.moved.len(),
        report.total,
        report.skipped.len()
    );
    if report.unlinked > 0 {
        line.push_str(&format!(" Ignored {} note card(s).", report.unlinked));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ColumnKind;

    fn report(outcome: Outcome) -> TriageReport {
        TriageReport {
            outcome,
            total: 3,
            moved: vec![(102, ColumnKind::Added)],
            skipped: vec![101],
            unlinked: 0,
            remaining: 1,
        }
    }

    #[test]
    fn summary_done() {
        assert_eq!(summary(&report(Outcome::Done)), "No more cards. Moved 1 of 3, skipped 1.");
    }

    #[test]
    fn summary_aborted_with_notes() {
        let mut r = report(Outcome::Aborted);
        r.unlinked = 2;
        assert_eq!(
            summary(&r),
            "Stopped with 1 card(s) left to triage. Moved 1 of 3, skipped 1. Ignored 2 note card(s)."
        );
    }
}
