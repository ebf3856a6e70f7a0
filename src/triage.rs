//! The triage loop: walk the "To-Add" column one card at a time and let the
//! operator decide where each pull request belongs.

use std::fmt;

use crate::board::{BoardColumns, ColumnKind};
use crate::github::{Card, Hosting, Project, PullRequest};
use crate::reconcile::parse_issue_id;

/// Operator answer at the decision prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    ShowDiff,
    Skip,
    Quit,
    Move(ColumnKind),
}

impl Decision {
    /// Menu entries in display order.
    pub fn menu() -> Vec<Decision> {
        let mut items = vec![Decision::ShowDiff, Decision::Skip, Decision::Quit];
        items.extend(ColumnKind::ALL.into_iter().map(Decision::Move));
        items
    }

    pub const fn label(self) -> &'static str {
        match self {
            Decision::ShowDiff => "Show Diff",
            Decision::Skip => "Skip",
            Decision::Quit => "Quit",
            Decision::Move(kind) => kind.name(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Presentation and input for the loop.
pub trait TriageUi {
    /// Show card `position` of `total` (1-based).
    fn present(&mut self, position: usize, total: usize, pr: &PullRequest) -> anyhow::Result<()>;

    /// Ask what to do with `pr`. `None` means the prompt was interrupted or
    /// failed, which ends the loop.
    fn choose(&mut self, pr: &PullRequest) -> Option<Decision>;

    fn show_diff(&mut self, pr: &PullRequest, diff: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every card was visited.
    Done,
    /// The operator quit or the prompt was interrupted.
    Aborted,
}

/// What a triage session did.
#[derive(Debug, Clone)]
pub struct TriageReport {
    pub outcome: Outcome,
    pub total: usize,
    pub moved: Vec<(u64, ColumnKind)>,
    pub skipped: Vec<u64>,
    /// Note cards and cards whose URL is not an issue URL.
    pub unlinked: usize,
    /// Cards never presented because the session was aborted.
    pub remaining: usize,
}

enum State {
    Presenting(usize),
    AwaitingDecision(usize, PullRequest),
    Done,
    Aborted(usize),
}

/// Run the loop over the "To-Add" column of `board`.
///
/// Cards are visited in the order the service returns them. Missing
/// "To-Add" fails before any card is read.
pub fn triage_board<H, U>(hosting: &H, board: &Project, ui: &mut U) -> anyhow::Result<TriageReport>
where
    H: Hosting + ?Sized,
    U: TriageUi + ?Sized,
{
    let columns = BoardColumns::load(hosting, board)?;
    let to_add = columns.require(ColumnKind::ToAdd)?;
    let cards: Vec<Card> = hosting.cards(to_add)?;

    let mut report = TriageReport {
        outcome: Outcome::Done,
        total: cards.len(),
        moved: Vec::new(),
        skipped: Vec::new(),
        unlinked: 0,
        remaining: 0,
    };
    let advance = |i: usize| {
        if i + 1 < cards.len() {
            State::Presenting(i + 1)
        } else {
            State::Done
        }
    };

    let mut state = if cards.is_empty() {
        State::Done
    } else {
        State::Presenting(0)
    };

    loop {
        state = match state {
            State::Presenting(i) => {
                let card = &cards[i];
                match card.content_url.as_deref().and_then(parse_issue_id) {
                    Some(number) => {
                        let pr = hosting.pull_request(number)?;
                        ui.present(i + 1, cards.len(), &pr)?;
                        State::AwaitingDecision(i, pr)
                    }
                    None => {
                        tracing::warn!(card = card.id, "card does not reference a pull request, skipping");
                        report.unlinked += 1;
                        advance(i)
                    }
                }
            }
            State::AwaitingDecision(i, pr) => match ui.choose(&pr) {
                Some(Decision::ShowDiff) => {
                    let diff = hosting.pull_request_diff(&pr)?;
                    ui.show_diff(&pr, &diff)?;
                    State::AwaitingDecision(i, pr)
                }
                Some(Decision::Skip) => {
                    report.skipped.push(pr.number);
                    advance(i)
                }
                Some(Decision::Move(kind)) => {
                    let target = columns.require(kind)?;
                    hosting.move_card(&cards[i], target)?;
                    tracing::info!(pr = pr.number, column = kind.name(), "card moved");
                    report.moved.push((pr.number, kind));
                    advance(i)
                }
                Some(Decision::Quit) | None => State::Aborted(cards.len() - i),
            },
            State::Done => {
                report.outcome = Outcome::Done;
                break;
            }
            State::Aborted(remaining) => {
                report.outcome = Outcome::Aborted;
                report.remaining = remaining;
                break;
            }
        };
    }
    Ok(report)
}
