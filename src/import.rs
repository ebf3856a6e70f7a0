use indicatif::ProgressBar;

use crate::board::{BoardColumns, ColumnKind};
use crate::github::{Card, Hosting, Project};

/// Append one "To-Add" card per PR number, in ascending order.
///
/// The column is resolved before anything is created, so a board without
/// "To-Add" fails without side effects. A failure part-way leaves the cards
/// created so far in place; reconciling again skips them.
pub fn bulk_import<H: Hosting + ?Sized>(
    hosting: &H,
    board: &Project,
    numbers: &[u64],
    progress: &ProgressBar,
) -> anyhow::Result<Vec<Card>> {
    let columns = BoardColumns::load(hosting, board)?;
    let to_add = columns.require(ColumnKind::ToAdd)?;

    let mut ordered = numbers.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    progress.set_length(ordered.len() as u64);
    let mut created = Vec::with_capacity(ordered.len());
    for number in ordered {
        let pr = hosting.pull_request(number)?;
        let card = hosting.create_card(to_add, &pr)?;
        tracing::debug!(pr = number, card = card.id, "card created");
        created.push(card);
        progress.inc(1);
    }
    progress.finish_and_clear();
    Ok(created)
}
