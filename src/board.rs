//! Release-notes boards: naming, the fixed column set, and creation.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ExitError;
use crate::github::{Column, Hosting, Project};

/// Columns of a release-notes board, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnKind {
    ToAdd,
    InProgress,
    Added,
    Minor,
    NotApplicable,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 5] = [
        ColumnKind::ToAdd,
        ColumnKind::InProgress,
        ColumnKind::Added,
        ColumnKind::Minor,
        ColumnKind::NotApplicable,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ColumnKind::ToAdd => "To-Add",
            ColumnKind::InProgress => "In Progress",
            ColumnKind::Added => "Added",
            ColumnKind::Minor => "Minor",
            ColumnKind::NotApplicable => "Not Applicable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Board naming convention, e.g. `Release Notes - 10.1.0`.
#[derive(Debug, Clone)]
pub struct BoardNaming {
    prefix: String,
}

impl BoardNaming {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn board_name(&self, version: &str) -> String {
        format!("{}{}", self.prefix, version.trim())
    }

    pub fn is_release_board(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }
}

impl Default for BoardNaming {
    fn default() -> Self {
        Self::new("Release Notes - ")
    }
}

/// Create the board for `version` with every column of [`ColumnKind::ALL`].
///
/// Nothing is cleaned up if a later step fails; the partially created board
/// stays on the service.
pub fn create_release_board<H: Hosting + ?Sized>(
    hosting: &H,
    naming: &BoardNaming,
    version: &str,
) -> anyhow::Result<Project> {
    let version = version.trim();
    if version.is_empty() {
        anyhow::bail!("release version must not be empty");
    }
    let name = naming.board_name(version);
    tracing::info!(board = %name, "creating release board");
    let project = hosting.create_project(&name)?;
    for kind in ColumnKind::ALL {
        hosting.create_column(&project, kind.name())?;
    }
    Ok(project)
}

/// Columns of one board, keyed by kind. Columns with other names are ignored.
#[derive(Debug, Clone)]
pub struct BoardColumns {
    board: String,
    columns: BTreeMap<ColumnKind, Column>,
}

impl BoardColumns {
    pub fn load<H: Hosting + ?Sized>(hosting: &H, project: &Project) -> anyhow::Result<Self> {
        let mut columns = BTreeMap::new();
        for column in hosting.columns(project)? {
            if let Some(kind) = ColumnKind::from_name(&column.name) {
                columns.entry(kind).or_insert(column);
            }
        }
        Ok(Self {
            board: project.name.clone(),
            columns,
        })
    }

    pub fn get(&self, kind: ColumnKind) -> Option<&Column> {
        self.columns.get(&kind)
    }

    /// Like [`get`](Self::get), but a missing column is a fatal error.
    pub fn require(&self, kind: ColumnKind) -> Result<&Column, ExitError> {
        self.get(kind).ok_or_else(|| ExitError::MissingColumn {
            board: self.board.clone(),
            column: kind.name().to_string(),
        })
    }
}
