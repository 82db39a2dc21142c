//! Core domain types for tic-tac-toe.

use derive_more::{Display, From};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

/// Grid columns, in cell identifier order.
pub const COLUMNS: [char; 3] = ['a', 'b', 'c'];

/// Number of rows per column.
pub const ROWS: usize = 3;

/// Mark placed into a cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, strum::EnumIter,
)]
pub enum Mark {
    /// Cross (placed by the first mover).
    #[serde(alias = "cross")]
    X,
    /// Nought (placed by the second mover).
    #[serde(alias = "nought")]
    O,
}

impl Mark {
    /// Returns the opponent's mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// Role of a participant in a session, fixed for the lifetime of a game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Makes the opening move; plays X.
    #[display("first-mover")]
    #[strum(serialize = "first-mover", serialize = "primary")]
    #[serde(alias = "primary")]
    FirstMover,
    /// Plays O.
    #[display("second-mover")]
    #[strum(serialize = "second-mover", serialize = "secondary")]
    #[serde(alias = "secondary")]
    SecondMover,
}

impl Role {
    /// Returns the mark this role places.
    pub fn mark(self) -> Mark {
        match self {
            Role::FirstMover => Mark::X,
            Role::SecondMover => Mark::O,
        }
    }
}

/// Identifier of a grid cell, e.g. `a0` or `c2`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    /// Creates a cell identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// All cells of the standard 3x3 grid (`a0` through `c2`).
    pub fn standard_grid() -> Vec<CellId> {
        COLUMNS
            .iter()
            .flat_map(|col| (0..ROWS).map(move |row| CellId(format!("{col}{row}"))))
            .collect()
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle status of a game. Encoded on the wire as an ordinal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameStatus {
    /// Created, no move made yet.
    #[display("new")]
    New,
    /// At least one move made.
    #[display("active")]
    Active,
    /// Won or drawn; no further moves.
    #[display("finished")]
    Finished,
}

impl From<GameStatus> for u8 {
    fn from(status: GameStatus) -> Self {
        match status {
            GameStatus::New => 1,
            GameStatus::Active => 2,
            GameStatus::Finished => 3,
        }
    }
}

impl TryFrom<u8> for GameStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(GameStatus::New),
            2 => Ok(GameStatus::Active),
            3 => Ok(GameStatus::Finished),
            other => Err(format!("unknown game status ordinal {other}")),
        }
    }
}

/// Cell-to-mark mapping.
///
/// Snapshots may list only some cells; a cell that is not listed holds
/// no mark.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: BTreeMap<CellId, Option<Mark>>,
}

impl Board {
    /// Creates an empty standard 3x3 board.
    pub fn new() -> Self {
        Self::with_cells(CellId::standard_grid())
    }

    /// Creates an empty board over the given cells.
    pub fn with_cells(cells: impl IntoIterator<Item = CellId>) -> Self {
        Self {
            cells: cells.into_iter().map(|cell| (cell, None)).collect(),
        }
    }

    /// Returns the mark in a cell, or `None` if the cell is not on the board.
    pub fn get(&self, cell: &CellId) -> Option<Option<Mark>> {
        self.cells.get(cell).copied()
    }

    /// Returns the mark in a cell. Cells missing from the board are unmarked.
    pub fn mark_at(&self, cell: &CellId) -> Option<Mark> {
        self.get(cell).flatten()
    }

    /// Places a mark, adding the cell if the board does not list it.
    pub fn set(&mut self, cell: &CellId, mark: Mark) {
        self.cells.insert(cell.clone(), Some(mark));
    }

    /// Checks whether a cell holds no mark. Missing cells count as unmarked.
    pub fn is_unmarked(&self, cell: &CellId) -> bool {
        self.mark_at(cell).is_none()
    }

    /// Checks whether the cell is part of this board.
    pub fn contains(&self, cell: &CellId) -> bool {
        self.cells.contains_key(cell)
    }

    /// Iterates over all cells and their marks.
    pub fn cells(&self) -> impl Iterator<Item = (&CellId, Option<Mark>)> {
        self.cells.iter().map(|(cell, mark)| (cell, *mark))
    }

    /// Cells holding the given mark.
    pub fn cells_marked(&self, mark: Mark) -> impl Iterator<Item = &CellId> {
        self.cells
            .iter()
            .filter(move |(_, m)| **m == Some(mark))
            .map(|(cell, _)| cell)
    }

    /// Checks whether every cell is marked.
    pub fn is_full(&self) -> bool {
        !self.cells.is_empty() && self.cells.values().all(Option::is_some)
    }

    /// Formats the board as a human-readable grid (rows top to bottom).
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..ROWS {
            for (i, col) in COLUMNS.iter().enumerate() {
                let cell = CellId(format!("{col}{row}"));
                let symbol = match self.get(&cell) {
                    Some(Some(mark)) => mark.to_string(),
                    _ => cell.to_string(),
                };
                result.push_str(&format!("{symbol:^3}"));
                if i < COLUMNS.len() - 1 {
                    result.push('|');
                }
            }
            if row < ROWS - 1 {
                result.push_str("\n---+---+---\n");
            }
        }
        result
    }
}

/// Names of the fields of [`GameState`], used in change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, strum::EnumIter)]
pub enum Field {
    /// `coordinates`
    #[display("coordinates")]
    Coordinates,
    /// `status`
    #[display("status")]
    Status,
    /// `last_mark`
    #[display("last_mark")]
    LastMark,
    /// `winner`
    #[display("winner")]
    Winner,
    /// `winning_combination`
    #[display("winning_combination")]
    WinningCombination,
    /// `draw`
    #[display("draw")]
    Draw,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Complete shared game state, as held by the authoritative side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    coordinates: Board,
    status: GameStatus,
    #[serde(default)]
    last_mark: Option<Mark>,
    #[serde(default)]
    winner: Option<Mark>,
    #[serde(default)]
    winning_combination: Option<Vec<CellId>>,
    #[serde(default, deserialize_with = "null_as_false")]
    draw: bool,
}

impl GameState {
    /// Creates a new game on the standard board.
    #[instrument]
    pub fn new() -> Self {
        Self::with_board(Board::new())
    }

    /// Creates a new game over an arbitrary (empty) board.
    #[instrument(skip(coordinates))]
    pub fn with_board(coordinates: Board) -> Self {
        Self {
            coordinates,
            status: GameStatus::New,
            last_mark: None,
            winner: None,
            winning_combination: None,
            draw: false,
        }
    }

    /// Returns the board.
    pub fn coordinates(&self) -> &Board {
        &self.coordinates
    }

    /// Returns the game status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Returns the mark of the most recently committed move.
    pub fn last_mark(&self) -> Option<Mark> {
        self.last_mark
    }

    /// Returns the winner, if any.
    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }

    /// Returns the winning cells, if any.
    pub fn winning_combination(&self) -> Option<&[CellId]> {
        self.winning_combination.as_deref()
    }

    /// Returns true if the game ended in a draw.
    pub fn draw(&self) -> bool {
        self.draw
    }

    /// Returns true once the game is finished.
    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// Fields whose values differ between `self` and `other`.
    pub fn changed_fields(&self, other: &GameState) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.coordinates != other.coordinates {
            fields.push(Field::Coordinates);
        }
        if self.status != other.status {
            fields.push(Field::Status);
        }
        if self.last_mark != other.last_mark {
            fields.push(Field::LastMark);
        }
        if self.winner != other.winner {
            fields.push(Field::Winner);
        }
        if self.winning_combination != other.winning_combination {
            fields.push(Field::WinningCombination);
        }
        if self.draw != other.draw {
            fields.push(Field::Draw);
        }
        fields
    }

    /// Returns a copy with the patch's fields replaced. Performs no validation.
    pub fn merged(&self, patch: &StatePatch) -> GameState {
        let mut next = self.clone();
        if let Some(coordinates) = &patch.coordinates {
            next.coordinates = coordinates.clone();
        }
        if let Some(last_mark) = patch.last_mark {
            next.last_mark = Some(last_mark);
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        next
    }

    /// Finishes the game with a winner.
    pub(crate) fn finish_with_winner(&mut self, winner: Mark, combination: Vec<CellId>) {
        self.status = GameStatus::Finished;
        self.winner = Some(winner);
        self.winning_combination = Some(combination);
        self.draw = false;
    }

    /// Finishes the game as a draw.
    pub(crate) fn finish_with_draw(&mut self) {
        self.status = GameStatus::Finished;
        self.winner = None;
        self.winning_combination = None;
        self.draw = true;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial state carrying only the fields a client proposes to change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePatch {
    /// Full proposed board.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Board>,
    /// Mark of the proposed move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_mark: Option<Mark>,
    /// Proposed status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
}
