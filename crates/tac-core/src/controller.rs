//! Pick-up / drop interaction on top of the move rule.
//!
//! The controller only mutates its own copy of the board. Broadcasting a
//! [`ClickOutcome::Moved`] state is the caller's job, so a remote update
//! applied through [`BoardController::apply_remote`] never produces anything
//! to send.

use tracing::debug;

use crate::board::apply_move;
use crate::error::MoveError;
use crate::history::History;
use crate::types::Field;

/// Result of clicking a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A marble was picked up from this field.
    Selected(usize),
    /// The selected field was clicked again.
    Deselected,
    /// Nothing selected and the field is empty.
    Ignored,
    /// The move was refused. The board is unchanged and the selection cleared.
    Rejected(MoveError),
    /// The move was applied; carries the new board.
    Moved(Vec<Field>),
}

/// Board state plus the current selection and undo history.
#[derive(Debug, Clone)]
pub struct BoardController {
    fields: Vec<Field>,
    selected: Option<usize>,
    history: History,
}

impl BoardController {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            selected: None,
            history: History::new(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Handles a click on field `index`.
    pub fn click(&mut self, index: usize) -> ClickOutcome {
        let Some(from) = self.selected else {
            return match self.fields.get(index) {
                Some(field) if field.has_marble() => {
                    self.selected = Some(index);
                    ClickOutcome::Selected(index)
                }
                Some(_) => ClickOutcome::Ignored,
                None => ClickOutcome::Rejected(MoveError::OutOfBounds {
                    index,
                    len: self.fields.len(),
                }),
            };
        };

        if from == index {
            self.selected = None;
            return ClickOutcome::Deselected;
        }

        self.selected = None;
        match apply_move(&self.fields, from, index) {
            Ok(next) => {
                let previous = std::mem::replace(&mut self.fields, next.clone());
                self.history.push(previous);
                debug!(from, to = index, history = self.history.len(), "move applied");
                ClickOutcome::Moved(next)
            }
            Err(err) => {
                debug!(from, to = index, error = %err, "move rejected");
                ClickOutcome::Rejected(err)
            }
        }
    }

    /// Restores the board from before the last move. Returns the restored
    /// board, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Vec<Field>> {
        let previous = self.history.pop()?;
        self.fields = previous.clone();
        self.selected = None;
        Some(previous)
    }

    /// Replaces the board with a state received from another client.
    /// History is kept so local undo still walks back local moves.
    pub fn apply_remote(&mut self, fields: Vec<Field>) {
        self.fields = fields;
        self.selected = None;
    }

    /// Starts over from `fields` with no selection and no history.
    pub fn reset(&mut self, fields: Vec<Field>) {
        self.fields = fields;
        self.selected = None;
        self.history.clear();
    }
}

impl Default for BoardController {
    fn default() -> Self {
        Self::new(crate::board::initial_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{home_index, initial_fields, target_index};
    use crate::types::PlayerId;

    fn player(seat: u8) -> PlayerId {
        PlayerId::new(seat).unwrap()
    }

    #[test]
    fn click_empty_field_without_selection_is_ignored() {
        let mut board = BoardController::default();
        assert_eq!(board.click(0), ClickOutcome::Ignored);
        assert_eq!(board.selected(), None);
    }

    #[test]
    fn click_selected_field_deselects() {
        let mut board = BoardController::default();
        let home = home_index(player(0), 0);
        assert_eq!(board.click(home), ClickOutcome::Selected(home));
        assert_eq!(board.click(home), ClickOutcome::Deselected);
        assert_eq!(board.selected(), None);
        assert_eq!(board.history_len(), 0);
    }

    #[test]
    fn pick_and_drop_moves() {
        let mut board = BoardController::default();
        let home = home_index(player(0), 0);
        board.click(home);
        let outcome = board.click(12);
        let ClickOutcome::Moved(next) = outcome else {
            panic!("expected a move, got {outcome:?}");
        };
        assert_eq!(next, board.fields());
        assert!(board.fields()[12].has_marble());
        assert_eq!(board.history_len(), 1);
        assert_eq!(board.selected(), None);
    }

    #[test]
    fn foreign_target_is_rejected_and_clears_selection() {
        let mut board = BoardController::default();
        board.click(home_index(player(1), 0));
        board.click(30);
        let before = board.fields().to_vec();

        assert_eq!(board.click(30), ClickOutcome::Selected(30));
        let outcome = board.click(target_index(player(2), 0));
        assert!(matches!(
            outcome,
            ClickOutcome::Rejected(MoveError::WrongOwner { .. })
        ));
        assert_eq!(board.fields(), before.as_slice());
        assert_eq!(board.selected(), None);
    }

    #[test]
    fn undo_walks_back_to_initial_state() {
        let mut board = BoardController::default();
        let moves = [
            (home_index(player(0), 0), 0),
            (home_index(player(1), 1), 16),
            (0, 5),
            (16, 5),
        ];
        for (from, to) in moves {
            board.click(from);
            assert!(matches!(board.click(to), ClickOutcome::Moved(_)));
        }

        for _ in 0..moves.len() {
            assert!(board.undo().is_some());
        }
        assert_eq!(board.fields(), initial_fields().as_slice());
        assert_eq!(board.undo(), None);
        assert_eq!(board.fields(), initial_fields().as_slice());
    }

    #[test]
    fn undo_clears_selection() {
        let mut board = BoardController::default();
        board.click(home_index(player(0), 0));
        board.click(3);
        board.click(3);
        assert_eq!(board.selected(), Some(3));
        board.undo();
        assert_eq!(board.selected(), None);
    }

    #[test]
    fn remote_update_replaces_board_and_keeps_history() {
        let mut board = BoardController::default();
        board.click(home_index(player(0), 0));
        board.click(3);
        board.click(home_index(player(2), 0));

        let mut remote = initial_fields();
        remote[40].place(crate::types::Marble::for_player(player(3)));
        board.apply_remote(remote.clone());

        assert_eq!(board.fields(), remote.as_slice());
        assert_eq!(board.selected(), None);
        assert_eq!(board.history_len(), 1);
    }

    #[test]
    fn reset_clears_history() {
        let mut board = BoardController::default();
        board.click(home_index(player(0), 0));
        board.click(3);
        board.reset(initial_fields());
        assert_eq!(board.history_len(), 0);
        assert_eq!(board.undo(), None);
    }
}
