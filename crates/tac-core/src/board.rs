//! Board layout and the single-marble move rule.

use tracing::debug;

use crate::error::{LayoutError, MoveError};
use crate::types::{Field, Marble, PlayerId, PLAYER_COUNT};

/// Number of circle (track) fields.
pub const CIRCLE_FIELDS: usize = 64;

/// Target and home slots per player.
pub const SLOTS_PER_PLAYER: usize = 4;

/// Total fields on a board.
pub const FIELD_COUNT: usize = CIRCLE_FIELDS + 2 * PLAYER_COUNT * SLOTS_PER_PLAYER;

const TARGET_BASE: usize = CIRCLE_FIELDS;
const HOME_BASE: usize = CIRCLE_FIELDS + PLAYER_COUNT * SLOTS_PER_PLAYER;

/// Position of a player's target slot in the field sequence.
pub fn target_index(player: PlayerId, slot: usize) -> usize {
    TARGET_BASE + player.index() * SLOTS_PER_PLAYER + slot
}

/// Position of a player's home slot in the field sequence.
pub fn home_index(player: PlayerId, slot: usize) -> usize {
    HOME_BASE + player.index() * SLOTS_PER_PLAYER + slot
}

/// Returns the starting board: empty circle and target fields, every home
/// slot holding its owner's marble.
pub fn initial_fields() -> Vec<Field> {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    fields.extend((0..CIRCLE_FIELDS as u8).map(Field::circle));
    for player in PlayerId::all() {
        fields.extend((0..SLOTS_PER_PLAYER as u8).map(|idx| Field::target(player, idx)));
    }
    for player in PlayerId::all() {
        fields.extend(
            (0..SLOTS_PER_PLAYER as u8)
                .map(|idx| Field::home(player, idx, Some(Marble::for_player(player)))),
        );
    }
    fields
}

/// Checks that `fields` has the standard shape: every position holds the
/// kind, owner and slot index that [`initial_fields`] puts there. Marble
/// placement is not checked.
pub fn validate_layout(fields: &[Field]) -> Result<(), LayoutError> {
    if fields.len() != FIELD_COUNT {
        return Err(LayoutError::WrongLength {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    for (index, (field, expected)) in fields.iter().zip(initial_fields()).enumerate() {
        let same_shape = field.kind() == expected.kind()
            && field.owner() == expected.owner()
            && field.idx() == expected.idx();
        if !same_shape {
            let expected = match expected.owner() {
                Some(owner) => format!("{} {} of player {}", expected.kind(), expected.idx(), owner),
                None => format!("{} {}", expected.kind(), expected.idx()),
            };
            return Err(LayoutError::UnexpectedField { index, expected });
        }
    }
    Ok(())
}

/// First empty home slot of `player`, in slot order.
pub fn first_empty_home_slot(fields: &[Field], player: PlayerId) -> Option<usize> {
    fields.iter().position(|field| {
        matches!(field, Field::Home { player: owner, marble: None, .. } if *owner == player)
    })
}

/// Number of marbles on the board.
pub fn marble_count(fields: &[Field]) -> usize {
    fields.iter().filter(|field| field.has_marble()).count()
}

/// Moves the marble on `from` to `to` and returns the resulting board.
///
/// The only rule enforced is ownership: target and home fields accept
/// only their owner's marbles. A marble already on `to` is bumped back to
/// its owner's first empty home slot, looked up after the moving marble
/// has left `from`.
pub fn apply_move(fields: &[Field], from: usize, to: usize) -> Result<Vec<Field>, MoveError> {
    let len = fields.len();
    for index in [from, to] {
        if index >= len {
            return Err(MoveError::OutOfBounds { index, len });
        }
    }
    if from == to {
        return Err(MoveError::SameField(from));
    }

    let marble = fields[from].marble().ok_or(MoveError::EmptySource(from))?;
    if let Some(owner) = fields[to].owner() {
        if owner != marble.player {
            return Err(MoveError::WrongOwner {
                field: to,
                owner,
                player: marble.player,
            });
        }
    }

    let mut next = fields.to_vec();
    let moving = next[from].take_marble().ok_or(MoveError::EmptySource(from))?;
    if let Some(bumped) = next[to].place(moving) {
        let player = bumped.player;
        let slot = first_empty_home_slot(&next, player).ok_or(MoveError::NoHomeSlot { player })?;
        debug!(from, to, bumped_to = slot, player = %player, "bumped marble home");
        next[slot].place(bumped);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldKind;

    fn player(seat: u8) -> PlayerId {
        PlayerId::new(seat).unwrap()
    }

    #[test]
    fn initial_board_shape() {
        let fields = initial_fields();
        assert_eq!(fields.len(), FIELD_COUNT);
        assert_eq!(FIELD_COUNT, 96);
        assert!(validate_layout(&fields).is_ok());

        let circle = fields.iter().filter(|f| f.kind() == FieldKind::Circle);
        let target = fields.iter().filter(|f| f.kind() == FieldKind::Target);
        let home: Vec<_> = fields.iter().filter(|f| f.kind() == FieldKind::Home).collect();
        assert_eq!(circle.clone().count(), 64);
        assert_eq!(target.clone().count(), 16);
        assert_eq!(home.len(), 16);

        assert!(circle.chain(target).all(|f| !f.has_marble()));
        for field in home {
            let marble = field.marble().unwrap();
            assert_eq!(Some(marble.player), field.owner());
            assert_eq!(marble.color, marble.player.color());
        }
    }

    #[test]
    fn index_helpers_match_layout() {
        let fields = initial_fields();
        let p2 = player(2);
        assert_eq!(fields[target_index(p2, 3)], Field::target(p2, 3));
        assert_eq!(fields[home_index(p2, 0)].owner(), Some(p2));
        assert_eq!(home_index(player(0), 0), 80);
        assert_eq!(target_index(player(0), 0), 64);
    }

    #[test]
    fn validate_rejects_wrong_length() {
        let mut fields = initial_fields();
        fields.pop();
        assert_eq!(
            validate_layout(&fields),
            Err(LayoutError::WrongLength {
                expected: 96,
                found: 95
            })
        );
    }

    #[test]
    fn validate_rejects_reordered_fields() {
        let mut fields = initial_fields();
        fields.swap(64, 68);
        assert!(matches!(
            validate_layout(&fields),
            Err(LayoutError::UnexpectedField { index: 64, .. })
        ));
    }

    #[test]
    fn move_home_to_circle() {
        let fields = initial_fields();
        let next = apply_move(&fields, home_index(player(0), 0), 10).unwrap();
        assert_eq!(next[10].marble().unwrap().player, player(0));
        assert!(!next[home_index(player(0), 0)].has_marble());
        assert_eq!(marble_count(&next), 16);
        // Input is untouched.
        assert!(fields[home_index(player(0), 0)].has_marble());
    }

    #[test]
    fn move_rejects_foreign_target() {
        let fields = apply_move(&initial_fields(), home_index(player(1), 0), 5).unwrap();
        let result = apply_move(&fields, 5, target_index(player(2), 0));
        assert_eq!(
            result,
            Err(MoveError::WrongOwner {
                field: target_index(player(2), 0),
                owner: player(2),
                player: player(1),
            })
        );
    }

    #[test]
    fn move_rejects_foreign_home() {
        let fields = apply_move(&initial_fields(), home_index(player(3), 2), 7).unwrap();
        let result = apply_move(&fields, 7, home_index(player(0), 0));
        assert!(matches!(result, Err(MoveError::WrongOwner { .. })));
    }

    #[test]
    fn move_errors() {
        let fields = initial_fields();
        assert_eq!(apply_move(&fields, 3, 4), Err(MoveError::EmptySource(3)));
        assert_eq!(apply_move(&fields, 80, 80), Err(MoveError::SameField(80)));
        assert_eq!(
            apply_move(&fields, 80, 200),
            Err(MoveError::OutOfBounds { index: 200, len: 96 })
        );
    }

    #[test]
    fn bump_sends_occupant_to_first_empty_home_slot() {
        let p0 = player(0);
        let p1 = player(1);
        let fields = initial_fields();
        // Player 0 brings two marbles out; the first goes to circle field 0.
        let fields = apply_move(&fields, home_index(p0, 0), 0).unwrap();
        let fields = apply_move(&fields, home_index(p0, 1), 1).unwrap();
        // Player 1 moves onto circle field 0.
        let fields = apply_move(&fields, home_index(p1, 0), 20).unwrap();
        let next = apply_move(&fields, 20, 0).unwrap();

        assert_eq!(next[0].marble().unwrap().player, p1);
        assert_eq!(next[home_index(p0, 0)].marble().unwrap().player, p0);
        assert!(!next[home_index(p0, 1)].has_marble());
        assert_eq!(marble_count(&next), 16);
    }

    #[test]
    fn bump_onto_own_home_slot_keeps_every_marble() {
        let p0 = player(0);
        let fields = apply_move(&initial_fields(), home_index(p0, 0), 0).unwrap();
        // Circle marble jumps onto an occupied home slot of its own player.
        let next = apply_move(&fields, 0, home_index(p0, 2)).unwrap();
        assert_eq!(marble_count(&next), 16);
        assert!(next[home_index(p0, 0)].has_marble());
        assert!(next[home_index(p0, 2)].has_marble());
    }

    #[test]
    fn bump_without_home_slot_is_refused() {
        let p0 = player(0);
        let mut fields = initial_fields();
        // Put a fifth player 0 marble on the circle so no home slot can free up.
        fields[0].place(Marble::for_player(p0));
        fields[1].place(Marble::for_player(player(1)));
        assert_eq!(
            apply_move(&fields, 1, 0),
            Err(MoveError::NoHomeSlot { player: p0 })
        );
    }
}
