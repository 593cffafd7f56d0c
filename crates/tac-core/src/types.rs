//! Core types for the Tac board.

use serde::{Deserialize, Serialize};

/// Number of players at the table.
pub const PLAYER_COUNT: usize = 4;

/// Marble colors per player (red, blue, green, yellow).
pub const PLAYER_COLORS: [&str; PLAYER_COUNT] = ["#ef4444", "#3b82f6", "#22c55e", "#eab308"];

/// A player seat (0..=3).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PlayerId(u8);

impl PlayerId {
    /// Returns the player for a seat index, or `None` if the seat does not exist.
    pub fn new(seat: u8) -> Option<Self> {
        ((seat as usize) < PLAYER_COUNT).then_some(Self(seat))
    }

    /// Returns the seat index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns every player in seat order.
    pub fn all() -> impl Iterator<Item = PlayerId> {
        (0..PLAYER_COUNT as u8).map(PlayerId)
    }

    /// Returns this player's marble color.
    pub fn color(self) -> &'static str {
        PLAYER_COLORS[self.index()]
    }
}

impl TryFrom<u8> for PlayerId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PlayerId::new(value).ok_or_else(|| format!("player {value} is out of range"))
    }
}

impl From<PlayerId> for u8 {
    fn from(value: PlayerId) -> Self {
        value.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player-owned token. Only its location ever changes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Marble {
    pub color: String,
    pub player: PlayerId,
}

impl Marble {
    /// Creates a marble in the player's own color.
    pub fn for_player(player: PlayerId) -> Self {
        Self {
            color: player.color().to_string(),
            player,
        }
    }
}

/// Discriminant of [`Field`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldKind {
    Circle,
    Target,
    Home,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldKind::Circle => "circle",
            FieldKind::Target => "target",
            FieldKind::Home => "home",
        };
        f.write_str(name)
    }
}

/// One addressable slot on the board.
///
/// Serializes as `{"type": "circle", "idx": 3, "marble": {...}}`; the marble
/// key is omitted when the field is empty.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Field {
    Circle {
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marble: Option<Marble>,
    },
    Target {
        player: PlayerId,
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marble: Option<Marble>,
    },
    Home {
        player: PlayerId,
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marble: Option<Marble>,
    },
}

impl Field {
    pub fn circle(idx: u8) -> Self {
        Field::Circle { idx, marble: None }
    }

    pub fn target(player: PlayerId, idx: u8) -> Self {
        Field::Target {
            player,
            idx,
            marble: None,
        }
    }

    pub fn home(player: PlayerId, idx: u8, marble: Option<Marble>) -> Self {
        Field::Home {
            player,
            idx,
            marble,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Circle { .. } => FieldKind::Circle,
            Field::Target { .. } => FieldKind::Target,
            Field::Home { .. } => FieldKind::Home,
        }
    }

    /// Position within the field's own group.
    pub fn idx(&self) -> u8 {
        match self {
            Field::Circle { idx, .. } | Field::Target { idx, .. } | Field::Home { idx, .. } => *idx,
        }
    }

    /// Owning player of a target or home field; circle fields have none.
    pub fn owner(&self) -> Option<PlayerId> {
        match self {
            Field::Circle { .. } => None,
            Field::Target { player, .. } | Field::Home { player, .. } => Some(*player),
        }
    }

    pub fn marble(&self) -> Option<&Marble> {
        self.slot_ref().as_ref()
    }

    pub fn has_marble(&self) -> bool {
        self.marble().is_some()
    }

    /// Removes and returns the marble on this field.
    pub fn take_marble(&mut self) -> Option<Marble> {
        self.slot().take()
    }

    /// Puts a marble on this field, returning whatever was there.
    pub fn place(&mut self, marble: Marble) -> Option<Marble> {
        self.slot().replace(marble)
    }

    /// Whether `marble` may be dropped here. Target and home fields only
    /// take their owner's marbles.
    pub fn accepts(&self, marble: &Marble) -> bool {
        match self.owner() {
            Some(owner) => owner == marble.player,
            None => true,
        }
    }

    fn slot(&mut self) -> &mut Option<Marble> {
        match self {
            Field::Circle { marble, .. }
            | Field::Target { marble, .. }
            | Field::Home { marble, .. } => marble,
        }
    }

    fn slot_ref(&self) -> &Option<Marble> {
        match self {
            Field::Circle { marble, .. }
            | Field::Target { marble, .. }
            | Field::Home { marble, .. } => marble,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(seat: u8) -> PlayerId {
        PlayerId::new(seat).unwrap()
    }

    #[test]
    fn player_id_range() {
        assert!(PlayerId::new(0).is_some());
        assert!(PlayerId::new(3).is_some());
        assert!(PlayerId::new(4).is_none());
        assert_eq!(PlayerId::all().count(), PLAYER_COUNT);
    }

    #[test]
    fn player_id_rejects_out_of_range_json() {
        let result: Result<PlayerId, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }

    #[test]
    fn circle_field_json_omits_empty_marble() {
        let json = serde_json::to_value(Field::circle(5)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "circle", "idx": 5}));
    }

    #[test]
    fn home_field_json_shape() {
        let field = Field::home(player(2), 1, Some(Marble::for_player(player(2))));
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "home");
        assert_eq!(json["player"], 2);
        assert_eq!(json["idx"], 1);
        assert_eq!(json["marble"]["color"], "#22c55e");
        assert_eq!(json["marble"]["player"], 2);
    }

    #[test]
    fn field_parses_null_marble_as_empty() {
        let field: Field =
            serde_json::from_str(r#"{"type":"target","player":1,"idx":3,"marble":null}"#).unwrap();
        assert_eq!(field, Field::target(player(1), 3));
    }

    #[test]
    fn field_rejects_unknown_kind() {
        let result: Result<Field, _> = serde_json::from_str(r#"{"type":"bench","idx":0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_only_owner_on_owned_fields() {
        let red = Marble::for_player(player(0));
        assert!(Field::circle(0).accepts(&red));
        assert!(Field::target(player(0), 0).accepts(&red));
        assert!(!Field::target(player(1), 0).accepts(&red));
        assert!(!Field::home(player(3), 0, None).accepts(&red));
    }

    #[test]
    fn place_and_take() {
        let mut field = Field::circle(9);
        assert!(field.place(Marble::for_player(player(1))).is_none());
        assert!(field.has_marble());
        let taken = field.take_marble().unwrap();
        assert_eq!(taken.player, player(1));
        assert!(!field.has_marble());
    }
}
