//! Game session identifiers.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameIdError;

/// Characters used for generated ids.
pub const GAME_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of a generated id.
pub const GAME_ID_LEN: usize = 10;

const MAX_LEN: usize = 64;

/// Opaque identifier of one replicated game session.
///
/// Used as the partition key for storage and to derive the realtime topic.
/// Generated ids are not checked for uniqueness anywhere.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameId(String);

impl GameId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..GAME_ID_LEN)
            .map(|_| GAME_ID_ALPHABET[rng.gen_range(0..GAME_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Parses a user-supplied id. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, GameIdError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(GameIdError::Empty);
        }
        let len = id.chars().count();
        if len > MAX_LEN {
            return Err(GameIdError::TooLong {
                max: MAX_LEN,
                found: len,
            });
        }
        if let Some((index, ch)) = id
            .chars()
            .enumerate()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(GameIdError::InvalidCharacter { ch, index });
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Realtime topic for this game.
    pub fn topic(&self) -> String {
        format!("game-{}", self.0)
    }

    /// Key of this game's entry in the local cache.
    pub fn cache_key(&self) -> String {
        format!("tac-game-{}", self.0)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GameId {
    type Err = GameIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameId::parse(s)
    }
}

impl TryFrom<String> for GameId {
    type Error = GameIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        GameId::parse(&value)
    }
}

impl From<GameId> for String {
    fn from(value: GameId) -> Self {
        value.0
    }
}

impl AsRef<str> for GameId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_use_the_alphabet() {
        let id = GameId::generate();
        assert_eq!(id.as_str().len(), GAME_ID_LEN);
        assert!(id.as_str().bytes().all(|b| GAME_ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn generated_ids_are_unique_in_practice() {
        let ids: HashSet<GameId> = (0..1000).map(|_| GameId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn generated_ids_parse_back() {
        let id = GameId::generate();
        assert_eq!(GameId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(GameId::parse("  abc123 \n").unwrap().as_str(), "abc123");
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(GameId::parse(""), Err(GameIdError::Empty));
        assert_eq!(GameId::parse("   "), Err(GameIdError::Empty));
    }

    #[test]
    fn parse_rejects_long_ids() {
        let long = "a".repeat(65);
        assert_eq!(
            GameId::parse(&long),
            Err(GameIdError::TooLong { max: 64, found: 65 })
        );
        assert!(GameId::parse(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn parse_rejects_bad_characters() {
        assert_eq!(
            GameId::parse("ab/cd"),
            Err(GameIdError::InvalidCharacter { ch: '/', index: 2 })
        );
        assert!(GameId::parse("My_Game-01").is_ok());
    }

    #[test]
    fn derived_names() {
        let id = GameId::parse("k3x9").unwrap();
        assert_eq!(id.topic(), "game-k3x9");
        assert_eq!(id.cache_key(), "tac-game-k3x9");
    }

    #[test]
    fn serde_validates() {
        let id: GameId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert!(serde_json::from_str::<GameId>("\"a b\"").is_err());
    }
}
