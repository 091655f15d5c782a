use std::fmt;
use std::str::FromStr;

use crate::error::HotkeyError;
use crate::key::{self, Key, RawKey, parse_token};

/// Parsed key combination such as `Ctrl+Shift+T`.
///
/// The literal is normalized (trimmed, lowercased tokens joined by `+`) and
/// serves as the binding key, so `Ctrl+T` and `ctrl + t` are the same binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combination {
    literal: String,
    keys: Vec<Key>,
}

impl Combination {
    pub fn parse(combination: &str) -> Result<Self, HotkeyError> {
        if combination.trim().is_empty() {
            return Err(HotkeyError::EmptyCombination);
        }

        let mut keys = Vec::new();
        let mut tokens = Vec::new();

        for part in combination.split('+') {
            let token = part.trim();
            if token.is_empty() {
                return Err(HotkeyError::EmptyToken(combination.to_string()));
            }

            let key = parse_token(token).map_err(|_| HotkeyError::UnknownToken {
                token: token.to_string(),
                combination: combination.to_string(),
            })?;

            if keys.contains(&key) {
                return Err(HotkeyError::DuplicateToken {
                    token: token.to_string(),
                    combination: combination.to_string(),
                });
            }

            keys.push(key);
            tokens.push(token.to_lowercase());
        }

        Ok(Self {
            literal: tokens.join("+"),
            keys,
        })
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Number of keys in the combination
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Every key of the combination is covered by some held key. Extra held
    /// keys do not prevent a match.
    pub fn is_satisfied_by(&self, held: &[RawKey]) -> bool {
        self.keys
            .iter()
            .all(|required| held.iter().any(|raw| key::matches(*required, raw)))
    }
}

impl FromStr for Combination {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes() {
        let combo: Combination = "Ctrl + Shift+T".parse().unwrap();
        assert_eq!(combo.literal(), "ctrl+shift+t");
        assert_eq!(combo.keys(), &[Key::Ctrl, Key::Shift, Key::Char('t')]);
        assert_eq!(combo.len(), 3);

        let settings = Combination::parse("Ctrl+,").unwrap();
        assert_eq!(settings.keys(), &[Key::Ctrl, Key::Char(',')]);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert_eq!(Combination::parse("  "), Err(HotkeyError::EmptyCombination));
        assert!(matches!(
            Combination::parse("ctrl++"),
            Err(HotkeyError::EmptyToken(_))
        ));
        assert_eq!(
            Combination::parse("ctrl+±"),
            Err(HotkeyError::UnknownToken {
                token: "±".to_string(),
                combination: "ctrl+±".to_string(),
            })
        );
        assert!(matches!(
            Combination::parse("ctrl+control+t"),
            Err(HotkeyError::DuplicateToken { .. })
        ));
    }

    #[test]
    fn satisfied_by_superset_of_held_keys() {
        let combo = Combination::parse("ctrl+t").unwrap();
        let held = [
            RawKey::Name("LControl".into()),
            RawKey::Name("LShift".into()),
            RawKey::Char('\u{14}'),
        ];
        assert!(combo.is_satisfied_by(&held));
        assert!(!combo.is_satisfied_by(&held[..2]));
        assert!(!combo.is_satisfied_by(&[]));
    }
}
