//! Logical keys and the table that maps platform key reports onto them.
//!
//! Platforms disagree on how a key press is reported: the same physical
//! comma may arrive as the character `','`, as `'<'` with shift held, as
//! virtual-key code 188, or as a named key like `Comma`. Holding Ctrl often
//! turns letters into ASCII control characters (`Ctrl+T` reports `'\x14'`).
//! Every representation is resolved here, through the tables below, into
//! the set of logical keys it may stand for.

use std::fmt;

use crate::error::HotkeyError;

/// A key as named in a combination string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Ctrl,
    Alt,
    Shift,
    Cmd,
    /// Unshifted printable key on a US layout: `a`-`z`, `0`-`9` or one of
    /// `` , . / ; ' [ ] \ - = ` ``
    Char(char),
    Space,
    Enter,
    Tab,
    Esc,
    Backspace,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key F1..=F24
    F(u8),
}

impl Key {
    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Ctrl | Key::Alt | Key::Shift | Key::Cmd)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::F(n) => write!(f, "f{n}"),
            other => {
                let name = NAMED_TOKENS
                    .iter()
                    .find(|(_, k)| k == other)
                    .map(|(name, _)| *name)
                    .unwrap_or("?");
                f.write_str(name)
            }
        }
    }
}

/// Key as delivered by an input source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawKey {
    /// Character the platform attached to the event
    Char(char),
    /// Windows-style virtual key code
    Code(u32),
    /// Platform key name such as `LControl`, `Comma` or `Key.shift_l`
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Press,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub key: RawKey,
}

impl KeyEvent {
    pub fn press(key: RawKey) -> Self {
        Self {
            kind: KeyEventKind::Press,
            key,
        }
    }

    pub fn release(key: RawKey) -> Self {
        Self {
            kind: KeyEventKind::Release,
            key,
        }
    }
}

const PUNCTUATION: &[char] = &[',', '.', '/', ';', '\'', '[', ']', '\\', '-', '=', '`'];

/// Shifted character -> key that produces it on a US layout
const SHIFTED: &[(char, char)] = &[
    ('!', '1'),
    ('@', '2'),
    ('#', '3'),
    ('$', '4'),
    ('%', '5'),
    ('^', '6'),
    ('&', '7'),
    ('*', '8'),
    ('(', '9'),
    (')', '0'),
    ('<', ','),
    ('>', '.'),
    ('?', '/'),
    (':', ';'),
    ('"', '\''),
    ('{', '['),
    ('}', ']'),
    ('|', '\\'),
    ('_', '-'),
    ('+', '='),
    ('~', '`'),
];

/// Token names accepted in combination strings, first entry per key is the
/// canonical spelling
const NAMED_TOKENS: &[(&str, Key)] = &[
    ("ctrl", Key::Ctrl),
    ("control", Key::Ctrl),
    ("alt", Key::Alt),
    ("option", Key::Alt),
    ("shift", Key::Shift),
    ("cmd", Key::Cmd),
    ("command", Key::Cmd),
    ("win", Key::Cmd),
    ("super", Key::Cmd),
    ("meta", Key::Cmd),
    ("space", Key::Space),
    ("enter", Key::Enter),
    ("return", Key::Enter),
    ("tab", Key::Tab),
    ("esc", Key::Esc),
    ("escape", Key::Esc),
    ("backspace", Key::Backspace),
    ("delete", Key::Delete),
    ("del", Key::Delete),
    ("insert", Key::Insert),
    ("up", Key::Up),
    ("down", Key::Down),
    ("left", Key::Left),
    ("right", Key::Right),
    ("home", Key::Home),
    ("end", Key::End),
    ("page_up", Key::PageUp),
    ("pageup", Key::PageUp),
    ("page_down", Key::PageDown),
    ("pagedown", Key::PageDown),
    ("comma", Key::Char(',')),
    ("period", Key::Char('.')),
    ("slash", Key::Char('/')),
    ("semicolon", Key::Char(';')),
    ("minus", Key::Char('-')),
    ("equal", Key::Char('=')),
    ("backslash", Key::Char('\\')),
    ("grave", Key::Char('`')),
];

/// Platform key names (compared case-insensitively, `key.` prefix stripped)
const PLATFORM_NAMES: &[(&str, Key)] = &[
    ("control", Key::Ctrl),
    ("lcontrol", Key::Ctrl),
    ("rcontrol", Key::Ctrl),
    ("ctrl", Key::Ctrl),
    ("ctrl_l", Key::Ctrl),
    ("ctrl_r", Key::Ctrl),
    ("shift", Key::Shift),
    ("lshift", Key::Shift),
    ("rshift", Key::Shift),
    ("shift_l", Key::Shift),
    ("shift_r", Key::Shift),
    ("alt", Key::Alt),
    ("lalt", Key::Alt),
    ("ralt", Key::Alt),
    ("alt_l", Key::Alt),
    ("alt_r", Key::Alt),
    ("alt_gr", Key::Alt),
    ("loption", Key::Alt),
    ("roption", Key::Alt),
    ("command", Key::Cmd),
    ("rcommand", Key::Cmd),
    ("lcommand", Key::Cmd),
    ("cmd", Key::Cmd),
    ("cmd_l", Key::Cmd),
    ("cmd_r", Key::Cmd),
    ("meta", Key::Cmd),
    ("lmeta", Key::Cmd),
    ("rmeta", Key::Cmd),
    ("comma", Key::Char(',')),
    ("dot", Key::Char('.')),
    ("period", Key::Char('.')),
    ("slash", Key::Char('/')),
    ("semicolon", Key::Char(';')),
    ("apostrophe", Key::Char('\'')),
    ("quote", Key::Char('\'')),
    ("leftbracket", Key::Char('[')),
    ("rightbracket", Key::Char(']')),
    ("backslash", Key::Char('\\')),
    ("minus", Key::Char('-')),
    ("equal", Key::Char('=')),
    ("grave", Key::Char('`')),
    ("space", Key::Space),
    ("enter", Key::Enter),
    ("return", Key::Enter),
    ("tab", Key::Tab),
    ("escape", Key::Esc),
    ("esc", Key::Esc),
    ("backspace", Key::Backspace),
    ("delete", Key::Delete),
    ("insert", Key::Insert),
    ("up", Key::Up),
    ("down", Key::Down),
    ("left", Key::Left),
    ("right", Key::Right),
    ("home", Key::Home),
    ("end", Key::End),
    ("pageup", Key::PageUp),
    ("page_up", Key::PageUp),
    ("pagedown", Key::PageDown),
    ("page_down", Key::PageDown),
];

/// Windows virtual-key codes that are not covered by the letter, digit and
/// function-key ranges
const VIRTUAL_CODES: &[(u32, Key)] = &[
    (0x08, Key::Backspace),
    (0x09, Key::Tab),
    (0x0D, Key::Enter),
    (0x10, Key::Shift),
    (0x11, Key::Ctrl),
    (0x12, Key::Alt),
    (0x1B, Key::Esc),
    (0x20, Key::Space),
    (0x21, Key::PageUp),
    (0x22, Key::PageDown),
    (0x23, Key::End),
    (0x24, Key::Home),
    (0x25, Key::Left),
    (0x26, Key::Up),
    (0x27, Key::Right),
    (0x28, Key::Down),
    (0x2D, Key::Insert),
    (0x2E, Key::Delete),
    (0x5B, Key::Cmd),
    (0x5C, Key::Cmd),
    (0xA0, Key::Shift),
    (0xA1, Key::Shift),
    (0xA2, Key::Ctrl),
    (0xA3, Key::Ctrl),
    (0xA4, Key::Alt),
    (0xA5, Key::Alt),
    (0xBA, Key::Char(';')),
    (0xBB, Key::Char('=')),
    (0xBC, Key::Char(',')),
    (0xBD, Key::Char('-')),
    (0xBE, Key::Char('.')),
    (0xBF, Key::Char('/')),
    (0xC0, Key::Char('`')),
    (0xDB, Key::Char('[')),
    (0xDC, Key::Char('\\')),
    (0xDD, Key::Char(']')),
    (0xDE, Key::Char('\'')),
];

/// Parse one `+`-separated token of a combination string
pub fn parse_token(token: &str) -> Result<Key, HotkeyError> {
    let lower = token.trim().to_lowercase();
    let unknown = || HotkeyError::UnknownToken {
        token: token.trim().to_string(),
        combination: token.to_string(),
    };

    let mut chars = lower.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return if c.is_ascii_lowercase() || c.is_ascii_digit() || PUNCTUATION.contains(&c) {
            Ok(Key::Char(c))
        } else {
            Err(unknown())
        };
    }

    if let Some(key) = function_key(&lower) {
        return Ok(key);
    }

    NAMED_TOKENS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, key)| *key)
        .ok_or_else(unknown)
}

/// Every logical key a raw report may stand for. Empty when the report is
/// not something a combination can name.
pub fn logical_keys(raw: &RawKey) -> Vec<Key> {
    match raw {
        RawKey::Char(c) => from_char(*c),
        RawKey::Code(code) => from_code(*code).into_iter().collect(),
        RawKey::Name(name) => from_name(name),
    }
}

pub(crate) fn matches(key: Key, raw: &RawKey) -> bool {
    logical_keys(raw).contains(&key)
}

fn from_char(c: char) -> Vec<Key> {
    let mut keys = Vec::with_capacity(2);

    // Named control characters are also what Ctrl+letter produces
    match c {
        ' ' => keys.push(Key::Space),
        '\r' | '\n' => keys.push(Key::Enter),
        '\t' => keys.push(Key::Tab),
        '\u{1b}' => keys.push(Key::Esc),
        '\u{8}' => keys.push(Key::Backspace),
        '\u{7f}' => keys.push(Key::Delete),
        _ => {}
    }

    match c {
        '\u{1}'..='\u{1a}' => keys.push(Key::Char((b'a' + c as u8 - 1) as char)),
        'A'..='Z' => keys.push(Key::Char(c.to_ascii_lowercase())),
        'a'..='z' | '0'..='9' => keys.push(Key::Char(c)),
        c if PUNCTUATION.contains(&c) => keys.push(Key::Char(c)),
        c => {
            if let Some((_, base)) = SHIFTED.iter().find(|(shifted, _)| *shifted == c) {
                keys.push(Key::Char(*base));
            }
        }
    }

    keys
}

fn from_code(code: u32) -> Option<Key> {
    match code {
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(code).map(|c| Key::Char(c.to_ascii_lowercase())),
        0x70..=0x87 => Some(Key::F((code - 0x70 + 1) as u8)),
        _ => VIRTUAL_CODES
            .iter()
            .find(|(vk, _)| *vk == code)
            .map(|(_, key)| *key),
    }
}

fn from_name(name: &str) -> Vec<Key> {
    let lower = name.trim().to_lowercase();
    let lower = lower.strip_prefix("key.").unwrap_or(lower.as_str());

    if lower.chars().count() == 1 {
        return lower.chars().next().map(from_char).unwrap_or_default();
    }

    // device_query spells digits Key0..Key9 and numpad digits Numpad0..
    if let Some(digit) = lower.strip_prefix("key").or_else(|| lower.strip_prefix("numpad"))
        && digit.len() == 1
        && let Some(c) = digit.chars().next().filter(char::is_ascii_digit)
    {
        return vec![Key::Char(c)];
    }

    if let Some(key) = function_key(lower) {
        return vec![key];
    }

    PLATFORM_NAMES
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, key)| vec![*key])
        .unwrap_or_default()
}

fn function_key(lower: &str) -> Option<Key> {
    let n: u8 = lower.strip_prefix('f')?.parse().ok()?;
    (1..=24).contains(&n).then_some(Key::F(n))
}
