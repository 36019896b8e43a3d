//! Decoder for the `keys` column of worker transfer logs.
//!
//! The column holds a Python mapping literal from task key to byte size,
//! e.g. `{'inc-1': 28, ('x-9', 0): 80}`. Only a fixed grammar is accepted:
//!
//! ```text
//! mapping := '{' [ entry (',' entry)* [','] ] '}'
//! entry   := key ':' number
//! key     := string | tuple
//! tuple   := '(' [ atom (',' atom)* [','] ] ')'
//! atom    := string | integer
//! ```
//!
//! Tuple keys are rendered back to their Python `repr`, which is how the
//! transition logs spell the same key.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Syntax errors in a keys literal. Positions are character offsets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeysError {
    #[error("expected {expected} at position {position}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
        position: usize,
    },

    #[error("unterminated string starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("unsupported escape sequence \\{escape} at position {position}")]
    InvalidEscape { escape: char, position: usize },

    #[error("invalid number {text:?} at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("duplicate key {key:?}")]
    DuplicateKey { key: String },
}

/// Task keys referenced by one transfer, with their per-key sizes.
///
/// Entries keep the order they had in the literal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferKeys(Vec<(String, f64)>);

impl TransferKeys {
    /// Builds a key set, rejecting duplicate keys.
    pub fn new(entries: Vec<(String, f64)>) -> Result<Self, KeysError> {
        let mut seen = HashSet::with_capacity(entries.len());
        if let Some((key, _)) = entries.iter().find(|(key, _)| !seen.insert(key.as_str())) {
            return Err(KeysError::DuplicateKey { key: key.clone() });
        }
        Ok(Self(entries))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The task keys, in literal order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(key, size)| (key.as_str(), *size))
    }

    /// Size recorded for one key.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, size)| *size)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }
}

/// Renders as a double-quoted literal that [`parse_keys`] accepts.
impl fmt::Display for TransferKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (key, size)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str("\"")?;
            for c in key.chars() {
                match c {
                    '"' | '\\' => write!(f, "\\{c}")?,
                    '\n' => f.write_str("\\n")?,
                    '\t' => f.write_str("\\t")?,
                    '\r' => f.write_str("\\r")?,
                    c => write!(f, "{c}")?,
                }
            }
            write!(f, "\": {size}")?;
        }
        f.write_str("}")
    }
}

impl std::str::FromStr for TransferKeys {
    type Err = KeysError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_keys(s)
    }
}

/// Decodes a keys literal.
pub fn parse_keys(src: &str) -> Result<TransferKeys, KeysError> {
    let mut parser = Parser::new(src);
    let mut entries = Vec::new();

    parser.skip_ws();
    parser.expect('{', "'{'")?;
    loop {
        parser.skip_ws();
        if parser.eat('}') {
            break;
        }
        let key = parser.key()?;
        parser.skip_ws();
        parser.expect(':', "':'")?;
        parser.skip_ws();
        let size = parser.number()?;
        entries.push((key, size));

        parser.skip_ws();
        if parser.eat(',') {
            continue;
        }
        parser.expect('}', "',' or '}'")?;
        break;
    }
    parser.skip_ws();
    parser.expect_end()?;

    TransferKeys::new(entries)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> KeysError {
        KeysError::Unexpected {
            expected,
            found: self
                .peek()
                .map_or_else(|| "end of input".to_string(), |c| format!("{c:?}")),
            position: self.pos,
        }
    }

    fn expect(&mut self, expected: char, what: &'static str) -> Result<(), KeysError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_end(&self) -> Result<(), KeysError> {
        if self.peek().is_none() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn key(&mut self) -> Result<String, KeysError> {
        match self.peek() {
            Some('\'' | '"') => self.string(),
            Some('(') => self.tuple(),
            _ => Err(self.unexpected("string or tuple key")),
        }
    }

    fn string(&mut self) -> Result<String, KeysError> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return Err(self.unexpected("string"));
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(KeysError::UnterminatedString { position: start }),
                Some('\\') => {
                    let position = self.pos - 1;
                    match self.bump() {
                        Some('\\') => out.push('\\'),
                        Some('\'') => out.push('\''),
                        Some('"') => out.push('"'),
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some(escape) => return Err(KeysError::InvalidEscape { escape, position }),
                        None => return Err(KeysError::UnterminatedString { position: start }),
                    }
                }
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn tuple(&mut self) -> Result<String, KeysError> {
        self.expect('(', "'('")?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(')') {
                break;
            }
            let item = match self.peek() {
                Some('\'' | '"') => python_repr(&self.string()?),
                _ => self.integer()?,
            };
            items.push(item);

            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.expect(')', "',' or ')'")?;
            break;
        }

        Ok(if items.len() == 1 {
            format!("({},)", items[0])
        } else {
            format!("({})", items.join(", "))
        })
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&accept) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn integer(&mut self) -> Result<String, KeysError> {
        let position = self.pos;
        let text = self.take_while(|c| c.is_ascii_digit() || c == '-' || c == '+');
        if text.is_empty() {
            return Err(self.unexpected("string or integer tuple item"));
        }
        text.parse::<i64>()
            .map(|value| value.to_string())
            .map_err(|_| KeysError::InvalidNumber { text, position })
    }

    fn number(&mut self) -> Result<f64, KeysError> {
        let position = self.pos;
        let text = self.take_while(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
        if text.is_empty() {
            return Err(self.unexpected("number"));
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(KeysError::InvalidNumber { text, position }),
        }
    }
}

/// Quotes a string the way Python's `repr` does.
fn python_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_double_quoted_mapping() {
        let keys = parse_keys(r#"{"X":10,"Y":20}"#).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.names().collect::<Vec<_>>(), ["X", "Y"]);
        assert_eq!(keys.get("Y"), Some(20.0));
    }

    #[test]
    fn parses_python_repr_with_whitespace() {
        let keys = parse_keys("{ 'inc-abc': 28 ,  'add-def': 1.5e3 , }").unwrap();
        assert_eq!(keys.names().collect::<Vec<_>>(), ["inc-abc", "add-def"]);
        assert_eq!(keys.get("add-def"), Some(1500.0));
    }

    #[test]
    fn tuple_keys_render_as_python_repr() {
        let keys = parse_keys(r#"{("x-9", 0): 80, ('y',): 8, ('z', -1, 'w'): 1}"#).unwrap();
        assert_eq!(
            keys.names().collect::<Vec<_>>(),
            ["('x-9', 0)", "('y',)", "('z', -1, 'w')"]
        );
    }

    #[test]
    fn empty_mapping_is_valid() {
        assert!(parse_keys("{}").unwrap().is_empty());
        assert!(parse_keys("  { }  ").unwrap().is_empty());
    }

    #[test]
    fn escapes_are_decoded() {
        let keys = parse_keys(r"{'it\'s': 1, 'back\\slash': 2}").unwrap();
        assert!(keys.contains("it's"));
        assert!(keys.contains("back\\slash"));
    }

    #[test]
    fn rejects_code() {
        assert!(parse_keys("__import__('os').system('true')").is_err());
        assert!(parse_keys("{'a': len('b')}").is_err());
        assert!(parse_keys("{'a': {'b': 1}}").is_err());
        assert!(parse_keys("{a: 1}").is_err());
    }

    #[test]
    fn rejects_malformed_literals() {
        assert!(matches!(
            parse_keys("{'a': 1"),
            Err(KeysError::Unexpected { position: 7, .. })
        ));
        assert!(matches!(
            parse_keys("{'a: 1}"),
            Err(KeysError::UnterminatedString { position: 1 })
        ));
        assert!(matches!(
            parse_keys("{'a': 1e}"),
            Err(KeysError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_keys("{'a': nan}"),
            Err(KeysError::Unexpected { .. })
        ));
        assert!(parse_keys("{'a': 1} trailing").is_err());
        assert!(parse_keys("{,}").is_err());
        assert!(parse_keys("").is_err());
    }

    #[test]
    fn rejects_duplicate_keys() {
        assert_eq!(
            parse_keys("{'a': 1, \"a\": 2}").unwrap_err(),
            KeysError::DuplicateKey {
                key: "a".to_string()
            }
        );
    }

    #[test]
    fn duplicate_found_among_many_keys() {
        let mut literal: String = (0..200).map(|i| format!("'k{i}': {i}, ")).collect();
        literal.insert(0, '{');
        literal.push_str("'k17': 1}");
        assert_eq!(
            parse_keys(&literal).unwrap_err(),
            KeysError::DuplicateKey {
                key: "k17".to_string()
            }
        );
    }

    #[test]
    fn display_reparses_to_same_keys() {
        let keys = parse_keys(r#"{('x', 0): 80, 'q"uote': 2.5}"#).unwrap();
        let rendered = keys.to_string();
        assert_eq!(rendered, r#"{"('x', 0)": 80, "q\"uote": 2.5}"#);
        assert_eq!(parse_keys(&rendered).unwrap(), keys);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = parse_keys("[1, 2]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected '{' at position 0, found '['"
        );
    }
}
