//! OpenStep property-list parser for `project.pbxproj` documents.
//!
//! Every node keeps the byte span it was read from, so callers can splice edits into
//! the original text instead of re-serializing the whole document.

use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Data(Vec<u8>),
    Array(Vec<Node>),
    Dictionary(Dictionary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub value: Value,
    pub span: Range<usize>,
}

impl Node {
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match &self.value {
            Value::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        }
    }

    /// Name of the value's type, for error messages.
    pub fn kind(&self) -> &'static str {
        match self.value {
            Value::String(_) => "string",
            Value::Data(_) => "data",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
        }
    }
}

/// One `key = value;` pair. `end` is the offset just past the `;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub key_span: Range<usize>,
    pub value: Node,
    pub end: usize,
}

/// Dictionary entries in document order. `open` and `close` are the offsets of the braces.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dictionary {
    pub entries: Vec<Entry>,
    pub open: usize,
    pub close: usize,
}

impl Dictionary {
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|entry| &entry.value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Node::as_str)
    }
}

/// Characters accepted in an unquoted string token.
pub(crate) fn is_unquoted_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '+' | '/' | ':' | '.' | '-')
}

/// Parses a complete document. Trailing content after the root value is an error.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    let mut parser = Parser { source, pos: 0 };
    parser.skip_trivia()?;
    let root = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.pos < source.len() {
        return Err(parser.error("Unexpected content after root value"));
    }
    Ok(root)
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> ParseError {
        let before = &self.source[..pos];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |index| index + 1);
        let column = before[line_start..].chars().count() + 1;
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.pos, message)
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(c) => format!("'{c}'"),
            None => "end of input".to_string(),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                match body.find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(self.error("Unterminated comment")),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("Expected '{expected}', found {}", self.found())))
        }
    }

    fn parse_value(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some('{') => self.parse_dictionary(),
            Some('(') => self.parse_array(),
            Some('<') => self.parse_data(),
            Some(_) => {
                let (value, span) = self.parse_string()?;
                Ok(Node {
                    value: Value::String(value),
                    span,
                })
            }
            None => Err(self.error("Unexpected end of input")),
        }
    }

    fn parse_string(&mut self) -> Result<(String, Range<usize>), ParseError> {
        match self.peek() {
            Some('"') | Some('\'') => self.parse_quoted(),
            Some(c) if is_unquoted_char(c) => Ok(self.parse_unquoted()),
            _ => Err(self.error(format!("Expected a string, found {}", self.found()))),
        }
    }

    fn parse_unquoted(&mut self) -> (String, Range<usize>) {
        let start = self.pos;
        let rest = self.rest();
        let mut len = 0;
        for (index, c) in rest.char_indices() {
            if !is_unquoted_char(c) {
                break;
            }
            let next = &rest[index + 1..];
            if c == '/' && (next.starts_with('/') || next.starts_with('*')) {
                break;
            }
            len = index + c.len_utf8();
        }
        self.pos += len;
        (rest[..len].to_string(), start..self.pos)
    }

    fn parse_quoted(&mut self) -> Result<(String, Range<usize>), ParseError> {
        let start = self.pos;
        let Some(quote) = self.peek() else {
            return Err(self.error("Unexpected end of input"));
        };
        self.pos += 1;

        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error_at(start, "Unterminated string"));
            };
            self.pos += c.len_utf8();
            if c == quote {
                break;
            }
            if c == '\\' {
                value.push(self.parse_escape()?);
            } else {
                value.push(c);
            }
        }
        Ok((value, start..self.pos))
    }

    fn parse_escape(&mut self) -> Result<char, ParseError> {
        let escape_start = self.pos - 1;
        let Some(c) = self.peek() else {
            return Err(self.error_at(escape_start, "Unterminated escape sequence"));
        };
        self.pos += c.len_utf8();

        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0C}',
            'v' => '\u{0B}',
            'U' => {
                let code = self
                    .rest()
                    .get(..4)
                    .filter(|digits| digits.chars().all(|d| d.is_ascii_hexdigit()))
                    .and_then(|digits| u32::from_str_radix(digits, 16).ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error_at(escape_start, "Invalid \\U escape"))?;
                self.pos += 4;
                code
            }
            '0'..='7' => {
                let mut code = c as u32 - '0' as u32;
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                char::from_u32(code)
                    .ok_or_else(|| self.error_at(escape_start, "Invalid octal escape"))?
            }
            other => other,
        };
        Ok(decoded)
    }

    fn parse_dictionary(&mut self) -> Result<Node, ParseError> {
        let open = self.pos;
        self.expect('{')?;

        let mut entries = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some('}') => break,
                None => return Err(self.error_at(open, "Unterminated dictionary")),
                _ => {}
            }

            let (key, key_span) = self.parse_string()?;
            self.skip_trivia()?;
            self.expect('=')?;
            self.skip_trivia()?;
            let value = self.parse_value()?;
            self.skip_trivia()?;
            self.expect(';')?;

            entries.push(Entry {
                key,
                key_span,
                value,
                end: self.pos,
            });
        }

        let close = self.pos;
        self.pos += 1;
        Ok(Node {
            value: Value::Dictionary(Dictionary {
                entries,
                open,
                close,
            }),
            span: open..self.pos,
        })
    }

    fn parse_array(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.expect('(')?;

        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(')') => break,
                None => return Err(self.error_at(start, "Unterminated array")),
                _ => {}
            }

            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {}
                None => return Err(self.error_at(start, "Unterminated array")),
                Some(_) => {
                    return Err(self.error(format!("Expected ',' or ')', found {}", self.found())));
                }
            }
        }

        self.pos += 1;
        Ok(Node {
            value: Value::Array(items),
            span: start..self.pos,
        })
    }

    fn parse_data(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.expect('<')?;

        let mut digits = String::new();
        loop {
            match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                Some(c) if c.is_ascii_hexdigit() => {
                    digits.push(c);
                    self.pos += 1;
                }
                Some(c) if c.is_whitespace() => self.pos += c.len_utf8(),
                Some(c) => return Err(self.error(format!("Invalid character '{c}' in data"))),
                None => return Err(self.error_at(start, "Unterminated data")),
            }
        }

        if digits.len() % 2 != 0 {
            return Err(self.error_at(start, "Odd number of hex digits in data"));
        }
        let bytes = (0..digits.len())
            .step_by(2)
            .map(|index| u8::from_str_radix(&digits[index..index + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| self.error_at(start, "Invalid hex digits in data"))?;

        Ok(Node {
            value: Value::Data(bytes),
            span: start..self.pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/project.pbxproj");

    #[test]
    fn test_parse_fixture() {
        let root = parse(FIXTURE).unwrap();
        let root = root.as_dictionary().unwrap();

        assert_eq!(root.get_str("archiveVersion"), Some("1"));
        assert_eq!(root.get_str("rootObject"), Some("9F0A1B2C3D4E5F6071829301"));
        assert!(root.get("objects").and_then(Node::as_dictionary).is_some());
    }

    #[test]
    fn test_parse_skips_comments() {
        let source = "// !$*UTF8*$!\n{\n\t/* block */ key /* inline */ = value; // trailing\n}\n";
        let root = parse(source).unwrap();
        assert_eq!(root.as_dictionary().unwrap().get_str("key"), Some("value"));
    }

    #[test]
    fn test_parse_quoted_escapes() {
        let source = r#"{ a = "say \"hi\"\n"; b = "tab\there"; c = "\U00e9"; d = "\101"; e = 'single'; }"#;
        let root = parse(source).unwrap();
        let dict = root.as_dictionary().unwrap();

        assert_eq!(dict.get_str("a"), Some("say \"hi\"\n"));
        assert_eq!(dict.get_str("b"), Some("tab\there"));
        assert_eq!(dict.get_str("c"), Some("é"));
        assert_eq!(dict.get_str("d"), Some("A"));
        assert_eq!(dict.get_str("e"), Some("single"));
    }

    #[test]
    fn test_parse_unquoted_stops_before_comment() {
        let root = parse("{ path = Sample/Info.plist/* note */; }").unwrap();
        assert_eq!(
            root.as_dictionary().unwrap().get_str("path"),
            Some("Sample/Info.plist")
        );
    }

    #[test]
    fn test_parse_array_with_trailing_comma() {
        let root = parse("( A /* a */, B, C, )").unwrap();
        let items: Vec<&str> = root
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Node::as_str)
            .collect();
        assert_eq!(items, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_parse_data() {
        let root = parse("<0fA1 ff>").unwrap();
        assert_eq!(root.value, Value::Data(vec![0x0f, 0xa1, 0xff]));
        assert_eq!(root.kind(), "data");
    }

    #[test]
    fn test_spans_point_into_source() {
        let source = "{\n\tMARKETING_VERSION = \"1.0\";\n}";
        let root = parse(source).unwrap();
        let dict = root.as_dictionary().unwrap();
        let entry = dict.entry("MARKETING_VERSION").unwrap();

        assert_eq!(&source[entry.key_span.clone()], "MARKETING_VERSION");
        assert_eq!(&source[entry.value.span.clone()], "\"1.0\"");
        assert_eq!(&source[..entry.end], "{\n\tMARKETING_VERSION = \"1.0\";");
        assert_eq!(dict.open, 0);
        assert_eq!(dict.close, source.len() - 1);
    }

    #[test]
    fn test_error_reports_line_and_column() {
        let err = parse("{\n\ta = b\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 1);
        assert!(err.message.contains("Expected ';'"));
    }

    #[test]
    fn test_unterminated_inputs_fail() {
        assert!(parse("{ a = b;").is_err());
        assert!(parse("( a, b").is_err());
        assert!(parse("\"open").is_err());
        assert!(parse("/* open").is_err());
        assert!(parse("<abc>").is_err());
    }

    #[test]
    fn test_trailing_content_fails() {
        let err = parse("{ } extra").unwrap_err();
        assert!(err.message.contains("after root value"));
    }
}
