use std::borrow::Cow;

/// Characters Xcode writes without quotes. Narrower than what the parser accepts:
/// Xcode quotes values containing `-` or `+` even though it reads them bare.
fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.')
}

/// Formats a string as a pbxproj token, quoting and escaping only when needed.
pub fn quote(value: &str) -> Cow<'_, str> {
    let bare = !value.is_empty()
        && value.chars().all(is_bare_char)
        && !value.contains("//")
        && !value.contains("/*");
    if bare {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Leading whitespace of the line containing `pos`.
pub(crate) fn line_indent(source: &str, pos: usize) -> &str {
    let line_start = source[..pos].rfind('\n').map_or(0, |index| index + 1);
    let line = &source[line_start..];
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// A single text replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Splice {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Splice {
    pub fn apply(&self, source: &mut String) {
        source.replace_range(self.start..self.end, &self.text);
    }
}
