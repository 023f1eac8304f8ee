// Line-level lexing for Spin sources: decoding, comments and section keywords

use crate::index::SymbolKind;

/// Section keywords, matched case-insensitively at the start of a line.
pub const SECTION_KEYWORDS: [(&str, SymbolKind); 6] = [
    ("CON", SymbolKind::Const),
    ("OBJ", SymbolKind::Object),
    ("PUB", SymbolKind::Pub),
    ("PRI", SymbolKind::Pri),
    ("VAR", SymbolKind::Var),
    ("DAT", SymbolKind::Dat),
];

/// Decode raw file bytes.
///
/// Spin tools write UTF-16 with a BOM, UTF-8 or plain Latin-1; anything that
/// is not valid UTF-8 is read as Latin-1.
pub fn decode_source(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Non-empty lines of `text`. LF, CRLF and lone CR all end a line.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\r', '\n']).filter(|line| !line.is_empty())
}

/// Trimmed line with tabs turned into spaces. Tabs separate the fields of
/// a tag record, so none may survive into the stored line.
pub fn clean_line(line: &str) -> String {
    line.trim().replace('\t', " ")
}

/// Removes `{ … }` block comments (which may span lines and nest) and
/// `'` line comments. Double-quoted strings are copied through untouched.
#[derive(Debug, Default, Clone)]
pub struct CommentStripper {
    depth: usize,
}

impl CommentStripper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a block comment is still open after the last line.
    pub fn in_block(&self) -> bool {
        self.depth > 0
    }

    /// Strip one raw line, carrying block state into the next call.
    pub fn strip(&mut self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut in_string = false;

        for c in line.chars() {
            if in_string {
                out.push(c);
                if c == '"' {
                    in_string = false;
                }
                continue;
            }

            match c {
                '{' => self.depth += 1,
                '}' => self.depth = self.depth.saturating_sub(1),
                _ if self.depth > 0 => {}
                '\'' => break,
                '"' => {
                    in_string = true;
                    out.push(c);
                }
                _ => out.push(c),
            }
        }

        out
    }
}

/// Length of `keyword` at the start of `line` when it stands as a word.
fn keyword_len(line: &str, keyword: &str) -> Option<usize> {
    let head = line.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    match line[keyword.len()..].chars().next() {
        None => Some(keyword.len()),
        Some(c) if c.is_whitespace() => Some(keyword.len()),
        Some(_) => None,
    }
}

/// Section introduced by a trimmed line, or `SymbolKind::None`.
pub fn classify(line: &str) -> SymbolKind {
    SECTION_KEYWORDS
        .iter()
        .find(|(keyword, _)| keyword_len(line, keyword).is_some())
        .map(|(_, kind)| *kind)
        .unwrap_or(SymbolKind::None)
}

/// `line` without a leading `keyword`, trimmed. Unchanged (but trimmed)
/// when the keyword is absent or runs into a longer word.
pub fn strip_keyword<'a>(line: &'a str, keyword: &str) -> &'a str {
    let line = line.trim();
    match keyword_len(line, keyword) {
        Some(len) => line[len..].trim(),
        None => line,
    }
}

/// Whether `line` starts with `keyword` as a whole word.
pub fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    keyword_len(line.trim_start(), keyword).is_some()
}
