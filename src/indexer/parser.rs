// Per-section symbol extractors

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::lexer::{starts_with_keyword, strip_keyword};
use crate::index::{object_info, SymbolKind, TagRecord};

static TYPE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(byte|word|long)\b").unwrap());

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Built-in constants, registers and clock settings. Spin names are case
/// insensitive, so these are matched upper-cased.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "TRUE", "FALSE", "POSX", "NEGX", "PI", "RESULT", "PAR", "CNT", "INA", "INB", "OUTA", "OUTB", "DIRA",
        "DIRB", "CTRA", "CTRB", "FRQA", "FRQB", "PHSA", "PHSB", "VCFG", "VSCL", "SPR", "CLKFREQ", "CLKMODE",
        "CHIPVER", "RCFAST", "RCSLOW", "XINPUT", "XTAL1", "XTAL2", "XTAL3", "PLL1X", "PLL2X", "PLL4X", "PLL8X",
        "PLL16X",
    ]
    .into_iter()
    .collect()
});

/// What an extractor found on one line. The walker turns these into
/// database entries under the current object node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A declaration; replaces any entry with the same key.
    Tag(TagRecord),
    /// A name mentioned in a DAT data list; stored only if the key is free.
    WeakTag(TagRecord),
    /// An object instance and the file reference it names.
    Object { tag: TagRecord, reference: String },
}

/// Parses one stripped, trimmed line of a section.
pub type Extractor = fn(line: &str, file: &str) -> Vec<Extraction>;

/// Extractor per section kind.
pub const EXTRACTORS: [(SymbolKind, Extractor); 6] = [
    (SymbolKind::Const, extract_constants),
    (SymbolKind::Object, extract_object),
    (SymbolKind::Pub, extract_public),
    (SymbolKind::Pri, extract_private),
    (SymbolKind::Var, extract_vars),
    (SymbolKind::Dat, extract_dat),
];

pub fn extractor_for(kind: SymbolKind) -> Option<Extractor> {
    EXTRACTORS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, extractor)| *extractor)
}

fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name.to_ascii_uppercase().as_str())
}

fn strip_array_suffix(name: &str) -> &str {
    match name.find('[') {
        Some(i) => &name[..i],
        None => name,
    }
}

/// Split on commas that are not inside brackets, parentheses or strings.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '(' | '[' if !in_string => depth += 1,
            ')' | ']' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// `name[...]` items of a comma list that are plain identifiers.
fn declared_names(list: &str) -> impl Iterator<Item = &str> {
    split_top_level(list)
        .into_iter()
        .map(|item| strip_array_suffix(item).trim())
        .filter(|name| is_identifier(name))
}

/// CON: `#start, A, B[2], C` enumerations and `NAME = expr[, NAME = expr]`.
pub fn extract_constants(line: &str, file: &str) -> Vec<Extraction> {
    let body = strip_keyword(line, "CON");

    if let Some(list) = body.strip_prefix('#') {
        return declared_names(list)
            .map(|name| Extraction::Tag(TagRecord::new(name, file, line, SymbolKind::EnumConst)))
            .collect();
    }

    split_top_level(body)
        .into_iter()
        .filter_map(constant_name)
        .map(|name| Extraction::Tag(TagRecord::new(name, file, line, SymbolKind::Const)))
        .collect()
}

/// Name of a `NAME = expr` declaration. Comparison and assignment
/// operators (`==`, `=<`, `=>`, `:=`, `<=`, `+=` ...) do not declare.
fn constant_name(segment: &str) -> Option<&str> {
    let eq = segment.find('=')?;
    let before = segment[..eq].chars().next_back();
    let after = segment[eq + 1..].chars().next();

    if matches!(before, Some(':' | '<' | '>' | '!' | '=' | '+' | '-' | '*' | '/' | '&' | '|' | '^' | '~' | '#' | '@')) {
        return None;
    }
    if matches!(after, Some('=' | '<' | '>')) {
        return None;
    }

    let name = segment[..eq].trim();
    is_identifier(name).then_some(name)
}

/// DAT: labels before the first `byte`/`word`/`long`, plus bare names in
/// the data list after it.
pub fn extract_dat(line: &str, file: &str) -> Vec<Extraction> {
    let body = strip_keyword(line, "DAT");
    let Some(type_word) = TYPE_WORD.find(body) else {
        return Vec::new();
    };

    let mut found: Vec<Extraction> = declared_names(&body[..type_word.start()])
        .map(|name| Extraction::Tag(TagRecord::new(name, file, line, SymbolKind::Dat)))
        .collect();

    found.extend(
        declared_names(&body[type_word.end()..])
            .filter(|name| !TYPE_WORD.is_match(name) && !is_reserved(name))
            .map(|name| Extraction::WeakTag(TagRecord::new(name, file, line, SymbolKind::Dat))),
    );

    found
}

/// VAR: `byte|word|long name[, name[n] ...]`; the type must come first.
pub fn extract_vars(line: &str, file: &str) -> Vec<Extraction> {
    let body = strip_keyword(line, "VAR");
    let Some(type_word) = TYPE_WORD.find(body) else {
        return Vec::new();
    };
    if type_word.start() != 0 {
        return Vec::new();
    }

    declared_names(&body[type_word.end()..])
        .map(|name| Extraction::Tag(TagRecord::new(name, file, line, SymbolKind::Var)))
        .collect()
}

fn extract_method(line: &str, file: &str, keyword: &str, kind: SymbolKind) -> Vec<Extraction> {
    if !starts_with_keyword(line, keyword) {
        return Vec::new();
    }

    let rest = strip_keyword(line, keyword);
    let end = rest.find(['|', ':', '(']).unwrap_or(rest.len());
    let name = rest[..end].trim();

    if !is_identifier(name) {
        return Vec::new();
    }
    vec![Extraction::Tag(TagRecord::new(name, file, line, kind))]
}

/// PUB: `PUB name(params) : result | locals`
pub fn extract_public(line: &str, file: &str) -> Vec<Extraction> {
    extract_method(line, file, "PUB", SymbolKind::Pub)
}

/// PRI: same shape as PUB.
pub fn extract_private(line: &str, file: &str) -> Vec<Extraction> {
    extract_method(line, file, "PRI", SymbolKind::Pri)
}

/// OBJ: `name[count] : "file"`. Assignments (`:=`) are not declarations.
pub fn extract_object(line: &str, file: &str) -> Vec<Extraction> {
    if line.contains(":=") {
        return Vec::new();
    }
    let Some(colon) = line.find(':') else {
        return Vec::new();
    };

    let name = strip_array_suffix(strip_keyword(&line[..colon], "OBJ")).trim();
    if !is_identifier(name) {
        return Vec::new();
    }

    let tag = TagRecord::new(name, file, line, SymbolKind::Object);
    match object_info(&tag) {
        Some((_, reference)) => vec![Extraction::Object { tag, reference }],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(found: &[Extraction]) -> Vec<(&str, char)> {
        found
            .iter()
            .map(|e| match e {
                Extraction::Tag(tag) | Extraction::WeakTag(tag) => (tag.name.as_str(), tag.kind.letter()),
                Extraction::Object { tag, .. } => (tag.name.as_str(), tag.kind.letter()),
            })
            .collect()
    }

    #[test]
    fn test_enum_constants() {
        let found = extract_constants("#0, ONE, TWO, THREE", "top.spin");
        assert_eq!(names(&found), vec![("ONE", 'e'), ("TWO", 'e'), ("THREE", 'e')]);
        match &found[0] {
            Extraction::Tag(tag) => assert_eq!(tag.line, "#0, ONE, TWO, THREE"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_enum_counters_and_steps() {
        let found = extract_constants("CON #1, A, B[2], #10, C, $20", "top.spin");
        assert_eq!(names(&found), vec![("A", 'e'), ("B", 'e'), ("C", 'e')]);
    }

    #[test]
    fn test_named_constants() {
        assert_eq!(names(&extract_constants("MAX = 100", "t.spin")), vec![("MAX", 'c')]);
        assert_eq!(
            names(&extract_constants("CON _clkmode = xtal1 + pll16x", "t.spin")),
            vec![("_clkmode", 'c')]
        );
        assert_eq!(
            names(&extract_constants("A = 1, B = (2, 3)", "t.spin")),
            vec![("A", 'c'), ("B", 'c')]
        );
        assert_eq!(names(&extract_constants("CONTROL = 5", "t.spin")), vec![("CONTROL", 'c')]);
    }

    #[test]
    fn test_constant_operators_are_skipped() {
        assert!(extract_constants("x := 5", "t.spin").is_empty());
        assert!(extract_constants("if a == b", "t.spin").is_empty());
        assert!(extract_constants("a =< b", "t.spin").is_empty());
        assert!(extract_constants("total += 1", "t.spin").is_empty());
        assert!(extract_constants("no equals here", "t.spin").is_empty());
    }

    #[test]
    fn test_dat_labels_and_data_names() {
        let found = extract_dat("buf byte 0[16], flag", "t.spin");
        assert_eq!(found.len(), 2);
        assert!(matches!(&found[0], Extraction::Tag(t) if t.name == "buf" && t.kind == SymbolKind::Dat));
        assert!(matches!(&found[1], Extraction::WeakTag(t) if t.name == "flag"));
    }

    #[test]
    fn test_dat_data_skips_reserved_words() {
        assert_eq!(names(&extract_dat("flag long TRUE", "t.spin")), vec![("flag", 'x')]);
        assert_eq!(names(&extract_dat("mask long POSX, cnt, limit", "t.spin")), vec![("mask", 'x'), ("limit", 'x')]);
        assert_eq!(names(&extract_dat("clk long clkfreq, Pll16x", "t.spin")), vec![("clk", 'x')]);
    }

    #[test]
    fn test_dat_variants() {
        assert_eq!(names(&extract_dat("DAT table long 1, 2, 3", "t.spin")), vec![("table", 'x')]);
        assert_eq!(names(&extract_dat("msg BYTE \"hi, there\", 0", "t.spin")), vec![("msg", 'x')]);
        assert!(extract_dat("entry mov x, y", "t.spin").is_empty());
        assert!(extract_dat("rdlong x, par", "t.spin").is_empty());
        assert!(extract_dat("org 0", "t.spin").is_empty());
    }

    #[test]
    fn test_vars() {
        assert_eq!(
            names(&extract_vars("long stack[32], cog", "t.spin")),
            vec![("stack", 'v'), ("cog", 'v')]
        );
        assert_eq!(names(&extract_vars("VAR byte flag", "t.spin")), vec![("flag", 'v')]);
        assert!(extract_vars("count long", "t.spin").is_empty());
        assert!(extract_vars("stack := 0", "t.spin").is_empty());
    }

    #[test]
    fn test_methods() {
        let found = extract_public("PUB start(pin) : ok | tmp", "t.spin");
        assert_eq!(names(&found), vec![("start", 'f')]);

        assert_eq!(names(&extract_private("PRI helper | i", "t.spin")), vec![("helper", 'p')]);
        assert_eq!(names(&extract_public("pub go", "t.spin")), vec![("go", 'f')]);
        assert!(extract_public("repeat i from 0 to 3", "t.spin").is_empty());
        assert!(extract_public("publish := 1", "t.spin").is_empty());
        assert!(extract_private("PUB wrong_kind", "t.spin").is_empty());
    }

    #[test]
    fn test_object_declarations() {
        let found = extract_object("OBJ lcd : \"display\"", "top.spin");
        assert_eq!(
            found,
            vec![Extraction::Object {
                tag: TagRecord::new("lcd", "top.spin", "OBJ lcd : \"display\"", SymbolKind::Object),
                reference: "display.spin".to_string(),
            }]
        );

        let found = extract_object("ser[4] : \"FullDuplexSerial.spin\"", "top.spin");
        assert!(matches!(&found[0], Extraction::Object { tag, reference }
            if tag.name == "ser" && reference == "FullDuplexSerial.spin"));

        let found = extract_object("myobj : \"thing\"", "top.spin");
        assert_eq!(names(&found), vec![("myobj", 'o')]);
    }

    #[test]
    fn test_object_rejects() {
        assert!(extract_object("lcd := 3", "t.spin").is_empty());
        assert!(extract_object("OBJ", "t.spin").is_empty());
        assert!(extract_object("lcd : display", "t.spin").is_empty());
        assert!(extract_object(": \"display\"", "t.spin").is_empty());
    }

    #[test]
    fn test_dispatch_table() {
        assert!(extractor_for(SymbolKind::Const).is_some());
        assert!(extractor_for(SymbolKind::Dat).is_some());
        assert!(extractor_for(SymbolKind::None).is_none());
        assert!(extractor_for(SymbolKind::EnumConst).is_none());

        let extractor = extractor_for(SymbolKind::Pub).unwrap();
        assert_eq!(names(&extractor("PUB main", "t.spin")), vec![("main", 'f')]);
    }
}
