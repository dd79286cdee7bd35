//! String-aware views of a single source line

/// What a run of characters is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    /// Plain code
    Code,
    /// `"..."`, quotes included
    Double,
    /// `'...'`, quotes included
    Single,
    /// `` `...` ``, backticks included
    Backtick,
}

/// A byte range of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment {
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
}

/// Split a line into code and quoted runs
///
/// An unterminated quote runs to the end of the line; the parser reports it.
/// Quotes inside `#{...}` belong to the enclosing string.
pub(crate) fn segments(line: &str) -> Vec<Segment> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let kind = match bytes[i] {
            b'"' => SegmentKind::Double,
            b'\'' => SegmentKind::Single,
            b'`' => SegmentKind::Backtick,
            _ => {
                i += 1;
                continue;
            }
        };
        if code_start < i {
            out.push(Segment {
                kind: SegmentKind::Code,
                start: code_start,
                end: i,
            });
        }
        let start = i;
        i = skip_quoted(bytes, i, 0);
        out.push(Segment {
            kind,
            start,
            end: i,
        });
        code_start = i;
    }

    if code_start < bytes.len() {
        out.push(Segment {
            kind: SegmentKind::Code,
            start: code_start,
            end: bytes.len(),
        });
    }
    out
}

/// Interpolations nested deeper than this are treated as plain text
const MAX_INTERPOLATION_NESTING: usize = 16;

/// Offset just past the quoted run starting at `start`
pub(crate) fn skip_quoted(bytes: &[u8], start: usize, level: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            b'#' if quote != b'\'' && bytes.get(i + 1) == Some(&b'{') => {
                i = match interpolation_end(bytes, i + 2, level + 1) {
                    Some(close) => close + 1,
                    None => bytes.len(),
                };
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Offset of the `}` closing an interpolation whose code starts at `from`
pub(crate) fn interpolation_end(bytes: &[u8], from: usize, level: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' if level < MAX_INTERPOLATION_NESTING => {
                i = skip_quoted(bytes, i, level);
                continue;
            }
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// An identifier-like word in code
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Word<'a> {
    pub text: &'a str,
    pub start: usize,
}

/// Identifier words in code runs, skipping `label:` words and `.field` names
pub(crate) fn words(line: &str) -> Vec<Word<'_>> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    for seg in segments(line) {
        if seg.kind != SegmentKind::Code {
            continue;
        }
        let mut i = seg.start;
        while i < seg.end {
            let c = bytes[i];
            if c.is_ascii_alphabetic() || c == b'_' {
                let start = i;
                while i < seg.end && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let is_label = bytes.get(i) == Some(&b':') && bytes.get(i + 1) != Some(&b':');
                let is_field = start > 0 && bytes[start - 1] == b'.';
                if !is_label && !is_field {
                    out.push(Word {
                        text: &line[start..i],
                        start,
                    });
                }
            } else if c.is_ascii_digit() {
                while i < seg.end && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
            } else {
                i += 1;
            }
        }
    }
    out
}

/// Net change in `(`/`[`/`{` nesting across the code runs of a line
pub(crate) fn bracket_delta(line: &str) -> i64 {
    let bytes = line.as_bytes();
    segments(line)
        .iter()
        .filter(|seg| seg.kind == SegmentKind::Code)
        .flat_map(|seg| bytes[seg.start..seg.end].iter())
        .map(|b| match b {
            b'(' | b'[' | b'{' => 1,
            b')' | b']' | b'}' => -1,
            _ => 0,
        })
        .sum()
}

/// Whether the line's last code character leaves the statement open
pub(crate) fn ends_with_continuation(line: &str) -> bool {
    let trimmed = line.trim_end();
    let Some(last) = segments(trimmed).last().copied() else {
        return false;
    };
    if last.kind != SegmentKind::Code {
        return false;
    }
    let code = &trimmed[last.start..last.end];
    const OPERATORS: &[&str] = &[
        "&&", "||", "==", "!=", "<=", ">=", "=>", "+", "-", "*", "/", "%", "<", ">", "=", ",",
        "(", "[", "{", ".",
    ];
    OPERATORS.iter().any(|op| code.ends_with(op))
}

/// Byte offset of the first non-blank character
pub(crate) fn indent_len(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Whether `name` is a plain identifier
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Leading identifier at byte offset `at`, if any
pub(crate) fn identifier_at(line: &str, at: usize) -> Option<&str> {
    let rest = line.get(at..)?;
    let end = rest
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_alphanumeric() || *c == '_') || (*i == 0 && c.is_ascii_digit()))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if end == 0 {
        None
    } else {
        Some(&rest[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_split_strings() {
        let segs = segments(r#"puts("a \" b", 'c') `ls`"#);
        let kinds: Vec<SegmentKind> = segs.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Code,
                SegmentKind::Double,
                SegmentKind::Code,
                SegmentKind::Single,
                SegmentKind::Code,
                SegmentKind::Backtick,
            ]
        );
    }

    #[test]
    fn test_quotes_inside_interpolation_stay_in_string() {
        let segs = segments(r#"x = "a #{f("b")} c" + y"#);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[1].kind, SegmentKind::Double);
        assert_eq!(segs[2].kind, SegmentKind::Code);
    }

    #[test]
    fn test_words_skip_strings_labels_and_fields() {
        let found: Vec<&str> = words(r#"x = {end: "if"} + t.end"#)
            .iter()
            .map(|w| w.text)
            .collect();
        assert_eq!(found, vec!["x", "t"]);
    }

    #[test]
    fn test_bracket_delta_ignores_strings() {
        assert_eq!(bracket_delta(r#"foo("(", ["#), 2);
        assert_eq!(bracket_delta("])"), -2);
    }

    #[test]
    fn test_continuation() {
        assert!(ends_with_continuation("x = 1 +"));
        assert!(ends_with_continuation("foo(a,"));
        assert!(!ends_with_continuation("foo(a)"));
        assert!(!ends_with_continuation(r#"puts "a +""#));
    }
}
