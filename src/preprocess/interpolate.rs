use super::segments::{interpolation_end, segments, SegmentKind};

/// Rewrite interpolating strings into concatenation
///
/// `"a #{e} b"` becomes `("a " + __to_s(e) + " b")`. Strings without an
/// interpolation, single-quoted strings, unterminated strings and
/// unbalanced `#{` are left alone.
pub(crate) fn interpolate(line: &str) -> String {
    interpolate_nested(line, 0)
}

/// Interpolations nested deeper than this are left as written
const MAX_DEPTH: usize = 16;

fn interpolate_nested(line: &str, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    for seg in segments(line) {
        let text = &line[seg.start..seg.end];
        if seg.kind != SegmentKind::Double || text.len() < 2 || !text.ends_with('"') {
            out.push_str(text);
            continue;
        }
        match expand(&text[1..text.len() - 1], depth) {
            Some(expanded) => out.push_str(&expanded),
            None => out.push_str(text),
        }
    }
    out
}

enum Part<'a> {
    Literal(&'a str),
    Code(&'a str),
}

fn expand(content: &str, depth: usize) -> Option<String> {
    let parts = split_parts(content)?;
    if !parts.iter().any(|p| matches!(p, Part::Code(_))) {
        return None;
    }

    let mut pieces = Vec::new();
    if !matches!(parts.first(), Some(Part::Literal(_))) {
        pieces.push("\"\"".to_string());
    }
    for part in parts {
        match part {
            Part::Literal(text) => pieces.push(format!("\"{}\"", text)),
            Part::Code(code) => pieces.push(format!(
                "__to_s({})",
                interpolate_nested(code.trim(), depth + 1)
            )),
        }
    }
    Some(format!("({})", pieces.join(" + ")))
}

fn split_parts(content: &str) -> Option<Vec<Part<'_>>> {
    let bytes = content.as_bytes();
    let mut parts = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                let code_start = i + 2;
                let code_end = interpolation_end(bytes, code_start, 0)?;
                if literal_start < i {
                    parts.push(Part::Literal(&content[literal_start..i]));
                }
                parts.push(Part::Code(&content[code_start..code_end]));
                i = code_end + 1;
                literal_start = i;
            }
            _ => i += 1,
        }
    }
    if literal_start < bytes.len() {
        parts.push(Part::Literal(&content[literal_start..]));
    }
    Some(parts)
}

/// Replace `` `cmd` `` with `__capture("cmd")`
pub(crate) fn rewrite_backticks(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for seg in segments(line) {
        let text = &line[seg.start..seg.end];
        if seg.kind == SegmentKind::Backtick && text.len() >= 2 && text.ends_with('`') {
            let command = text[1..text.len() - 1].replace("\\`", "`");
            out.push_str("__capture(");
            out.push_str(&shell_literal(&command));
            out.push(')');
        } else {
            out.push_str(text);
        }
    }
    out
}

/// Quote a shell command as a Rugo string, keeping `#{...}` intact
pub(crate) fn shell_literal(command: &str) -> String {
    let bytes = command.as_bytes();
    let mut out = String::from("\"");
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                let end = interpolation_end(bytes, i + 2, 0)
                    .map(|e| e + 1)
                    .unwrap_or(bytes.len());
                out.push_str(&escape(&command[copied..i]));
                out.push_str(&command[i..end]);
                i = end;
                copied = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&escape(&command[copied..]));
    out.push('"');
    out
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
