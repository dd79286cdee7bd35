use super::segments::{segments, SegmentKind};
use super::SourceLine;

/// Heredoc opener found on a line
struct Opener {
    /// Byte range of `<<~TAG` in the line
    start: usize,
    end: usize,
    tag: String,
    /// `<<~` strips common indentation
    squiggly: bool,
    /// `<<~'TAG'` disables interpolation and escapes
    raw: bool,
}

/// Collapse heredoc bodies into single-line string literals
///
/// The literal replaces the opener on its own line; body and terminator
/// lines disappear. An opener without a terminator is left untouched.
pub(crate) fn expand_heredocs(lines: Vec<SourceLine>) -> Vec<SourceLine> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let Some(opener) = find_opener(&line.text) else {
            out.push(line.clone());
            i += 1;
            continue;
        };

        let terminator = lines[i + 1..]
            .iter()
            .position(|l| l.text.trim() == opener.tag)
            .map(|offset| i + 1 + offset);
        let Some(term) = terminator else {
            out.push(line.clone());
            i += 1;
            continue;
        };

        let body: Vec<&str> = lines[i + 1..term].iter().map(|l| l.text.as_str()).collect();
        let literal = render_literal(&body, opener.squiggly, opener.raw);
        let mut text = String::with_capacity(line.text.len() + literal.len());
        text.push_str(&line.text[..opener.start]);
        text.push_str(&literal);
        text.push_str(&line.text[opener.end..]);
        out.push(SourceLine {
            text,
            origin: line.origin,
        });
        i = term + 1;
    }

    out
}

fn find_opener(line: &str) -> Option<Opener> {
    for seg in segments(line) {
        if seg.kind != SegmentKind::Code {
            continue;
        }
        let code = &line[seg.start..seg.end];
        let Some(pos) = code.find("<<") else {
            continue;
        };
        let mut cursor = pos + 2;
        let squiggly = code[cursor..].starts_with('~');
        if squiggly {
            cursor += 1;
        }
        let raw = code[cursor..].starts_with('\'');
        if raw {
            cursor += 1;
        }
        let tag_len = code[cursor..]
            .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
            .unwrap_or(code.len() - cursor);
        if tag_len == 0 || !code[cursor..].starts_with(|c: char| c.is_ascii_uppercase()) {
            continue;
        }
        let tag = code[cursor..cursor + tag_len].to_string();
        cursor += tag_len;
        if raw {
            if !code[cursor..].starts_with('\'') {
                continue;
            }
            cursor += 1;
        }
        return Some(Opener {
            start: seg.start + pos,
            end: seg.start + cursor,
            tag,
            squiggly,
            raw,
        });
    }

    // `<<~'TAG'`: the quote splits the opener across segments
    let pos = line.find("<<~'").or_else(|| line.find("<<'"))?;
    let quote = line[pos..].find('\'')? + pos;
    let close = line[quote + 1..].find('\'')? + quote + 1;
    let tag = &line[quote + 1..close];
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        return None;
    }
    let prefix_is_code = segments(&line[..pos])
        .last()
        .map(|s| s.kind == SegmentKind::Code)
        .unwrap_or(true);
    if !prefix_is_code {
        return None;
    }
    Some(Opener {
        start: pos,
        end: close + 1,
        tag: tag.to_string(),
        squiggly: line[pos..].starts_with("<<~"),
        raw: true,
    })
}

fn render_literal(body: &[&str], squiggly: bool, raw: bool) -> String {
    let strip = if squiggly {
        body.iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
            .min()
            .unwrap_or(0)
    } else {
        0
    };

    let mut out = String::from("\"");
    for line in body {
        let content = strip_indent(line, strip);
        for c in content.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' if raw => out.push_str("\\\\"),
                '#' if raw => out.push_str("\\#"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
        out.push_str("\\n");
    }
    out.push('"');
    out
}

/// Drop up to `count` leading whitespace characters
fn strip_indent(line: &str, count: usize) -> &str {
    let cut = line
        .char_indices()
        .take(count)
        .take_while(|(_, c)| c.is_whitespace())
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &line[cut..]
}
