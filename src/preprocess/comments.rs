use super::segments::{segments, SegmentKind};
use super::SourceLine;

/// Strip `#` comments outside string literals
///
/// `#{` outside a string is left alone: it only appears in shell lines,
/// where it is interpolation.
pub(crate) fn strip_comments(lines: Vec<SourceLine>) -> Vec<SourceLine> {
    lines
        .into_iter()
        .map(|line| SourceLine {
            text: strip_line(&line.text).to_string(),
            origin: line.origin,
        })
        .collect()
}

fn strip_line(line: &str) -> &str {
    let bytes = line.as_bytes();
    for seg in segments(line) {
        if seg.kind != SegmentKind::Code {
            continue;
        }
        for i in seg.start..seg.end {
            if bytes[i] == b'#' && bytes.get(i + 1) != Some(&b'{') {
                return line[..i].trim_end();
            }
        }
    }
    line.trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line() {
        assert_eq!(strip_line("x = 1 # note"), "x = 1");
        assert_eq!(strip_line(r#"puts "a # b" # c"#), r#"puts "a # b""#);
        assert_eq!(strip_line("# whole line"), "");
        assert_eq!(strip_line("echo #{name}"), "echo #{name}");
        assert_eq!(strip_line("x = 'it''s' # q"), "x = 'it''s'");
    }
}
