use super::segments::is_identifier;
use super::SourceLine;

/// Expand `struct Name` blocks into a declaration and a constructor
///
/// ```text
/// struct Point          struct Point(x, y)
///   x, y          =>    def Point(x, y)
/// end                     return {"__type__" => "Point", "x" => x, "y" => y}
///                       end
/// ```
pub(crate) fn expand_structs(lines: Vec<SourceLine>) -> Vec<SourceLine> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let Some((name, indent)) = struct_header(&lines[i].text) else {
            out.push(lines[i].clone());
            i += 1;
            continue;
        };

        match struct_body(&lines[i + 1..]) {
            Some((fields, consumed)) => {
                let origin = lines[i].origin;
                let end_origin = lines[i + consumed].origin;
                let params = fields.join(", ");
                let mut hash = format!("{{\"__type__\" => \"{}\"", name);
                for field in &fields {
                    hash.push_str(&format!(", \"{}\" => {}", field, field));
                }
                hash.push('}');

                out.push(SourceLine::new(format!("{}struct {}({})", indent, name, params), origin));
                out.push(SourceLine::new(format!("{}def {}({})", indent, name, params), origin));
                out.push(SourceLine::new(format!("{}  return {}", indent, hash), origin));
                out.push(SourceLine::new(format!("{}end", indent), end_origin));
                i += consumed + 1;
            }
            None => {
                out.push(lines[i].clone());
                i += 1;
            }
        }
    }

    out
}

/// `struct Name` on a line of its own
fn struct_header(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim();
    let name = trimmed.strip_prefix("struct ")?.trim();
    let capitalized = name.starts_with(|c: char| c.is_ascii_uppercase());
    if !capitalized || !is_identifier(name) {
        return None;
    }
    let indent = text[..text.len() - text.trim_start().len()].to_string();
    Some((name.to_string(), indent))
}

/// Field names up to `end`, and the number of lines consumed including `end`
fn struct_body(lines: &[SourceLine]) -> Option<(Vec<String>, usize)> {
    let mut fields = Vec::new();
    for (offset, line) in lines.iter().enumerate() {
        let trimmed = line.text.trim();
        if trimmed == "end" {
            return Some((fields, offset + 1));
        }
        for field in trimmed.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            if !is_identifier(field) || fields.iter().any(|f| f == field) {
                return None;
            }
            fields.push(field.to_string());
        }
    }
    None
}
