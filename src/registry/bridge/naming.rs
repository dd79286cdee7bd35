/// Mixed-case words kept whole, longest first within a shared prefix
const ACRONYMS: &[&str] = &[
    "GraphQL",
    "IPv4",
    "IPv6",
    "MySQL",
    "OAuth2",
    "OAuth",
    "PostgreSQL",
    "UTF16",
    "UTF8",
    "iOS",
    "macOS",
];

/// Translate an exported Go identifier into a Rugo snake_case name
///
/// Words split at lower-to-upper transitions, at the last capital of an
/// upper-case run followed by lower case, and after digits.
/// `ToUpper` → `to_upper`, `HTTPServer` → `http_server`,
/// `ParseIPv4` → `parse_ipv4`.
pub fn to_snake_case(go_name: &str) -> String {
    let chars: Vec<char> = go_name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        if let Some(acronym) = acronym_at(&chars, i) {
            flush(&mut words, &mut current);
            words.push(acronym.to_lowercase());
            i += acronym.chars().count();
            continue;
        }

        let c = chars[i];
        if c == '_' {
            flush(&mut words, &mut current);
            i += 1;
            continue;
        }
        if c.is_uppercase() {
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // `current` is already lower-cased; look at the source characters
            let boundary = !current.is_empty() && {
                let prev = chars[i - 1];
                prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            };
            if boundary {
                flush(&mut words, &mut current);
            }
        }
        current.extend(c.to_lowercase());
        i += 1;
    }
    flush(&mut words, &mut current);
    words.join("_")
}

fn acronym_at(chars: &[char], at: usize) -> Option<&'static str> {
    ACRONYMS.iter().copied().find(|acronym| {
        let len = acronym.chars().count();
        at + len <= chars.len()
            && acronym.chars().zip(&chars[at..at + len]).all(|(a, b)| a == *b)
            // the acronym must not run into a lower-case continuation
            && !chars.get(at + len).is_some_and(|c| c.is_lowercase())
    })
}

fn flush(words: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_boundaries() {
        assert_eq!(to_snake_case("Greet"), "greet");
        assert_eq!(to_snake_case("ToUpper"), "to_upper");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("Base64Encode"), "base64_encode");
        assert_eq!(to_snake_case("Already_Snake"), "already_snake");
    }

    #[test]
    fn test_acronym_exceptions() {
        assert_eq!(to_snake_case("ParseIPv4"), "parse_ipv4");
        assert_eq!(to_snake_case("IPv6Zone"), "ipv6_zone");
        assert_eq!(to_snake_case("NewOAuthClient"), "new_oauth_client");
        assert_eq!(to_snake_case("ValidUTF8"), "valid_utf8");
    }

    #[test]
    fn test_collisions_are_possible() {
        assert_eq!(to_snake_case("HTTPGet"), to_snake_case("HttpGet"));
    }
}
