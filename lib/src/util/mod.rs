mod macros;

pub use macros::*;

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        let ascii = match deunicode::deunicode_char(ch) {
            Some(ascii) if !ascii.is_empty() && !ch.is_whitespace() => ascii,
            _ => "-",
        };

        for b in ascii.bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => {
                    // All sequences of characters not alphanumeric or `_` are
                    // converted into one `-`.
                    need_dash = !output.is_empty();
                }
            }
        }
    }

    output
}

/// Returns `true` if `input` is likely to contain Antlers markup.
pub fn is_template(input: &str) -> bool {
    memchr::memmem::find(input.as_bytes(), b"{{").is_some()
}

/// Joins `base` and `path` with exactly one `/` between them.
///
/// ```rust
/// use antlers::util::join_url;
///
/// assert_eq!(join_url("http://example.com", "path/to/a.txt"), "http://example.com/path/to/a.txt");
/// assert_eq!(join_url("/assets/", "/a.txt"), "/assets/a.txt");
/// assert_eq!(join_url("", "a.txt"), "a.txt");
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }

    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (true, false) | (false, true) => format!("{base}{path}"),
        (false, false) => format!("{base}/{path}"),
    }
}

/// Formats a byte count the way asset listings show it: `12 B`, `1.5 KB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{bytes} B"),
        _ => format!("{:.2} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod slug_tests {
    #[test]
    fn test_slugify() {
        use crate::util::slugify;

        assert_eq!(slugify("My Test String!!!1!1"), "my-test-string-1-1");
        assert_eq!(slugify("test\nit   now!"), "test-it-now");
        assert_eq!(slugify("  --test_-_cool- -  "), "test_-_cool");
        assert_eq!(slugify("Æúű--cool?"), "aeuu-cool");
        assert_eq!(slugify("You & Me"), "you-me");
        assert_eq!(slugify("a\tb\u{0}c\u{7f}d"), "a-b-c-d");
        assert_eq!(slugify("one\u{2003}two"), "one-two");
    }

    #[test]
    fn test_human_size() {
        use crate::util::human_size;

        assert_eq!(human_size(12), "12 B");
        assert_eq!(human_size(1536), "1.50 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_is_template() {
        use crate::util::is_template;

        assert!(is_template("Hello {{ name }}"));
        assert!(!is_template("Hello { name }"));
    }
}
