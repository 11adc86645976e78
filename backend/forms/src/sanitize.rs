//! Escaping of markup-significant characters in free text before it is stored.
//!
//! Only `<`, `>`, `"` and `'` are replaced. `&` is left alone, so a second pass
//! over text that already holds entities is a no-op, but text that contained a
//! literal `&lt;` before the first pass can no longer be told apart from an
//! escaped `<`. That is a known limitation of the scheme.

pub fn sanitize_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }

    escaped
}
