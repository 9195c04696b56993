/// Builds the URL-safe broker identity from a display name.
///
/// Lowercases, drops everything except ASCII letters, digits, whitespace and
/// hyphens, then joins the remaining words with single hyphens. Names that
/// differ only in punctuation or spacing collapse to the same slug.
pub fn slugify(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    cleaned
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
