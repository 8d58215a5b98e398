/// slugify
///
/// URL slug for a translation title: lowercased, anything that is not an ASCII word
/// character, whitespace or hyphen dropped, and runs of whitespace, underscores and
/// hyphens collapsed into a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        }
        // Everything else is dropped without acting as a separator.
    }

    slug
}
