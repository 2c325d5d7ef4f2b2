use unicode_normalization::UnicodeNormalization;

/// Decomposes accents off their letters, lower-cases, drops everything but
/// ASCII word characters, spaces and hyphens, then collapses each run of
/// spaces and hyphens into one `-`.
pub fn slugify(value: &str) -> String {
    let kept: String = value
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.trim().chars() {
        if c == '-' || c.is_whitespace() {
            in_separator = true;
            continue;
        }
        if in_separator {
            slug.push('-');
            in_separator = false;
        }
        slug.push(c.to_ascii_lowercase());
    }
    if in_separator {
        slug.push('-');
    }
    slug
}

/// A slug made of the first 15 characters of each part, e.g.
/// `["2025-06-01", "Ben Nevis", "42"]` becomes `2025-06-01-ben-nevis-42`.
pub fn readable_id<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.as_ref().chars().take(15).collect::<String>().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    slugify(&joined)
}

#[cfg(test)]
mod tests {
    use super::{readable_id, slugify};

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Crib Goch -- scramble!  "), "crib-goch-scramble");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn slugify_strips_accents() {
        assert_eq!(slugify("Café Rhône"), "cafe-rhone");
        assert_eq!(slugify("Ａｌｐｓ ✓"), "alps");
    }

    #[test]
    fn readable_id_truncates_each_part() {
        let slug = readable_id(&["2025-06-01", "The Cuillin Ridge Traverse", "7"]);
        assert_eq!(slug, "2025-06-01-the-cuillin-rid-7");
    }
}
