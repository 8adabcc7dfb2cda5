use std::collections::HashMap;

/// Extracts a `{#custom-id}` suffix from heading text.
///
/// If the text ends with `{#some-id}` (ASCII alphanumerics, hyphens or
/// underscores), returns the text without the suffix and `Some(id)`.
/// Otherwise returns the original text and `None`.
pub fn extract_custom_id(text: &str) -> (&str, Option<&str>) {
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return (text, None);
    }

    if let Some(open) = trimmed.rfind("{#") {
        let id = &trimmed[open + 2..trimmed.len() - 1];
        if !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return (trimmed[..open].trim_end(), Some(id));
        }
    }

    (text, None)
}

/// Github-style anchor generator with per-document duplicate suffixes.
#[derive(Debug, Default)]
pub struct Slugger {
    counts: HashMap<String, usize>,
}

impl Slugger {
    /// Creates a new slugger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor for the next heading titled `text`; repeats get `-1`, `-2`, ...
    pub fn next_slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut slug = base.clone();
        // A suffixed slug can itself be taken by an explicit anchor.
        while self.counts.contains_key(&slug) {
            let seen = self.counts.entry(base.clone()).or_insert(0);
            *seen += 1;
            slug = format!("{base}-{seen}");
        }
        self.counts.insert(slug.clone(), 0);
        slug
    }

    /// Reserves an explicit anchor so generated ones do not collide with it.
    pub fn reserve(&mut self, slug: &str) {
        self.counts.entry(slug.to_string()).or_insert(0);
    }
}

/// Lowercases, keeps letters, digits, `-` and `_`, turns spaces into hyphens
/// and drops everything else. Never returns an empty string.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            slug.extend(ch.to_lowercase());
        } else if ch == ' ' {
            slug.push('-');
        }
    }

    if slug.is_empty() {
        slug.push_str("heading");
    }
    slug
}
