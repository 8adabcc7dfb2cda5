use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use thiserror::Error;

/// Document metadata parked ahead of the body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frontmatter {
    /// `title` key.
    pub title: Option<String>,
    /// `description` key.
    pub description: Option<String>,
    /// Every other key, kept for re-export.
    pub extra: BTreeMap<String, JsonValue>,
}

impl Frontmatter {
    /// True when no key is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.extra.is_empty()
    }
}

/// Result returned after extracting frontmatter from a document.
#[derive(Debug)]
pub struct FrontmatterExtraction {
    /// Parsed metadata.
    pub frontmatter: Frontmatter,
    /// Byte offset inside the original document where the body begins.
    pub body_start: usize,
}

impl FrontmatterExtraction {
    fn empty() -> Self {
        Self {
            frontmatter: Frontmatter::default(),
            body_start: 0,
        }
    }
}

/// Errors emitted while parsing or extracting frontmatter.
#[derive(Debug, Error)]
pub enum FrontmatterError {
    /// Unclosed YAML fence (e.g., missing terminating `---`).
    #[error("Unterminated YAML frontmatter block: expected closing '---'")]
    Unterminated,
    /// YAML failed to parse.
    #[error("Frontmatter parse error: {0}")]
    Parse(String),
    /// Top-level YAML node was not a mapping.
    #[error("Frontmatter must be a YAML mapping at the top level")]
    InvalidRootType,
}

/// Extracts YAML frontmatter from an input document.
pub fn extract_frontmatter(input: &str) -> Result<FrontmatterExtraction, FrontmatterError> {
    match find_yaml_block(input)? {
        Some((block, body_start)) => {
            let frontmatter = parse_yaml_block(block)?;
            Ok(FrontmatterExtraction {
                frontmatter,
                body_start,
            })
        }
        None => Ok(FrontmatterExtraction::empty()),
    }
}

fn parse_yaml_block(block: &str) -> Result<Frontmatter, FrontmatterError> {
    if block.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|err| FrontmatterError::Parse(err.to_string()))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| FrontmatterError::Parse(err.to_string()))?;

    let mut map = match json_value {
        JsonValue::Null => return Ok(Frontmatter::default()),
        JsonValue::Object(map) => map,
        _ => return Err(FrontmatterError::InvalidRootType),
    };

    Ok(Frontmatter {
        title: map.remove("title").map(scalar_string),
        description: map.remove("description").map(scalar_string),
        extra: map.into_iter().collect(),
    })
}

fn scalar_string(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Renders metadata as a `---` block followed by one blank line.
///
/// `title` and `description` come first as double-quoted strings, then the
/// remaining keys in sorted order. Empty metadata renders as nothing.
pub fn render_frontmatter(frontmatter: &Frontmatter) -> String {
    if frontmatter.is_empty() {
        return String::new();
    }

    let mut out = String::from("---\n");
    if let Some(title) = &frontmatter.title {
        out.push_str(&format!("title: {}\n", quote(title)));
    }
    if let Some(description) = &frontmatter.description {
        out.push_str(&format!("description: {}\n", quote(description)));
    }
    if !frontmatter.extra.is_empty() {
        match serde_yaml::to_string(&frontmatter.extra) {
            Ok(yaml) => out.push_str(&yaml),
            Err(err) => log::warn!("dropping unserializable frontmatter keys: {err}"),
        }
    }
    out.push_str("---\n\n");
    out
}

// A JSON string literal is also a valid YAML double-quoted scalar.
fn quote(value: &str) -> String {
    JsonValue::String(value.to_string()).to_string()
}

fn find_yaml_block(input: &str) -> Result<Option<(&str, usize)>, FrontmatterError> {
    let (without_bom, bom_len) = strip_bom(input);
    let mut cursor = 0usize;

    while let Some((line, next_cursor)) = next_line(without_bom, cursor) {
        if line.trim().is_empty() {
            cursor = next_cursor;
            continue;
        }

        if !is_yaml_fence(line) {
            return Ok(None);
        }

        let block_start = next_cursor;
        let mut scan_cursor = next_cursor;
        while let Some((block_line, next_line_cursor)) = next_line(without_bom, scan_cursor) {
            if is_yaml_fence(block_line) {
                let raw_block = &without_bom[block_start..scan_cursor];
                let trimmed = raw_block.trim_end_matches(['\r', '\n']);
                return Ok(Some((trimmed, bom_len + next_line_cursor)));
            }
            scan_cursor = next_line_cursor;
        }
        return Err(FrontmatterError::Unterminated);
    }

    Ok(None)
}

fn strip_bom(input: &str) -> (&str, usize) {
    if let Some(stripped) = input.strip_prefix('\u{feff}') {
        (stripped, '\u{feff}'.len_utf8())
    } else {
        (input, 0)
    }
}

fn next_line(input: &str, start: usize) -> Option<(&str, usize)> {
    if start >= input.len() {
        return None;
    }

    let rest = &input[start..];
    match rest.find('\n') {
        Some(pos) => Some((&rest[..pos], start + pos + 1)),
        None => Some((rest, input.len())),
    }
}

fn is_yaml_fence(line: &str) -> bool {
    line.trim_end_matches('\r') == "---"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(input: &str) -> FrontmatterExtraction {
        extract_frontmatter(input).expect("frontmatter extraction should succeed")
    }

    #[test]
    fn returns_empty_when_no_frontmatter() {
        let result = extract("# Title\nBody");
        assert_eq!(result.body_start, 0);
        assert!(result.frontmatter.is_empty());
    }

    #[test]
    fn parses_title_description_and_extra_keys() {
        let input = "---\ntitle: Getting Started\ndescription: First steps\ntags:\n  - setup\n---\n# Content";
        let result = extract(input);
        assert_eq!(result.body_start, input.find("# Content").unwrap());
        assert_eq!(result.frontmatter.title.as_deref(), Some("Getting Started"));
        assert_eq!(result.frontmatter.description.as_deref(), Some("First steps"));
        assert_eq!(
            result.frontmatter.extra.get("tags"),
            Some(&serde_json::json!(["setup"]))
        );
    }

    #[test]
    fn handles_empty_block() {
        let input = "---\n---\n# Body";
        let result = extract(input);
        assert!(result.frontmatter.is_empty());
        assert_eq!(result.body_start, input.find("# Body").unwrap());
    }

    #[test]
    fn skips_bom_and_leading_blank_lines() {
        let input = "\u{feff}\n   \n---\ntitle: bar\n---\nBody";
        let result = extract(input);
        assert_eq!(result.frontmatter.title.as_deref(), Some("bar"));
        assert_eq!(result.body_start, input.find("Body").unwrap());
    }

    #[test]
    fn non_string_title_is_stringified() {
        let result = extract("---\ntitle: 42\n---\n");
        assert_eq!(result.frontmatter.title.as_deref(), Some("42"));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let err = extract_frontmatter("---\ninvalid: [unterminated\n---\n").unwrap_err();
        assert!(matches!(err, FrontmatterError::Parse(_)), "{err:?}");
    }

    #[test]
    fn errors_on_unterminated_block() {
        let err = extract_frontmatter("---\ntitle: test").unwrap_err();
        assert!(matches!(err, FrontmatterError::Unterminated));
    }

    #[test]
    fn errors_on_scalar_root() {
        let err = extract_frontmatter("---\njust text\n---\n").unwrap_err();
        assert!(matches!(err, FrontmatterError::InvalidRootType));
    }

    #[test]
    fn rendered_block_parses_back() {
        let mut frontmatter = Frontmatter {
            title: Some("Say \"hi\": now".to_string()),
            description: Some(String::new()),
            extra: BTreeMap::new(),
        };
        frontmatter
            .extra
            .insert("order".to_string(), serde_json::json!(3));

        let rendered = render_frontmatter(&frontmatter);
        assert!(rendered.starts_with("---\ntitle: \"Say \\\"hi\\\": now\"\ndescription: \"\"\n"));
        assert!(rendered.ends_with("---\n\n"));

        let parsed = extract(&rendered);
        assert_eq!(parsed.frontmatter, frontmatter);
        assert_eq!(parsed.body_start, rendered.len() - 1);
    }

    #[test]
    fn empty_metadata_renders_nothing() {
        assert_eq!(render_frontmatter(&Frontmatter::default()), "");
    }
}
