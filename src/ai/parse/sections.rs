//! Heuristic extraction of labeled sections and bullet lists from prose.
//!
//! Recognized shapes:
//!
//! ```text
//! Summary: Lists all users.          (inline label)
//! ## Key Points                       (markdown heading)
//! **Use Cases**                       (bold heading)
//! - paginated listing                 (bullet, also "*", "•", "1.", "2)")
//! ```
//!
//! Labels are normalized to lowercase with single spaces, so `Key Points`,
//! `KEY POINTS` and `key_points` all land under `key points`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static RE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#{1,6}\s+(.+?)|\*\*(.+?)\*\*)\s*:?\s*$").unwrap()
});

static RE_INLINE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\**([A-Za-z][A-Za-z _-]{0,40}?)\**\s*:\s*(.*)$").unwrap()
});

static RE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+?)\s*$").unwrap());

/// One labeled block of text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    /// Prose lines joined with single spaces
    pub text: String,
    /// Bullet items in order
    pub items: Vec<String>,
}

impl Section {
    fn push_text(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(line);
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.items.is_empty()
    }
}

/// Sections recovered from unstructured model output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    labeled: BTreeMap<String, Section>,
    /// Text before the first label
    preamble: Section,
    /// Every bullet in document order, regardless of section
    bullets: Vec<String>,
}

impl Sections {
    pub fn extract(text: &str) -> Self {
        let mut sections = Sections::default();
        let mut current: Option<String> = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("```") {
                continue;
            }

            if let Some(caps) = RE_BULLET.captures(trimmed) {
                let item = strip_emphasis(&caps[1]);
                sections.bullets.push(item.clone());
                sections.section_mut(current.as_deref()).items.push(item);
                continue;
            }

            if let Some(caps) = RE_HEADING.captures(trimmed) {
                let label = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
                if let Some(label) = label {
                    current = Some(normalize_label(label));
                    sections.section_mut(current.as_deref());
                    continue;
                }
            }

            if let Some(caps) = RE_INLINE_LABEL.captures(trimmed) {
                let label = normalize_label(&caps[1]);
                let rest = strip_emphasis(&caps[2]);
                sections.section_mut(Some(&label)).push_text(&rest);
                current = Some(label);
                continue;
            }

            let line = strip_emphasis(trimmed);
            sections.section_mut(current.as_deref()).push_text(&line);
        }

        sections
    }

    fn section_mut(&mut self, label: Option<&str>) -> &mut Section {
        match label {
            Some(label) => self.labeled.entry(label.to_string()).or_default(),
            None => &mut self.preamble,
        }
    }

    /// First non-empty section among `labels`
    pub fn section(&self, labels: &[&str]) -> Option<&Section> {
        labels
            .iter()
            .filter_map(|label| self.labeled.get(&normalize_label(label)))
            .find(|section| !section.is_empty())
    }

    /// Prose of the first matching section
    pub fn text(&self, labels: &[&str]) -> Option<String> {
        self.section(labels)
            .map(|section| section.text.clone())
            .filter(|text| !text.is_empty())
    }

    /// Bullet items of the first matching section
    pub fn items(&self, labels: &[&str]) -> Vec<String> {
        self.section(labels)
            .map(|section| section.items.clone())
            .unwrap_or_default()
    }

    pub fn preamble(&self) -> &str {
        &self.preamble.text
    }

    pub fn bullets(&self) -> &[String] {
        &self.bullets
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labeled.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.labeled.is_empty() && self.preamble.is_empty()
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .trim_matches('*')
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn strip_emphasis(s: &str) -> String {
    s.trim().trim_matches('*').trim_matches('`').trim().to_string()
}
