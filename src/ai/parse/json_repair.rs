//! JSON extraction and repair for model output.
//!
//! Models wrap JSON in prose, markdown fences, or cut it off mid-object when
//! they hit the token limit. Repairs run in increasing order of aggressiveness
//! and stop at the first variant that parses:
//!
//! 1. fence and BOM stripping, then a direct parse
//! 2. the first balanced `{...}` / `[...]` span inside surrounding prose
//! 3. trailing-comma removal and bracket balancing
//! 4. closing strings cut at a newline, dropping control characters, and
//!    truncating to the last complete top-level value

use serde_json::Value;
use tracing::debug;

/// Parsed JSON and whether any repair was needed to get it
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    pub repaired: bool,
}

/// Extract a JSON value from raw model text, repairing it if possible
pub fn extract_json(raw: &str) -> Option<Extracted> {
    let cleaned = strip_wrapping(raw);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Some(Extracted {
            value,
            repaired: false,
        });
    }

    let embedded = balanced_span(&cleaned).map(str::to_string);
    let base = embedded.as_deref().unwrap_or(&cleaned);

    let candidates = [
        embedded.clone(),
        Some(close_open_structures(&drop_trailing_commas(base))),
        Some(truncate_to_complete(&close_open_structures(
            &close_broken_strings(&strip_control_chars(&drop_trailing_commas(base))),
        ))),
    ];

    for (stage, candidate) in candidates.into_iter().flatten().enumerate() {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            debug!(stage = stage + 1, "Model output JSON repaired");
            return Some(Extracted {
                value,
                repaired: true,
            });
        }
    }

    None
}

/// Strip a BOM and a surrounding (or embedded) markdown code fence
fn strip_wrapping(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();

    let Some(open) = trimmed.find("```") else {
        return trimmed.to_string();
    };
    let after_open = &trimmed[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the first newline
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim().to_string()
}

/// Lexical state shared by the scanners below
#[derive(Default)]
struct Scanner {
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    /// Feed one char; returns true when it is structural (outside a string)
    fn feed(&mut self, ch: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        match ch {
            '\\' if self.in_string => {
                self.escaped = true;
                false
            }
            '"' => {
                self.in_string = !self.in_string;
                false
            }
            _ => !self.in_string,
        }
    }
}

/// First balanced object or array span within mixed content
fn balanced_span(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut scanner = Scanner::default();
    let mut depth = 0i32;

    for (offset, ch) in s[start..].char_indices() {
        if !scanner.feed(ch) {
            continue;
        }
        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn drop_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut scanner = Scanner::default();

    for (i, &ch) in chars.iter().enumerate() {
        let structural = scanner.feed(ch);
        if structural && ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Close an unterminated string and any open brackets, innermost first
fn close_open_structures(s: &str) -> String {
    let mut scanner = Scanner::default();
    let mut stack = Vec::new();

    for ch in s.chars() {
        if !scanner.feed(ch) {
            continue;
        }
        match ch {
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = s.trim_end().to_string();
    if scanner.in_string {
        out.push('"');
    }
    while out.ends_with(',') {
        out.pop();
    }
    out.extend(stack.into_iter().rev());
    out
}

/// Close strings that run into a raw newline
fn close_broken_strings(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut scanner = Scanner::default();

    for ch in s.chars() {
        if matches!(ch, '\n' | '\r') && scanner.in_string {
            out.push('"');
            scanner.in_string = false;
            out.push(ch);
            continue;
        }
        scanner.feed(ch);
        out.push(ch);
    }
    out
}

fn strip_control_chars(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Cut everything after the last complete top-level value
fn truncate_to_complete(s: &str) -> String {
    let mut scanner = Scanner::default();
    let mut depth = 0i32;
    let mut last_complete = 0;

    for (i, ch) in s.char_indices() {
        if !scanner.feed(ch) {
            continue;
        }
        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    last_complete = i + ch.len_utf8();
                }
            }
            _ => {}
        }
    }

    if last_complete > 0 {
        s[..last_complete].to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_not_repaired() {
        let extracted = extract_json(r#"{"summary": "Lists users"}"#).unwrap();
        assert!(!extracted.repaired);
        assert_eq!(extracted.value["summary"], "Lists users");
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"valid\": true, \"score\": 0.9}\n```";
        let extracted = extract_json(raw).unwrap();
        assert!(!extracted.repaired);
        assert_eq!(extracted.value["score"], 0.9);
    }

    #[test]
    fn test_fence_inside_prose() {
        let raw = "Here you go:\n```json\n{\"valid\": false}\n```\nLet me know.";
        let extracted = extract_json(raw).unwrap();
        assert_eq!(extracted.value["valid"], false);
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let raw = r#"Sure! {"keyPoints": ["a", "b"]} Hope this helps."#;
        let extracted = extract_json(raw).unwrap();
        assert!(extracted.repaired);
        assert_eq!(extracted.value["keyPoints"][1], "b");
    }

    #[test]
    fn test_trailing_comma() {
        let extracted = extract_json(r#"{"useCases": ["list", "search",],}"#).unwrap();
        assert!(extracted.repaired);
        assert_eq!(extracted.value["useCases"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_truncated_output_is_closed() {
        let raw = r#"{"enhancements": [{"type": "addition", "suggested": "Add an example"#;
        let extracted = extract_json(raw).unwrap();
        assert!(extracted.repaired);
        assert_eq!(
            extracted.value["enhancements"][0]["suggested"],
            "Add an example"
        );
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let raw = r#"{"example": "GET /users/{id}", "n": 1"#;
        let extracted = extract_json(raw).unwrap();
        assert_eq!(extracted.value["example"], "GET /users/{id}");
    }

    #[test]
    fn test_prose_without_json() {
        assert!(extract_json("Summary: Returns all users.").is_none());
        assert!(extract_json("   ").is_none());
    }
}
