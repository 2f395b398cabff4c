//! Splitting socket frames into JSON messages.
//!
//! The matchmaking socket sometimes delivers several JSON objects in one
//! frame, or a frame that is not a single valid document. A frame is first
//! parsed whole; if that fails, a balanced-brace scan extracts every
//! top-level `{...}` substring and each one is parsed on its own.
//!
//! The scan tracks string literals (and escapes inside them), so braces that
//! appear inside quoted values do not affect nesting.

use serde_json::Value;

/// A fragment that could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAnomaly {
    /// Balanced substring that still failed to parse.
    Unparseable { fragment: String, reason: String },
    /// Text after the last balanced object that never closed.
    Unbalanced { fragment: String },
    /// A whole-frame document that is not an object or array of objects.
    NotAnObject { fragment: String },
}

/// Messages and anomalies extracted from one frame.
#[derive(Debug, Default)]
pub struct SplitFrame {
    pub messages: Vec<Value>,
    pub anomalies: Vec<FrameAnomaly>,
}

/// Split `frame` into JSON objects.
pub fn split_frame(frame: &str) -> SplitFrame {
    let trimmed = frame.trim();
    let mut out = SplitFrame::default();
    if trimmed.is_empty() {
        return out;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        collect_document(value, &mut out);
        return out;
    }

    let (fragments, remainder) = balanced_objects(trimmed);
    for fragment in fragments {
        match serde_json::from_str::<Value>(fragment) {
            Ok(value @ Value::Object(_)) => out.messages.push(value),
            Ok(_) => out.anomalies.push(FrameAnomaly::NotAnObject {
                fragment: fragment.to_string(),
            }),
            Err(e) => out.anomalies.push(FrameAnomaly::Unparseable {
                fragment: fragment.to_string(),
                reason: e.to_string(),
            }),
        }
    }
    if let Some(rest) = remainder {
        out.anomalies.push(FrameAnomaly::Unbalanced {
            fragment: rest.to_string(),
        });
    }
    out
}

fn collect_document(value: Value, out: &mut SplitFrame) {
    match value {
        Value::Object(_) => out.messages.push(value),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(_) => out.messages.push(item),
                    other => out.anomalies.push(FrameAnomaly::NotAnObject {
                        fragment: other.to_string(),
                    }),
                }
            }
        }
        other => out.anomalies.push(FrameAnomaly::NotAnObject {
            fragment: other.to_string(),
        }),
    }
}

/// Top-level balanced `{...}` substrings plus any unclosed remainder.
fn balanced_objects(text: &str) -> (Vec<&str>, Option<&str>) {
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    // Only ASCII bytes are matched, so every index is a char boundary.
    for (i, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        fragments.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    (fragments, start.map(|s| &text[s..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_object() {
        let split = split_frame(r#"{"name":"StatusUpdate","payload":{"state":"Connecting"}}"#);
        assert_eq!(split.messages.len(), 1);
        assert!(split.anomalies.is_empty());
    }

    #[test]
    fn test_two_concatenated_objects() {
        let split = split_frame(
            r#"{"name":"StatusUpdate","payload":{"state":"Waiting"}}{"name":"StatusUpdate","payload":{"state":"Queued","ticketId":"t1"}}"#,
        );
        assert_eq!(split.messages.len(), 2);
        assert_eq!(split.messages[1]["payload"]["ticketId"], "t1");
        assert!(split.anomalies.is_empty());
    }

    #[test]
    fn test_one_good_one_truncated() {
        let split = split_frame(r#"{"name":"Play","payload":{"matchId":"m1"}} {"name":"Stat"#);
        assert_eq!(split.messages.len(), 1);
        assert_eq!(split.messages[0]["name"], "Play");
        assert_eq!(split.anomalies.len(), 1);
        assert!(matches!(split.anomalies[0], FrameAnomaly::Unbalanced { .. }));
    }

    #[test]
    fn test_balanced_but_invalid_fragment() {
        let split = split_frame(r#"{"name":"Play"} {name: bad}"#);
        assert_eq!(split.messages.len(), 1);
        assert!(matches!(
            split.anomalies[0],
            FrameAnomaly::Unparseable { .. }
        ));
    }

    #[test]
    fn test_braces_inside_strings() {
        let split = split_frame(
            r#"{"name":"Unknown","payload":{"note":"a } tricky { value \" }"}}{"name":"Play"}"#,
        );
        assert_eq!(split.messages.len(), 2);
        assert_eq!(split.messages[0]["payload"]["note"], "a } tricky { value \" }");
        assert!(split.anomalies.is_empty());
    }

    #[test]
    fn test_array_is_flattened() {
        let split = split_frame(r#"[{"name":"Play"},{"name":"StatusUpdate"},3]"#);
        assert_eq!(split.messages.len(), 2);
        assert_eq!(split.anomalies.len(), 1);
    }

    #[test]
    fn test_garbage_yields_nothing() {
        let split = split_frame("keepalive");
        assert!(split.messages.is_empty());
        assert!(split.anomalies.is_empty());

        let split = split_frame("   ");
        assert!(split.messages.is_empty());
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let depth = 10_000;
        let frame = format!("{}{}", "{\"a\":".repeat(depth), "1");
        let split = split_frame(&frame);
        assert!(split.messages.is_empty());
        assert_eq!(split.anomalies.len(), 1);
    }
}
