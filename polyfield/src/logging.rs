//! Log formatting helpers.

use serde::Serialize;
use std::fmt::Debug;

/// Render a value as YAML in log lines.
///
/// ```ignore
/// use polyfield::Pretty;
/// tracing::debug!("rejected input: {}", Pretty(&value));
/// ```
///
/// Output starts with a newline. Debug formatting is the fallback when the
/// value cannot be serialized.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml.trim_end()),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> std::fmt::Debug for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_yaml_with_leading_newline() {
        let rendered = format!("{}", Pretty(&json!({"type": "str", "value": "red"})));
        assert!(rendered.starts_with('\n'));
        assert!(rendered.contains("type: str"));
        assert!(rendered.contains("value: red"));
    }

    #[test]
    fn debug_matches_display() {
        let value = json!([1, 2]);
        assert_eq!(format!("{:?}", Pretty(&value)), format!("{}", Pretty(&value)));
    }
}
