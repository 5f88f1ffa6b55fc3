use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Reads a JSON payload given inline, as `@path`, or as `-` for stdin.
pub fn read_payload(arg: &str) -> Result<Value> {
    let text = match arg {
        "-" => read_stdin()?,
        _ => match arg.strip_prefix('@') {
            Some(path) => read_file(Path::new(path))?,
            None => arg.to_string(),
        },
    };
    parse(&text)
}

/// Reads a JSON payload from a file path, or from stdin for `-`.
pub fn read_document(arg: &str) -> Result<Value> {
    let text = match arg {
        "-" => read_stdin()?,
        path => read_file(Path::new(path))?,
    };
    parse(&text)
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read payload from stdin")?;
    Ok(text)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse(text: &str) -> Result<Value> {
    serde_json::from_str(text).context("Payload is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_inline_payload() {
        let value = read_payload(r#"{"type": "live", "title": "T"}"#).unwrap();
        assert_eq!(value, json!({"type": "live", "title": "T"}));
    }

    #[test]
    fn test_payload_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("payload.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let value = read_payload(&format!("@{}", path.display())).unwrap();
        assert_eq!(value, json!([1, 2]));

        let value = read_document(path.to_str().unwrap()).unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(read_payload("{not json").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = read_document("/nonexistent/lectern/import.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
