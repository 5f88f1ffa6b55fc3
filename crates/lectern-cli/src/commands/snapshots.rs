use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use lectern_core::error::LecternError;
use lectern_infrastructure::JsonCourseRepository;
use lectern_infrastructure::storage::parse_document;

/// Lists snapshots, newest first.
pub async fn list(repo: &JsonCourseRepository) -> Result<Value> {
    let entries = repo.snapshots().list().await?;
    let data: Vec<Value> = entries
        .iter()
        .map(|entry| {
            let modified: DateTime<Utc> = entry.modified.into();
            json!({
                "file": entry.path.file_name().map(|n| n.to_string_lossy()),
                "modifiedAt": modified.to_rfc3339_opts(SecondsFormat::Millis, true),
            })
        })
        .collect();

    Ok(json!({
        "total": data.len(),
        "retention": repo.snapshots().retention().keep(),
        "data": data,
    }))
}

/// Decompresses the snapshot `name` and returns the document it holds.
pub async fn show(repo: &JsonCourseRepository, name: &str) -> Result<Value> {
    let store = repo.snapshots();
    if !store.is_snapshot_name(name) || name.contains(['/', '\\']) {
        return Err(LecternError::Validation(vec![format!(
            "{} is not a snapshot file name",
            name
        )])
        .into());
    }

    let path = store.dir().join(name);
    if !path.is_file() {
        return Err(LecternError::not_found("snapshot", name).into());
    }
    let raw = store.read(&path).await?;
    let text = String::from_utf8(raw).with_context(|| format!("{} is not UTF-8", name))?;
    let document = parse_document(&text, &path)?;

    Ok(json!({ "total": document.len(), "data": document }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::config::{Retention, StoreConfig};
    use lectern_core::course::CourseRepository;
    use tempfile::TempDir;

    async fn create_test_repository() -> (JsonCourseRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            data_file: temp_dir.path().join("data").join("courses.json"),
            backup_dir: temp_dir.path().join("backups"),
            log_dir: temp_dir.path().join("logs"),
            retention: Retention::KeepLatest(5),
        };
        let repo = JsonCourseRepository::open(&config).await.unwrap();
        (repo, temp_dir)
    }

    #[tokio::test]
    async fn test_list_and_show() {
        let (repo, _temp_dir) = create_test_repository().await;
        let record = serde_json::from_value(json!({"type": "live", "title": "T"})).unwrap();
        repo.append(record).await.unwrap();

        let listed = list(&repo).await.unwrap();
        assert_eq!(listed["total"], 1);
        assert_eq!(listed["retention"], 5);
        let name = listed["data"][0]["file"].as_str().unwrap().to_string();
        assert!(name.starts_with("courses-"));

        // The first mutation snapshotted the initial empty document.
        let shown = show(&repo, &name).await.unwrap();
        assert_eq!(shown["total"], 0);
    }

    #[tokio::test]
    async fn test_show_rejects_foreign_names() {
        let (repo, _temp_dir) = create_test_repository().await;

        let err = show(&repo, "../data/courses.json").await.unwrap_err();
        assert!(err.downcast_ref::<LecternError>().unwrap().is_validation());

        let err = show(&repo, "courses-20200101000000.json.gz").await.unwrap_err();
        assert!(err.downcast_ref::<LecternError>().unwrap().is_not_found());
    }
}
