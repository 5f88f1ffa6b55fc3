//! Record commands: list, add, update, remove and import.
//!
//! Payloads are validated here, before the repository sees them. Every
//! command answers with `{"data": ..., "total": n}`.

use anyhow::Result;
use serde_json::{Value, json};

use lectern_core::course::{
    CourseRepository, Record, RecordPatch, ValidationMode, ensure_valid, now_timestamp,
    parse_import,
};
use lectern_core::error::LecternError;

pub async fn list<R>(repo: &R) -> Result<Value>
where
    R: CourseRepository + ?Sized,
{
    let document = repo.list().await?;
    Ok(json!({ "total": document.len(), "data": document }))
}

pub async fn add<R>(repo: &R, payload: Value) -> Result<Value>
where
    R: CourseRepository + ?Sized,
{
    let patch = to_patch(payload)?;
    ensure_valid(&patch, ValidationMode::Create)?;

    let record = Record::from_patch(&patch, &now_timestamp())?;
    let change = repo.append(record).await?;
    tracing::info!(
        "Added {} record {}",
        change.record.kind(),
        change.record.id()
    );

    Ok(json!({ "total": change.total(), "data": change.record }))
}

pub async fn update<R>(repo: &R, id: &str, payload: Value) -> Result<Value>
where
    R: CourseRepository + ?Sized,
{
    let patch = to_patch(payload)?;
    ensure_valid(&patch, ValidationMode::Patch)?;

    let change = repo.replace_by_id(id, patch).await?;
    tracing::info!("Updated record {}", id);

    Ok(json!({ "total": change.total(), "data": change.record }))
}

pub async fn remove<R>(repo: &R, id: &str) -> Result<Value>
where
    R: CourseRepository + ?Sized,
{
    let change = repo.remove_by_id(id).await?;
    tracing::info!("Removed record {}", id);

    Ok(json!({ "total": change.total(), "data": change.record }))
}

pub async fn import<R>(repo: &R, payload: Value) -> Result<Value>
where
    R: CourseRepository + ?Sized,
{
    let mut records = parse_import(payload)?;
    let now = now_timestamp();
    for record in &mut records {
        record.normalize(&now);
    }

    let document = repo.bulk_replace(records).await?;
    tracing::info!("Imported {} records", document.len());

    Ok(json!({ "total": document.len(), "data": document }))
}

/// Keeps only the known fields of an object payload.
fn to_patch(payload: Value) -> Result<RecordPatch> {
    if !payload.is_object() {
        return Err(
            LecternError::Validation(vec!["Payload must be an object".to_string()]).into(),
        );
    }
    serde_json::from_value(payload)
        .map_err(|e| LecternError::Validation(vec![format!("Invalid payload: {}", e)]).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::config::{Retention, StoreConfig};
    use lectern_infrastructure::JsonCourseRepository;
    use tempfile::TempDir;

    async fn create_test_repository() -> (JsonCourseRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            data_file: temp_dir.path().join("data").join("courses.json"),
            backup_dir: temp_dir.path().join("backups"),
            log_dir: temp_dir.path().join("logs"),
            retention: Retention::default(),
        };
        let repo = JsonCourseRepository::open(&config).await.unwrap();
        (repo, temp_dir)
    }

    fn validation_error(err: &anyhow::Error) -> Option<&Vec<String>> {
        match err.downcast_ref::<LecternError>() {
            Some(LecternError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let (repo, _temp_dir) = create_test_repository().await;

        let added = add(
            &repo,
            json!({
                "type": "live",
                "title": "Kickoff",
                "link": "https://meet.example.com/abc",
                "unexpected": "dropped"
            }),
        )
        .await
        .unwrap();

        assert_eq!(added["total"], 1);
        assert_eq!(added["data"]["title"], "Kickoff");
        assert!(added["data"].get("unexpected").is_none());
        assert!(added["data"]["id"].as_str().is_some_and(|id| !id.is_empty()));

        let listed = list(&repo).await.unwrap();
        assert_eq!(listed["total"], 1);
        assert_eq!(listed["data"][0], added["data"]);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_course() {
        let (repo, _temp_dir) = create_test_repository().await;

        let err = add(&repo, json!({"type": "course", "topic": " "}))
            .await
            .unwrap_err();

        let errors = validation_error(&err).unwrap();
        assert!(errors.contains(&"lessonLabel is required".to_string()));
        assert!(errors.contains(&"topic is required".to_string()));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_non_object() {
        let (repo, _temp_dir) = create_test_repository().await;

        let err = add(&repo, json!(["live"])).await.unwrap_err();

        assert!(validation_error(&err).is_some());
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let (repo, _temp_dir) = create_test_repository().await;
        let added = add(&repo, json!({"type": "live", "title": "Old"}))
            .await
            .unwrap();
        let id = added["data"]["id"].as_str().unwrap().to_string();

        let updated = update(&repo, &id, json!({"title": "New"})).await.unwrap();
        assert_eq!(updated["data"]["title"], "New");
        assert_eq!(updated["data"]["id"], id.as_str());

        let removed = remove(&repo, &id).await.unwrap();
        assert_eq!(removed["total"], 0);
        assert_eq!(removed["data"]["title"], "New");
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let (repo, _temp_dir) = create_test_repository().await;

        let err = remove(&repo, "missing").await.unwrap_err();

        let err = err.downcast_ref::<LecternError>().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_import_fills_ids_and_keeps_order() {
        let (repo, _temp_dir) = create_test_repository().await;

        let imported = import(
            &repo,
            json!([
                {"type": "course", "topic": "First"},
                {"type": "live", "id": "keep-me", "title": "Second"}
            ]),
        )
        .await
        .unwrap();

        assert_eq!(imported["total"], 2);
        assert_eq!(imported["data"][0]["topic"], "First");
        assert!(imported["data"][0]["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(imported["data"][0]["updatedAt"].is_string());
        assert_eq!(imported["data"][1]["id"], "keep-me");
    }

    #[tokio::test]
    async fn test_import_rejects_bad_item() {
        let (repo, _temp_dir) = create_test_repository().await;
        add(&repo, json!({"type": "live", "title": "Stays"}))
            .await
            .unwrap();

        let err = import(&repo, json!([{"type": "webinar"}])).await.unwrap_err();

        assert_eq!(
            validation_error(&err).unwrap(),
            &vec!["Item at index 0 has invalid type".to_string()]
        );
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
