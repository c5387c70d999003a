//! Upload response decoding.
//!
//! Deployments of the service disagree on how upload counts are named, so the
//! client is configured with exactly one `ResponseSchema` and reads only that.

use crate::error::{Result, WorkflowError};
use crate::model::{ResponseSchema, Stage, UploadSummary};
use serde_json::Value;

pub(crate) fn upload_summary(
    stage: Stage,
    schema: ResponseSchema,
    body: &Value,
) -> Result<UploadSummary> {
    match (stage, schema) {
        (Stage::Network, ResponseSchema::Stats) => Ok(UploadSummary::Network {
            nodes: count_at(body, &["stats", "nodes"])?,
            edges: count_at(body, &["stats", "edges"])?,
        }),
        (Stage::Network, ResponseSchema::Collections) => Ok(UploadSummary::Network {
            nodes: len_at(body, "nodes")?,
            edges: len_at(body, "edges")?,
        }),
        (Stage::Points, ResponseSchema::Stats) => Ok(UploadSummary::Points {
            loaded: count_at(body, &["points_loaded"])?,
            skipped: warnings(body),
        }),
        (Stage::Points, ResponseSchema::Collections) => Ok(UploadSummary::Points {
            loaded: len_at(body, "points")?,
            skipped: warnings(body),
        }),
    }
}

fn count_at(body: &Value, path: &[&str]) -> Result<u64> {
    path.iter()
        .try_fold(body, |v, key| v.get(*key))
        .and_then(Value::as_u64)
        .ok_or_else(|| WorkflowError::malformed(format!("missing count `{}`", path.join("."))))
}

fn len_at(body: &Value, key: &str) -> Result<u64> {
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| items.len() as u64)
        .ok_or_else(|| WorkflowError::malformed(format!("missing list `{key}`")))
}

/// Rows the service skipped; `warnings` is `null` when nothing was skipped.
fn warnings(body: &Value) -> u64 {
    body.get("warnings")
        .and_then(Value::as_array)
        .map_or(0, |w| w.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stats_schema_reads_nested_counts() {
        let body = json!({ "status": "success", "stats": { "nodes": 5, "edges": 7, "connected": true } });
        let s = upload_summary(Stage::Network, ResponseSchema::Stats, &body).unwrap();
        assert_eq!(s, UploadSummary::Network { nodes: 5, edges: 7 });
    }

    #[test]
    fn collections_schema_counts_lengths() {
        let body = json!({ "nodes": [1, 2, 3], "edges": [[1, 2]] });
        let s = upload_summary(Stage::Network, ResponseSchema::Collections, &body).unwrap();
        assert_eq!(s, UploadSummary::Network { nodes: 3, edges: 1 });

        let body = json!({ "points": ["a", "b"], "warnings": [{ "id": "x" }] });
        let s = upload_summary(Stage::Points, ResponseSchema::Collections, &body).unwrap();
        assert_eq!(s, UploadSummary::Points { loaded: 2, skipped: 1 });
    }

    #[test]
    fn points_with_null_warnings() {
        let body = json!({ "points_loaded": 12, "warnings": null });
        let s = upload_summary(Stage::Points, ResponseSchema::Stats, &body).unwrap();
        assert_eq!(s, UploadSummary::Points { loaded: 12, skipped: 0 });
    }

    #[test]
    fn wrong_schema_is_malformed() {
        let body = json!({ "nodes": [1], "edges": [] });
        let err = upload_summary(Stage::Network, ResponseSchema::Stats, &body).unwrap_err();
        assert_eq!(err, WorkflowError::malformed("missing count `stats.nodes`"));
    }
}
