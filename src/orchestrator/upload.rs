//! One upload stage: validate, send, then apply the stage summary.

use super::trigger::{Trigger, TriggerGuard};
use crate::error::{Result, WorkflowError};
use crate::model::{Action, ResponseSchema, Stage, UploadState, UploadSummary};
use crate::service::{schema, FilePayload, RouteService};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// A finished upload call that has not been applied yet. Holding it keeps
/// the stage's trigger disabled.
#[derive(Debug)]
pub struct UploadCompletion {
    pub stage: Stage,
    outcome: Result<Value>,
    _guard: TriggerGuard,
}

pub struct UploadCoordinator<S> {
    stage: Stage,
    schema: ResponseSchema,
    service: Arc<S>,
    trigger: Trigger,
}

impl<S: RouteService> UploadCoordinator<S> {
    pub fn new(stage: Stage, schema: ResponseSchema, service: Arc<S>) -> Self {
        Self {
            stage,
            schema,
            service,
            trigger: Trigger::default(),
        }
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Validate the selection and issue the request.
    ///
    /// Fails without touching the network when no file is selected or when
    /// this stage already has a call in flight.
    pub fn start(&self, file: Option<&Path>) -> Result<BoxFuture<'static, UploadCompletion>> {
        let path = file
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                WorkflowError::validation(format!("Select a {} file first", self.stage.label()))
            })?
            .to_path_buf();
        let guard = self.trigger.try_acquire().ok_or_else(|| {
            WorkflowError::validation(format!(
                "{} already in progress",
                Action::for_stage(self.stage)
            ))
        })?;

        let stage = self.stage;
        let service = Arc::clone(&self.service);
        tracing::info!(?stage, file = %path.display(), "upload submitted");
        Ok(async move {
            let outcome = match read_payload(&path).await {
                Ok(payload) => service.upload(stage, payload).await,
                Err(e) => Err(e),
            };
            UploadCompletion {
                stage,
                outcome,
                _guard: guard,
            }
        }
        .boxed())
    }

    /// Apply a resolved call: decode the summary and mark the stage loaded.
    /// The trigger is released when `completion` is dropped at the end.
    pub fn finish(
        &self,
        uploads: &mut UploadState,
        completion: UploadCompletion,
    ) -> Result<UploadSummary> {
        let summary = completion
            .outcome
            .and_then(|body| schema::upload_summary(self.stage, self.schema, &body));
        match &summary {
            Ok(s) => {
                uploads.mark_loaded(self.stage);
                tracing::info!(stage = ?self.stage, summary = ?s, "upload completed");
            }
            Err(e) => tracing::warn!(stage = ?self.stage, kind = e.kind(), "upload failed: {e}"),
        }
        summary
    }

    #[cfg(test)]
    pub async fn submit(
        &self,
        uploads: &mut UploadState,
        file: Option<&Path>,
    ) -> Result<UploadSummary> {
        let completion = self.start(file)?.await;
        self.finish(uploads, completion)
    }
}

async fn read_payload(path: &Path) -> Result<FilePayload> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| WorkflowError::validation(format!("Cannot read {}: {e}", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(FilePayload {
        name,
        contents: contents.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fake::{Call, FakeService};
    use serde_json::json;
    use std::io::Write;

    fn temp_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn missing_file_fails_without_a_request() {
        for stage in [Stage::Network, Stage::Points] {
            let svc = Arc::new(FakeService::new());
            let coord = UploadCoordinator::new(stage, ResponseSchema::Stats, svc.clone());
            let mut uploads = UploadState::default();

            let err = coord.submit(&mut uploads, None).await.unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(_)));
            let err = coord.submit(&mut uploads, Some(Path::new(""))).await.unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(_)));

            assert!(svc.calls().is_empty());
            assert_eq!(uploads, UploadState::default());
            assert!(!coord.trigger().is_busy());
        }
    }

    #[tokio::test]
    async fn successful_upload_sets_only_its_flag() {
        let svc = Arc::new(FakeService::new().reply(Ok(json!({ "stats": { "nodes": 5, "edges": 7 } }))));
        let coord = UploadCoordinator::new(Stage::Network, ResponseSchema::Stats, svc.clone());
        let file = temp_file("<osm/>");
        let mut uploads = UploadState::default();

        let summary = coord.submit(&mut uploads, Some(file.path())).await.unwrap();
        assert_eq!(summary, UploadSummary::Network { nodes: 5, edges: 7 });
        assert!(uploads.network_loaded);
        assert!(!uploads.points_loaded);
        assert!(matches!(
            svc.calls().as_slice(),
            [Call::Upload { stage: Stage::Network, bytes: 6, .. }]
        ));
    }

    #[tokio::test]
    async fn server_failure_leaves_state_and_releases_trigger() {
        let svc = Arc::new(FakeService::new().reply(Err(WorkflowError::Server {
            status: 400,
            message: "Solo se aceptan archivos XML".into(),
        })));
        let coord = UploadCoordinator::new(Stage::Network, ResponseSchema::Stats, svc);
        let file = temp_file("x");
        let mut uploads = UploadState::default();

        let err = coord.submit(&mut uploads, Some(file.path())).await.unwrap_err();
        assert_eq!(err.to_string(), "Solo se aceptan archivos XML");
        assert!(!uploads.network_loaded);
        assert!(!coord.trigger().is_busy());
    }

    #[tokio::test]
    async fn trigger_stays_disabled_until_completion_is_applied() {
        let svc = Arc::new(FakeService::new());
        let release = svc.hold();
        let coord = UploadCoordinator::new(Stage::Points, ResponseSchema::Stats, svc.clone());
        let file = temp_file("X\tY\tid\n");

        let pending = coord.start(Some(file.path())).unwrap();
        assert!(coord.trigger().is_busy());
        let Err(again) = coord.start(Some(file.path())) else {
            panic!("second start must be refused while the first is in flight");
        };
        assert!(matches!(again, WorkflowError::Validation(_)));

        release.send(Ok(json!({ "points_loaded": 3 }))).unwrap();
        let completion = pending.await;
        assert!(coord.trigger().is_busy(), "not applied yet");

        let mut uploads = UploadState::default();
        let summary = coord.finish(&mut uploads, completion).unwrap();
        assert_eq!(summary, UploadSummary::Points { loaded: 3, skipped: 0 });
        assert!(uploads.points_loaded);
        assert!(!coord.trigger().is_busy());
    }

    #[tokio::test]
    async fn unreadable_file_is_a_validation_error() {
        let svc = Arc::new(FakeService::new());
        let coord = UploadCoordinator::new(Stage::Network, ResponseSchema::Stats, svc.clone());
        let mut uploads = UploadState::default();
        let err = coord
            .submit(&mut uploads, Some(Path::new("/definitely/not/here.osm")))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(svc.calls().is_empty());
    }
}
