//! The solve stage: serialize the selection, send it, show and draw the result.

use super::trigger::{Trigger, TriggerGuard};
use crate::error::{Result, WorkflowError};
use crate::map::MapLayerManager;
use crate::model::{Algorithm, AlgorithmSelection, SolveResult};
use crate::results::ResultsPanel;
use crate::service::RouteService;
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Body of `POST /api/solve_tsp`. Parameters are only present for
/// algorithms that take them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveRequest {
    pub algorithm: Algorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation_rate: Option<f64>,
}

impl SolveRequest {
    pub fn from_selection(selection: &AlgorithmSelection) -> Result<Self> {
        let algorithm = selection
            .algorithm
            .ok_or_else(|| WorkflowError::validation("Select an algorithm first"))?;
        if !algorithm.is_parameterized() {
            return Ok(Self {
                algorithm,
                population_size: None,
                generations: None,
                mutation_rate: None,
            });
        }
        let p = &selection.params;
        if p.population_size == 0 {
            return Err(WorkflowError::validation("Population size must be greater than 0"));
        }
        if p.generations == 0 {
            return Err(WorkflowError::validation("Generations must be greater than 0"));
        }
        if p.mutation_rate_percent > 100 {
            return Err(WorkflowError::validation("Mutation rate must be between 0% and 100%"));
        }
        Ok(Self {
            algorithm,
            population_size: Some(p.population_size),
            generations: Some(p.generations),
            mutation_rate: Some(p.mutation_rate()),
        })
    }
}

#[derive(Debug)]
pub struct SolveCompletion {
    pub algorithm: Algorithm,
    outcome: Result<Value>,
    _guard: TriggerGuard,
}

pub struct SolveCoordinator<S> {
    service: Arc<S>,
    trigger: Trigger,
}

impl<S: RouteService> SolveCoordinator<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            trigger: Trigger::default(),
        }
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Validate the selection and issue the request.
    pub fn start(&self, selection: &AlgorithmSelection) -> Result<BoxFuture<'static, SolveCompletion>> {
        let request = SolveRequest::from_selection(selection)?;
        let body = serde_json::to_value(&request)
            .map_err(|e| WorkflowError::validation(format!("cannot encode request: {e}")))?;
        let guard = self
            .trigger
            .try_acquire()
            .ok_or_else(|| WorkflowError::validation("solve already in progress"))?;

        let algorithm = request.algorithm;
        let service = Arc::clone(&self.service);
        tracing::info!(%algorithm, %body, "solve submitted");
        Ok(async move {
            let outcome = service.solve(body).await;
            SolveCompletion {
                algorithm,
                outcome,
                _guard: guard,
            }
        }
        .boxed())
    }

    /// Apply a resolved call. Success replaces the panel with a summary and
    /// redraws the map; any failure replaces the panel with an error card.
    pub fn finish(
        &self,
        completion: SolveCompletion,
        results: &mut ResultsPanel,
        map: &mut MapLayerManager,
    ) -> Result<SolveResult> {
        let algorithm = completion.algorithm;
        let decoded = completion.outcome.and_then(|body| {
            serde_json::from_value::<SolveResult>(body).map_err(|e| WorkflowError::malformed(e.to_string()))
        });
        match &decoded {
            Ok(result) => {
                tracing::info!(%algorithm, distance = result.distance, nodes = result.path.len(), "solve completed");
                results.show_result(algorithm, result);
                map.render(result);
            }
            Err(e) => {
                tracing::warn!(%algorithm, kind = e.kind(), "solve failed: {e}");
                results.show_error(e);
            }
        }
        decoded
    }

    #[cfg(test)]
    pub async fn solve(
        &self,
        selection: &AlgorithmSelection,
        results: &mut ResultsPanel,
        map: &mut MapLayerManager,
    ) -> Result<SolveResult> {
        let completion = self.start(selection)?.await;
        self.finish(completion, results, map)
    }
}
