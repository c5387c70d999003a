//! Workflow session.
//!
//! Owns every piece of mutable client state and turns UI commands into
//! coordinator calls. Presentation layers keep the returned futures in flight
//! and hand each completion back through [`Workflow::complete`].

use super::solve::{SolveCompletion, SolveCoordinator};
use super::upload::{UploadCompletion, UploadCoordinator};
use crate::error::{Result, WorkflowError};
use crate::gate::{self, Controls};
use crate::map::surface::CanvasMap;
use crate::map::{MapConfig, MapLayerManager};
use crate::model::{
    Action, Algorithm, AlgorithmSelection, GeneticParams, ResponseSchema, SolveResult, Stage,
    UploadState, UploadSummary,
};
use crate::results::ResultsPanel;
use crate::service::RouteService;
use crate::status::StatusNotifier;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UiCommand {
    SelectNetworkFile(Option<PathBuf>),
    SelectPointsFile(Option<PathBuf>),
    SelectAlgorithm(Option<Algorithm>),
    SetParams(GeneticParams),
    Fire(Action),
    Reload,
}

#[derive(Debug)]
pub(crate) enum Completion {
    Upload(UploadCompletion),
    Solve(SolveCompletion),
}

/// One in-flight action.
pub(crate) type Pending = BoxFuture<'static, Completion>;

/// What a completion changed, for callers that report outcomes themselves.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Uploaded(UploadSummary),
    Solved(SolveResult),
}

/// Everything a presentation layer draws, copied out after every change.
/// Status messages are not included: they expire on their own timers and
/// are read straight from the shared notifier.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Snapshot {
    pub uploads: UploadState,
    pub selection: AlgorithmSelection,
    pub controls: Controls,
    pub busy: [bool; 3],
    pub network_file: Option<PathBuf>,
    pub points_file: Option<PathBuf>,
    pub network_summary: Option<UploadSummary>,
    pub points_summary: Option<UploadSummary>,
    pub results: ResultsPanel,
    /// Shared until the next render or reload replaces it.
    pub map: Option<Arc<CanvasMap>>,
}

impl Snapshot {
    pub fn is_busy(&self, action: Action) -> bool {
        self.busy[action_index(action)]
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        let gated = match action {
            Action::LoadNetwork => self.controls.network_upload,
            Action::LoadPoints => self.controls.points_upload,
            Action::Solve => self.controls.solve,
        };
        gated && !self.is_busy(action)
    }
}

fn action_index(action: Action) -> usize {
    match action {
        Action::LoadNetwork => 0,
        Action::LoadPoints => 1,
        Action::Solve => 2,
    }
}

pub(crate) struct Workflow<S> {
    network: UploadCoordinator<S>,
    points: UploadCoordinator<S>,
    solver: SolveCoordinator<S>,
    uploads: UploadState,
    selection: AlgorithmSelection,
    network_file: Option<PathBuf>,
    points_file: Option<PathBuf>,
    controls: Controls,
    notifier: StatusNotifier,
    results: ResultsPanel,
    map: MapLayerManager,
    drawn: Option<Arc<CanvasMap>>,
    network_summary: Option<UploadSummary>,
    points_summary: Option<UploadSummary>,
    last_result: Option<SolveResult>,
}

impl<S: RouteService> Workflow<S> {
    pub fn new(
        service: Arc<S>,
        schema: ResponseSchema,
        map_config: MapConfig,
        notifier: StatusNotifier,
    ) -> Self {
        let mut map = MapLayerManager::new(map_config);
        map.init_map();
        let drawn = map.map().cloned().map(Arc::new);
        Self {
            network: UploadCoordinator::new(Stage::Network, schema, Arc::clone(&service)),
            points: UploadCoordinator::new(Stage::Points, schema, Arc::clone(&service)),
            solver: SolveCoordinator::new(service),
            uploads: UploadState::default(),
            selection: AlgorithmSelection::default(),
            network_file: None,
            points_file: None,
            controls: Controls::default(),
            notifier,
            results: ResultsPanel::default(),
            map,
            drawn,
            network_summary: None,
            points_summary: None,
            last_result: None,
        }
    }

    #[cfg(test)]
    pub fn uploads(&self) -> UploadState {
        self.uploads
    }

    #[cfg(test)]
    pub fn selection(&self) -> AlgorithmSelection {
        self.selection
    }

    #[cfg(test)]
    pub fn controls(&self) -> Controls {
        self.controls
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &StatusNotifier {
        &self.notifier
    }

    pub fn results(&self) -> &ResultsPanel {
        &self.results
    }

    pub fn map(&self) -> &MapLayerManager {
        &self.map
    }

    #[cfg(test)]
    pub fn network_file(&self) -> Option<&PathBuf> {
        self.network_file.as_ref()
    }

    pub fn summary(&self, stage: Stage) -> Option<UploadSummary> {
        match stage {
            Stage::Network => self.network_summary,
            Stage::Points => self.points_summary,
        }
    }

    pub fn last_result(&self) -> Option<&SolveResult> {
        self.last_result.as_ref()
    }

    pub fn is_busy(&self, action: Action) -> bool {
        match action {
            Action::LoadNetwork => self.network.trigger().is_busy(),
            Action::LoadPoints => self.points.trigger().is_busy(),
            Action::Solve => self.solver.trigger().is_busy(),
        }
    }

    /// Gate enablement combined with the action's own in-flight flag.
    pub fn is_enabled(&self, action: Action) -> bool {
        let gated = match action {
            Action::LoadNetwork => self.controls.network_upload,
            Action::LoadPoints => self.controls.points_upload,
            Action::Solve => self.controls.solve,
        };
        gated && !self.is_busy(action)
    }

    fn regate(&mut self) {
        self.controls = gate::evaluate(&self.uploads, &self.selection);
    }

    /// Apply a UI command. `Fire` may return a call to keep in flight.
    pub fn handle(&mut self, cmd: UiCommand) -> Option<Pending> {
        match cmd {
            UiCommand::SelectNetworkFile(path) => {
                self.network_file = path;
                self.regate();
            }
            UiCommand::SelectPointsFile(path) => {
                self.points_file = path;
                self.regate();
            }
            UiCommand::SelectAlgorithm(algorithm) => {
                self.selection.algorithm = algorithm;
                self.regate();
            }
            UiCommand::SetParams(params) => self.selection.params = params,
            UiCommand::Fire(action) => return self.fire(action).ok(),
            UiCommand::Reload => self.reload(),
        }
        None
    }

    /// Start `action`. Validation failures are reported as an error status;
    /// a trigger the gate has disabled is ignored.
    pub fn fire(&mut self, action: Action) -> Result<Pending> {
        if !self.is_enabled(action) {
            tracing::debug!(%action, "trigger disabled, ignoring");
            return Err(WorkflowError::validation(format!("{action} is not available")));
        }
        let started = match action {
            Action::LoadNetwork => self
                .network
                .start(self.network_file.as_deref())
                .map(|f| f.map(Completion::Upload).boxed()),
            Action::LoadPoints => self
                .points
                .start(self.points_file.as_deref())
                .map(|f| f.map(Completion::Upload).boxed()),
            Action::Solve => self
                .solver
                .start(&self.selection)
                .map(|f| f.map(Completion::Solve).boxed()),
        };
        match &started {
            Ok(_) => {
                self.notifier.progress(self.progress_text(action));
            }
            Err(e) => {
                self.notifier.error(e.to_string());
            }
        }
        started
    }

    fn progress_text(&self, action: Action) -> String {
        match (action, self.selection.algorithm) {
            (Action::LoadNetwork, _) => "Loading road network…".to_string(),
            (Action::LoadPoints, _) => "Loading points…".to_string(),
            (Action::Solve, Some(algorithm)) => format!("Running {algorithm}…"),
            (Action::Solve, None) => "Solving…".to_string(),
        }
    }

    /// Apply a resolved call: state first, then status, then gating.
    pub fn complete(&mut self, completion: Completion) -> Result<Outcome> {
        match completion {
            Completion::Upload(c) => {
                let stage = c.stage;
                let coordinator = match stage {
                    Stage::Network => &self.network,
                    Stage::Points => &self.points,
                };
                let summary = coordinator.finish(&mut self.uploads, c);
                match &summary {
                    Ok(s) => {
                        match stage {
                            Stage::Network => self.network_summary = Some(*s),
                            Stage::Points => self.points_summary = Some(*s),
                        }
                        self.notifier.success(s.to_message());
                    }
                    Err(e) => {
                        self.notifier.error(e.to_string());
                    }
                }
                self.regate();
                summary.map(Outcome::Uploaded)
            }
            Completion::Solve(c) => {
                let algorithm = c.algorithm;
                let result = self.solver.finish(c, &mut self.results, &mut self.map);
                if result.is_ok() {
                    self.redraw();
                }
                match &result {
                    Ok(r) => {
                        self.last_result = Some(r.clone());
                        self.notifier
                            .success(format!("{algorithm} finished: {:.2} m", r.distance));
                    }
                    Err(e) => {
                        self.notifier.error(e.to_string());
                    }
                }
                result.map(Outcome::Solved)
            }
        }
    }

    /// Fire and await one action to completion.
    pub async fn perform(&mut self, action: Action) -> Result<Outcome> {
        let pending = self.fire(action)?;
        let completion = pending.await;
        self.complete(completion)
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut busy = [false; 3];
        for action in [Action::LoadNetwork, Action::LoadPoints, Action::Solve] {
            busy[action_index(action)] = self.is_busy(action);
        }
        Snapshot {
            uploads: self.uploads,
            selection: self.selection,
            controls: self.controls,
            busy,
            network_file: self.network_file.clone(),
            points_file: self.points_file.clone(),
            network_summary: self.network_summary,
            points_summary: self.points_summary,
            results: self.results.clone(),
            map: self.drawn.clone(),
        }
    }

    fn redraw(&mut self) {
        self.drawn = self.map.map().cloned().map(Arc::new);
    }

    /// Full reload: every piece of state back to its initial value and a
    /// fresh map. Completions of calls started before the reload must be
    /// discarded by the caller.
    pub fn reload(&mut self) {
        self.uploads = UploadState::default();
        self.selection = AlgorithmSelection::default();
        self.network_file = None;
        self.points_file = None;
        self.results = ResultsPanel::default();
        self.network_summary = None;
        self.points_summary = None;
        self.last_result = None;
        self.notifier.clear();
        self.map.init_map();
        self.redraw();
        self.regate();
        tracing::info!("workflow reloaded");
    }
}

/// Drive the workflow from UI commands until the command channel closes.
///
/// In-flight calls live in one `FuturesUnordered`; each completion is applied
/// as soon as it resolves. A reload drops every call still in flight. A
/// snapshot is published after every command and every completion.
pub(crate) async fn run_controller<S: RouteService>(
    mut workflow: Workflow<S>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
    snapshot_tx: UnboundedSender<Snapshot>,
) {
    let mut pending: FuturesUnordered<Pending> = FuturesUnordered::new();
    if snapshot_tx.send(workflow.snapshot()).is_err() {
        return;
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Reload) => {
                        if !pending.is_empty() {
                            tracing::info!(dropped = pending.len(), "reload discards in-flight calls");
                        }
                        pending.clear();
                        workflow.reload();
                    }
                    Some(cmd) => {
                        if let Some(call) = workflow.handle(cmd) {
                            pending.push(call);
                        }
                    }
                    None => break,
                }
            }
            Some(done) = pending.next(), if !pending.is_empty() => {
                // Failures were already posted as statuses.
                let _ = workflow.complete(done);
            }
        }
        if snapshot_tx.send(workflow.snapshot()).is_err() {
            break;
        }
    }
    tracing::debug!("controller stopped");
}
