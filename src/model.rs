use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One of the two upload stages of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Network,
    Points,
}

impl Stage {
    pub fn endpoint(self) -> &'static str {
        match self {
            Stage::Network => "/api/load_network",
            Stage::Points => "/api/load_points",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Network => "road network",
            Stage::Points => "points",
        }
    }

    /// Message used when a failed response carries no usable error text.
    pub fn fallback_error(self) -> &'static str {
        match self {
            Stage::Network => "Failed to load road network",
            Stage::Points => "Failed to load points",
        }
    }
}

/// A user-facing trigger. Each one is single-flight on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    LoadNetwork,
    LoadPoints,
    Solve,
}

impl Action {
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Network => Action::LoadNetwork,
            Stage::Points => Action::LoadPoints,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::LoadNetwork => "network upload",
            Action::LoadPoints => "points upload",
            Action::Solve => "solve",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadState {
    pub network_loaded: bool,
    pub points_loaded: bool,
}

impl UploadState {
    pub fn mark_loaded(&mut self, stage: Stage) {
        match stage {
            Stage::Network => self.network_loaded = true,
            Stage::Points => self.points_loaded = true,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    BruteForce,
    NearestNeighbor,
    Genetic,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::BruteForce,
        Algorithm::NearestNeighbor,
        Algorithm::Genetic,
    ];

    /// Wire name sent as the `algorithm` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::BruteForce => "brute_force",
            Algorithm::NearestNeighbor => "nearest_neighbor",
            Algorithm::Genetic => "genetic",
        }
    }

    pub fn is_parameterized(self) -> bool {
        matches!(self, Algorithm::Genetic)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of the population-based search. The mutation rate is kept as the
/// percentage shown on the slider and converted on serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneticParams {
    pub population_size: u32,
    pub generations: u32,
    pub mutation_rate_percent: u8,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            mutation_rate_percent: 5,
        }
    }
}

impl GeneticParams {
    pub fn mutation_rate(&self) -> f64 {
        f64::from(self.mutation_rate_percent) / 100.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlgorithmSelection {
    pub algorithm: Option<Algorithm>,
    pub params: GeneticParams,
}

impl AlgorithmSelection {
    pub fn is_selected(&self) -> bool {
        self.algorithm.is_some()
    }
}

/// Which field names the service uses for upload counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ResponseSchema {
    /// `stats.nodes` / `stats.edges` and `points_loaded`.
    #[default]
    Stats,
    /// `nodes` / `edges` / `points` arrays, counted by length.
    Collections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploadSummary {
    Network { nodes: u64, edges: u64 },
    Points { loaded: u64, skipped: u64 },
}

impl UploadSummary {
    pub fn to_message(&self) -> String {
        match self {
            UploadSummary::Network { nodes, edges } => {
                format!("Road network loaded: {nodes} nodes, {edges} edges")
            }
            UploadSummary::Points { loaded, skipped: 0 } => format!("{loaded} points loaded"),
            UploadSummary::Points { loaded, skipped } => {
                format!("{loaded} points loaded ({skipped} skipped)")
            }
        }
    }
}

/// Graph node identifier as returned by the service. OSM ids arrive either as
/// strings or as bare integers depending on the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawNodeId", into = "String")]
pub struct NodeId(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNodeId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawNodeId> for NodeId {
    fn from(raw: RawNodeId) -> Self {
        match raw {
            RawNodeId::Text(s) => NodeId(s),
            RawNodeId::Signed(n) => NodeId(n.to_string()),
            RawNodeId::Unsigned(n) => NodeId(n.to_string()),
        }
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geometry the service sends for drawing. Entries stay as raw JSON; the map
/// layer decodes each one and skips what it cannot read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVisualization")]
pub struct VisualizationData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_edges: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawVisualization {
    #[serde(default)]
    graph_edges: Option<Value>,
    #[serde(default)]
    network: Option<Value>,
    #[serde(default)]
    points: Option<Value>,
}

impl From<RawVisualization> for VisualizationData {
    fn from(raw: RawVisualization) -> Self {
        let graph_edges = raw
            .graph_edges
            .as_ref()
            .and_then(features_of)
            .or_else(|| raw.network.as_ref().and_then(features_of));
        Self {
            graph_edges,
            points: raw.points.as_ref().and_then(features_of),
        }
    }
}

/// Accept a bare array or a GeoJSON-style `{ "features": [...] }` collection.
fn features_of(v: &Value) -> Option<Vec<Value>> {
    match v {
        Value::Array(items) => Some(items.clone()),
        Value::Object(map) => map.get("features").and_then(Value::as_array).cloned(),
        _ => None,
    }
}

/// Outcome of one successful solve call. Replaces any previous result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSolveResult")]
pub struct SolveResult {
    pub path: Vec<NodeId>,
    pub distance: f64,
    /// Seconds, normalized from either `execution_time` or `execution_time_ms`.
    #[serde(rename = "execution_time", skip_serializing_if = "Option::is_none")]
    pub execution_time_secs: Option<f64>,
    /// `[lat, lon]` pairs, drawn as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_coordinates: Option<Vec<[f64; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_data: Option<VisualizationData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
}

#[derive(Deserialize)]
struct RawSolveResult {
    path: Vec<NodeId>,
    distance: f64,
    #[serde(default)]
    execution_time: Option<f64>,
    #[serde(default)]
    execution_time_ms: Option<f64>,
    #[serde(default)]
    path_coordinates: Option<Value>,
    #[serde(default)]
    visualization_data: Option<Value>,
    #[serde(default)]
    center: Option<Value>,
}

impl TryFrom<RawSolveResult> for SolveResult {
    type Error = String;

    fn try_from(raw: RawSolveResult) -> Result<Self, Self::Error> {
        if !raw.distance.is_finite() {
            return Err(format!("distance is not a finite number: {}", raw.distance));
        }
        let execution_time_secs = raw
            .execution_time
            .or_else(|| raw.execution_time_ms.map(|ms| ms / 1000.0));
        // Unreadable geometry is dropped here; drawing never fails.
        let path_coordinates = raw
            .path_coordinates
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(number_pair).collect());
        let visualization_data = raw
            .visualization_data
            .filter(Value::is_object)
            .and_then(|v| serde_json::from_value::<VisualizationData>(v).ok());
        Ok(Self {
            path: raw.path,
            distance: raw.distance,
            execution_time_secs,
            path_coordinates,
            visualization_data,
            center: raw.center.as_ref().and_then(number_pair),
        })
    }
}

/// Read a two-element numeric JSON array.
pub fn number_pair(v: &Value) -> Option<[f64; 2]> {
    match v.as_array()?.as_slice() {
        [a, b] => Some([a.as_f64()?, b.as_f64()?]),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusKind {
    /// An action has started and is waiting on the service.
    Progress,
    Success,
    Error,
}
