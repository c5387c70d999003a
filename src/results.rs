//! The results panel below the status list.

use crate::error::WorkflowError;
use crate::model::{Algorithm, NodeId, SolveResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ResultCard {
    pub algorithm: Algorithm,
    pub route: Vec<NodeId>,
    pub distance_m: f64,
    pub execution_time_secs: Option<f64>,
}

impl ResultCard {
    pub fn new(algorithm: Algorithm, result: &SolveResult) -> Self {
        Self {
            algorithm,
            route: result.path.clone(),
            distance_m: result.distance,
            execution_time_secs: result.execution_time_secs,
        }
    }

    pub fn title(&self) -> String {
        format!("Results: {}", self.algorithm.as_str().to_uppercase())
    }

    pub fn route_text(&self) -> String {
        self.route
            .iter()
            .map(NodeId::to_string)
            .collect::<Vec<_>>()
            .join(" → ")
    }

    /// `(label, value)` rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Route", self.route_text()),
            ("Total distance", format!("{:.2} m", self.distance_m)),
        ];
        if let Some(secs) = self.execution_time_secs {
            rows.push(("Execution time", format!("{secs:.3} s")));
        }
        rows
    }
}

/// The only way out of a failed solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Reload,
}

impl Recovery {
    pub fn label(self) -> &'static str {
        match self {
            Recovery::Reload => "Reload (Ctrl-R)",
        }
    }
}

/// Persistent: stays until a full reload.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCard {
    pub message: String,
    pub recovery: Recovery,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResultsPanel {
    #[default]
    Empty,
    Summary(ResultCard),
    Failed(ErrorCard),
}

impl ResultsPanel {
    pub fn show_result(&mut self, algorithm: Algorithm, result: &SolveResult) {
        *self = ResultsPanel::Summary(ResultCard::new(algorithm, result));
    }

    pub fn show_error(&mut self, err: &WorkflowError) {
        *self = ResultsPanel::Failed(ErrorCard {
            message: err.to_string(),
            recovery: Recovery::Reload,
        });
    }

    pub fn card(&self) -> Option<&ResultCard> {
        match self {
            ResultsPanel::Summary(card) => Some(card),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(execution_time_secs: Option<f64>) -> SolveResult {
        SolveResult {
            path: vec![NodeId("A".into()), NodeId("B".into()), NodeId("A".into())],
            distance: 1234.567,
            execution_time_secs,
            path_coordinates: None,
            visualization_data: None,
            center: None,
        }
    }

    #[test]
    fn summary_rows_include_execution_time_only_when_known() {
        let card = ResultCard::new(Algorithm::NearestNeighbor, &result(None));
        assert_eq!(card.title(), "Results: NEAREST_NEIGHBOR");
        assert_eq!(
            card.rows(),
            vec![
                ("Route", "A → B → A".to_string()),
                ("Total distance", "1234.57 m".to_string())
            ]
        );

        let card = ResultCard::new(Algorithm::Genetic, &result(Some(0.0421)));
        assert_eq!(card.rows().last().unwrap().1, "0.042 s");
    }

    #[test]
    fn error_replaces_summary() {
        let mut panel = ResultsPanel::default();
        panel.show_result(Algorithm::BruteForce, &result(None));
        assert!(panel.card().is_some());
        panel.show_error(&WorkflowError::Transport("connection refused".into()));
        assert_eq!(
            panel,
            ResultsPanel::Failed(ErrorCard {
                message: "request failed: connection refused".into(),
                recovery: Recovery::Reload
            })
        );
    }
}
