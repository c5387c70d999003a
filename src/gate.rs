//! Trigger enablement derived from workflow progress.

use crate::model::{AlgorithmSelection, UploadState};

/// Which controls may be used, before accounting for in-flight requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub network_upload: bool,
    pub points_upload: bool,
    pub algorithm_select: bool,
    pub solve: bool,
}

impl Default for Controls {
    fn default() -> Self {
        evaluate(&UploadState::default(), &AlgorithmSelection::default())
    }
}

/// Recompute enablement. Total over its inputs and free of side effects.
pub fn evaluate(uploads: &UploadState, selection: &AlgorithmSelection) -> Controls {
    Controls {
        network_upload: true,
        points_upload: uploads.network_loaded,
        algorithm_select: uploads.points_loaded,
        solve: uploads.points_loaded && selection.is_selected(),
    }
}
