//! Text summary builder for headless output.

use crate::map::surface::{CanvasMap, LayerKind};
use crate::model::UploadSummary;
use crate::results::ResultCard;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build the final report from the stage summaries, the result card and
/// what ended up on the map.
pub(crate) fn build_text_summary(
    uploads: &[UploadSummary],
    card: &ResultCard,
    map: Option<&CanvasMap>,
) -> TextSummary {
    let mut lines = Vec::new();

    for summary in uploads {
        lines.push(summary.to_message());
    }

    lines.push(format!("== {} ==", card.title()));
    for (label, value) in card.rows() {
        lines.push(format!("{label}: {value}"));
    }

    if let Some(map) = map {
        let count = |kind: LayerKind| {
            map.overlays()
                .filter(|(_, o)| o.kind == kind)
                .map(|(_, o)| (o.lines.len(), o.markers.len()))
                .fold((0, 0), |acc, (l, m)| (acc.0 + l, acc.1 + m))
        };
        let (roads, _) = count(LayerKind::RoadNetwork);
        let (_, markers) = count(LayerKind::Markers);
        let route = map
            .overlays()
            .filter(|(_, o)| o.kind == LayerKind::Route)
            .flat_map(|(_, o)| o.lines.iter())
            .map(|l| l.points.len())
            .sum::<usize>();
        lines.push(format!(
            "Map: {route} route points, {markers} markers, {roads} road segments"
        ));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapConfig, MapLayerManager};
    use crate::model::{Algorithm, NodeId, SolveResult, VisualizationData};
    use serde_json::json;

    #[test]
    fn summary_lists_stages_then_result_then_map() {
        let result = SolveResult {
            path: vec![NodeId("7".into()), NodeId("9".into())],
            distance: 42.0,
            execution_time_secs: None,
            path_coordinates: Some(vec![[1.0, 2.0], [3.0, 4.0]]),
            visualization_data: Some(VisualizationData {
                graph_edges: Some(vec![json!([[2.0, 1.0], [4.0, 3.0]])]),
                points: Some(vec![json!([2.0, 1.0]), json!([4.0, 3.0])]),
            }),
            center: None,
        };
        let mut map: MapLayerManager = MapLayerManager::new(MapConfig::default());
        map.render(&result);
        let card = ResultCard::new(Algorithm::BruteForce, &result);
        let uploads = [
            UploadSummary::Network { nodes: 5, edges: 7 },
            UploadSummary::Points { loaded: 2, skipped: 0 },
        ];

        let s = build_text_summary(&uploads, &card, map.map());
        assert_eq!(
            s.lines,
            vec![
                "Road network loaded: 5 nodes, 7 edges",
                "2 points loaded",
                "== Results: BRUTE_FORCE ==",
                "Route: 7 → 9",
                "Total distance: 42.00 m",
                "Map: 2 route points, 2 markers, 1 road segments",
            ]
        );
    }
}
