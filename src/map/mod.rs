//! Map instance ownership and overlay lifecycle.
//!
//! `MapLayerManager` is the only owner of the map and of the three tracked
//! overlay slots. Each slot holds at most one handle; `render` always removes
//! what a slot holds before installing its replacement.

pub mod geometry;
pub mod surface;

use crate::model::SolveResult;
use geometry::{decode_edge, decode_point, Bounds, LatLon, Rgb};
use surface::{
    CanvasMap, Glyph, LayerHandle, LayerKind, MapSurface, Marker, Overlay, Polyline, TileLayer,
    View,
};

/// Neutral viewport used whenever a fresh map is created.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub center: LatLon,
    pub zoom: u8,
    pub tiles: TileLayer,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: LatLon::new(0.0, 0.0),
            zoom: 2,
            tiles: TileLayer::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapLayers {
    pub route: Option<LayerHandle>,
    pub markers: Option<LayerHandle>,
    pub road_network: Option<LayerHandle>,
}

pub struct MapLayerManager<S: MapSurface = CanvasMap> {
    config: MapConfig,
    map: Option<S>,
    layers: MapLayers,
    instances: u64,
}

impl<S: MapSurface> MapLayerManager<S> {
    /// No map exists until `init_map` or the first `render`.
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            map: None,
            layers: MapLayers::default(),
            instances: 0,
        }
    }

    /// Replace any existing map with a fresh one at the default viewport.
    pub fn init_map(&mut self) {
        // Handles belong to the old instance; they die with it.
        self.layers = MapLayers::default();
        self.map = None;

        let mut map = S::create(View::Center {
            center: self.config.center,
            zoom: self.config.zoom,
        });
        map.add_tile_layer(self.config.tiles.clone());
        self.map = Some(map);
        self.instances += 1;
        tracing::debug!(instance = self.instances, "map initialized");
    }

    pub fn map(&self) -> Option<&S> {
        self.map.as_ref()
    }

    #[cfg(test)]
    pub fn layers(&self) -> MapLayers {
        self.layers
    }

    /// Number of map instances created so far.
    #[cfg(test)]
    pub fn instances(&self) -> u64 {
        self.instances
    }

    /// Draw a solve result, replacing whatever the previous result drew.
    pub fn render(&mut self, result: &SolveResult) {
        if self.map.is_none() {
            self.init_map();
        }
        let Some(map) = self.map.as_mut() else {
            return;
        };

        for slot in [
            &mut self.layers.route,
            &mut self.layers.markers,
            &mut self.layers.road_network,
        ] {
            if let Some(handle) = slot.take() {
                map.remove_overlay(handle);
            }
        }

        let viz = result.visualization_data.as_ref();

        if let Some(edges) = viz.and_then(|v| v.graph_edges.as_ref()) {
            let mut overlay = Overlay::new(LayerKind::RoadNetwork);
            overlay.lines = edges
                .iter()
                .filter_map(decode_edge)
                .map(|e| Polyline {
                    points: e.points,
                    color: e.color.unwrap_or(Rgb::ROAD),
                    weight: 2,
                })
                .collect();
            self.layers.road_network = Some(map.add_overlay(overlay));
        }

        if let Some(points) = viz.and_then(|v| v.points.as_ref()) {
            let decoded: Vec<_> = points.iter().filter_map(decode_point).collect();
            let last = decoded.len().saturating_sub(1);
            let mut overlay = Overlay::new(LayerKind::Markers);
            overlay.markers = decoded
                .into_iter()
                .enumerate()
                .map(|(i, p)| {
                    let default_color = if i == 0 {
                        Rgb::START
                    } else if i == last {
                        Rgb::END
                    } else {
                        Rgb::WAYPOINT
                    };
                    Marker {
                        at: p.at,
                        color: p.color.unwrap_or(default_color),
                        label: p.label.unwrap_or_else(|| format!("Point {}", i + 1)),
                        glyph: Glyph::Dot,
                    }
                })
                .collect();
            self.layers.markers = Some(map.add_overlay(overlay));
        }

        let route: Vec<LatLon> = result
            .path_coordinates
            .as_deref()
            .unwrap_or_default()
            .iter()
            .copied()
            .map(LatLon::from_lat_lon)
            .collect();

        if let (Some(first), Some(last)) = (route.first().copied(), route.last().copied()) {
            let mut overlay = Overlay::new(LayerKind::Route);
            overlay.markers = vec![
                Marker {
                    at: first,
                    color: Rgb::START,
                    label: "Start".into(),
                    glyph: Glyph::Start,
                },
                Marker {
                    at: last,
                    color: Rgb::END,
                    label: "End".into(),
                    glyph: Glyph::End,
                },
            ];
            overlay.lines = vec![Polyline {
                points: route.clone(),
                color: Rgb::ROUTE,
                weight: 5,
            }];
            self.layers.route = Some(map.add_overlay(overlay));
        }

        if let Some(bounds) = Bounds::enclosing(&route) {
            map.set_view(View::Fit(bounds));
        } else if let Some(center) = result.center {
            map.set_view(View::Center {
                center: LatLon::from_lat_lon(center),
                zoom: self.config.zoom,
            });
        }

        tracing::debug!(
            route_points = route.len(),
            road_network = self.layers.road_network.is_some(),
            markers = self.layers.markers.is_some(),
            "map rendered"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, VisualizationData};
    use serde_json::json;

    fn manager() -> MapLayerManager {
        MapLayerManager::new(MapConfig::default())
    }

    fn full_result() -> SolveResult {
        SolveResult {
            path: vec![NodeId("1".into()), NodeId("2".into()), NodeId("3".into())],
            distance: 120.5,
            execution_time_secs: Some(0.01),
            path_coordinates: Some(vec![[40.0, -3.0], [40.1, -3.1], [40.2, -3.05]]),
            visualization_data: Some(VisualizationData {
                graph_edges: Some(vec![json!([[10, 20], [11, 21]]), json!({ "geometry": null })]),
                points: Some(vec![
                    json!({ "geometry": { "coordinates": [-3.0, 40.0] } }),
                    json!({ "geometry": { "coordinates": [-3.1, 40.1] } }),
                    json!({ "geometry": { "coordinates": [-3.05, 40.2] }, "properties": { "popup": "Depot" } }),
                ]),
            }),
            center: None,
        }
    }

    #[test]
    fn init_map_is_idempotent_and_drops_the_previous_instance() {
        let mut m = manager();
        m.init_map();
        m.render(&full_result());
        m.init_map();

        let map = m.map().unwrap();
        assert_eq!(m.instances(), 2);
        assert_eq!(map.tiles().len(), 1);
        assert_eq!(map.overlay_count(), 0);
        assert_eq!(m.layers(), MapLayers::default());
        assert_eq!(
            map.view(),
            View::Center {
                center: LatLon::new(0.0, 0.0),
                zoom: 2
            }
        );
    }

    #[test]
    fn rendering_twice_keeps_one_layer_per_slot() {
        let mut m = manager();
        m.init_map();
        m.render(&full_result());
        let first = m.layers();
        m.render(&full_result());
        let second = m.layers();

        let map = m.map().unwrap();
        assert_eq!(map.count(LayerKind::Route), 1);
        assert_eq!(map.count(LayerKind::Markers), 1);
        assert_eq!(map.count(LayerKind::RoadNetwork), 1);
        assert_eq!(map.overlay_count(), 3);
        assert_ne!(first.route, second.route);
        assert!(map.overlay(first.route.unwrap()).is_none());
    }

    #[test]
    fn road_network_geometry_is_flipped_and_bad_edges_skipped() {
        let mut m = manager();
        m.render(&full_result());
        let map = m.map().unwrap();
        let road = map.overlay(m.layers().road_network.unwrap()).unwrap();
        assert_eq!(road.lines.len(), 1);
        let pairs: Vec<[f64; 2]> = road.lines[0].points.iter().map(|p| p.as_pair()).collect();
        assert_eq!(pairs, vec![[20.0, 10.0], [21.0, 11.0]]);
    }

    #[test]
    fn route_coordinates_are_drawn_unflipped_with_start_and_end_glyphs() {
        let mut m = manager();
        m.render(&full_result());
        let map = m.map().unwrap();
        let route = map.overlay(m.layers().route.unwrap()).unwrap();
        assert_eq!(route.lines[0].points[0], LatLon::new(40.0, -3.0));
        let glyphs: Vec<(Glyph, LatLon)> = route.markers.iter().map(|mk| (mk.glyph, mk.at)).collect();
        assert_eq!(
            glyphs,
            vec![
                (Glyph::Start, LatLon::new(40.0, -3.0)),
                (Glyph::End, LatLon::new(40.2, -3.05))
            ]
        );
        assert_eq!(
            map.view(),
            View::Fit(Bounds {
                south: 40.0,
                west: -3.1,
                north: 40.2,
                east: -3.0
            })
        );
    }

    #[test]
    fn markers_distinguish_first_and_last_unless_colored() {
        let mut m = manager();
        m.render(&full_result());
        let map = m.map().unwrap();
        let markers = &map.overlay(m.layers().markers.unwrap()).unwrap().markers;
        let colors: Vec<Rgb> = markers.iter().map(|mk| mk.color).collect();
        assert_eq!(colors, vec![Rgb::START, Rgb::WAYPOINT, Rgb::END]);
        let labels: Vec<&str> = markers.iter().map(|mk| mk.label.as_str()).collect();
        assert_eq!(labels, vec!["Point 1", "Point 2", "Depot"]);

        let mut result = full_result();
        result.visualization_data = Some(VisualizationData {
            graph_edges: None,
            points: Some(vec![json!({
                "geometry": { "coordinates": [1.0, 2.0] },
                "properties": { "color": "#000000" }
            })]),
        });
        m.render(&result);
        let map = m.map().unwrap();
        let markers = &map.overlay(m.layers().markers.unwrap()).unwrap().markers;
        assert_eq!(markers[0].color, Rgb(0, 0, 0));
        assert!(m.layers().road_network.is_none(), "absent geometry clears the slot");
    }

    #[test]
    fn result_without_geometry_clears_every_slot() {
        let mut m = manager();
        m.render(&full_result());
        m.render(&SolveResult {
            path: vec![],
            distance: 0.0,
            execution_time_secs: None,
            path_coordinates: None,
            visualization_data: None,
            center: Some([10.0, 20.0]),
        });
        let map = m.map().unwrap();
        assert_eq!(map.overlay_count(), 0);
        assert_eq!(m.layers(), MapLayers::default());
        assert_eq!(
            map.view(),
            View::Center {
                center: LatLon::new(10.0, 20.0),
                zoom: 2
            }
        );
    }

    #[test]
    fn render_without_map_initializes_one() {
        let mut m = manager();
        assert!(m.map().is_none());
        m.render(&full_result());
        assert_eq!(m.instances(), 1);
        assert_eq!(m.map().unwrap().tiles().len(), 1);
    }
}
