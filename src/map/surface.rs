//! Drawing-surface seam and the in-memory canvas map behind the map pane.

use super::geometry::{Bounds, LatLon, Rgb};
use std::collections::BTreeMap;

pub const OSM_TILES: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Center { center: LatLon, zoom: u8 },
    Fit(Bounds),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: OSM_TILES.to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
        }
    }
}

/// Opaque id issued by a surface for an installed overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    RoadNetwork,
    Markers,
    Route,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<LatLon>,
    pub color: Rgb,
    pub weight: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Dot,
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub at: LatLon,
    pub color: Rgb,
    pub label: String,
    pub glyph: Glyph,
}

/// A group of lines and markers installed and removed as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub kind: LayerKind,
    pub lines: Vec<Polyline>,
    pub markers: Vec<Marker>,
}

impl Overlay {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
            markers: Vec::new(),
        }
    }
}

/// What the map manager needs from a drawing library.
pub trait MapSurface {
    fn create(view: View) -> Self
    where
        Self: Sized;

    fn add_tile_layer(&mut self, tiles: TileLayer);

    fn add_overlay(&mut self, overlay: Overlay) -> LayerHandle;

    /// Returns false when the handle is not installed on this surface.
    fn remove_overlay(&mut self, handle: LayerHandle) -> bool;

    fn set_view(&mut self, view: View);
}

/// Map state drawn by the terminal map pane. Overlays are kept in insertion
/// order so later layers paint over earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasMap {
    view: View,
    tiles: Vec<TileLayer>,
    overlays: BTreeMap<LayerHandle, Overlay>,
    next_handle: u64,
}

impl CanvasMap {
    pub fn view(&self) -> View {
        self.view
    }

    pub fn tiles(&self) -> &[TileLayer] {
        &self.tiles
    }

    pub fn overlays(&self) -> impl Iterator<Item = (LayerHandle, &Overlay)> {
        self.overlays.iter().map(|(h, o)| (*h, o))
    }

    #[cfg(test)]
    pub fn overlay(&self, handle: LayerHandle) -> Option<&Overlay> {
        self.overlays.get(&handle)
    }

    #[cfg(test)]
    pub fn count(&self, kind: LayerKind) -> usize {
        self.overlays.values().filter(|o| o.kind == kind).count()
    }

    #[cfg(test)]
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }
}

impl MapSurface for CanvasMap {
    fn create(view: View) -> Self {
        Self {
            view,
            tiles: Vec::new(),
            overlays: BTreeMap::new(),
            next_handle: 1,
        }
    }

    fn add_tile_layer(&mut self, tiles: TileLayer) {
        self.tiles.push(tiles);
    }

    fn add_overlay(&mut self, overlay: Overlay) -> LayerHandle {
        let handle = LayerHandle(self.next_handle);
        self.next_handle += 1;
        self.overlays.insert(handle, overlay);
        handle
    }

    fn remove_overlay(&mut self, handle: LayerHandle) -> bool {
        self.overlays.remove(&handle).is_some()
    }

    fn set_view(&mut self, view: View) {
        self.view = view;
    }
}
