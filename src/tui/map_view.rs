use crate::map::geometry::Rgb;
use crate::map::surface::{CanvasMap, Glyph, View};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Map as WorldMap, MapResolution},
        Block, Borders, Paragraph,
    },
    Frame,
};

/// Smallest half-width of a fitted view, in degrees.
const MIN_HALF_SPAN: f64 = 0.01;

fn color(c: Rgb) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

fn glyph_symbol(g: Glyph) -> &'static str {
    match g {
        Glyph::Dot => "●",
        Glyph::Start => "S",
        Glyph::End => "E",
    }
}

/// Canvas bounds `([west, east], [south, north])` for a map view.
///
/// A centered view spans `360 / 2^zoom` degrees of longitude; a fitted view
/// gets a 5% margin around its envelope and never collapses below
/// `2 * MIN_HALF_SPAN`.
pub fn view_bounds(view: View) -> ([f64; 2], [f64; 2]) {
    match view {
        View::Center { center, zoom } => {
            let scale = 2f64.powi(i32::from(zoom.min(20)));
            let half_lon = 180.0 / scale;
            let half_lat = 90.0 / scale;
            (
                [
                    (center.lon - half_lon).max(-180.0),
                    (center.lon + half_lon).min(180.0),
                ],
                [
                    (center.lat - half_lat).max(-90.0),
                    (center.lat + half_lat).min(90.0),
                ],
            )
        }
        View::Fit(b) => {
            let mid_lon = (b.west + b.east) / 2.0;
            let mid_lat = (b.south + b.north) / 2.0;
            let half_lon = ((b.east - b.west) * 0.55).max(MIN_HALF_SPAN);
            let half_lat = ((b.north - b.south) * 0.55).max(MIN_HALF_SPAN);
            (
                [mid_lon - half_lon, mid_lon + half_lon],
                [mid_lat - half_lat, mid_lat + half_lat],
            )
        }
    }
}

pub fn draw_map(area: Rect, f: &mut Frame, map: Option<&CanvasMap>) {
    let Some(map) = map else {
        let p = Paragraph::new("Map not initialized")
            .block(Block::default().borders(Borders::ALL).title("Map"));
        f.render_widget(p, area);
        return;
    };

    let title = match map.tiles().first() {
        Some(t) => format!("Map · {}", t.attribution),
        None => "Map".to_string(),
    };
    let (x_bounds, y_bounds) = view_bounds(map.view());

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            if !map.tiles().is_empty() {
                ctx.draw(&WorldMap {
                    resolution: MapResolution::High,
                    color: Color::DarkGray,
                });
                ctx.layer();
            }
            // Insertion order: later overlays paint over earlier ones.
            for (_, overlay) in map.overlays() {
                for line in &overlay.lines {
                    for seg in line.points.windows(2) {
                        ctx.draw(&CanvasLine::new(
                            seg[0].lon,
                            seg[0].lat,
                            seg[1].lon,
                            seg[1].lat,
                            color(line.color),
                        ));
                    }
                }
                for marker in &overlay.markers {
                    ctx.print(
                        marker.at.lon,
                        marker.at.lat,
                        Span::styled(
                            glyph_symbol(marker.glyph),
                            Style::default().fg(color(marker.color)),
                        ),
                    );
                }
                ctx.layer();
            }
        });
    f.render_widget(canvas, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::geometry::{Bounds, LatLon};

    #[test]
    fn zoom_zero_shows_the_whole_world() {
        let (x, y) = view_bounds(View::Center {
            center: LatLon::new(0.0, 0.0),
            zoom: 0,
        });
        assert_eq!(x, [-180.0, 180.0]);
        assert_eq!(y, [-90.0, 90.0]);
    }

    #[test]
    fn default_zoom_is_a_quarter_of_the_world() {
        let (x, y) = view_bounds(View::Center {
            center: LatLon::new(0.0, 0.0),
            zoom: 2,
        });
        assert_eq!(x, [-45.0, 45.0]);
        assert_eq!(y, [-22.5, 22.5]);
    }

    #[test]
    fn fitted_view_keeps_a_margin_around_the_envelope() {
        let (x, y) = view_bounds(View::Fit(Bounds {
            south: 10.0,
            west: 20.0,
            north: 12.0,
            east: 30.0,
        }));
        assert!(x[0] < 20.0 && x[1] > 30.0);
        assert!(y[0] < 10.0 && y[1] > 12.0);
    }

    #[test]
    fn fitting_a_single_point_still_has_area() {
        let (x, y) = view_bounds(View::Fit(Bounds {
            south: 40.0,
            west: -3.0,
            north: 40.0,
            east: -3.0,
        }));
        assert!(x[1] - x[0] > MIN_HALF_SPAN);
        assert!(y[1] - y[0] > MIN_HALF_SPAN);
        assert!(x[0] < -3.0 && x[1] > -3.0);
        assert!(y[0] < 40.0 && y[1] > 40.0);
    }
}
