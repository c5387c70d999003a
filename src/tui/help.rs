use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEYS: &[(&str, &str)] = &[
    ("Tab / ↓", "Next field"),
    ("Shift-Tab / ↑", "Previous field"),
    ("Enter", "Run the focused row's action (upload or solve)"),
    ("← / →", "Change algorithm, move the mutation-rate slider"),
    ("Ctrl-R", "Reload: clear every upload, result and message"),
    ("Ctrl-Y", "Copy the current route to the clipboard"),
    ("F1", "Toggle this help"),
    ("Esc / Ctrl-C", "Quit"),
];

pub fn draw_help(area: Rect, f: &mut Frame) {
    let mut lines = vec![Line::from("Keybinds:")];
    for (key, what) in KEYS {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{key:<14}"), Style::default().fg(Color::Magenta)),
            Span::raw(*what),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Workflow:"));
    lines.push(Line::from(
        "  1. Upload the road network  2. Upload the points  3. Pick an algorithm and solve",
    ));
    lines.push(Line::from(
        "  Each step unlocks the next. Messages disappear after five seconds.",
    ));
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
