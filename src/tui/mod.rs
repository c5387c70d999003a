mod clipboard;
mod help;
mod map_view;
mod state;

use crate::cli::Cli;
use crate::model::{Action, Algorithm, StatusKind, UploadSummary};
use crate::orchestrator::{self, Snapshot, UiCommand, Workflow};
use crate::results::ResultsPanel;
use crate::service::RouteService;
use crate::status::StatusNotifier;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Terminal,
};
use state::{Focus, KeyAction, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub async fn run<S: RouteService>(args: Cli, service: Arc<S>) -> Result<()> {
    let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel::<Snapshot>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let notifier = StatusNotifier::new();
    let workflow = Workflow::new(
        service,
        args.upload_schema,
        args.map_config(),
        notifier.clone(),
    );
    // Queued ahead of any key press; the controller applies them first.
    for cmd in args.preselection() {
        let _ = cmd_tx.send(cmd);
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(ui_args, notifier, snapshot_rx, cmd_tx));

    // Returns once the UI thread drops its command sender.
    orchestrator::run_controller(workflow, cmd_rx, snapshot_tx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }
    Ok(())
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    notifier: StatusNotifier,
    mut snapshot_rx: UnboundedReceiver<Snapshot>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::new(&args);
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Only the latest snapshot matters.
        while let Ok(s) = snapshot_rx.try_recv() {
            state.snapshot = Some(s);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state, &notifier)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match state.on_key(k) {
                    KeyAction::None => {}
                    KeyAction::Quit => break Ok(()),
                    KeyAction::Send(cmds) => {
                        for cmd in cmds {
                            if cmd_tx.send(cmd).is_err() {
                                break;
                            }
                        }
                    }
                    KeyAction::CopyRoute => {
                        state.info = match state.route_text() {
                            Some(route) => match clipboard::copy_to_clipboard(&route) {
                                Ok(()) => "Route copied to clipboard".into(),
                                Err(e) => format!("Copy failed: {e:#}"),
                            },
                            None => "No route to copy yet".into(),
                        };
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, notifier: &StatusNotifier) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(area);

    let hint = if state.info.is_empty() {
        "Tab move · Enter run · Ctrl-R reload · Ctrl-Y copy route · F1 help · Esc quit".to_string()
    } else {
        state.info.clone()
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(hint, Style::default().fg(Color::Gray)))),
        rows[1],
    );

    if state.show_help {
        help::draw_help(rows[0], f);
        return;
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(56), Constraint::Min(0)].as_ref())
        .split(rows[0]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(10), // Controls
                Constraint::Length(7),  // Status messages
                Constraint::Min(0),     // Results
            ]
            .as_ref(),
        )
        .split(cols[0]);

    draw_controls(left[0], f, state);
    draw_statuses(left[1], f, notifier);
    draw_results(left[2], f, state);
    map_view::draw_map(
        cols[1],
        f,
        state.snapshot.as_ref().and_then(|s| s.map.as_deref()),
    );
}

fn trigger_badge(snapshot: Option<&Snapshot>, action: Action) -> Span<'static> {
    let (text, color) = match snapshot {
        Some(s) if s.is_busy(action) => ("[working…]", Color::Yellow),
        Some(s) if s.is_enabled(action) => ("[ready]", Color::Green),
        _ => ("[locked]", Color::DarkGray),
    };
    Span::styled(text, Style::default().fg(color))
}

fn stage_note(summary: Option<UploadSummary>) -> Span<'static> {
    match summary {
        Some(_) => Span::styled(" ✓", Style::default().fg(Color::Green)),
        None => Span::raw(""),
    }
}

fn control_row(
    state: &UiState,
    row: Focus,
    label: &str,
    value: String,
    trailing: Vec<Span<'static>>,
) -> Line<'static> {
    let focused = state.focus == row;
    let enabled = state.row_enabled(row);
    let label_style = match (focused, enabled) {
        (true, _) => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        (false, true) => Style::default().fg(Color::White),
        (false, false) => Style::default().fg(Color::DarkGray),
    };
    let value_style = if enabled {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![
        Span::styled(if focused { "› " } else { "  " }, label_style),
        Span::styled(format!("{label:<13}"), label_style),
        Span::styled(value, value_style),
    ];
    if focused && enabled {
        spans.push(Span::styled("▏", Style::default().fg(Color::Cyan)));
    }
    spans.push(Span::raw(" "));
    spans.extend(trailing);
    Line::from(spans)
}

fn draw_controls(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let snap = state.snapshot.as_ref();
    let or_placeholder = |s: &str| {
        if s.is_empty() {
            "<path>".to_string()
        } else {
            s.to_string()
        }
    };
    let algorithm = state
        .algorithm
        .map(Algorithm::as_str)
        .unwrap_or("<select>")
        .to_string();
    let slider_width = 20usize;
    let filled = usize::from(state.mutation_percent) * slider_width / 100;
    let slider = format!(
        "{}{} {:>3}%",
        "█".repeat(filled),
        "░".repeat(slider_width - filled),
        state.mutation_percent
    );

    let mut lines = vec![
        control_row(
            state,
            Focus::NetworkFile,
            "Road network",
            or_placeholder(&state.network_input),
            vec![
                trigger_badge(snap, Action::LoadNetwork),
                stage_note(snap.and_then(|s| s.network_summary)),
            ],
        ),
        control_row(
            state,
            Focus::PointsFile,
            "Points",
            or_placeholder(&state.points_input),
            vec![
                trigger_badge(snap, Action::LoadPoints),
                stage_note(snap.and_then(|s| s.points_summary)),
            ],
        ),
        control_row(
            state,
            Focus::Algorithm,
            "Algorithm",
            format!("◂ {algorithm} ▸"),
            vec![trigger_badge(snap, Action::Solve)],
        ),
    ];
    // Parameter rows only matter for the population-based search.
    if state.algorithm.is_some_and(Algorithm::is_parameterized) {
        lines.push(control_row(
            state,
            Focus::Population,
            "Population",
            state.population_input.clone(),
            vec![],
        ));
        lines.push(control_row(
            state,
            Focus::Generations,
            "Generations",
            state.generations_input.clone(),
            vec![],
        ));
        lines.push(control_row(
            state,
            Focus::MutationRate,
            "Mutation",
            slider,
            vec![],
        ));
    } else if state.focus.is_genetic_param() {
        lines.push(Line::from(Span::styled(
            "  (parameters apply to the genetic algorithm only)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Workflow"));
    f.render_widget(p, area);
}

fn draw_statuses(area: Rect, f: &mut ratatui::Frame, notifier: &StatusNotifier) {
    let lines: Vec<Line> = notifier
        .active()
        .into_iter()
        .map(|m| {
            let color = match m.kind {
                StatusKind::Progress => Color::Yellow,
                StatusKind::Success => Color::Green,
                StatusKind::Error => Color::Red,
            };
            Line::from(vec![
                Span::styled(format!("{} ", m.posted_at), Style::default().fg(Color::DarkGray)),
                Span::styled(m.text, Style::default().fg(color)),
            ])
        })
        .collect();
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let empty = ResultsPanel::Empty;
    let panel = state
        .snapshot
        .as_ref()
        .map(|s| &s.results)
        .unwrap_or(&empty);

    let (title, lines, border) = match panel {
        ResultsPanel::Empty => (
            "Results".to_string(),
            vec![Line::from(Span::styled(
                "No result yet",
                Style::default().fg(Color::DarkGray),
            ))],
            Color::Reset,
        ),
        ResultsPanel::Summary(card) => (
            card.title(),
            card.rows()
                .into_iter()
                .map(|(label, value)| {
                    Line::from(vec![
                        Span::styled(format!("{label}: "), Style::default().fg(Color::Gray)),
                        Span::raw(value),
                    ])
                })
                .collect(),
            Color::Green,
        ),
        ResultsPanel::Failed(card) => (
            "Error".to_string(),
            vec![
                Line::from(Span::styled(card.message.clone(), Style::default().fg(Color::Red))),
                Line::from(""),
                Line::from(vec![
                    Span::raw("Recover: "),
                    Span::styled(card.recovery.label(), Style::default().fg(Color::Magenta)),
                ]),
            ],
            Color::Red,
        ),
    };

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    f.render_widget(p, area);
}
