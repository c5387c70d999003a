use crate::cli::Cli;
use crate::model::{Action, Algorithm, GeneticParams};
use crate::orchestrator::{Snapshot, UiCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

/// Focusable rows of the controls panel, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    NetworkFile,
    PointsFile,
    Algorithm,
    Population,
    Generations,
    MutationRate,
}

impl Focus {
    pub const ORDER: [Focus; 6] = [
        Focus::NetworkFile,
        Focus::PointsFile,
        Focus::Algorithm,
        Focus::Population,
        Focus::Generations,
        Focus::MutationRate,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    /// Trigger fired by Enter on this row.
    pub fn action(self) -> Action {
        match self {
            Focus::NetworkFile => Action::LoadNetwork,
            Focus::PointsFile => Action::LoadPoints,
            _ => Action::Solve,
        }
    }

    pub fn is_genetic_param(self) -> bool {
        matches!(self, Focus::Population | Focus::Generations | Focus::MutationRate)
    }
}

/// What the UI loop should do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    None,
    Send(Vec<UiCommand>),
    CopyRoute,
    Quit,
}

/// UI-thread state. Workflow state arrives as snapshots; this only holds
/// what the user is typing and what is focused.
pub struct UiState {
    pub focus: Focus,
    pub network_input: String,
    pub points_input: String,
    pub algorithm: Option<Algorithm>,
    pub population_input: String,
    pub generations_input: String,
    pub mutation_percent: u8,
    pub show_help: bool,
    pub info: String,
    pub snapshot: Option<Snapshot>,
}

impl Default for UiState {
    fn default() -> Self {
        let params = GeneticParams::default();
        Self {
            focus: Focus::NetworkFile,
            network_input: String::new(),
            points_input: String::new(),
            algorithm: None,
            population_input: params.population_size.to_string(),
            generations_input: params.generations.to_string(),
            mutation_percent: params.mutation_rate_percent,
            show_help: false,
            info: String::new(),
            snapshot: None,
        }
    }
}

const MAX_NUMBER_DIGITS: usize = 9;

fn path_of(input: &str) -> Option<PathBuf> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

impl UiState {
    pub fn new(args: &Cli) -> Self {
        let display = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        Self {
            network_input: display(&args.network),
            points_input: display(&args.points),
            algorithm: args.algorithm,
            population_input: args.population_size.to_string(),
            generations_input: args.generations.to_string(),
            mutation_percent: args.mutation_rate,
            ..Default::default()
        }
    }

    /// Parameters as typed. An empty field reads as 0 and is rejected when
    /// the solve is validated.
    pub fn params(&self) -> GeneticParams {
        GeneticParams {
            population_size: self.population_input.parse().unwrap_or(0),
            generations: self.generations_input.parse().unwrap_or(0),
            mutation_rate_percent: self.mutation_percent,
        }
    }

    /// Whether the gate currently lets the user edit `row`.
    pub fn row_enabled(&self, row: Focus) -> bool {
        let Some(s) = &self.snapshot else {
            return row == Focus::NetworkFile;
        };
        match row {
            Focus::NetworkFile => s.controls.network_upload,
            Focus::PointsFile => s.controls.points_upload,
            _ => s.controls.algorithm_select,
        }
    }

    fn cycle_algorithm(&mut self, forward: bool) {
        let all = Algorithm::ALL;
        let next = match self.algorithm.and_then(|a| all.iter().position(|x| *x == a)) {
            None if forward => 0,
            None => all.len() - 1,
            Some(i) if forward => (i + 1) % all.len(),
            Some(i) => (i + all.len() - 1) % all.len(),
        };
        self.algorithm = Some(all[next]);
    }

    fn reset_inputs(&mut self) {
        let snapshot = self.snapshot.take();
        *self = Self {
            snapshot,
            info: "Reloaded".into(),
            ..Default::default()
        };
    }

    fn edit(&mut self, key: KeyCode) -> KeyAction {
        let row = self.focus;
        if !self.row_enabled(row) {
            return KeyAction::None;
        }
        match (row, key) {
            (Focus::NetworkFile, KeyCode::Char(c)) => self.network_input.push(c),
            (Focus::NetworkFile, KeyCode::Backspace) => {
                self.network_input.pop();
            }
            (Focus::PointsFile, KeyCode::Char(c)) => self.points_input.push(c),
            (Focus::PointsFile, KeyCode::Backspace) => {
                self.points_input.pop();
            }
            (Focus::Algorithm, KeyCode::Right) => self.cycle_algorithm(true),
            (Focus::Algorithm, KeyCode::Left) => self.cycle_algorithm(false),
            (Focus::Population | Focus::Generations, KeyCode::Char(c)) if c.is_ascii_digit() => {
                let input = if row == Focus::Population {
                    &mut self.population_input
                } else {
                    &mut self.generations_input
                };
                if input.len() >= MAX_NUMBER_DIGITS {
                    return KeyAction::None;
                }
                input.push(c);
            }
            (Focus::Population, KeyCode::Backspace) => {
                self.population_input.pop();
            }
            (Focus::Generations, KeyCode::Backspace) => {
                self.generations_input.pop();
            }
            (Focus::MutationRate, KeyCode::Right) => {
                self.mutation_percent = (self.mutation_percent + 1).min(100);
            }
            (Focus::MutationRate, KeyCode::Left) => {
                self.mutation_percent = self.mutation_percent.saturating_sub(1);
            }
            _ => return KeyAction::None,
        }

        let cmd = match row {
            Focus::NetworkFile => UiCommand::SelectNetworkFile(path_of(&self.network_input)),
            Focus::PointsFile => UiCommand::SelectPointsFile(path_of(&self.points_input)),
            Focus::Algorithm => UiCommand::SelectAlgorithm(self.algorithm),
            _ => UiCommand::SetParams(self.params()),
        };
        KeyAction::Send(vec![cmd])
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char('c') if ctrl => KeyAction::Quit,
            KeyCode::F(1) => {
                self.show_help = !self.show_help;
                KeyAction::None
            }
            KeyCode::Char('r') if ctrl => {
                self.reset_inputs();
                KeyAction::Send(vec![UiCommand::Reload])
            }
            KeyCode::Char('y') if ctrl => KeyAction::CopyRoute,
            _ if ctrl => KeyAction::None,
            KeyCode::Tab | KeyCode::Down => {
                self.focus = self.focus.next();
                KeyAction::None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = self.focus.prev();
                KeyAction::None
            }
            KeyCode::Enter => KeyAction::Send(vec![UiCommand::Fire(self.focus.action())]),
            code => self.edit(code),
        }
    }

    /// Route of the current result card, ready for the clipboard.
    pub fn route_text(&self) -> Option<String> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.results.card())
            .map(|c| c.route_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Controls;
    use crate::model::{AlgorithmSelection, UploadState};
    use crate::results::ResultsPanel;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn snapshot(controls: Controls) -> Snapshot {
        Snapshot {
            uploads: UploadState::default(),
            selection: AlgorithmSelection::default(),
            controls,
            busy: [false; 3],
            network_file: None,
            points_file: None,
            network_summary: None,
            points_summary: None,
            results: ResultsPanel::default(),
            map: None,
        }
    }

    fn all_enabled() -> Controls {
        Controls {
            network_upload: true,
            points_upload: true,
            algorithm_select: true,
            solve: true,
        }
    }

    #[test]
    fn typing_a_path_selects_the_file() {
        let mut s = UiState::default();
        s.on_key(key(KeyCode::Char('a')));
        let action = s.on_key(key(KeyCode::Char('b')));
        assert_eq!(
            action,
            KeyAction::Send(vec![UiCommand::SelectNetworkFile(Some(PathBuf::from("ab")))])
        );
        s.on_key(key(KeyCode::Backspace));
        let action = s.on_key(key(KeyCode::Backspace));
        assert_eq!(action, KeyAction::Send(vec![UiCommand::SelectNetworkFile(None)]));
    }

    #[test]
    fn disabled_rows_ignore_edits() {
        let mut s = UiState::default();
        s.focus = Focus::PointsFile;
        assert_eq!(s.on_key(key(KeyCode::Char('x'))), KeyAction::None);
        assert!(s.points_input.is_empty());

        s.focus = Focus::Algorithm;
        assert_eq!(s.on_key(key(KeyCode::Right)), KeyAction::None);
        assert_eq!(s.algorithm, None);
    }

    #[test]
    fn enter_fires_the_focused_rows_trigger() {
        let mut s = UiState::default();
        assert_eq!(
            s.on_key(key(KeyCode::Enter)),
            KeyAction::Send(vec![UiCommand::Fire(Action::LoadNetwork)])
        );
        s.on_key(key(KeyCode::Tab));
        assert_eq!(
            s.on_key(key(KeyCode::Enter)),
            KeyAction::Send(vec![UiCommand::Fire(Action::LoadPoints)])
        );
        s.focus = Focus::Generations;
        assert_eq!(
            s.on_key(key(KeyCode::Enter)),
            KeyAction::Send(vec![UiCommand::Fire(Action::Solve)])
        );
    }

    #[test]
    fn focus_wraps_both_ways() {
        assert_eq!(Focus::MutationRate.next(), Focus::NetworkFile);
        assert_eq!(Focus::NetworkFile.prev(), Focus::MutationRate);
    }

    #[test]
    fn algorithm_cycles_and_slider_clamps() {
        let mut s = UiState {
            snapshot: Some(snapshot(all_enabled())),
            focus: Focus::Algorithm,
            ..Default::default()
        };
        s.on_key(key(KeyCode::Right));
        assert_eq!(s.algorithm, Some(Algorithm::BruteForce));
        s.on_key(key(KeyCode::Left));
        assert_eq!(s.algorithm, Some(Algorithm::Genetic));

        s.focus = Focus::MutationRate;
        s.mutation_percent = 99;
        s.on_key(key(KeyCode::Right));
        let action = s.on_key(key(KeyCode::Right));
        assert_eq!(s.mutation_percent, 100);
        assert_eq!(
            action,
            KeyAction::Send(vec![UiCommand::SetParams(GeneticParams {
                population_size: 50,
                generations: 100,
                mutation_rate_percent: 100
            })])
        );
    }

    #[test]
    fn numeric_fields_accept_digits_only() {
        let mut s = UiState {
            snapshot: Some(snapshot(all_enabled())),
            focus: Focus::Population,
            ..Default::default()
        };
        assert_eq!(s.on_key(key(KeyCode::Char('x'))), KeyAction::None);
        s.on_key(key(KeyCode::Backspace));
        s.on_key(key(KeyCode::Backspace));
        assert_eq!(s.params().population_size, 0);
        s.on_key(key(KeyCode::Char('7')));
        assert_eq!(s.params().population_size, 7);
    }

    #[test]
    fn control_keys_quit_reload_and_copy() {
        let mut s = UiState {
            network_input: "roads.osm".into(),
            ..Default::default()
        };
        assert_eq!(s.on_key(ctrl('y')), KeyAction::CopyRoute);
        assert_eq!(s.on_key(ctrl('r')), KeyAction::Send(vec![UiCommand::Reload]));
        assert!(s.network_input.is_empty());
        assert_eq!(s.on_key(ctrl('c')), KeyAction::Quit);
        assert_eq!(s.on_key(key(KeyCode::Esc)), KeyAction::Quit);
        assert_eq!(s.on_key(ctrl('x')), KeyAction::None);
    }
}
