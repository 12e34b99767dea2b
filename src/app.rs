use crate::engine::PortfolioSimulation;
use crate::report::SimulationReport;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::io;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Portfolio,
    Asset(usize),
}

/// Read-only dashboard over a finished simulation.
pub struct App<'a> {
    pub should_quit: bool,
    pub view: View,
    pub simulation: &'a PortfolioSimulation,
    pub report: &'a SimulationReport,
}

impl<'a> App<'a> {
    pub fn new(simulation: &'a PortfolioSimulation, report: &'a SimulationReport) -> Self {
        Self {
            should_quit: false,
            view: View::Portfolio,
            simulation,
            report,
        }
    }

    pub fn next_view(&mut self) {
        let assets = self.simulation.assets.len();
        self.view = match self.view {
            View::Portfolio if assets > 0 => View::Asset(0),
            View::Asset(i) if i + 1 < assets => View::Asset(i + 1),
            _ => View::Portfolio,
        };
    }

    pub fn previous_view(&mut self) {
        let assets = self.simulation.assets.len();
        self.view = match self.view {
            View::Portfolio if assets > 0 => View::Asset(assets - 1),
            View::Asset(i) if i > 0 => View::Asset(i - 1),
            _ => View::Portfolio,
        };
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.next_view(),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => self.previous_view(),
            KeyCode::Char('p') => self.view = View::Portfolio,
            _ => {}
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        while !self.should_quit {
            terminal.draw(|f| crate::ui::render(f, self))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::data::PriceSeries;
    use crate::engine::run_simulation;
    use crate::random::{NormalMethod, SeededShocks};

    fn simulation() -> PortfolioSimulation {
        let a = PriceSeries::from_prices("AAA", &[10.0, 10.5, 10.2, 10.8]).unwrap();
        let b = PriceSeries::from_prices("BBB", &[50.0, 49.0, 51.0, 52.0]).unwrap();
        let config = SimulationConfig { days: 5, trials: 4, ..SimulationConfig::default() };
        let shocks = SeededShocks::new(2, NormalMethod::InverseCdf);
        run_simulation(&[a, b], &[0.5, 0.5], &config, &shocks, Some(2)).unwrap()
    }

    #[test]
    fn test_view_cycling() {
        let sim = simulation();
        let report = SimulationReport::from_simulation(&sim).unwrap();
        let mut app = App::new(&sim, &report);
        assert_eq!(app.view, View::Portfolio);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.view, View::Asset(0));
        app.handle_key(KeyCode::Right);
        assert_eq!(app.view, View::Asset(1));
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.view, View::Portfolio);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.view, View::Asset(1));
        app.handle_key(KeyCode::Char('p'));
        assert_eq!(app.view, View::Portfolio);
        assert!(!app.should_quit);
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
