//! Live validation dashboard

use crate::error::EngineError;
use crate::proxy::{Candidate, Probe, Progress, ValidationEngine, ValidationResult};
use crate::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::collections::VecDeque;
use std::io;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::Duration;

/// Maximum number of recent results kept per list for display
const MAX_RECENT: usize = 100;

/// Which list has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Working,
    Failed,
}

/// Terminal dashboard driving a validation run
pub struct ValidationDashboard<P: Probe> {
    engine: ValidationEngine<P>,
    /// Taken when the run starts
    candidates: Option<Vec<Candidate>>,
    progress: Progress,
    results: Vec<ValidationResult>,
    recent_working: VecDeque<ValidationResult>,
    recent_failed: VecDeque<ValidationResult>,
    focus: Focus,
    list_state: ListState,
    status_message: String,
    is_complete: bool,
    should_quit: bool,
    fault: Option<EngineError>,
}

impl<P: Probe> ValidationDashboard<P> {
    pub fn new(engine: ValidationEngine<P>, candidates: Vec<Candidate>) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            engine,
            progress: Progress::new(candidates.len()),
            candidates: Some(candidates),
            results: Vec::new(),
            recent_working: VecDeque::new(),
            recent_failed: VecDeque::new(),
            focus: Focus::Working,
            list_state,
            status_message: "Validating proxies... Press 'q' to quit.".to_string(),
            is_complete: false,
            should_quit: false,
            fault: None,
        }
    }

    /// Run the dashboard until the user quits.
    ///
    /// Returns every result once the run is complete. An engine fault, or
    /// quitting before the run completes, is returned as
    /// [`EngineError::Aborted`] carrying the results received so far.
    pub async fn run(&mut self) -> Result<Vec<ValidationResult>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal).await;

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result?;

        Ok(self.finish()?)
    }

    /// Hand over the collected results, failing unless the run completed
    fn finish(&mut self) -> std::result::Result<Vec<ValidationResult>, EngineError> {
        let results = std::mem::take(&mut self.results);
        match self.fault.take() {
            Some(fault) => Err(EngineError::aborted(results, fault)),
            None if !self.is_complete => {
                Err(EngineError::aborted(results, EngineError::Cancelled))
            }
            None => Ok(results),
        }
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let candidates = self.candidates.take().unwrap_or_default();
        let mut rx = self.engine.spawn_validation(candidates);

        loop {
            terminal.draw(|f| self.ui(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_input(key.code);
                        if self.should_quit {
                            break;
                        }
                    }
                }
            }

            // Drain everything that arrived since the last frame
            while !self.is_complete {
                match rx.try_recv() {
                    Ok(Ok(result)) => self.record(result),
                    Ok(Err(fault)) => {
                        self.status_message = format!("Validation aborted: {} | Press 'q' to quit", fault);
                        self.fault = Some(fault);
                        self.is_complete = true;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.is_complete = true;
                        self.status_message = format!(
                            "Complete! Checked: {} | Working: {} | Failed: {} | Press 'q' to quit",
                            self.progress.completed,
                            self.progress.working,
                            self.progress.completed - self.progress.working
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn record(&mut self, result: ValidationResult) {
        self.progress.record(&result);

        let recent = if result.is_working() {
            &mut self.recent_working
        } else {
            &mut self.recent_failed
        };
        recent.push_back(result.clone());
        if recent.len() > MAX_RECENT {
            recent.pop_front();
        }
        self.results.push(result);

        self.status_message = format!(
            "Validating... {}% ({}/{}) | Working: {} | Failed: {}",
            self.progress.percent(),
            self.progress.completed,
            self.progress.total,
            self.progress.working,
            self.progress.completed - self.progress.working
        );
    }

    fn focused_len(&self) -> usize {
        match self.focus {
            Focus::Working => self.recent_working.len(),
            Focus::Failed => self.recent_failed.len(),
        }
    }

    fn handle_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Working => Focus::Failed,
                    Focus::Failed => Focus::Working,
                };
                self.list_state.select(Some(0));
            }
            KeyCode::Down => {
                let len = self.focused_len();
                let i = match self.list_state.selected() {
                    Some(i) if i + 1 < len => i + 1,
                    _ => 0,
                };
                self.list_state.select(Some(i));
            }
            KeyCode::Up => {
                let len = self.focused_len();
                let i = match self.list_state.selected() {
                    Some(0) | None => len.saturating_sub(1),
                    Some(i) => i - 1,
                };
                self.list_state.select(Some(i));
            }
            _ => {}
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(3), // Progress bar
                Constraint::Min(0),    // Result lists
                Constraint::Length(3), // Status bar
            ])
            .split(f.size());

        let title = Paragraph::new("Proxy Checker")
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let percent = self.progress.percent().min(100);
        let label = format!(
            "{}/{} ({}%)",
            self.progress.completed, self.progress.total, percent
        );
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
            .percent(percent)
            .label(label);
        f.render_widget(gauge, chunks[1]);

        let list_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);

        let failed = self.progress.completed - self.progress.working;
        render_result_list(
            f,
            list_chunks[0],
            "Working",
            &self.recent_working,
            self.progress.working,
            Color::Green,
            (self.focus == Focus::Working).then_some(&mut self.list_state),
        );
        render_result_list(
            f,
            list_chunks[1],
            "Failed",
            &self.recent_failed,
            failed,
            Color::Red,
            (self.focus == Focus::Failed).then_some(&mut self.list_state),
        );

        let status = Paragraph::new(self.status_message.clone())
            .style(if self.fault.is_some() {
                Style::default().fg(Color::Red)
            } else if self.is_complete {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Yellow)
            })
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(status, chunks[3]);
    }
}

/// One line per result: latency and protocols when working, the error otherwise
fn result_line(result: &ValidationResult) -> String {
    match result.latency_ms {
        Some(ms) => format!("{} ({}ms, {})", result.address, ms, result.protocols_label()),
        None => match &result.error {
            Some(error) => format!("{} - {}", result.address, error),
            None => format!("{} - no supported protocol", result.address),
        },
    }
}

fn render_result_list(
    f: &mut Frame,
    area: Rect,
    title: &str,
    results: &VecDeque<ValidationResult>,
    total_count: usize,
    color: Color,
    list_state: Option<&mut ListState>,
) {
    let items: Vec<ListItem> = results
        .iter()
        .rev() // Show newest first
        .map(|result| ListItem::new(result_line(result)).style(Style::default().fg(color)))
        .collect();

    let border_style = if list_state.is_some() {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ({})", title, total_count))
                .border_style(border_style),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">> ");

    match list_state {
        Some(state) => f.render_stateful_widget(list, area, state),
        None => f.render_widget(list, area),
    }
}
