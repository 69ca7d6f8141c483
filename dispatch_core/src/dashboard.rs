//! Dispatch Monitor TUI Dashboard
//! ==============================
//!
//! Terminal status view for a running simulation.
//! Uses Ratatui for rendering and Crossbeam for frame/command delivery.
//!
//! Enable with the `dashboard` feature flag.
//!
//! Panels:
//! - Header with phase and simulation time
//! - Status log line (last outcome only)
//! - Summary (delivered patients, standby roster per hospital)
//! - Ambulance and patient lists
//! - Ring map of the first nodes with per-node occupancy

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dispatch_env::StatusSnapshot;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as CanvasLine},
        Block, Borders, List, ListItem, Paragraph, Sparkline,
    },
    Frame, Terminal,
};

use crate::lifecycle::Phase;
use crate::map_layout::MapLayoutEngine;
use crate::summary::StatusSummary;

// =============================================================================
// FRAMES AND COMMANDS
// =============================================================================

/// Everything the dashboard draws, sent by the controller task.
#[derive(Debug, Clone)]
pub struct DashboardFrame {
    pub phase: Phase,
    /// Latest status log message
    pub log: Option<String>,
    pub snapshot: Option<Arc<StatusSnapshot>>,
    /// Point count the map is laid out with
    pub map_points: u32,
    /// Current (unvalidated) config inputs, for display
    pub config_line: String,
}

impl Default for DashboardFrame {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            log: None,
            snapshot: None,
            map_points: crate::config::FALLBACK_POINTS,
            config_line: String::new(),
        }
    }
}

/// User commands sent back to the controller task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardCommand {
    Start,
    Stop,
    Restart,
    Quit,
}

/// Maps a key press to a command.
pub fn command_for_key(code: KeyCode) -> Option<DashboardCommand> {
    match code {
        KeyCode::Char('s') => Some(DashboardCommand::Start),
        KeyCode::Char('x') => Some(DashboardCommand::Stop),
        KeyCode::Char('r') => Some(DashboardCommand::Restart),
        KeyCode::Char('q') | KeyCode::Esc => Some(DashboardCommand::Quit),
        _ => None,
    }
}

// =============================================================================
// STATUS DASHBOARD
// =============================================================================

/// TUI dashboard for one client session.
pub struct StatusDashboard {
    rx: Receiver<DashboardFrame>,
    commands: Sender<DashboardCommand>,
    engine: MapLayoutEngine,
    latest: DashboardFrame,
    delivered_history: VecDeque<u64>,
    last_snapshot_time: Option<f64>,
    frame_count: usize,
}

impl StatusDashboard {
    /// Create a new dashboard with the frame receiver and command sender.
    pub fn new(rx: Receiver<DashboardFrame>, commands: Sender<DashboardCommand>, engine: MapLayoutEngine) -> Self {
        Self {
            rx,
            commands,
            engine,
            latest: DashboardFrame::default(),
            delivered_history: VecDeque::with_capacity(100),
            last_snapshot_time: None,
            frame_count: 0,
        }
    }

    /// Folds a frame into the dashboard state.
    pub fn ingest(&mut self, frame: DashboardFrame) {
        if let Some(snapshot) = &frame.snapshot {
            // One history sample per distinct snapshot
            if self.last_snapshot_time != Some(snapshot.time) {
                self.last_snapshot_time = Some(snapshot.time);
                let summary = StatusSummary::from_snapshot(snapshot);
                self.delivered_history.push_back(summary.delivered as u64);
                if self.delivered_history.len() > 100 {
                    self.delivered_history.pop_front();
                }
            }
        }
        self.latest = frame;
    }

    /// Run the TUI main loop (blocks until 'q' pressed)
    pub fn run(&mut self) -> io::Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        loop {
            while let Ok(frame) = self.rx.try_recv() {
                self.ingest(frame);
            }

            terminal.draw(|f| self.ui(f))?;
            self.frame_count += 1;

            // Handle input (non-blocking with 50ms timeout)
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if let Some(command) = command_for_key(key.code) {
                        let quit = command == DashboardCommand::Quit;
                        if self.commands.send(command).is_err() || quit {
                            break;
                        }
                    }
                }
            }
        }

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Render the UI
    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(3), // Log line
                Constraint::Min(10),   // Body
                Constraint::Length(1), // Footer
            ])
            .split(f.area());

        // === HEADER ===
        let (phase_text, phase_color) = match self.latest.phase {
            Phase::Running => ("RUNNING", Color::Green),
            Phase::Idle => ("IDLE", Color::Yellow),
        };
        let time = self
            .latest
            .snapshot
            .as_ref()
            .map(|s| format!("t={}", s.time))
            .unwrap_or_else(|| "t=-".to_string());
        let header = Paragraph::new(Line::from(vec![
            Span::styled("🚑 Ambulance Dispatch Monitor", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  |  "),
            Span::styled(format!("■ {}", phase_text), Style::default().fg(phase_color)),
            Span::raw("  |  "),
            Span::styled(time, Style::default().fg(Color::Cyan)),
            Span::raw("  |  "),
            Span::raw(self.latest.config_line.clone()),
        ]))
        .block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(header, chunks[0]);

        // === LOG ===
        let log = Paragraph::new(self.latest.log.clone().unwrap_or_default())
            .block(Block::default().title("Status").borders(Borders::ALL));
        f.render_widget(log, chunks[1]);

        // === BODY ===
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[2]);

        match &self.latest.snapshot {
            Some(snapshot) => {
                self.render_panels(f, body[0], snapshot);
                self.render_map(f, body[1], snapshot);
            }
            None => {
                let waiting = Paragraph::new("No status yet")
                    .style(Style::default().fg(Color::DarkGray))
                    .block(Block::default().borders(Borders::ALL));
                f.render_widget(waiting, chunks[2]);
            }
        }

        // === FOOTER ===
        let footer = Paragraph::new(format!("s: start  x: stop  r: restart  q: quit  |  frame {}", self.frame_count))
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(footer, chunks[3]);
    }

    fn render_panels(&self, f: &mut Frame, area: Rect, snapshot: &StatusSnapshot) {
        let summary = StatusSummary::from_snapshot(snapshot);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Length(5),
                Constraint::Min(3),
                Constraint::Min(3),
            ])
            .split(area);

        let mut lines = vec![Line::from(format!("Delivered patients: {}", summary.delivered))];
        for roster in &summary.standby {
            let ids: Vec<String> = roster.idle_ambulances.iter().map(|id| id.to_string()).collect();
            lines.push(Line::from(format!(
                "Hospital {} standby: [{}]",
                roster.hospital_id,
                ids.join(", ")
            )));
        }
        let summary_panel = Paragraph::new(lines).block(Block::default().title("Summary").borders(Borders::ALL));
        f.render_widget(summary_panel, rows[0]);

        let history: Vec<u64> = self.delivered_history.iter().copied().collect();
        let sparkline = Sparkline::default()
            .block(Block::default().title("Delivered (history)").borders(Borders::ALL))
            .data(&history)
            .style(Style::default().fg(Color::Green));
        f.render_widget(sparkline, rows[1]);

        let ambulances: Vec<ListItem> = snapshot
            .ambulances
            .iter()
            .map(|a| ListItem::new(format!("🚑 {} @ {} - {}", a.id, a.location, a.state)))
            .collect();
        f.render_widget(
            List::new(ambulances).block(Block::default().title("Ambulances").borders(Borders::ALL)),
            rows[2],
        );

        let patients: Vec<ListItem> = snapshot
            .patients
            .iter()
            .map(|p| ListItem::new(format!("🧍 {} @ {} - {}", p.id, p.location, p.state)))
            .collect();
        f.render_widget(
            List::new(patients).block(Block::default().title("Patients").borders(Borders::ALL)),
            rows[3],
        );
    }

    fn render_map(&self, f: &mut Frame, area: Rect, snapshot: &StatusSnapshot) {
        let map = self.engine.map(snapshot, self.latest.map_points as usize);
        let (width, height) = (map.width, map.height);

        let canvas = Canvas::default()
            .block(Block::default().title("City Map").borders(Borders::ALL))
            .marker(Marker::Braille)
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(move |ctx| {
                // Canvas y grows upward, layout y grows downward
                for edge in &map.edges {
                    let a = map.nodes[edge.from].position;
                    let b = map.nodes[edge.to].position;
                    ctx.draw(&CanvasLine {
                        x1: a.x,
                        y1: height - a.y,
                        x2: b.x,
                        y2: height - b.y,
                        color: Color::Gray,
                    });
                }
                for node in &map.nodes {
                    let (x, y) = (node.position.x, height - node.position.y);
                    ctx.draw(&Circle {
                        x,
                        y,
                        radius: 8.0,
                        color: Color::Cyan,
                    });
                    ctx.print(x, y, node.index.to_string());
                    if !node.is_empty() {
                        ctx.print(
                            x,
                            y + 14.0,
                            format!(
                                "H{} A{} P{}",
                                node.hospitals_here.len(),
                                node.ambulances_here.len(),
                                node.patients_here.len()
                            ),
                        );
                    }
                }
            });
        f.render_widget(canvas, area);
    }
}

// =============================================================================
// TESTS
// =============================================================================
