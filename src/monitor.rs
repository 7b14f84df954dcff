// Live sampling view: polls the bench and renders the latest readback as a table.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use geny::command::ReadbackMode;
use geny::{SamplingData, TestBench};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};
use ratatui::{Frame, Terminal};

const REFRESH: Duration = Duration::from_millis(500);

struct Monitor {
    latest: Option<SamplingData>,
    status: String,
    polls: u64,
}

impl Monitor {
    fn refresh(&mut self, bench: &TestBench) {
        self.polls += 1;
        match bench.read_sampling(ReadbackMode::Once) {
            Ok(Some(sample)) => {
                self.latest = Some(sample);
                self.status = format!("poll {} ok", self.polls);
            }
            Ok(None) => self.status = format!("poll {}: no data", self.polls),
            Err(e) => self.status = format!("poll {}: {}", self.polls, e),
        }
    }
}

pub fn run(bench: &TestBench) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, Hide)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let result = run_loop(&mut terminal, bench);
    cleanup_terminal(&mut terminal)?;
    result
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)?;
    terminal.show_cursor()
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, bench: &TestBench) -> io::Result<()> {
    let mut monitor = Monitor {
        latest: None,
        status: String::from("waiting for first poll"),
        polls: 0,
    };
    loop {
        monitor.refresh(bench);
        terminal.draw(|frame| draw_ui(frame, &monitor))?;
        if event::poll(REFRESH)? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Ok(());
                }
            }
        }
    }
}

fn draw_ui(frame: &mut Frame, monitor: &Monitor) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(frame.size());

    let header = Row::new(["Phase", "U (V)", "U angle", "I (A)", "I angle", "P (W)", "Q (var)", "S (VA)"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = match &monitor.latest {
        Some(sample) => {
            let mut rows: Vec<Row> = sample
                .phases
                .iter()
                .zip(["A", "B", "C"])
                .map(|(phase, name)| {
                    Row::new(vec![
                        name.to_string(),
                        format!("{:.3}", phase.voltage),
                        format!("{:.2}", phase.voltage_angle),
                        format!("{:.4}", phase.current),
                        format!("{:.2}", phase.current_angle),
                        format!("{:.3}", phase.active_power),
                        format!("{:.3}", phase.reactive_power),
                        format!("{:.3}", phase.apparent_power()),
                    ])
                })
                .collect();
            rows.push(Row::new(vec![
                "Total".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                format!("{:.3}", sample.total_active_power),
                format!("{:.3}", sample.total_reactive_power),
                format!("{:.3}", sample.total_apparent_power()),
            ]));
            rows
        }
        None => vec![Row::new(vec!["(no data)".to_string()])],
    };

    let mut widths = vec![Constraint::Length(7)];
    widths.extend([Constraint::Length(11); 7]);
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Sampling"));
    frame.render_widget(table, layout[0]);

    let help = Paragraph::new(format!("{}  |  q quit", monitor.status))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(help, layout[1]);
}
