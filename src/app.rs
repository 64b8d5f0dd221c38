use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::time::Duration;
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame, Terminal,
};

use crate::client::WeatherBackend;
use crate::controller::{Controller, Notice, ViewState};
use crate::render::{forecast_view, render_forecast};

const TITLE: &str = " Weather Checker ";
const HELP: &str = " Enter search | Ctrl-S store | Ctrl-D download image | Esc quit";
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run_app<B: Backend, W: WeatherBackend + 'static>(
    terminal: &mut Terminal<B>,
    controller: &mut Controller<W>,
) -> io::Result<()> {
    loop {
        controller.apply_pending();
        terminal.draw(|f| ui(f, controller.state()))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && handle_key(controller, key) == Flow::Quit {
                return Ok(());
            }
        }
    }
}

fn handle_key<W: WeatherBackend + 'static>(controller: &mut Controller<W>, key: KeyEvent) -> Flow {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return Flow::Quit,
        KeyCode::Char('c') if ctrl => return Flow::Quit,
        _ => {}
    }

    controller.dismiss_notice();
    match key.code {
        KeyCode::Enter => {
            controller.search();
        }
        KeyCode::Char('s') if ctrl => {
            controller.store_current_forecast();
        }
        KeyCode::Char('d') if ctrl => {
            controller.download_static_image();
        }
        KeyCode::Backspace => {
            let mut query = controller.state().query().to_string();
            query.pop();
            controller.set_query(query);
        }
        KeyCode::Char(c) if !ctrl => {
            let mut query = controller.state().query().to_string();
            query.push(c);
            controller.set_query(query);
        }
        _ => {}
    }
    Flow::Continue
}

fn display_headline(state: &ViewState) -> Paragraph<'static> {
    let location = state.location().unwrap_or_default();
    Paragraph::new(vec![
        Line::from(vec![
            Span::raw(format!(" {:9}", "City:")),
            Span::styled(location.city, Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:9}", "Country:")),
            Span::styled(location.country, Style::default().fg(Color::Green)),
        ]),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                TITLE,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_alignment(Alignment::Left)
            .border_style(Style::default().fg(Color::Cyan))
            .border_type(BorderType::Rounded),
    )
}

fn display_query(query: &str) -> Paragraph<'_> {
    let text = if query.is_empty() {
        Span::styled("Enter city name", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(query)
    };
    Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" City ", Style::default().fg(Color::Yellow)))
            .border_style(Style::default().fg(Color::Cyan))
            .border_type(BorderType::Rounded),
    )
}

fn display_status(notice: Option<&Notice>) -> Paragraph<'static> {
    let line = match notice {
        Some(Notice::Info(text)) => Span::styled(format!(" {text}"), Style::default().fg(Color::Green)),
        Some(Notice::Failure(text)) => Span::styled(
            format!(" {text}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled(HELP, Style::default().fg(Color::DarkGray)),
    };
    Paragraph::new(line)
}

fn ui(f: &mut Frame, state: &ViewState) {
    let vert_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(f.area());

    f.render_widget(display_headline(state), vert_layout[0]);

    let input: Rect = vert_layout[1];
    f.render_widget(display_query(state.query()), input);
    let typed = u16::try_from(state.query().chars().count()).unwrap_or(u16::MAX);
    let cursor_x = input.x + 1 + typed.min(input.width.saturating_sub(2));
    f.set_cursor_position((cursor_x, input.y + 1));

    render_forecast(f, vert_layout[2], &forecast_view(state.forecast()));
    f.render_widget(display_status(state.notice()), vert_layout[3]);
}
