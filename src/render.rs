//! Forecast table renderer.
//!
//! [`forecast_view`] maps a [`ForecastResult`] to what should be on screen and
//! does nothing else; [`render_forecast`] turns that into ratatui widgets.

use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use serde_json::Value;

use crate::forecast::ForecastResult;

pub const MISSING: &str = "--";
pub const PROMPT: &str = "Please enter a location";
pub const INCOMPLETE: &str = "Weather data is incomplete";
pub const MAX_DAYS: usize = 7;
pub const HEADERS: [&str; 4] = [
    "Day",
    "Day Temperature (°C)",
    "Night Temperature (°C)",
    "Humidity(%)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    Default,
    /// After a failed search. Same text, blinking.
    Blink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRow {
    pub day: String,
    pub day_temp: String,
    pub night_temp: String,
    pub humidity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastView {
    Prompt(PromptStyle),
    Incomplete,
    Table(Vec<ForecastRow>),
}

pub fn forecast_view(result: &ForecastResult) -> ForecastView {
    let forecast = match result {
        ForecastResult::Empty => return ForecastView::Prompt(PromptStyle::Default),
        ForecastResult::Error => return ForecastView::Prompt(PromptStyle::Blink),
        ForecastResult::Data(forecast) => forecast,
    };

    let record = forecast.primary();
    let (Some(days), Some(nights)) = (&record.days_day, &record.days_night) else {
        return ForecastView::Incomplete;
    };

    let rows = days
        .iter()
        .take(MAX_DAYS)
        .enumerate()
        .map(|(i, day_temp)| ForecastRow {
            day: format!("Day {}", i + 1),
            day_temp: reading(day_temp, "°C"),
            night_temp: positional(Some(nights.as_slice()), i, "°C"),
            humidity: positional(record.humidity.as_deref(), i, ""),
        })
        .collect();

    ForecastView::Table(rows)
}

fn positional(values: Option<&[Value]>, i: usize, unit: &str) -> String {
    match values.and_then(|v| v.get(i)) {
        Some(v) => reading(v, unit),
        None => MISSING.to_string(),
    }
}

/// One cell. Numbers print as received (`20`, `20.5`); `null` is a gap.
fn reading(value: &Value, unit: &str) -> String {
    match value {
        Value::Number(n) => format!("{n}{unit}"),
        Value::String(s) => format!("{s}{unit}"),
        _ => MISSING.to_string(),
    }
}

fn forecast_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            " Forecast ",
            Style::default().fg(Color::Yellow),
        ))
        .title_alignment(Alignment::Left)
        .border_style(Style::default().fg(Color::Cyan))
        .border_type(BorderType::Rounded)
}

fn forecast_table(rows: &[ForecastRow]) -> Table<'static> {
    let header = Row::new(HEADERS.iter().map(|h| Cell::from(*h))).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.day.clone()),
                Cell::from(row.day_temp.clone()).style(Style::default().fg(Color::Green)),
                Cell::from(row.night_temp.clone()).style(Style::default().fg(Color::Green)),
                Cell::from(row.humidity.clone()).style(Style::default().fg(Color::Green)),
            ])
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(22),
            Constraint::Length(24),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(forecast_block())
}

pub fn render_forecast(f: &mut Frame, area: Rect, view: &ForecastView) {
    match view {
        ForecastView::Table(rows) => f.render_widget(forecast_table(rows), area),
        ForecastView::Prompt(style) => {
            let mut text = Style::default().fg(Color::Gray);
            if *style == PromptStyle::Blink {
                text = text.add_modifier(Modifier::SLOW_BLINK);
            }
            let prompt = Paragraph::new(Span::styled(PROMPT, text)).block(forecast_block());
            f.render_widget(prompt, area);
        }
        ForecastView::Incomplete => {
            f.render_widget(Paragraph::new(INCOMPLETE).block(forecast_block()), area);
        }
    }
}
