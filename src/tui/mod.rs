// src/tui/mod.rs
use crate::core::orchestrator::Orchestrator;
use crate::types::{
    ControlCommand, Controls, IndicatorSnapshot, MarketSnapshot, Side, TradeOrigin, UiEvent,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Terminal,
};
use std::{io, sync::Arc, time::Duration};
use tokio::sync::mpsc;

const MAX_LINES: usize = 20;

/// What a key press asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Trade(Side),
    Control(ControlCommand),
    DismissAlert,
    Quit,
}

pub struct App {
    pub symbol: String,
    pub controls: Controls,
    pub market: Arc<Vec<MarketSnapshot>>,
    pub indicators: Arc<Vec<IndicatorSnapshot>>,
    pub commentary: String,
    pub trades: Vec<String>,
    pub logs: Vec<String>,
    pub alert: Option<String>,
    pub audio_live: bool,
}

fn push_capped(lines: &mut Vec<String>, line: String) {
    lines.push(line);
    if lines.len() > MAX_LINES {
        lines.remove(0);
    }
}

impl App {
    pub fn new(symbol: String, controls: Controls) -> Self {
        Self {
            symbol,
            controls,
            market: Arc::default(),
            indicators: Arc::default(),
            commentary: "Loading market insights...".to_string(),
            trades: Vec::new(),
            logs: Vec::new(),
            alert: None,
            audio_live: false,
        }
    }

    pub fn on_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::MarketUpdate(series) => self.market = series,
            UiEvent::IndicatorUpdate(series) => self.indicators = series,
            UiEvent::Commentary(text) => self.commentary = text,
            UiEvent::ControlsChanged(controls) => self.controls = controls,
            UiEvent::TradeExecuted {
                side,
                origin,
                result,
            } => {
                let origin = match origin {
                    TradeOrigin::Manual => "manual",
                    TradeOrigin::Automatic => "auto",
                };
                let time = chrono::Local::now().format("%H:%M:%S");
                push_capped(
                    &mut self.trades,
                    format!("{} {} ({}) -> {}", time, side, origin, result),
                );
            }
            UiEvent::Alert(msg) => {
                push_capped(&mut self.logs, format!("ALERT: {}", msg));
                self.alert = Some(msg);
            }
            UiEvent::Log(msg) => push_capped(&mut self.logs, msg),
        }
    }

    /// While an alert is shown only the dismiss keys are accepted.
    pub fn on_key(&self, code: KeyCode) -> Option<Action> {
        if self.alert.is_some() {
            return match code {
                KeyCode::Enter | KeyCode::Esc => Some(Action::DismissAlert),
                _ => None,
            };
        }
        match code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('b') => Some(Action::Trade(Side::Buy)),
            KeyCode::Char('s') => Some(Action::Trade(Side::Sell)),
            KeyCode::Char('a') => Some(Action::Control(ControlCommand::SetAutoTrade(
                !self.controls.auto_trade_enabled,
            ))),
            KeyCode::Char('p') => Some(Action::Control(ControlCommand::SetAudioContinuous(
                !self.controls.audio_continuous_enabled,
            ))),
            KeyCode::Char('l') => Some(Action::Control(ControlCommand::SetLanguage(
                self.controls.language.next(),
            ))),
            _ => None,
        }
    }
}

pub async fn run(mut rx: mpsc::Receiver<UiEvent>, orchestrator: &mut Orchestrator) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(orchestrator.symbol().to_string(), orchestrator.controls());

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    match app.on_key(key.code) {
                        Some(Action::Quit) => break,
                        Some(Action::DismissAlert) => app.alert = None,
                        Some(Action::Trade(side)) => {
                            // Result is reported back through the UI channel.
                            drop(orchestrator.manual_trade(side));
                        }
                        Some(Action::Control(command)) => orchestrator.apply(command),
                        None => {}
                    }
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            app.on_event(event);
        }
        app.audio_live = orchestrator.audio_is_live();
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

fn on_off(flag: bool) -> Span<'static> {
    if flag {
        Span::styled("ON", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("OFF", Style::default().fg(Color::DarkGray))
    }
}

fn reading(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "--".to_string())
}

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(4),
                Constraint::Length(6),
                Constraint::Min(6),
                Constraint::Length(10),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.size());

    let price_text = match app.market.last() {
        Some(bar) => {
            let at = bar
                .timestamp()
                .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
                .unwrap_or_default();
            let range = match (bar.open, bar.high, bar.low) {
                (Some(o), Some(h), Some(l)) => format!(" (O {:.2} H {:.2} L {:.2})", o, h, l),
                _ => String::new(),
            };
            let volume = bar.volume.map(|v| format!(" V {}", v)).unwrap_or_default();
            format!("${:.2}{}{} @ {}", bar.close, range, volume, at)
        }
        None => "Waiting for data...".to_string(),
    };
    let indicator_text = match app.indicators.last() {
        Some(ind) => format!(
            "SMA 20 {} | RSI 14 {} | MACD {}",
            reading(ind.sma_20, 2),
            reading(ind.rsi_14, 2),
            reading(ind.macd, 4)
        ),
        None => "Indicators pending...".to_string(),
    };

    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!("AI Mastermind [{}]", app.symbol),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" | Price: "),
            Span::styled(
                price_text,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" | "),
            Span::raw(indicator_text),
        ]),
        Line::from(vec![
            Span::raw("Auto trade: "),
            on_off(app.controls.auto_trade_enabled),
            Span::raw(" | Commentary audio: "),
            on_off(app.controls.audio_continuous_enabled),
            Span::raw(if app.audio_live { " (playing)" } else { "" }),
            Span::raw(format!(" | Language: {}", app.controls.language.label())),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(header, chunks[0]);

    let commentary = Paragraph::new(app.commentary.as_str())
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Commentary"));
    f.render_widget(commentary, chunks[1]);

    let trades: Vec<ListItem> = app
        .trades
        .iter()
        .rev()
        .map(|s| {
            ListItem::new(Line::from(Span::styled(
                s.as_str(),
                Style::default().fg(Color::Green),
            )))
        })
        .collect();
    let trades_list =
        List::new(trades).block(Block::default().borders(Borders::ALL).title("Trades"));
    f.render_widget(trades_list, chunks[2]);

    let logs: Vec<ListItem> = app
        .logs
        .iter()
        .rev()
        .map(|s| ListItem::new(Line::from(Span::raw(s.as_str()))))
        .collect();
    let logs_list =
        List::new(logs).block(Block::default().borders(Borders::ALL).title("System Logs"));
    f.render_widget(logs_list, chunks[3]);

    let help = Paragraph::new(
        "[b] BUY  [s] SELL  [a] auto trade  [p] commentary audio  [l] language  [q] quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[4]);

    if let Some(alert) = &app.alert {
        let area = centered(f.size(), 60, 5);
        let popup = Paragraph::new(vec![
            Line::from(alert.as_str()),
            Line::from(Span::styled(
                "Press Enter to dismiss",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Alert")
                .style(Style::default().fg(Color::Red)),
        );
        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
