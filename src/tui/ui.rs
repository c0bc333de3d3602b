//! TUI UI Rendering
//!
//! Renders the console with ratatui:
//! - Header: connection, bot state, runtime clock, filter
//! - Tabs: Dashboard / Strategies / Journal / Analytics
//! - Log pane (operator log, or developer traces with `l`)
//! - Command line
//!
//! The setup prompt and the guide are drawn as modals on top.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Clear, Dataset, Gauge,
        GraphType, List, ListItem, Paragraph, Row, Table, Tabs, Wrap,
    },
    Frame,
};

use super::app::{Tab, ViewState};
use crate::api::DEFAULT_MONGO_URI;
use crate::core::{
    BotState, ConnectionState, Control, LogKind, PanelState, Speaker, Theme, FORM_FIELDS,
};

const LOG_PANE_HEIGHT: u16 = 10;

/// Colours for one theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub positive: Color,
    pub negative: Color,
    pub warn: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg: Color::Reset,
                fg: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                positive: Color::Green,
                negative: Color::Red,
                warn: Color::Yellow,
            },
            Theme::Light => Self {
                bg: Color::White,
                fg: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                positive: Color::Rgb(0, 128, 0),
                negative: Color::Rgb(178, 34, 34),
                warn: Color::Magenta,
            },
        }
    }

    fn sign(&self, value: f64) -> Color {
        if value >= 0.0 {
            self.positive
        } else {
            self.negative
        }
    }
}

/// Main draw function - renders the entire UI
pub fn draw(frame: &mut Frame, state: &ViewState) {
    let palette = Palette::for_theme(state.theme);
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
        frame.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),               // Header
            Constraint::Length(3),               // Tabs
            Constraint::Min(12),                 // Body
            Constraint::Length(LOG_PANE_HEIGHT), // Logs
            Constraint::Length(1),               // Command line
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], state, &palette);
    draw_tabs(frame, chunks[1], state, &palette);
    match state.tab {
        Tab::Dashboard => draw_dashboard(frame, chunks[2], state, &palette),
        Tab::Strategies => draw_strategies(frame, chunks[2], state, &palette),
        Tab::Journal => draw_journal(frame, chunks[2], state, &palette),
        Tab::Analytics => draw_analytics(frame, chunks[2], state, &palette),
    }
    if state.show_dev_pane {
        draw_dev_logs(frame, chunks[3], state, &palette);
    } else {
        draw_logs(frame, chunks[3], state, &palette);
    }
    draw_command_line(frame, chunks[4], state, &palette);

    if state.setup_required {
        draw_setup(frame, state, &palette);
    } else if state.guide_visible {
        draw_guide(frame, &palette);
    }
}

fn block<'a>(title: impl Into<Line<'a>>, palette: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .title(title)
}

/// Loading / error placeholder for a panel that has no data yet
fn placeholder<'a, T>(state: &PanelState<T>, palette: &Palette) -> Option<Paragraph<'a>> {
    match state {
        PanelState::Loaded(_) => None,
        PanelState::Loading => Some(Paragraph::new(Span::styled(
            "Loading...",
            Style::default().fg(palette.muted),
        ))),
        PanelState::Failed(msg) => Some(
            Paragraph::new(Span::styled(
                format!("Error: {}", msg),
                Style::default().fg(palette.negative),
            ))
            .wrap(Wrap { trim: true }),
        ),
    }
}

fn draw_header(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let (conn_text, conn_color) = match state.connection {
        ConnectionState::Connected => ("● connected", palette.positive),
        ConnectionState::Connecting => ("◌ connecting", palette.warn),
        ConnectionState::Reconnecting => ("○ disconnected", palette.negative),
    };
    let (bot_text, bot_color) = match state.bot.state {
        BotState::Running => ("RUNNING", palette.positive),
        BotState::Stopped => ("STOPPED", palette.negative),
    };
    let key_style = |enabled: bool| {
        if enabled {
            Style::default().fg(palette.accent)
        } else {
            Style::default().fg(palette.muted)
        }
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(conn_text, Style::default().fg(conn_color)),
        Span::raw("  │  Bot: "),
        Span::styled(bot_text, Style::default().fg(bot_color).add_modifier(Modifier::BOLD)),
        Span::raw("  │  Runtime: "),
        Span::styled(&state.runtime, Style::default().fg(palette.accent)),
        Span::raw("  │  Filter: "),
        Span::styled(
            state.filter.as_deref().unwrap_or("all"),
            Style::default().fg(palette.warn),
        ),
        Span::raw("  │  "),
        Span::styled("[s]tart", key_style(state.bot.start_enabled)),
        Span::raw(" "),
        Span::styled("[x]stop", key_style(state.bot.stop_enabled)),
        Span::raw(" "),
        Span::styled("[r]efresh", key_style(state.control_enabled(Control::Refresh))),
    ]))
    .block(block(" Bot Console ", palette));

    frame.render_widget(header, area);
}

fn draw_tabs(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
        .select(state.tab.index())
        .style(Style::default().fg(palette.muted))
        .highlight_style(Style::default().fg(palette.accent).add_modifier(Modifier::BOLD))
        .block(block(" Tab to switch ", palette));
    frame.render_widget(tabs, area);
}

// ============================================================================
// Dashboard
// ============================================================================

fn draw_dashboard(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(8),
            Constraint::Percentage(40),
        ])
        .split(area);
    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
        ])
        .split(rows[1]);
    let tables = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[2]);

    draw_stats(frame, rows[0], state, palette);
    draw_pnl_chart(frame, charts[0], state, palette);
    draw_profit_bars(frame, charts[1], state, palette);
    draw_bot_panel(frame, charts[2], state, palette);
    draw_trades(frame, tables[0], state, palette);
    draw_sessions(frame, tables[1], state, palette);
}

fn draw_stats(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let panel = block(" Stats ", palette);
    let stats = match (&state.stats, placeholder(&state.stats, palette)) {
        (PanelState::Loaded(stats), _) => stats,
        (_, Some(p)) => {
            frame.render_widget(p.block(panel), area);
            return;
        }
        _ => return,
    };

    let lines = vec![
        Line::from(vec![
            Span::raw("Trades: "),
            Span::styled(stats.total_trades.to_string(), Style::default().fg(palette.fg)),
            Span::raw("  │  Won: "),
            Span::styled(stats.winning_trades.to_string(), Style::default().fg(palette.positive)),
            Span::raw("  │  Lost: "),
            Span::styled(stats.losing_trades.to_string(), Style::default().fg(palette.negative)),
            Span::raw("  │  Win rate: "),
            Span::styled(format!("{:.1}%", stats.win_rate), Style::default().fg(palette.accent)),
        ]),
        Line::from(vec![
            Span::raw("Total PnL: "),
            Span::styled(
                format!("${:+.2}", stats.total_pnl),
                Style::default()
                    .fg(palette.sign(stats.total_pnl))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  │  Avg profit: "),
            Span::styled(
                format!("${:+.2}", stats.avg_profit),
                Style::default().fg(palette.sign(stats.avg_profit)),
            ),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines).block(panel), area);
}

/// Axis bounds with a little headroom; flat series get a unit band
fn bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return [0.0, 1.0];
    }
    if (hi - lo).abs() < f64::EPSILON {
        return [lo - 1.0, hi + 1.0];
    }
    let pad = (hi - lo) * 0.1;
    [lo - pad, hi + pad]
}

fn line_chart(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    points: &[(f64, f64)],
    color: Color,
    palette: &Palette,
) {
    let y = bounds(points.iter().map(|p| p.1));
    let x_max = (points.len().max(2) - 1) as f64;
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(points);
    let chart = Chart::new(vec![dataset])
        .block(block(title.to_string(), palette))
        .x_axis(Axis::default().bounds([0.0, x_max]).style(Style::default().fg(palette.muted)))
        .y_axis(
            Axis::default()
                .bounds(y)
                .style(Style::default().fg(palette.muted))
                .labels(vec![format!("{:.2}", y[0]), format!("{:.2}", y[1])]),
        );
    frame.render_widget(chart, area);
}

fn draw_pnl_chart(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let charts = match (&state.charts, placeholder(&state.charts, palette)) {
        (PanelState::Loaded(charts), _) => charts,
        (_, Some(p)) => {
            frame.render_widget(p.block(block(" Cumulative PnL ", palette)), area);
            return;
        }
        _ => return,
    };
    let points: Vec<(f64, f64)> = charts
        .pnl
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.total_pnl))
        .collect();
    let color = palette.sign(charts.pnl.last().map(|p| p.total_pnl).unwrap_or(0.0));
    line_chart(frame, area, " Cumulative PnL ", &points, color, palette);
}

fn draw_profit_bars(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let panel = block(" Profit (last 20) ", palette);
    let charts = match (&state.charts, placeholder(&state.charts, palette)) {
        (PanelState::Loaded(charts), _) => charts,
        (_, Some(p)) => {
            frame.render_widget(p.block(panel), area);
            return;
        }
        _ => return,
    };

    // Bar heights are magnitudes in cents; sign is carried by colour
    let bars: Vec<Bar> = charts
        .profit_bars
        .iter()
        .map(|bar| {
            let color = if bar.positive {
                palette.positive
            } else {
                palette.negative
            };
            Bar::default()
                .value((bar.profit.abs() * 100.0).round() as u64)
                .label(Line::from(bar.label.clone()))
                .text_value(format!("{:+.2}", bar.profit))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(palette.bg).bg(color))
        })
        .collect();
    let chart = BarChart::default()
        .block(panel)
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(1);
    frame.render_widget(chart, area);
}

fn draw_bot_panel(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let (wins, losses) = state
        .charts
        .loaded()
        .map(|c| (c.wins, c.losses))
        .unwrap_or((0, 0));
    let total = wins + losses;
    let ratio = if total == 0 {
        0.0
    } else {
        wins as f64 / total as f64
    };
    let gauge = Gauge::default()
        .block(block(" Win / Loss ", palette))
        .gauge_style(Style::default().fg(palette.positive).bg(palette.negative))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("W {} / L {}", wins, losses));
    frame.render_widget(gauge, rows[0]);

    let form = &state.form;
    let values = [
        form.strategy.clone(),
        form.symbol.clone(),
        format!("{:.2}", form.initial_stake),
        format!("{:.2}", form.target_profit),
        format!("{:.2}", form.stop_loss),
        format!("{:.2}", form.martingale_factor),
        form.duration.to_string(),
        form.duration_unit.to_string(),
        form.streak_threshold.to_string(),
        form.barrier.clone(),
        form.use_trailing_stop.to_string(),
    ];
    let value_style = if state.bot.inputs_locked {
        Style::default().fg(palette.muted)
    } else {
        Style::default().fg(palette.fg)
    };
    let lines: Vec<Line> = FORM_FIELDS
        .iter()
        .zip(values)
        .map(|(field, value)| {
            Line::from(vec![
                Span::styled(format!("{:<11}", field), Style::default().fg(palette.muted)),
                Span::styled(value, value_style),
            ])
        })
        .collect();
    let title = if state.bot.inputs_locked {
        " Start form (locked) "
    } else {
        " Start form (:set) "
    };
    frame.render_widget(Paragraph::new(lines).block(block(title, palette)), rows[1]);
}

fn draw_trades(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let trades = match (&state.trades, placeholder(&state.trades, palette)) {
        (PanelState::Loaded(trades), _) => trades,
        (_, Some(p)) => {
            frame.render_widget(p.block(block(" Trades ", palette)), area);
            return;
        }
        _ => return,
    };

    // Ascending order; the newest rows stay visible
    let fit = area.height.saturating_sub(3) as usize;
    let rows: Vec<Row> = trades
        .iter()
        .skip(trades.len().saturating_sub(fit))
        .map(|t| {
            Row::new(vec![
                Cell::from(t.timestamp.format("%H:%M:%S").to_string()),
                Cell::from(t.strategy.clone()),
                Cell::from(t.contract_type.clone()),
                Cell::from(format!("{:.2}", t.stake)),
                Cell::from(Span::styled(
                    format!("{:+.2}", t.profit),
                    Style::default().fg(palette.sign(t.profit)),
                )),
                Cell::from(Span::styled(
                    format!("{:+.2}", t.total_pnl),
                    Style::default().fg(palette.sign(t.total_pnl)),
                )),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Min(10),
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(9),
        ],
    )
    .header(
        Row::new(vec!["Time", "Strategy", "Type", "Stake", "Profit", "Total"])
            .style(Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)),
    )
    .block(block(format!(" Trades ({}) ", trades.len()), palette));
    frame.render_widget(table, area);
}

fn draw_sessions(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let sessions = match (&state.sessions, placeholder(&state.sessions, palette)) {
        (PanelState::Loaded(sessions), _) => sessions,
        (_, Some(p)) => {
            frame.render_widget(p.block(block(" Sessions ", palette)), area);
            return;
        }
        _ => return,
    };

    let rows: Vec<Row> = sessions
        .iter()
        .map(|s| {
            Row::new(vec![
                Cell::from(s.strategy.clone()),
                Cell::from(s.start_time.format("%m-%d %H:%M").to_string()),
                Cell::from(s.total_trades.to_string()),
                Cell::from(format!("{:.0}%", s.win_rate)),
                Cell::from(Span::styled(
                    format!("{:+.2}", s.total_pnl),
                    Style::default().fg(palette.sign(s.total_pnl)),
                )),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["Strategy", "Started", "Trades", "Win", "PnL"])
            .style(Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)),
    )
    .block(block(" Sessions ", palette));
    frame.render_widget(table, area);
}

// ============================================================================
// Strategies, journal, analytics
// ============================================================================

fn draw_strategies(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    let list_block = block(" Saved (:load, :delete) ", palette);
    match (&state.strategies, placeholder(&state.strategies, palette)) {
        (PanelState::Loaded(strategies), _) => {
            let items: Vec<ListItem> = strategies
                .iter()
                .map(|s| {
                    let current = state.editor.current.as_deref() == Some(s.name.as_str());
                    let style = if current {
                        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(palette.fg)
                    };
                    let mut spans = vec![Span::styled(s.name.clone(), style)];
                    if !s.tags.is_empty() {
                        spans.push(Span::styled(
                            format!(" [{}]", s.tags.join(", ")),
                            Style::default().fg(palette.muted),
                        ));
                    }
                    ListItem::new(Line::from(spans))
                })
                .collect();
            frame.render_widget(List::new(items).block(list_block), cols[0]);
        }
        (_, Some(p)) => frame.render_widget(p.block(list_block), cols[0]),
        _ => {}
    }

    let tags = if state.editor.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", state.editor.tags.join(", "))
    };
    let run_hint = if state.control_enabled(Control::RunScript) {
        ":run"
    } else {
        "running..."
    };
    let title = format!(
        " {}{} (:save, :new, :import, :export, {}) ",
        state.editor.label(),
        tags,
        run_hint
    );
    let editor = Paragraph::new(state.editor.content.as_str())
        .style(Style::default().fg(palette.fg))
        .block(block(title, palette));
    frame.render_widget(editor, cols[1]);
}

fn draw_journal(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let panel = block(" Journal (:journal title | content | tags, :unjournal id) ", palette);
    let entries = match (&state.journal, placeholder(&state.journal, palette)) {
        (PanelState::Loaded(entries), _) => entries,
        (_, Some(p)) => {
            frame.render_widget(p.block(panel), area);
            return;
        }
        _ => return,
    };

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let mut header = vec![
                Span::styled(
                    entry.created_at.format("%Y-%m-%d %H:%M ").to_string(),
                    Style::default().fg(palette.muted),
                ),
                Span::styled(
                    entry.title.clone(),
                    Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  id={}", entry.id), Style::default().fg(palette.muted)),
            ];
            if !entry.tags.is_empty() {
                header.push(Span::styled(
                    format!("  [{}]", entry.tags.join(", ")),
                    Style::default().fg(palette.warn),
                ));
            }
            ListItem::new(vec![
                Line::from(header),
                Line::from(Span::raw(format!("  {}", entry.content))),
            ])
        })
        .collect();
    frame.render_widget(List::new(items).block(panel), area);
}

fn draw_analytics(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(6)])
        .split(cols[0]);

    let report_block = block(" Trade report ", palette);
    match (&state.report, placeholder(&state.report, palette)) {
        (PanelState::Loaded(r), _) => {
            let lines = vec![
                Line::from(format!(
                    "Trades: {}   Win rate: {:.1}%   Profit factor: {:.2}",
                    r.total_trades, r.win_rate, r.profit_factor
                )),
                Line::from(vec![
                    Span::raw("Total profit: "),
                    Span::styled(
                        format!("{:+.2}", r.total_profit),
                        Style::default().fg(palette.sign(r.total_profit)),
                    ),
                ]),
                Line::from(format!("Avg win: {:.2}   Avg loss: {:.2}", r.avg_win, r.avg_loss)),
                Line::from(format!(
                    "Largest win: {:.2}   Largest loss: {:.2}",
                    r.largest_win, r.largest_loss
                )),
                Line::from(format!(
                    "Streaks: {} wins / {} losses   Avg duration: {:.0}s",
                    r.longest_streak_win, r.longest_streak_loss, r.avg_duration
                )),
            ];
            frame.render_widget(Paragraph::new(lines).block(report_block), left[0]);
        }
        (_, Some(p)) => frame.render_widget(p.block(report_block), left[0]),
        _ => {}
    }

    match (&state.cash_flow, placeholder(&state.cash_flow, palette)) {
        (PanelState::Loaded(points), _) => {
            let data: Vec<(f64, f64)> = points
                .iter()
                .enumerate()
                .map(|(i, p)| (i as f64, p.balance))
                .collect();
            line_chart(frame, left[1], " Cash flow ", &data, palette.accent, palette);
        }
        (_, Some(p)) => frame.render_widget(p.block(block(" Cash flow ", palette)), left[1]),
        _ => {}
    }

    let lines: Vec<Line> = state
        .transcript
        .iter()
        .map(|turn| match turn.speaker {
            Speaker::User => Line::from(vec![
                Span::styled("you: ", Style::default().fg(palette.accent)),
                Span::raw(turn.text.clone()),
            ]),
            Speaker::Assistant => Line::from(vec![
                Span::styled("ai:  ", Style::default().fg(palette.warn)),
                Span::raw(turn.text.clone()),
            ]),
        })
        .collect();
    let chat = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block(" Ask (:ask, :generate) ", palette));
    frame.render_widget(chat, cols[1]);
}

// ============================================================================
// Logs, command line, modals
// ============================================================================

fn draw_logs(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let items: Vec<ListItem> = state
        .logs
        .iter()
        .rev() // Most recent first
        .skip(state.log_scroll_offset)
        .take(area.height.saturating_sub(2) as usize)
        .map(|entry| {
            let color = match entry.kind {
                LogKind::Error => palette.negative,
                LogKind::Success => palette.positive,
                LogKind::System => palette.accent,
                LogKind::Info => palette.warn,
                LogKind::Log => palette.fg,
            };
            ListItem::new(Line::from(vec![
                Span::styled(&entry.time, Style::default().fg(palette.muted)),
                Span::raw(" "),
                Span::styled(entry.message.as_str(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let title = format!(" Log ({}) ↑/↓ scroll, c=clear, l=developer ", state.logs.len());
    frame.render_widget(List::new(items).block(block(title, palette)), area);
}

fn draw_dev_logs(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let items: Vec<ListItem> = state
        .dev_logs
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|entry| {
            let level_color = match entry.level.as_str() {
                "ERROR" => palette.negative,
                "WARN" => palette.warn,
                "INFO" => palette.accent,
                _ => palette.muted,
            };
            ListItem::new(Line::from(vec![
                Span::styled(&entry.timestamp, Style::default().fg(palette.muted)),
                Span::raw(" "),
                Span::styled(format!("{:5}", entry.level), Style::default().fg(level_color)),
                Span::raw(" "),
                Span::raw(&entry.message),
            ]))
        })
        .collect();

    let dropped = if state.dropped_dev_logs > 0 {
        format!(" ({} dropped)", state.dropped_dev_logs)
    } else {
        String::new()
    };
    let title = format!(" Developer traces{} l=operator log ", dropped);
    frame.render_widget(List::new(items).block(block(title, palette)), area);
}

fn draw_command_line(frame: &mut Frame, area: Rect, state: &ViewState, palette: &Palette) {
    let line = if let Some(buffer) = &state.command {
        Line::from(vec![
            Span::styled(":", Style::default().fg(palette.accent)),
            Span::raw(buffer.as_str()),
            Span::styled("█", Style::default().fg(palette.muted)),
        ])
    } else if let Some(err) = &state.command_error {
        Line::from(Span::styled(err.as_str(), Style::default().fg(palette.negative)))
    } else {
        Line::from(Span::styled(
            "q quit  s start  x stop  r refresh  f filter  c clear  t theme  l dev  Tab view  : command",
            Style::default().fg(palette.muted),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Centered rect using up percentage of the available rect
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn draw_setup(frame: &mut Frame, state: &ViewState, palette: &Palette) {
    let area = centered_rect(60, 40, frame.area());
    let saving = !state.control_enabled(Control::SaveSetup);
    let lines = vec![
        Line::from(Span::styled(
            "Welcome! The bot server has no API token yet.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Type  :setup <api_token> [mongo_uri]  and press Enter."),
        Line::from(format!(
            "Mongo URI defaults to {} when omitted.",
            DEFAULT_MONGO_URI
        )),
        Line::from(""),
        Line::from(Span::styled(
            if saving { "Saving..." } else { "Other actions are blocked until setup completes." },
            Style::default().fg(palette.warn),
        )),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(palette.bg).fg(palette.fg))
            .block(block(" Initial setup ", palette)),
        area,
    );
}

fn draw_guide(frame: &mut Frame, palette: &Palette) {
    let area = centered_rect(70, 60, frame.area());
    let lines = vec![
        Line::from(Span::styled(
            "Getting started",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("1. Pick a strategy and parameters:  :set strategy even_odd,  :set stake 2"),
        Line::from("2. Press s to start the bot, x to stop it."),
        Line::from("3. Watch stats, charts and trades on the Dashboard; r refreshes, f filters."),
        Line::from("4. Write custom scripts on the Strategies tab; :run starts the editor script."),
        Line::from("5. Keep notes with :journal and ask questions with :ask on Analytics."),
        Line::from(""),
        Line::from(Span::styled(
            "Enter or Esc to close. :guide shows this again.",
            Style::default().fg(palette.muted),
        )),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(palette.bg).fg(palette.fg))
            .block(block(" Guide ", palette)),
        area,
    );
}
