//! Ratatui rendering for every SATCHEL view.

use ratatui::prelude::*;
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Gauge, List, ListItem, Paragraph, Row, Table, TableState, Wrap,
};

use crate::api::types::{short_timestamp, DocumentStatus};
use crate::ask::{bar_percent, max_step_ms};
use crate::tui::state::{AskFocus, LoginField, NoticeKind, UploadField, View};
use crate::tui::App;

// ============= THEME SYSTEM =============
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

pub struct ThemeColors {
    pub bg: Color,
    pub fg: Color,
    pub teal: Color,
    pub highlight: Color,
    pub dim: Color,
    pub error: Color,
    pub yellow: Color,
    pub green: Color,
    pub blue: Color,
    pub chrome: Color,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        if name == "light" {
            Theme::Light
        } else {
            Theme::Dark
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn colors(self) -> ThemeColors {
        match self {
            Theme::Dark => ThemeColors {
                bg: Color::Rgb(10, 15, 20),
                fg: Color::Rgb(220, 225, 230),
                teal: Color::Rgb(26, 188, 156),
                highlight: Color::Rgb(22, 160, 133),
                dim: Color::Rgb(110, 125, 125),
                error: Color::Rgb(255, 80, 80),
                yellow: Color::Rgb(255, 200, 0),
                green: Color::Rgb(46, 204, 113),
                blue: Color::Rgb(52, 152, 219),
                chrome: Color::Rgb(82, 86, 89),
            },
            Theme::Light => ThemeColors {
                bg: Color::Rgb(250, 250, 250),
                fg: Color::Rgb(40, 40, 40),
                teal: Color::Rgb(0, 128, 128),
                highlight: Color::Rgb(0, 150, 150),
                dim: Color::Rgb(150, 150, 150),
                error: Color::Rgb(200, 0, 0),
                yellow: Color::Rgb(180, 140, 0),
                green: Color::Rgb(0, 150, 0),
                blue: Color::Rgb(0, 100, 200),
                chrome: Color::Rgb(200, 200, 200),
            },
        }
    }
}

fn status_style(status: DocumentStatus, colors: &ThemeColors) -> Style {
    let color = match status {
        DocumentStatus::Uploaded => colors.dim,
        DocumentStatus::Indexing => colors.yellow,
        DocumentStatus::Indexed => colors.green,
        DocumentStatus::Failed => colors.error,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn notice_style(kind: NoticeKind, colors: &ThemeColors) -> Style {
    let color = match kind {
        NoticeKind::Info => colors.blue,
        NoticeKind::Success => colors.green,
        NoticeKind::Error => colors.error,
    };
    Style::default().fg(color)
}

pub fn draw(frame: &mut Frame, app: &App) {
    let colors = app.theme.colors();
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg).fg(colors.fg)),
        frame.size(),
    );

    match app.view {
        View::Login => draw_login(frame, app, &colors),
        View::Dashboard => draw_dashboard(frame, app, &colors),
        View::Detail => draw_detail(frame, app, &colors),
        View::Ask => draw_ask(frame, app, &colors),
    }

    if app.upload.is_some() {
        draw_upload_modal(frame, app, &colors);
    }
    if app.confirm.is_some() {
        draw_confirm_modal(frame, app, &colors);
    }
}

fn chrome_layout(frame: &Frame) -> (Rect, Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.size());
    (chunks[0], chunks[1], chunks[2], chunks[3])
}

fn draw_header(frame: &mut Frame, app: &App, colors: &ThemeColors, area: Rect) {
    let user = if app.session.username.is_empty() {
        "not signed in".to_string()
    } else {
        app.session.username.clone()
    };
    let header = Line::from(vec![
        Span::styled(
            " 🎒 SATCHEL ",
            Style::default()
                .fg(colors.teal)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("· knowledge base ", Style::default().fg(colors.dim)),
        Span::styled(format!("· {} ", user), Style::default().fg(colors.blue)),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn draw_notices(frame: &mut Frame, app: &App, colors: &ThemeColors, area: Rect) {
    let lines: Vec<Line> = app
        .notices
        .iter()
        .map(|notice| {
            Line::from(Span::styled(
                format!(" {}", notice.text),
                notice_style(notice.kind, colors),
            ))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_footer(frame: &mut Frame, colors: &ThemeColors, area: Rect, text: &str) {
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(colors.chrome))),
        area,
    );
}

fn draw_login(frame: &mut Frame, app: &App, colors: &ThemeColors) {
    let area = centered_rect(50, 11, frame.size());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.chrome))
        .title(" Sign in to SATCHEL ");
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(1),
        ])
        .split(area);

    let field_style = |field: LoginField| {
        if app.login.focused() == field {
            Style::default().fg(colors.highlight).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.dim)
        }
    };

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Username: ", field_style(LoginField::Username)),
            Span::raw(app.login.username.clone()),
        ])),
        inner[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Password: ", field_style(LoginField::Password)),
            Span::raw("*".repeat(app.login.password.chars().count())),
        ])),
        inner[1],
    );

    let status = if app.login.busy {
        Line::from(Span::styled("Signing in…", Style::default().fg(colors.blue)))
    } else if let Some(error) = &app.login.error {
        Line::from(Span::styled(error.clone(), Style::default().fg(colors.error)))
    } else {
        Line::from(Span::styled(
            "Token auth via /api/token/",
            Style::default().fg(colors.dim),
        ))
    };
    frame.render_widget(Paragraph::new(status), inner[2]);
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Tab switch field · Enter sign in · Esc quit",
            Style::default().fg(colors.chrome),
        )),
        inner[3],
    );
}

fn draw_dashboard(frame: &mut Frame, app: &App, colors: &ThemeColors) {
    let (header, notices, body, footer) = chrome_layout(frame);
    draw_header(frame, app, colors, header);
    draw_notices(frame, app, colors, notices);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(3)])
        .split(body);

    let counts = app.docs.counts();
    let summary = Line::from(vec![
        Span::styled(
            format!(" {} documents ", counts.total),
            Style::default().fg(colors.fg).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("· {} indexed ", counts.indexed),
            Style::default().fg(colors.green),
        ),
        Span::styled(
            format!("· {} indexing ", counts.indexing),
            Style::default().fg(colors.yellow),
        ),
        Span::styled(
            format!("· {} failed", counts.failed),
            Style::default().fg(colors.error),
        ),
    ]);
    frame.render_widget(Paragraph::new(summary), chunks[0]);

    if app.docs.docs.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                " No documents yet. Press u to upload one.",
                Style::default().fg(colors.dim),
            ))
            .block(Block::default().borders(Borders::ALL).title(" Documents ")),
            chunks[1],
        );
    } else {
        draw_document_table(frame, app, colors, chunks[1]);
    }

    draw_footer(
        frame,
        colors,
        footer,
        " ↑/↓ select · Enter detail · u upload · i index · d delete · a ask · r refresh · t theme · L logout · q quit",
    );
}

fn draw_document_table(frame: &mut Frame, app: &App, colors: &ThemeColors, area: Rect) {
    let rows: Vec<Row> = app
        .docs
        .docs
        .iter()
        .map(|doc| {
            let status_text = if app.is_watching(doc.id) {
                format!("{} ⟳", doc.status.label())
            } else {
                doc.status.label().to_string()
            };
            Row::new(vec![
                Cell::from(doc.title.clone()),
                Cell::from(status_text).style(status_style(doc.status, colors)),
                Cell::from(doc.chunks_count.to_string()),
                Cell::from(
                    doc.last_indexed_at
                        .as_deref()
                        .map(short_timestamp)
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(45),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(18),
        ],
    )
    .header(
        Row::new(vec!["Title", "Status", "Chunks", "Last indexed"])
            .style(Style::default().fg(colors.teal).add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(" Documents "))
    .highlight_style(
        Style::default()
            .bg(colors.highlight)
            .fg(colors.bg)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = TableState::default();
    state.select(Some(app.docs.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_detail(frame: &mut Frame, app: &App, colors: &ThemeColors) {
    let (header, notices, body, footer) = chrome_layout(frame);
    draw_header(frame, app, colors, header);
    draw_notices(frame, app, colors, notices);

    let Some(detail) = &app.detail else {
        return;
    };

    let lines: Vec<Line> = match &detail.doc {
        Some(doc) => vec![
            Line::from(Span::styled(
                format!(" {}", doc.title),
                Style::default().fg(colors.fg).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            detail_row("Status", doc.status.label(), status_style(doc.status, colors)),
            detail_row(
                "Chunks",
                &doc.chunks_count.to_string(),
                Style::default().fg(colors.fg),
            ),
            detail_row(
                "Uploaded",
                &doc
                    .created_at
                    .as_deref()
                    .map(short_timestamp)
                    .unwrap_or_else(|| "-".to_string()),
                Style::default().fg(colors.fg),
            ),
            detail_row(
                "Last indexed",
                &doc
                    .last_indexed_at
                    .as_deref()
                    .map(short_timestamp)
                    .unwrap_or_else(|| "-".to_string()),
                Style::default().fg(colors.fg),
            ),
            detail_row("File", doc.file_label(), Style::default().fg(colors.fg)),
            match &doc.error_message {
                Some(message) => detail_row("Error", message, Style::default().fg(colors.error)),
                None => Line::default(),
            },
        ],
        None => vec![Line::from(Span::styled(
            " Document unavailable.",
            Style::default().fg(colors.dim),
        ))],
    };

    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Document "))
            .wrap(Wrap { trim: false }),
        body,
    );

    draw_footer(
        frame,
        colors,
        footer,
        " i index · d delete · r refresh · a ask · Esc back · q quit",
    );
}

fn detail_row<'a>(label: &'a str, value: &str, value_style: Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {:<14}", label), Style::default().add_modifier(Modifier::DIM)),
        Span::styled(value.to_string(), value_style),
    ])
}

fn draw_ask(frame: &mut Frame, app: &App, colors: &ThemeColors) {
    let (header, notices, body, footer) = chrome_layout(frame);
    draw_header(frame, app, colors, header);
    draw_notices(frame, app, colors, notices);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(body);

    draw_ask_form(frame, app, colors, columns[0]);
    draw_ask_answer(frame, app, colors, columns[1]);

    draw_footer(
        frame,
        colors,
        footer,
        " Tab next field · Space toggle · 1-9 expand source · Enter ask · Esc back",
    );
}

fn draw_ask_form(frame: &mut Frame, app: &App, colors: &ThemeColors, area: Rect) {
    let focus_style = |focus: AskFocus| {
        if app.ask.focus == focus {
            Style::default().fg(colors.highlight).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.dim)
        }
    };
    let check = |on: bool| if on { "[x]" } else { "[ ]" };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(2),
        ])
        .split(area);

    frame.render_widget(
        Block::default().borders(Borders::ALL).title(" Ask "),
        area,
    );

    frame.render_widget(
        Paragraph::new(app.ask.question.clone())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(focus_style(AskFocus::Question))
                    .title("Question"),
            )
            .wrap(Wrap { trim: false }),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("TopK: ", focus_style(AskFocus::TopK)),
            Span::raw(if app.ask.top_k_input.is_empty() {
                "6 (default)".to_string()
            } else {
                app.ask.top_k_input.clone()
            }),
        ])),
        chunks[1],
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!("{} Search all indexed documents", check(app.ask.search_all)),
                focus_style(AskFocus::SearchAll),
            ),
        ])),
        chunks[2],
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![Span::styled(
            format!("{} Show answer trace", check(app.ask.explain)),
            focus_style(AskFocus::Explain),
        )])),
        chunks[3],
    );

    let items: Vec<ListItem> = if app.ask.picker.is_empty() {
        vec![ListItem::new(Span::styled(
            "No indexed documents yet.",
            Style::default().fg(colors.dim),
        ))]
    } else {
        app.ask
            .picker
            .iter()
            .map(|item| {
                let style = if app.ask.search_all {
                    Style::default().fg(colors.chrome)
                } else {
                    Style::default().fg(colors.fg)
                };
                ListItem::new(Span::styled(
                    format!("{} {} (#{})", check(item.checked), item.title, item.id),
                    style,
                ))
            })
            .collect()
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_style(AskFocus::Picker))
                .title("Documents"),
        )
        .highlight_style(Style::default().bg(colors.highlight).fg(colors.bg));
    let mut list_state = ratatui::widgets::ListState::default();
    if app.ask.focus == AskFocus::Picker && !app.ask.picker.is_empty() {
        list_state.select(Some(app.ask.picker_index));
    }
    frame.render_stateful_widget(list, chunks[4], &mut list_state);
}

fn draw_ask_answer(frame: &mut Frame, app: &App, colors: &ThemeColors, area: Rect) {
    let Some(response) = &app.ask.response else {
        let text = if app.ask.busy {
            "Thinking…"
        } else {
            "Answers are grounded strictly in your indexed documents."
        };
        frame.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(colors.dim)))
                .block(Block::default().borders(Borders::ALL).title(" Answer ")),
            area,
        );
        return;
    };

    let trace_height = response
        .trace
        .as_ref()
        .map(|trace| (trace.steps.len() as u16 * 2).saturating_add(2))
        .unwrap_or(0);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),
            Constraint::Length(if response.sources.is_empty() { 0 } else { 8 }),
            Constraint::Length(trace_height),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(response.answer.clone())
            .block(Block::default().borders(Borders::ALL).title(" Answer "))
            .wrap(Wrap { trim: false }),
        chunks[0],
    );

    if !response.sources.is_empty() {
        let width = chunks[1].width.saturating_sub(6) as usize;
        let mut items: Vec<ListItem> = Vec::new();
        for (index, source) in response.sources.iter().enumerate() {
            let title = source.doc_title.as_deref().unwrap_or("Untitled");
            let mut lines = vec![Line::from(Span::styled(
                format!(
                    "[{}] {} · chunk {} · score {:.2}",
                    source.citation, title, source.chunk_index, source.score
                ),
                Style::default().fg(colors.teal),
            ))];
            if app.ask.expanded_sources.contains(&index) {
                let text = source.text.as_deref().unwrap_or("");
                for wrapped in textwrap::wrap(text, width.max(20)) {
                    lines.push(Line::from(Span::styled(
                        format!("    {}", wrapped),
                        Style::default().fg(colors.fg),
                    )));
                }
            }
            items.push(ListItem::new(lines));
        }
        frame.render_widget(
            List::new(items).block(Block::default().borders(Borders::ALL).title(" Sources ")),
            chunks[1],
        );
    }

    if let Some(trace) = &response.trace {
        let block = Block::default().borders(Borders::ALL).title(format!(
            " Answer Trace · total {} ms · hits {} · top_k {} ",
            trace.total_ms, trace.hits, trace.top_k
        ));
        let inner = block.inner(chunks[2]);
        frame.render_widget(block, chunks[2]);

        let max_ms = max_step_ms(trace);
        let mut y = inner.y;
        for step in &trace.steps {
            if y + 2 > inner.y + inner.height {
                break;
            }
            let label_area = Rect::new(inner.x, y, inner.width, 1);
            let gauge_area = Rect::new(inner.x, y + 1, inner.width, 1);
            let detail = step.detail.as_deref().unwrap_or("");
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(
                        step.name.clone(),
                        Style::default().fg(colors.fg).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!("  {}", detail), Style::default().fg(colors.dim)),
                    Span::styled(
                        format!("  {} ms", step.ms),
                        Style::default().fg(colors.blue),
                    ),
                ])),
                label_area,
            );
            frame.render_widget(
                Gauge::default()
                    .gauge_style(Style::default().fg(colors.teal).bg(colors.chrome))
                    .percent(bar_percent(step.ms, max_ms))
                    .label(""),
                gauge_area,
            );
            y += 2;
        }
    }
}

fn draw_upload_modal(frame: &mut Frame, app: &App, colors: &ThemeColors) {
    let Some(form) = &app.upload else {
        return;
    };
    let area = centered_rect(60, 10, frame.size());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.teal))
        .title(" Upload Document ");
    frame.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(1),
        ])
        .split(area);

    let field_style = |field: UploadField| {
        if form.focus == field {
            Style::default().fg(colors.highlight).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.dim)
        }
    };

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Title: ", field_style(UploadField::Title)),
            Span::raw(form.title.clone()),
        ])),
        inner[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("File:  ", field_style(UploadField::Path)),
            Span::raw(form.path.clone()),
        ])),
        inner[1],
    );

    let status = if form.busy {
        Line::from(Span::styled("Uploading…", Style::default().fg(colors.blue)))
    } else if let Some(error) = &form.error {
        Line::from(Span::styled(error.clone(), Style::default().fg(colors.error)))
    } else {
        Line::from(Span::styled(
            "Supported: PDF, TXT, MD. Index after upload for retrieval.",
            Style::default().fg(colors.dim),
        ))
    };
    frame.render_widget(Paragraph::new(status), inner[2]);
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Tab switch field · Enter upload · Esc cancel",
            Style::default().fg(colors.chrome),
        )),
        inner[3],
    );
}

fn draw_confirm_modal(frame: &mut Frame, app: &App, colors: &ThemeColors) {
    let Some(confirm) = &app.confirm else {
        return;
    };
    let area = centered_rect(56, 7, frame.size());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.error))
        .title(" Delete Document ");
    frame.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(3), Constraint::Length(1)])
        .split(area);

    frame.render_widget(
        Paragraph::new(format!(
            "Delete \"{}\" and its indexed chunks?",
            confirm.title
        ))
        .wrap(Wrap { trim: false }),
        inner[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            "y delete · n cancel",
            Style::default().fg(colors.chrome),
        )),
        inner[1],
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
