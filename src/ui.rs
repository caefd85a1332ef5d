use crate::app::App;
use crate::constants::{FOOTER_HEIGHT, HEADER_HEIGHT, LINK_BAR_HEIGHT, PREVIEW_HEIGHT, STATUS_HEIGHT};
use crate::models::{Preview, Theme};
use crate::session::{Phase, Session};

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn ui(f: &mut Frame, app: &App) {
    let session = &app.session;
    let theme = app.theme;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(HEADER_HEIGHT),   // Title + theme switch
                Constraint::Length(LINK_BAR_HEIGHT), // Link input
                Constraint::Min(0),                  // Preview / progress
                Constraint::Length(STATUS_HEIGHT),   // Status message
                Constraint::Length(FOOTER_HEIGHT),   // Key help
            ]
            .as_ref(),
        )
        .split(f.area());

    render_header(f, theme, chunks[0]);
    render_link_bar(f, session, theme, chunks[1]);

    f.render_widget(Clear, chunks[2]);
    if let Some(preview) = &session.preview {
        let preview_area = Rect {
            height: chunks[2].height.min(PREVIEW_HEIGHT),
            ..chunks[2]
        };
        render_preview(f, session, preview, theme, preview_area);

        let rest = Rect {
            y: preview_area.y + preview_area.height,
            height: chunks[2].height - preview_area.height,
            ..chunks[2]
        };
        render_progress(f, session, theme, rest);
    } else {
        render_progress(f, session, theme, chunks[2]);
    }

    render_status(f, session, theme, chunks[3]);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            " Enter: search/download  Ctrl+D: download  Ctrl+V: paste  Ctrl+U: clear  Ctrl+T: theme  Esc: quit ",
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!(" → {}", app.output_dir.display()),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    f.render_widget(footer, chunks[4]);
}

fn render_header(f: &mut Frame, theme: Theme, area: Rect) {
    let label_style = |active: bool| {
        if active {
            Style::default()
                .fg(theme.accent())
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let switch = Line::from(vec![
        Span::styled("Pink", label_style(!theme.is_checked())),
        Span::raw(if theme.is_checked() { " [ •] " } else { " [• ] " }),
        Span::styled("Blue", label_style(theme.is_checked())),
        Span::raw(" "),
    ])
    .alignment(Alignment::Right);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent()))
        .title(Span::styled(
            format!(" {} ", theme.title()),
            Style::default()
                .fg(theme.accent())
                .add_modifier(Modifier::BOLD),
        ));

    f.render_widget(Paragraph::new(switch).block(block), area);
}

fn render_link_bar(f: &mut Frame, session: &Session, theme: Theme, area: Rect) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent()))
        .title(" YouTube link ");

    if session.search_visible {
        let (label, style) = if session.can_search() {
            (" [ Enter: Search ] ", Style::default().fg(theme.highlight()).add_modifier(Modifier::BOLD))
        } else {
            (" [ Searching... ] ", Style::default().fg(Color::DarkGray))
        };
        block = block.title(Line::from(Span::styled(label, style)).alignment(Alignment::Right));
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let visible = tail_to_width(&session.link, inner_width.saturating_sub(1));
    let cursor_x = area.x + 1 + visible.width() as u16;

    f.render_widget(Paragraph::new(visible).block(block), area);
    f.set_cursor_position(Position::new(cursor_x, area.y + 1));
}

fn render_preview(f: &mut Frame, session: &Session, preview: &Preview, theme: Theme, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    let thumbnail = if preview.thumbnail_url.is_empty() {
        String::from("(no preview)")
    } else {
        preview.thumbnail_url.clone()
    };

    let download_style = if session.can_download() {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent())
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let lines = vec![
        Line::from(Span::styled(
            truncate_to_width(&preview.title, width),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Thumbnail: ", Style::default().fg(Color::DarkGray)),
            Span::raw(truncate_to_width(&thumbnail, width.saturating_sub(11))),
        ]),
        Line::from(vec![
            Span::styled("URL: ", Style::default().fg(Color::DarkGray)),
            Span::raw(truncate_to_width(&preview.canonical_url, width.saturating_sub(5))),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Download MP3 now ", download_style)),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent()))
        .title(" Preview ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_progress(f: &mut Frame, session: &Session, theme: Theme, area: Rect) {
    let Some(progress) = &session.progress else {
        return;
    };
    if area.height < 3 || !matches!(session.phase, Phase::Downloading | Phase::Saved) {
        return;
    }
    let gauge_area = Rect { height: 3, ..area };

    let (percent, label) = match progress.percent() {
        Some(p) => (p, format!("{}%", p)),
        None => (
            if session.phase == Phase::Saved { 100 } else { 0 },
            format!("{} bytes received", progress.bytes_downloaded),
        ),
    };
    let percent = if session.phase == Phase::Saved { 100 } else { percent };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Converting "))
        .gauge_style(Style::default().fg(theme.accent()))
        .percent(percent)
        .label(label);
    f.render_widget(gauge, gauge_area);
}

fn render_status(f: &mut Frame, session: &Session, theme: Theme, area: Rect) {
    let (text, style) = match &session.status {
        Some(msg) if msg.is_error => (msg.text.as_str(), Style::default().fg(Color::Red)),
        Some(msg) => (msg.text.as_str(), Style::default().fg(theme.accent())),
        None => ("", Style::default()),
    };
    let status = Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    f.render_widget(status, area);
}

/// Cuts `text` to at most `max` columns, marking the cut with `…`.
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Keeps the end of `text` so the cursor stays visible in a narrow field.
fn tail_to_width(text: &str, max: usize) -> &str {
    let mut used = 0;
    for (idx, c) in text.char_indices().rev() {
        used += c.width().unwrap_or(0);
        if used > max {
            return &text[idx + c.len_utf8()..];
        }
    }
    text
}
