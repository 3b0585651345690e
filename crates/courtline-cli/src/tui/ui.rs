//! UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

use super::app::{ActivePane, App, InputMode, Tab};

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    // Summary and tabs on top, status bar at the bottom
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let pane_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(outer_chunks[2]);

    draw_summary(frame, app, outer_chunks[0]);
    draw_tabs(frame, app, outer_chunks[1]);
    draw_items_pane(frame, app, pane_chunks[0]);
    draw_detail_pane(frame, app, pane_chunks[1]);

    match app.input_mode {
        InputMode::Normal => draw_status_bar(frame, app, outer_chunks[3]),
        InputMode::Filter => draw_filter_input(frame, app, outer_chunks[3]),
    }

    if app.show_help {
        draw_help_overlay(frame);
    }
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn counter<'a>(label: &'a str, value: usize, highlight: bool) -> Vec<Span<'a>> {
    let style = if highlight && value > 0 {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    vec![
        Span::styled(format!("{} ", label), Style::default().add_modifier(Modifier::DIM)),
        Span::styled(value.to_string(), style),
        Span::raw("   "),
    ]
}

/// Draw the summary counters
fn draw_summary(frame: &mut Frame, app: &App, area: Rect) {
    let r = &app.report;
    let mut spans = Vec::new();
    spans.extend(counter("active cases", r.cases.active, false));
    spans.extend(counter("upcoming hearings", r.cases.upcoming_hearings, true));
    spans.extend(counter("contacts", r.contacts.total, false));
    spans.extend(counter("scheduled SMS", r.outbox.scheduled, false));
    spans.extend(counter("failed SMS", r.outbox.failed, true));
    spans.extend(counter("unread", r.inbox.unread, true));
    spans.extend(counter("awaiting reply", r.inbox.requires_response, true));
    spans.extend(counter("audit today", r.audit.today, false));

    let block = Block::default().title(" Courtline ").borders(Borders::ALL);
    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn draw_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .map(|tab| {
            let count = app.data[tab.index()].entries.len();
            Line::from(format!("{} ({})", tab.title(), count))
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .divider("|");
    frame.render_widget(tabs, area);
}

/// Draw the records list (left)
fn draw_items_pane(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.active_pane == ActivePane::Items;
    let visible = app.visible();

    // Skip the id column, it is in the detail pane
    let headers = app.current_data().headers;
    let header = headers.iter().skip(1).copied().collect::<Vec<_>>().join("  ");

    let max_len = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = visible
        .iter()
        .map(|entry| {
            let line: String = entry.columns.iter().skip(1).cloned().collect::<Vec<_>>().join("  ");
            let line = if line.chars().count() > max_len {
                let cut: String = line.chars().take(max_len.saturating_sub(1)).collect();
                format!("{}…", cut)
            } else {
                line
            };
            ListItem::new(line)
        })
        .collect();

    let title = if app.filter_text.is_empty() {
        format!(" {} ({}) ", app.tab.title(), visible.len())
    } else {
        format!(" {} ({}) /{} ", app.tab.title(), visible.len(), app.filter_text)
    };
    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(Span::styled(
            format!(" {} ", header),
            Style::default().add_modifier(Modifier::DIM),
        )))
        .borders(Borders::ALL)
        .border_style(border_style(is_active));

    let highlight_style = if is_active {
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style);

    let mut state = ListState::default();
    if !visible.is_empty() {
        state.select(Some(app.selected_index()));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the detail pane (right)
fn draw_detail_pane(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Detail ")
        .borders(Borders::ALL)
        .border_style(border_style(app.active_pane == ActivePane::Detail));

    let content: Vec<Line> = match app.current_entry() {
        Some(entry) => entry
            .detail
            .iter()
            .map(|(field, value)| {
                Line::from(vec![
                    Span::styled(format!("{}: ", field), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(value.as_str()),
                ])
            })
            .collect(),
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "Nothing selected",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ],
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.detail_scroll, 0));

    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let content = app.status_message.clone().unwrap_or_else(|| {
        "tab:next tab  h/l:pane  /:filter  r:reload  ?:help  q:quit".to_string()
    });

    let paragraph = Paragraph::new(content).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

fn draw_filter_input(frame: &mut Frame, app: &App, area: Rect) {
    let prefix = "/";
    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Cyan)),
        Span::raw(app.filter_text.as_str()),
        Span::styled(
            format!("  ({} matches)", app.visible().len()),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);

    let cursor_x = area.x + prefix.len() as u16 + app.filter_text.chars().count() as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let popup_width = 46.min(area.width.saturating_sub(4));
    let popup_height = 18.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(ratatui::widgets::Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  gg          Jump to first record"),
        Line::from("  G           Jump to last record"),
        Line::from("  h/l, ←/→    Switch panes"),
        Line::from("  Tab         Next tab"),
        Line::from("  Shift+Tab   Previous tab"),
        Line::from(""),
        Line::from("  /           Filter records"),
        Line::from("  Esc         Clear filter"),
        Line::from("  r           Reload"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from("Changes are made with the courtline CLI."),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
}
