//! Idempotent render of a `NavState`: same state, same frame.

use chrono::{DateTime, Local};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::state::{NodeId, Tree};
use crate::ui::{markdown, theme};

use super::{NavMode, NavState, visible_nodes};

pub fn render(frame: &mut Frame, tree: &Tree, state: &mut NavState) {
    let base_style = Style::default().bg(theme::BG_BASE);
    frame.render_widget(Block::default().style(base_style), frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(3),    // tree
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    render_header(frame, tree, chunks[0]);
    render_tree(frame, tree, state, chunks[1]);
    render_footer(frame, state, chunks[2]);

    match &state.mode {
        NavMode::Detail { scroll } => {
            if let Some(id) = state.selected {
                render_detail(frame, tree, id, *scroll);
            }
        }
        NavMode::FollowUp { input } => {
            if let Some(id) = state.selected {
                render_follow_up_input(frame, tree, id, input);
            }
        }
        NavMode::Tree => {}
    }
}

fn render_header(frame: &mut Frame, tree: &Tree, area: Rect) {
    let stats = tree.stats();
    let line = Line::from(vec![
        Span::styled(format!(" {} ", tree.key), Style::default().fg(theme::ACCENT).bold()),
        Span::styled(
            format!(
                "{} nodes · {} roots · {} follow-ups · depth {}",
                stats.total, stats.roots, stats.follow_ups, stats.max_depth
            ),
            Style::default().fg(theme::TEXT_MUTED),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_tree(frame: &mut Frame, tree: &Tree, state: &mut NavState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(theme::BORDER))
        .title(Span::styled(" Questions ", Style::default().fg(theme::ACCENT).bold()));
    let content_area = block.inner(area);
    frame.render_widget(block, area);

    // the event loop reads this back to clamp the viewport
    state.viewport_rows = content_area.height as usize;

    let visible = visible_nodes(tree, &state.expanded);
    if visible.is_empty() {
        let hint = Paragraph::new(Span::styled(
            "No questions yet. Exit and use `q: <question>` to ask one.",
            Style::default().fg(theme::TEXT_MUTED).italic(),
        ));
        frame.render_widget(hint, content_area);
        return;
    }

    let rows = content_area.height as usize;
    let mut lines: Vec<Line> = Vec::new();
    for &id in visible.iter().skip(state.offset).take(rows) {
        lines.push(node_line(
            tree,
            id,
            state.selected == Some(id),
            state.expanded.contains(&id),
            content_area.width as usize,
        ));
    }
    frame.render_widget(Paragraph::new(lines), content_area);
}

fn node_line(tree: &Tree, id: NodeId, selected: bool, expanded: bool, width: usize) -> Line<'static> {
    let node = &tree.nodes[id.0];
    let depth = tree.depth(id);
    let indent = "  ".repeat(depth);

    let marker = if node.children.is_empty() {
        "  ".to_string()
    } else if expanded {
        "▼ ".to_string()
    } else {
        "▶ ".to_string()
    };
    let count = if node.children.is_empty() {
        String::new()
    } else {
        format!(" [{}]", node.children.len())
    };
    let time = format_time(node.created_at);

    let fg = if node.parent.is_none() { theme::ROOT_NODE } else { theme::CHILD_NODE };
    let row_style = if selected {
        Style::default().bg(theme::BG_SELECTED)
    } else {
        Style::default()
    };

    let fixed = indent.width() + marker.width() + count.width() + time.width() + 4;
    let summary = truncate_to_width(&node.summary, width.saturating_sub(fixed));

    Line::from(vec![
        Span::styled(format!(" {}", indent), row_style),
        Span::styled(marker, row_style.fg(theme::TEXT_MUTED)),
        Span::styled(summary, row_style.fg(fg)),
        Span::styled(count, row_style.fg(theme::TEXT_MUTED)),
        Span::styled(format!("  {}", time), row_style.fg(theme::TEXT_MUTED)),
    ])
}

fn render_footer(frame: &mut Frame, state: &NavState, area: Rect) {
    let help = match state.mode {
        NavMode::Tree => " ↑↓ move · → expand · ← collapse · Enter open · f follow-up · q back",
        NavMode::Detail { .. } => " ↑↓ scroll · s file to vault · any other key to go back",
        NavMode::FollowUp { .. } => " Enter queue question · empty line or Esc to finish",
    };
    frame.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(theme::TEXT_MUTED))),
        area,
    );
}

fn render_detail(frame: &mut Frame, tree: &Tree, id: NodeId, scroll: usize) {
    let node = &tree.nodes[id.0];
    let area = centered_rect(frame.area(), 90, 90);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(theme::ACCENT_DIM))
        .style(Style::default().bg(theme::BG_BASE))
        .title(Span::styled(format!(" {} ", id), Style::default().fg(theme::ACCENT).bold()));
    let content_area = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        node.question.clone(),
        Style::default().fg(theme::SUCCESS).bold(),
    )));
    lines.push(Line::from(Span::styled(
        format!("asked {}", node.created_at.format("%Y-%m-%d %H:%M")),
        Style::default().fg(theme::TEXT_MUTED).italic(),
    )));
    lines.push(Line::default());
    for raw in node.answer.lines() {
        for wrapped in wrap_line(raw, content_area.width as usize) {
            lines.push(Line::from(markdown::parse_markdown_line(&wrapped, Style::default())));
        }
    }

    let max_scroll = lines.len().saturating_sub(content_area.height as usize);
    let scroll = scroll.min(max_scroll) as u16;
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), content_area);
}

fn render_follow_up_input(frame: &mut Frame, tree: &Tree, id: NodeId, input: &str) {
    let area = frame.area();
    let bar = Rect::new(area.x, area.height.saturating_sub(3), area.width, 3.min(area.height));
    frame.render_widget(Clear, bar);

    let node = &tree.nodes[id.0];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::ACCENT))
        .style(Style::default().bg(theme::BG_BASE))
        .title(Span::styled(
            format!(" follow-up to {}: {} ", id, truncate_to_width(&node.summary, 40)),
            Style::default().fg(theme::ACCENT),
        ));
    let inner = block.inner(bar);
    frame.render_widget(block, bar);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(input.to_string(), Style::default().fg(theme::TEXT)),
            Span::styled("█", Style::default().fg(theme::ACCENT)),
        ])),
        inner,
    );
}

fn format_time(at: DateTime<Local>) -> String {
    at.format("%H:%M").to_string()
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn truncate_to_width(text: &str, max: usize) -> String {
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

/// Greedy word wrap; long unbreakable words are hard-split.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 || line.width() <= width {
        return vec![line.to_string()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let sep = if current.is_empty() { 0 } else { 1 };
        if current.width() + sep + word.width() <= width {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let mut rest = word;
            while rest.width() > width {
                let mut cut = 0;
                let mut used = 0;
                for (i, c) in rest.char_indices() {
                    let w = c.width().unwrap_or(0);
                    if used + w > width {
                        break;
                    }
                    used += w;
                    cut = i + c.len_utf8();
                }
                if cut == 0 {
                    break;
                }
                out.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            current.push_str(rest);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}
