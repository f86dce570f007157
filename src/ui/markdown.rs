//! Minimal markdown-to-spans renderer for the answer detail view.
//! Headers, bullets, and inline bold/italic/code/links; everything else
//! passes through as plain text.

use ratatui::prelude::*;

use super::theme;

/// Parse one markdown line into styled spans.
pub fn parse_markdown_line(line: &str, base_style: Style) -> Vec<Span<'static>> {
    let trimmed = line.trim_start();

    // Headers: # ## ### etc.
    if trimmed.starts_with('#') {
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        let content = trimmed[level..].trim_start();
        let style = match level {
            1 => Style::default().fg(theme::ACCENT).bold(),
            2 => Style::default().fg(theme::ACCENT),
            _ => Style::default().fg(theme::ACCENT_DIM).italic(),
        };
        return vec![Span::styled(content.to_string(), style)];
    }

    // Bullet points: - or *
    if let Some(stripped) = trimmed.strip_prefix("- ") {
        let indent = line.len() - trimmed.len();
        let mut spans = vec![
            Span::styled(" ".repeat(indent), base_style),
            Span::styled("• ", Style::default().fg(theme::ACCENT_DIM)),
        ];
        spans.extend(parse_inline_markdown(stripped));
        return spans;
    }
    if trimmed.starts_with("* ") && !trimmed.starts_with("**") {
        let indent = line.len() - trimmed.len();
        let mut spans = vec![
            Span::styled(" ".repeat(indent), base_style),
            Span::styled("• ", Style::default().fg(theme::ACCENT_DIM)),
        ];
        spans.extend(parse_inline_markdown(&trimmed[2..]));
        return spans;
    }

    parse_inline_markdown(line)
}

/// Parse inline markdown (bold, italic, code, links).
pub fn parse_inline_markdown(text: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current = String::new();

    while let Some(c) = chars.next() {
        match c {
            '`' => {
                if !current.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut current), Style::default().fg(theme::TEXT)));
                }
                let mut code = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '`' {
                        chars.next();
                        break;
                    }
                    code.push(next);
                    chars.next();
                }
                if !code.is_empty() {
                    spans.push(Span::styled(code, Style::default().fg(theme::WARNING)));
                }
            }
            '*' | '_' => {
                let is_double = chars.peek() == Some(&c);
                if is_double {
                    chars.next();
                    if !current.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut current), Style::default().fg(theme::TEXT)));
                    }
                    let mut bold_text = String::new();
                    while let Some(next) = chars.next() {
                        if next == c && chars.peek() == Some(&c) {
                            chars.next();
                            break;
                        }
                        bold_text.push(next);
                    }
                    if !bold_text.is_empty() {
                        spans.push(Span::styled(bold_text, Style::default().fg(theme::TEXT).bold()));
                    }
                } else {
                    if !current.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut current), Style::default().fg(theme::TEXT)));
                    }
                    let mut italic_text = String::new();
                    let mut found_close = false;
                    for next in chars.by_ref() {
                        if next == c {
                            found_close = true;
                            break;
                        }
                        italic_text.push(next);
                    }
                    if found_close && !italic_text.is_empty() {
                        spans.push(Span::styled(italic_text, Style::default().fg(theme::TEXT).italic()));
                    } else {
                        // not actually italic, restore
                        current.push(c);
                        current.push_str(&italic_text);
                    }
                }
            }
            '[' => {
                let mut link_text = String::new();
                let mut found_bracket = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        found_bracket = true;
                        break;
                    }
                    link_text.push(next);
                }
                if found_bracket && chars.peek() == Some(&'(') {
                    chars.next();
                    for next in chars.by_ref() {
                        if next == ')' {
                            break;
                        }
                    }
                    if !current.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut current), Style::default().fg(theme::TEXT)));
                    }
                    spans.push(Span::styled(link_text, Style::default().fg(theme::ACCENT).underlined()));
                } else {
                    current.push('[');
                    current.push_str(&link_text);
                    if found_bracket {
                        current.push(']');
                    }
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        spans.push(Span::styled(current, Style::default().fg(theme::TEXT)));
    }
    if spans.is_empty() {
        spans.push(Span::styled("", Style::default()));
    }
    spans
}
