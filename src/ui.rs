use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::state::{ChatMessage, ChatRole, Readiness};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some((_, c)) = chars.next() {
                if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                    chars.next(); // consume second *
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Render markdown markup to styled terminal lines: headings, bullet items,
/// **bold**, and fenced code blocks (fence lines themselves are hidden).
pub fn markdown_lines(markup: &str) -> Vec<Line<'static>> {
    let code_style = Style::default().fg(Color::Green);
    let mut lines = Vec::new();
    let mut in_code = false;

    for raw in markup.lines() {
        let trimmed = raw.trim_start();
        if trimmed.starts_with("```") {
            in_code = !in_code;
            continue;
        }

        if in_code {
            lines.push(Line::from(Span::styled(format!("  {}", raw), code_style)));
        } else if let Some(heading) = trimmed.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            lines.push(Line::from(Span::styled(
                heading.to_string(),
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )));
        } else if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            let mut line = parse_markdown_line(item);
            line.spans.insert(0, Span::raw("  • "));
            lines.push(line);
        } else {
            lines.push(parse_markdown_line(raw));
        }
    }

    lines
}

fn message_lines(msg: &ChatMessage) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match msg.role {
        ChatRole::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for line in msg.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        ChatRole::Ai if msg.is_error => {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                msg.content.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        ChatRole::Ai => {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            lines.extend(markdown_lines(&msg.content));
        }
    }
    lines.push(Line::default());
    lines
}

/// Rows a line occupies once word-wrapped to `width`. Words that do not fit
/// move to the next row and words longer than a row spill over, the same way
/// the transcript `Paragraph` wraps them.
fn wrapped_rows(line: &Line, width: u16) -> u16 {
    let width = width.max(1) as usize;
    let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();

    let mut rows = 1usize;
    // Leading indentation stays on the first row
    let mut col = Span::raw(&text[..text.len() - text.trim_start().len()]).width();
    for word in text.split_whitespace() {
        let word_width = Span::raw(word).width();
        if col > 0 && col + 1 + word_width <= width {
            col += 1 + word_width;
            continue;
        }
        if col > 0 {
            rows += 1;
        }
        let spill = word_width.saturating_sub(1) / width;
        rows += spill;
        col = word_width - spill * width;
    }

    // Never report fewer rows than a plain character wrap would need
    let by_chars = line.width().div_ceil(width).max(1);
    rows.max(by_chars).min(u16::MAX as usize) as u16
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let banner_height = if app.banner.is_some() { 1 } else { 0 };

    // Main layout: header, banner, transcript, input, footer
    let [header_area, banner_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(banner_height),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    if let Some(banner) = &app.banner {
        render_banner(banner, frame, banner_area);
    }
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" LogPilot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(app.api_url.clone(), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_banner(text: &str, frame: &mut Frame, area: Rect) {
    let banner = Paragraph::new(format!("⚠ {}", text))
        .style(Style::default().bg(Color::Yellow).fg(Color::Black).add_modifier(Modifier::BOLD))
        .centered();
    frame.render_widget(banner, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    // Inner size minus borders
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let mut lines: Vec<Line> = Vec::new();
    if app.messages.is_empty() && !app.typing {
        lines.push(Line::from(Span::styled(
            "Ask a question about your logs...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for msg in &app.messages {
        lines.extend(message_lines(msg));
    }

    if app.typing {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let total_rows: u16 = lines
        .iter()
        .map(|line| wrapped_rows(line, app.chat_width))
        .fold(0u16, |acc, rows| acc.saturating_add(rows));
    let max_scroll = total_rows.saturating_sub(app.chat_height);
    if app.follow_latest || app.scroll >= max_scroll {
        app.scroll = max_scroll;
        app.follow_latest = true;
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (border_color, title) = if !app.input_enabled {
        (Color::DarkGray, " Input disabled ")
    } else if app.input_mode == InputMode::Editing {
        (Color::Yellow, " Ask (Enter to send, Esc to leave) ")
    } else {
        (Color::DarkGray, " Ask (i to type) ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        Paragraph::new(app.placeholder.clone())
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))
    } else {
        // Get the visible slice of the input
        let visible_text: String = app.input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing && app.input_enabled {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let hints = match app.input_mode {
        InputMode::Normal => " i:type  j/k:scroll  r:recheck  ^L:clear  q:quit ",
        InputMode::Editing => " Enter:send  Esc:normal  ^L:clear  ^C:quit ",
    };

    let (status_text, status_color) = match &app.readiness {
        None => ("● checking".to_string(), Color::DarkGray),
        Some(Readiness::Ready) => ("● ready".to_string(), Color::Green),
        Some(Readiness::Downloading { model }) => (format!("● downloading {}", model), Color::Yellow),
        Some(Readiness::Unreachable) => ("● unreachable".to_string(), Color::Red),
    };

    let footer = Line::from(vec![
        Span::styled(mode_text, mode_style.add_modifier(Modifier::BOLD)),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
        Span::styled(status_text, Style::default().fg(status_color)),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::UiSink;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn buffer_text(buffer: &Buffer) -> String {
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_parse_markdown_line_bold() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_line_unclosed_bold_is_literal() {
        assert_eq!(line_text(&parse_markdown_line("a **b")), "a **b");
    }

    #[test]
    fn test_markdown_code_fence_is_hidden() {
        let lines = markdown_lines("Answer\n\nGenerated SQL:\n```sql\nSELECT 1\n```");
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["Answer", "", "Generated SQL:", "  SELECT 1"]);
    }

    #[test]
    fn test_markdown_headings_and_bullets() {
        let texts: Vec<String> = markdown_lines("## Summary\n- one\n* two")
            .iter()
            .map(line_text)
            .collect();
        assert_eq!(texts, vec!["Summary", "  • one", "  • two"]);
    }

    #[test]
    fn test_banner_and_disabled_input_are_drawn() {
        let mut app = App::new("http://localhost:8000");
        app.show_banner("Model is downloading... (foo). Please wait.");
        app.set_input_enabled(false);
        app.set_input_placeholder("Waiting for model download...");

        let screen = draw(&mut app);
        assert!(screen.contains("Model is downloading... (foo). Please wait."));
        assert!(screen.contains("Waiting for model download..."));
        assert!(screen.contains("Input disabled"));
    }

    #[test]
    fn test_transcript_shows_latest_message() {
        let mut app = App::new("http://localhost:8000");
        for i in 0..30 {
            app.append_message(ChatMessage::user(format!("question {}", i)));
        }
        app.append_message(ChatMessage::ai("final answer\n```sql\nSELECT 1\n```"));
        app.scroll_to_latest();

        let screen = draw(&mut app);
        assert!(screen.contains("final answer"));
        assert!(screen.contains("SELECT 1"));
        assert!(!screen.contains("```"));
        assert!(!screen.contains("question 0 "));
    }

    #[test]
    fn test_wrapped_rows_follows_word_boundaries() {
        let words = format!("{} {} {}", "a".repeat(40), "b".repeat(40), "c".repeat(40));
        assert_eq!(wrapped_rows(&Line::from(words.clone()), 78), 3);
        assert_eq!(wrapped_rows(&Line::from("short line"), 78), 1);
        assert_eq!(wrapped_rows(&Line::default(), 78), 1);
        assert_eq!(wrapped_rows(&Line::from("x".repeat(100)), 78), 2);
    }

    #[test]
    fn test_latest_message_visible_after_word_wrapped_replies() {
        let mut app = App::new("http://localhost:8000");
        let long = format!("{} {} {}", "a".repeat(40), "b".repeat(40), "c".repeat(40));
        for _ in 0..12 {
            app.append_message(ChatMessage::ai(long.clone()));
            app.scroll_to_latest();
        }
        app.append_message(ChatMessage::user("LATESTLINE"));
        app.scroll_to_latest();

        let screen = draw(&mut app);
        assert!(screen.contains("LATESTLINE"), "{}", screen);
    }

    #[test]
    fn test_typing_indicator_and_error_notice() {
        let mut app = App::new("http://localhost:8000");
        app.append_message(ChatMessage::error("Error: Could not connect to Pilot. Is the API running?"));
        app.set_typing_visible(true);

        let screen = draw(&mut app);
        assert!(screen.contains("Error: Could not connect to Pilot."));
        assert!(screen.contains("Thinking."));
    }
}
