pub mod overlays;
pub mod screen;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use studybuddy::app::App;
use studybuddy::models::{Message, PracticeProblemData, Sender};
use studybuddy::preferences::Theme;

const HORIZONTAL_MARGIN: u16 = 2;
const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];

/// Colors for one theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub user: Color,
    pub ai: Color,
    pub dim: Color,
    pub good: Color,
    pub bad: Color,
    pub star: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                fg: Color::Rgb(30, 30, 40),
                bg: Color::Rgb(248, 248, 252),
                accent: Color::Rgb(79, 70, 229),
                user: Color::Rgb(37, 99, 235),
                ai: Color::Rgb(124, 58, 237),
                dim: Color::Rgb(120, 120, 135),
                good: Color::Rgb(22, 163, 74),
                bad: Color::Rgb(220, 38, 38),
                star: Color::Rgb(202, 138, 4),
            },
            Theme::Dark => Self {
                fg: Color::Rgb(229, 231, 235),
                bg: Color::Rgb(17, 24, 39),
                accent: Color::Rgb(129, 140, 248),
                user: Color::Rgb(96, 165, 250),
                ai: Color::Rgb(192, 132, 252),
                dim: Color::Rgb(156, 163, 175),
                good: Color::Rgb(74, 222, 128),
                bad: Color::Rgb(248, 113, 113),
                star: Color::Rgb(250, 204, 21),
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn block<'a>(&self, title: &'a str) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                title,
                Style::default().fg(self.accent).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(self.dim))
            .style(self.base())
    }
}

/// Draw the current screen plus any open overlay
pub fn draw(app: &App, f: &mut Frame) {
    let palette = Palette::for_theme(app.theme);
    f.render_widget(Block::default().style(palette.base()), f.area());

    screen::current_screen(app.state).render(app, &palette, f);

    if let Some(overlay) = &app.overlay {
        overlays::render(app, overlay, &palette, f);
    }
}

pub fn render_topic_input(app: &App, palette: &Palette, f: &mut Frame) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let suggestions_height = app.suggested_topics.len() as u16 + 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints(
            [
                Constraint::Length(3),                  // title
                Constraint::Length(3),                  // topic input
                Constraint::Length(1),                  // level
                Constraint::Length(1),                  // padding
                Constraint::Length(suggestions_height), // suggestions
                Constraint::Min(0),
                Constraint::Length(1), // legend
            ]
            .as_ref(),
        )
        .split(f.area());

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            "Study Buddy",
            bold.fg(palette.accent),
        )),
        Line::from(Span::styled(
            "What do you want to learn today?",
            Style::default().fg(palette.dim),
        )),
    ])
    .alignment(Alignment::Center)
    .style(palette.base());
    f.render_widget(title, chunks[0]);

    let input = Paragraph::new(Line::from(vec![
        Span::raw(app.topic_input.as_str()),
        Span::styled("▏", Style::default().fg(palette.accent)),
    ]))
    .block(palette.block("Topic"));
    f.render_widget(input, chunks[1]);

    let level_spans: Vec<Span> = studybuddy::models::LearningLevel::ALL
        .iter()
        .flat_map(|level| {
            let style = if *level == app.level {
                bold.fg(palette.bg).bg(palette.accent)
            } else {
                Style::default().fg(palette.dim)
            };
            [Span::styled(format!(" {level} "), style), Span::raw(" ")]
        })
        .collect();
    let mut level_line = vec![Span::styled("Level: ", bold)];
    level_line.extend(level_spans);
    f.render_widget(
        Paragraph::new(Line::from(level_line)).style(palette.base()),
        chunks[2],
    );

    let suggestions: Vec<Line> = app
        .suggested_topics
        .iter()
        .enumerate()
        .map(|(idx, topic)| {
            if app.suggestion_cursor == Some(idx) {
                Line::from(Span::styled(format!("› {topic}"), bold.fg(palette.accent)))
            } else {
                Line::from(Span::raw(format!("  {topic}")))
            }
        })
        .collect();
    f.render_widget(
        Paragraph::new(suggestions).block(palette.block("Today's suggested topics")),
        chunks[4],
    );

    let legend = Paragraph::new(Span::styled(
        "(enter) start / (tab) level / (↑↓) suggestions / (^r) history / (^b) tip / (^g) guide / (^t) theme / (esc) quit",
        Style::default().fg(palette.dim).add_modifier(Modifier::ITALIC),
    ))
    .style(palette.base());
    f.render_widget(legend, chunks[6]);
}

pub fn render_chat(app: &App, palette: &Palette, f: &mut Frame) {
    let Some(session) = app.tutor.active() else {
        return;
    };
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints(
            [
                Constraint::Length(1), // header
                Constraint::Min(3),    // log
                Constraint::Length(3), // input
                Constraint::Length(1), // legend
            ]
            .as_ref(),
        )
        .split(f.area());

    let mut header = vec![
        Span::styled(session.topic.as_str(), bold.fg(palette.accent)),
        Span::styled(format!("  ({} level)", session.level), Style::default().fg(palette.dim)),
    ];
    if session.loading {
        header.push(Span::styled(
            format!("  {} thinking…", SPINNER[app.spinner % SPINNER.len()]),
            Style::default().fg(palette.ai),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(header)).style(palette.base()), chunks[0]);

    let log_area = chunks[1];
    let inner_width = log_area.width.saturating_sub(2).max(1) as usize;
    let (lines, starts) = message_lines(app, &session.chat_history, palette);

    let total = wrapped_height(&lines, inner_width);
    let visible = log_area.height.saturating_sub(2) as usize;
    let scroll = match app.selected_message.and_then(|i| starts.get(i)) {
        Some(&start) => wrapped_height(&lines[..start], inner_width).min(total.saturating_sub(visible)),
        None => total.saturating_sub(visible),
    };

    let log = Paragraph::new(lines)
        .block(palette.block("Conversation"))
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(log, log_area);

    let input = Paragraph::new(Line::from(vec![
        Span::raw(app.chat_input.as_str()),
        Span::styled("▏", Style::default().fg(palette.accent)),
    ]))
    .block(palette.block("Ask a question"));
    f.render_widget(input, chunks[2]);

    let legend = Paragraph::new(Span::styled(
        "(^e) explain / (^s) simplify / (^p) practice / (^l) translate / (↑↓ ^f) key point / (^k) key points / (^n) new topic / (^r) history",
        Style::default().fg(palette.dim).add_modifier(Modifier::ITALIC),
    ))
    .style(palette.base());
    f.render_widget(legend, chunks[3]);
}

/// Render the chat log; also returns the line index each message starts at
fn message_lines<'a>(
    app: &App,
    messages: &'a [Message],
    palette: &Palette,
) -> (Vec<Line<'a>>, Vec<usize>) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();
    let mut starts = Vec::with_capacity(messages.len());

    for (idx, msg) in messages.iter().enumerate() {
        starts.push(lines.len());
        let selected = app.selected_message == Some(idx);

        let (who, color) = match msg.sender {
            Sender::User => ("You", palette.user),
            Sender::Ai => ("Study Buddy", palette.ai),
        };
        let mut label = vec![Span::styled(who, bold.fg(color))];
        if msg.is_key_point {
            label.push(Span::styled(" ★", Style::default().fg(palette.star)));
        }
        if selected {
            label.push(Span::styled(" ◀", Style::default().fg(palette.accent)));
        }
        lines.push(Line::from(label));

        if let Some(text) = &msg.text {
            lines.extend(text.lines().map(|l| Line::from(Span::raw(l))));
        }
        if let Some(problem) = &msg.practice_problem {
            lines.extend(problem_lines(problem, app.answers.get(&msg.id).copied(), palette));
        }
        lines.push(Line::default());
    }

    (lines, starts)
}

fn problem_lines<'a>(
    problem: &'a PracticeProblemData,
    answer: Option<usize>,
    palette: &Palette,
) -> Vec<Line<'a>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(Span::styled(problem.question.as_str(), bold))];

    for (idx, option) in problem.options.iter().enumerate() {
        let is_correct = usize::try_from(problem.correct_answer_index).ok() == Some(idx);
        let (marker, style) = match answer {
            Some(_) if is_correct => ("✓", Style::default().fg(palette.good)),
            Some(chosen) if chosen == idx => ("✗", Style::default().fg(palette.bad)),
            _ => (" ", Style::default()),
        };
        lines.push(Line::from(Span::styled(
            format!(" {marker} {}. {option}", idx + 1),
            style,
        )));
    }

    match answer {
        Some(chosen) => {
            let verdict = if problem.correct_option().is_some()
                && usize::try_from(problem.correct_answer_index).ok() == Some(chosen)
            {
                Span::styled("Correct! ", bold.fg(palette.good))
            } else {
                Span::styled("Not quite. ", bold.fg(palette.bad))
            };
            lines.push(Line::from(vec![verdict, Span::raw(problem.explanation.as_str())]));
        }
        None if problem.is_error() => {
            lines.push(Line::from(Span::styled(
                problem.explanation.as_str(),
                Style::default().fg(palette.dim),
            )));
        }
        None => lines.push(Line::from(Span::styled(
            "Press 1-4 to answer",
            Style::default().fg(palette.dim).add_modifier(Modifier::ITALIC),
        ))),
    }

    lines
}

/// Rows taken by `lines` once wrapped at `width` columns
fn wrapped_height(lines: &[Line], width: usize) -> usize {
    lines
        .iter()
        .map(|line| {
            let w: usize = line.spans.iter().map(|s| s.content.width()).sum();
            w.div_ceil(width).max(1)
        })
        .sum()
}

/// A rectangle of `percent_x` by `height` centered in `area`
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((area.height - height) / 2),
                Constraint::Length(height),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}
