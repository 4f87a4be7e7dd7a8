use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

use studybuddy::app::{App, Overlay};
use studybuddy::util::truncate_to_width;

use super::{centered_rect, Palette};

const TUTORIAL: &[&str] = &[
    "Welcome to Study Buddy!",
    "",
    "1. Type a topic (or pick one of today's suggestions with ↑↓), choose a level with tab, press enter.",
    "2. Study Buddy explains the basics. Ask follow-up questions by typing and pressing enter.",
    "3. Use the study controls:",
    "     ^e  explain in more detail",
    "     ^s  simplify the last answer",
    "     ^p  get a practice problem (answer with 1-4)",
    "     ^l  explain difficult words in another language",
    "4. Select a message with ↑↓ and press ^f to keep it as a key point; ^k lists them.",
    "5. Every session is saved. ^r opens your history, ^n starts a new topic.",
    "",
    "^t switches between light and dark, ^g shows this guide again.",
    "",
    "Press enter to get started.",
];

pub fn render(app: &App, overlay: &Overlay, palette: &Palette, f: &mut Frame) {
    let dim = Style::default().fg(palette.dim);
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let (title, lines, height): (&str, Vec<Line>, u16) = match overlay {
        Overlay::History { selected } => {
            let sessions = app.sorted_history();
            let width = (f.area().width as usize * 7 / 10).saturating_sub(24).max(10);
            let mut lines: Vec<Line> = if sessions.is_empty() {
                vec![Line::from(Span::styled("No past sessions yet.", dim))]
            } else {
                sessions
                    .iter()
                    .enumerate()
                    .map(|(idx, s)| {
                        let when = s
                            .last_accessed_local()
                            .map(|d| d.format("%b %e %H:%M").to_string())
                            .unwrap_or_default();
                        let topic = truncate_to_width(&s.topic, width);
                        let text = format!("{topic} · {} · {when}", s.learning_level);
                        if idx == *selected {
                            Line::from(Span::styled(format!("› {text}"), bold.fg(palette.accent)))
                        } else {
                            Line::from(Span::raw(format!("  {text}")))
                        }
                    })
                    .collect()
            };
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                "(enter) resume / (c) clear all / (esc) close",
                dim,
            )));
            let height = lines.len() as u16 + 2;
            ("Study history", lines, height)
        }
        Overlay::Language { input } => (
            "Translate",
            vec![
                Line::from("Explain the difficult words of the last answer in:"),
                Line::from(vec![
                    Span::styled(input.as_str(), bold),
                    Span::styled("▏", Style::default().fg(palette.accent)),
                ]),
                Line::default(),
                Line::from(Span::styled("(enter) translate / (esc) cancel", dim)),
            ],
            6,
        ),
        Overlay::KeyPoints => {
            let points = app.tutor.key_points();
            let mut lines: Vec<Line> = if points.is_empty() {
                vec![Line::from(Span::styled(
                    "No key points yet. Select a message with ↑↓ and press ^f.",
                    dim,
                ))]
            } else {
                points
                    .into_iter()
                    .flat_map(|m| {
                        let text = m
                            .text
                            .as_deref()
                            .or(m.practice_problem.as_ref().map(|p| p.question.as_str()))
                            .unwrap_or_default();
                        [
                            Line::from(vec![
                                Span::styled("★ ", Style::default().fg(palette.star)),
                                Span::raw(text),
                            ]),
                            Line::default(),
                        ]
                    })
                    .collect()
            };
            lines.push(Line::from(Span::styled("(esc) close", dim)));
            ("Key points", lines, f.area().height.saturating_sub(4))
        }
        Overlay::Tutorial => (
            "How it works",
            TUTORIAL.iter().map(|l| Line::from(*l)).collect(),
            TUTORIAL.len() as u16 + 4,
        ),
        Overlay::Tip => {
            let tip = app.tip.as_deref().unwrap_or("No tip today.");
            (
                "Bonus tip of the day",
                vec![
                    Line::from(Span::raw(tip)),
                    Line::default(),
                    Line::from(Span::styled("(any key) close", dim)),
                ],
                8,
            )
        }
    };

    let area = centered_rect(70, height, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .block(palette.block(title))
            .wrap(Wrap { trim: false }),
        area,
    );
}
