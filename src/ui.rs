pub mod screen;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle},
        Gauge, Paragraph, Widget, Wrap,
    },
};

use breathr::{phase::MAX_CIRCLE_SCALE, util::timing_summary, Phase};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const RECENT_ATTEMPTS: usize = 6;

fn phase_color(phase: Phase) -> Color {
    match phase {
        Phase::Inhale => Color::Cyan,
        Phase::Hold1 | Phase::Hold2 => Color::Magenta,
        Phase::Exhale => Color::Blue,
        Phase::Idle => Color::Gray,
        Phase::Complete => Color::Green,
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

impl App {
    fn title(&self) -> String {
        let pattern = if self.is_custom() {
            "custom".to_string()
        } else {
            self.preset.to_string()
        };
        let d = self.session_config().durations;
        format!(
            "breathr · {} {}-{}-{}-{}",
            pattern, d.inhale, d.hold1, d.exhale, d.hold2
        )
    }

    fn render_session(&self, area: Rect, buf: &mut Buffer) {
        let breather = &self.breather;
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let color = phase_color(breather.phase());

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // title
                Constraint::Min(6),    // circle
                Constraint::Length(2), // phase + time left
                Constraint::Length(1), // score
                Constraint::Length(1), // progress
                Constraint::Length(1), // attempts
                Constraint::Length(2), // hints
            ])
            .split(area);

        Paragraph::new(Span::styled(self.title(), bold_style))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let radius = breather.circle_scale();
        let bound = MAX_CIRCLE_SCALE + 0.1;
        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([-bound, bound])
            .y_bounds([-bound, bound])
            .paint(|ctx| {
                ctx.draw(&Circle {
                    x: 0.0,
                    y: 0.0,
                    radius,
                    color,
                });
            })
            .render(chunks[1], buf);

        let status = if breather.is_idle() {
            Line::from(Span::styled("Ready", bold_style.fg(color)))
        } else {
            let paused = if breather.is_paused() { "  (paused)" } else { "" };
            Line::from(vec![
                Span::styled(breather.phase().label(), bold_style.fg(color)),
                Span::styled(
                    format!("  {:.1}s", breather.remaining_in_phase()),
                    dim_style,
                ),
                Span::raw(format!(
                    "  ·  Cycle {}/{}",
                    breather.current_cycle(),
                    breather.target_cycles()
                )),
                Span::styled(paused, Style::default().fg(Color::Yellow)),
            ])
        };
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        Paragraph::new(Span::styled(
            format!("Score: {} / 100", breather.score()),
            bold_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

        Gauge::default()
            .gauge_style(Style::default().fg(color))
            .ratio(breather.progress().clamp(0.0, 1.0))
            .label(format!("{:.0}%", breather.progress() * 100.0))
            .render(chunks[4], buf);

        let recent = breather
            .attempts()
            .iter()
            .rev()
            .take(RECENT_ATTEMPTS)
            .map(|a| format!("+{}", a.points_awarded))
            .join(" ");
        Paragraph::new(Span::styled(
            format!("Attempts: {}  {}", breather.attempts().len(), recent),
            dim_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

        let hint = if breather.is_idle() {
            "space start · 1 relax · 2 box · 3 energize · esc quit".to_string()
        } else {
            "space when a phase begins · p pause · r reset · esc quit".to_string()
        };
        let toggles = format!(
            "s sound {} · v haptics {}",
            on_off(breather.feedback().sound_enabled),
            on_off(breather.feedback().haptics_enabled)
        );
        Paragraph::new(vec![
            Line::from(Span::styled(hint, dim_style.add_modifier(Modifier::ITALIC))),
            Line::from(Span::styled(toggles, dim_style)),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[6], buf);
    }

    fn render_results(&self, area: Rect, buf: &mut Buffer) {
        let breather = &self.breather;
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let green_bold_style = bold_style.fg(Color::Green);

        let final_score = breather.final_score().unwrap_or_default();
        let mut lines = vec![
            Line::from(Span::styled("Session complete", green_bold_style)),
            Line::from(Span::styled(
                self.closing_word,
                Style::default().add_modifier(Modifier::ITALIC),
            )),
            Line::default(),
            Line::from(Span::styled(
                format!("Final score: {} / 100", final_score),
                bold_style,
            )),
            Line::from(format!(
                "{} attempts · {} points · +{} engagement",
                breather.attempts().len(),
                breather.raw_points(),
                breather.engagement_bonus()
            )),
        ];

        if let Some(timing) = timing_summary(breather.attempts()) {
            lines.push(Line::from(format!(
                "avg {:.2}s after phase start · sd {:.2}s · {} perfect",
                timing.mean_deviation, timing.std_dev, timing.perfect_hits
            )));
        }

        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!(
                "best {} · played {} · progress {}% · {} xp",
                self.progress.high_score,
                self.progress.times_played,
                self.progress.progress,
                self.progress.xp
            ),
            Style::default().fg(Color::Magenta),
        )));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "space play again · r reset · esc quit",
            dim_style.add_modifier(Modifier::ITALIC),
        )));

        let height = lines.len() as u16;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(area.height.saturating_sub(height) / 2),
                Constraint::Length(height),
                Constraint::Min(0),
            ])
            .split(area);

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);
    }
}
