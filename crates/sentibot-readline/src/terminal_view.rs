//! Colored terminal rendering of the chat.

use std::io::{self, Write};

use colored::{ColoredString, Colorize};
use sentibot_application::{ChatSession, SessionView};
use sentibot_core::SessionReport;
use sentibot_core::sentiment::{MoodBadge, SentimentLabel};
use sentibot_core::session::{Role, Turn};

use crate::chart::render_line_chart;

const CHART_HEIGHT: usize = 9;
const USER_AVATAR: &str = "👤";
const BOT_AVATAR: &str = "🧠";

/// Writes the conversation to stdout.
#[derive(Default)]
pub struct TerminalView;

impl TerminalView {
    pub fn new() -> Self {
        Self
    }

    fn flush() {
        let _ = io::stdout().flush();
    }
}

fn badge_text(badge: &MoodBadge) -> ColoredString {
    match badge {
        MoodBadge::Waiting => badge.to_string().bright_black().italic(),
        MoodBadge::Scored { label, .. } => {
            let text = format!("{} {}", badge.emoji(), badge);
            match label {
                SentimentLabel::Positive => text.bright_green().bold(),
                SentimentLabel::Negative => text.bright_red().bold(),
                SentimentLabel::Neutral => text.bright_black().bold(),
            }
        }
    }
}

impl SessionView for TerminalView {
    fn show_transcript(&mut self, turns: &[Turn]) {
        println!("{}", "── restored conversation ──".bright_black());
        for turn in turns {
            match turn.role() {
                Role::User => println!("{} {}", USER_AVATAR, turn.content().green()),
                Role::Assistant => println!("{} {}", BOT_AVATAR, turn.content().bright_blue()),
            }
        }
        println!("{}", "───────────────────────────".bright_black());
    }

    fn begin_reply(&mut self) {
        print!("{} ", BOT_AVATAR);
        Self::flush();
    }

    fn show_fragment(&mut self, fragment: &str) {
        print!("{}", fragment.bright_blue());
        Self::flush();
    }

    fn end_reply(&mut self, cancelled: bool) {
        println!();
        if cancelled {
            println!("{}", "(reply interrupted)".yellow());
        }
    }

    fn render(&mut self, session: &ChatSession) {
        println!(
            "{} {}",
            "CURRENT VIBE".bright_black(),
            badge_text(&session.mood())
        );
        println!();
    }

    fn show_report(&mut self, report: &SessionReport, scores: &[f64]) {
        println!("{}", "Session Analyzed!".bright_green().bold());
        println!("{} {}", "Overall Verdict:".bold(), report.verdict);
        println!("{} {}", "Emotional Trend:".bold(), report.trend);
        println!("{} {:.2}", "Avg Confidence:".bold(), report.final_score);

        if !scores.is_empty() {
            println!();
            println!("{}", "Emotional Journey Graph".bright_black());
            for row in render_line_chart(scores, CHART_HEIGHT) {
                println!("{}", row.cyan());
            }
        }
        println!();
    }

    fn show_notice(&mut self, message: &str) {
        println!("{}", message.bright_black());
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("{}", message.red());
    }
}
