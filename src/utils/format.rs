use crate::session::reporter::HumanSummary;
use crate::session::SessionKind;
use crate::utils::emoji::option_emoji;
use poise::serenity_prelude as serenity;

pub fn format_error_message(error: &str) -> String {
    format!("❌ **Error**: {}", error)
}

pub fn format_success_message(message: &str) -> String {
    format!("✅ {}", message)
}

pub fn format_info_message(message: &str) -> String {
    format!("ℹ️ {}", message)
}

/// Numbered option list using the same emoji participants react with.
pub fn format_option_list(options: &[String]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(index, option)| format!("{} {}", option_emoji(index).unwrap_or("▫️"), option))
        .collect::<Vec<_>>()
        .join("\n")
}

// Embed utility functions
pub fn create_info_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(0x3498db) // Blue
        .timestamp(chrono::Utc::now())
}

pub fn create_prompt_embed(kind: SessionKind, question: &str, options: &[String], footer: &str) -> serenity::CreateEmbed {
    let (title, description) = match kind {
        SessionKind::Attendance => (
            "📋 Attendance".to_string(),
            "React with ✅ to mark yourself present.".to_string(),
        ),
        SessionKind::Quiz => (format!("❓ Quiz: {}", question), format_option_list(options)),
        SessionKind::FeedbackPoll => (format!("🗳️ Feedback: {}", question), format_option_list(options)),
    };

    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(0xf1c40f) // Yellow
        .footer(serenity::CreateEmbedFooter::new(footer))
        .timestamp(chrono::Utc::now())
}

pub fn create_summary_embed(summary: &HumanSummary) -> serenity::CreateEmbed {
    let color = match summary {
        HumanSummary::Attendance { absent, .. } if absent.is_empty() => 0x00ff00,
        HumanSummary::Attendance { .. } => 0xe67e22,
        HumanSummary::Tally { .. } => 0x9b59b6,
    };

    serenity::CreateEmbed::new()
        .title(format!("📊 {}", summary.title()))
        .description(summary.body())
        .color(color)
        .timestamp(chrono::Utc::now())
}

pub fn create_assignment_embed(title: &str, due: &str, details: &str, author: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("📝 {}", title))
        .description(details)
        .field("Due", due, true)
        .color(0x2ecc71)
        .author(serenity::CreateEmbedAuthor::new(format!("Posted by {}", author)))
        .timestamp(chrono::Utc::now())
}

pub fn create_announcement_embed(text: &str, author: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("📢 Announcement")
        .description(text)
        .color(0x3498db)
        .author(serenity::CreateEmbedAuthor::new(author))
        .timestamp(chrono::Utc::now())
}
