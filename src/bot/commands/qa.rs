use crate::bot::commands::say_error;
use crate::bot::{Context, Error};
use crate::utils::format::create_info_embed;
use crate::utils::validation::validate_not_blank;
use poise::serenity_prelude as serenity;

// Discord caps thread names at 100 characters.
const THREAD_NAME_LIMIT: usize = 90;

/// Asks a question and opens a thread for the answers
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn question(
    ctx: Context<'_>,
    #[description = "Your question"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    let text = match validate_not_blank(&text, "Question") {
        Ok(text) => text,
        Err(e) => return say_error(ctx, &e.to_string()).await,
    };

    let embed = create_info_embed(&format!("❔ Question from {}", ctx.author().name), text);
    let posted = ctx
        .channel_id()
        .send_message(ctx.http(), serenity::CreateMessage::new().embed(embed))
        .await?;

    let thread = ctx
        .channel_id()
        .create_thread_from_message(ctx.http(), posted.id, serenity::CreateThread::new(thread_name(text)))
        .await?;

    tracing::info!("Q&A thread {} opened by {}", thread.id, ctx.author().name);
    ctx.say(format!("Thread opened: <#{}>", thread.id)).await?;
    Ok(())
}

fn thread_name(question: &str) -> String {
    let mut name = format!("Q: {}", question.lines().next().unwrap_or(question));
    if name.chars().count() > THREAD_NAME_LIMIT {
        name = name.chars().take(THREAD_NAME_LIMIT - 1).collect::<String>() + "…";
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_questions_keep_their_text() {
        assert_eq!(thread_name("What is ownership?"), "Q: What is ownership?");
    }

    #[test]
    fn long_questions_are_truncated() {
        let name = thread_name(&"why ".repeat(50));
        assert_eq!(name.chars().count(), THREAD_NAME_LIMIT);
        assert!(name.ends_with('…'));
    }

    #[test]
    fn only_first_line_is_used() {
        assert_eq!(thread_name("first\nsecond"), "Q: first");
    }
}
