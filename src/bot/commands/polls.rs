use crate::bot::commands::say_error;
use crate::bot::platform::{GuildRoster, actor_for, channel_key};
use crate::bot::{Context, Error};
use crate::session::{OpenSession, SessionDuration, SessionId, SessionKind};
use crate::utils::emoji::{option_emoji, reaction};
use crate::utils::format::{create_prompt_embed, format_success_message};
use crate::utils::time::{format_duration_secs, window_footer};
use crate::utils::validation::parse_choice_args;
use poise::serenity_prelude as serenity;

/// Starts a timed quiz; students vote with the numbered reactions
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn quiz(
    ctx: Context<'_>,
    #[description = "Seconds the quiz stays open"] seconds: i64,
    #[description = "question | option 1 | option 2 [| ...] [| answer=N]"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    run_choice_session(ctx, SessionKind::Quiz, seconds, &text).await
}

/// Starts a timed feedback poll; students vote with the numbered reactions
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn feedback(
    ctx: Context<'_>,
    #[description = "Seconds the poll stays open"] seconds: i64,
    #[description = "question | option 1 | option 2 [| ...]"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    run_choice_session(ctx, SessionKind::FeedbackPoll, seconds, &text).await
}

async fn run_choice_session(ctx: Context<'_>, kind: SessionKind, seconds: i64, text: &str) -> Result<(), Error> {
    let data = ctx.data();
    let Some(guild_id) = ctx.guild_id() else {
        return say_error(ctx, "This command only works in a server").await;
    };
    let duration = SessionDuration::from_secs(seconds);

    let actor = actor_for(ctx).await?;
    if let Err(e) = data.sessions.preflight(&actor, kind, duration) {
        return say_error(ctx, &e.to_string()).await;
    }

    let args = match parse_choice_args(text, kind == SessionKind::Quiz) {
        Ok(args) => args,
        Err(e) => return say_error(ctx, &e.to_string()).await,
    };

    let provider = GuildRoster::new(ctx.serenity_context().http.clone(), guild_id);
    let roster = match data
        .sessions
        .fetch_roster(&actor, kind, &provider, &data.student_filter())
        .await
    {
        Ok(roster) => roster,
        Err(e) => return say_error(ctx, &e.to_string()).await,
    };

    let footer = window_footer(data.sessions.now(), duration, data.config.utc_offset);
    let prompt = ctx
        .channel_id()
        .send_message(
            ctx.http(),
            serenity::CreateMessage::new().embed(create_prompt_embed(kind, &args.question, &args.options, &footer)),
        )
        .await?;

    let request = OpenSession::choices(
        SessionId(prompt.id.get()),
        kind,
        duration,
        roster,
        args.options.clone(),
        args.answer,
        channel_key(ctx),
    );

    match data.sessions.open_session(&actor, request) {
        Ok(id) => {
            // The bot's own reactions are not on the roster and never count.
            for index in 0..args.options.len() {
                if let Some(emoji) = option_emoji(index) {
                    prompt.react(ctx.http(), reaction(emoji)).await?;
                }
            }
            tracing::info!("{} {} opened by {} with {} options", kind, id, actor.name, args.options.len());
            ctx.say(format_success_message(&format!(
                "The {} is open for {}.",
                kind,
                format_duration_secs(duration.as_secs())
            )))
            .await?;
        }
        Err(e) => {
            if let Err(delete_err) = prompt.delete(ctx.http()).await {
                tracing::warn!("Could not remove {} prompt {}: {}", kind, prompt.id, delete_err);
            }
            say_error(ctx, &e.to_string()).await?;
        }
    }

    Ok(())
}
