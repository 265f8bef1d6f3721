use crate::bot::commands::{authorize, say_error};
use crate::bot::platform::{DiscordDelivery, GuildRoster, actor_for, channel_key};
use crate::bot::{Context, Error};
use crate::session::delivery::{ExportFailure, deliver_export};
use crate::session::{OpenSession, ReportError, SessionDuration, SessionId, SessionKind};
use crate::utils::emoji::{PRESENT_EMOJI, reaction};
use crate::utils::format::{create_prompt_embed, format_info_message, format_success_message};
use crate::utils::time::{local_date, window_footer};
use poise::serenity_prelude as serenity;

/// Opens an attendance check; students react with ✅ to mark themselves present
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn attendance(
    ctx: Context<'_>,
    #[description = "Seconds the check stays open"] seconds: Option<i64>,
) -> Result<(), Error> {
    let data = ctx.data();
    let Some(guild_id) = ctx.guild_id() else {
        return say_error(ctx, "This command only works in a server").await;
    };
    let duration = SessionDuration::from_secs(seconds.unwrap_or(data.config.default_window_secs));

    let actor = actor_for(ctx).await?;
    if let Err(e) = data.sessions.preflight(&actor, SessionKind::Attendance, duration) {
        return say_error(ctx, &e.to_string()).await;
    }

    let provider = GuildRoster::new(ctx.serenity_context().http.clone(), guild_id);
    let roster = match data
        .sessions
        .fetch_roster(&actor, SessionKind::Attendance, &provider, &data.student_filter())
        .await
    {
        Ok(roster) => roster,
        Err(e) => return say_error(ctx, &e.to_string()).await,
    };
    let size = roster.len();

    let footer = window_footer(data.sessions.now(), duration, data.config.utc_offset);
    let prompt = ctx
        .channel_id()
        .send_message(
            ctx.http(),
            serenity::CreateMessage::new().embed(create_prompt_embed(SessionKind::Attendance, "", &[], &footer)),
        )
        .await?;

    // Open before anything else awaits so early reactions are not lost.
    let request = OpenSession::attendance(SessionId(prompt.id.get()), duration, roster, channel_key(ctx));
    match data.sessions.open_session(&actor, request) {
        Ok(id) => {
            prompt.react(ctx.http(), reaction(PRESENT_EMOJI)).await?;
            tracing::info!("Attendance {} opened by {} for {} students", id, actor.name, size);
            ctx.say(format_success_message(&format!(
                "Attendance is open for {} students. React with {} above!",
                size, PRESENT_EMOJI
            )))
            .await?;
        }
        Err(e) => {
            if let Err(delete_err) = prompt.delete(ctx.http()).await {
                tracing::warn!("Could not remove attendance prompt {}: {}", prompt.id, delete_err);
            }
            say_error(ctx, &e.to_string()).await?;
        }
    }

    Ok(())
}

/// Exports every closed attendance check as a CSV file
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn exportattendance(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    if authorize(ctx, data.staff_policy(), "export attendance").await?.is_none() {
        return Ok(());
    }

    let sessions = data.sessions.closed_sessions(SessionKind::Attendance);
    let table = match data.reporter.export(&sessions) {
        Ok(table) => table,
        Err(ReportError::NoData) => {
            ctx.say(format_info_message("No attendance has been recorded yet.")).await?;
            return Ok(());
        }
        Err(e) => return say_error(ctx, &e.to_string()).await,
    };

    let filename = format!(
        "attendance_{}.csv",
        local_date(data.sessions.now(), data.config.utc_offset).format("%Y-%m-%d")
    );
    let delivery = DiscordDelivery::new(ctx.serenity_context().http.clone());

    match deliver_export(&delivery, channel_key(ctx), &table, &filename).await {
        Ok(_) => {
            tracing::info!("Exported {} attendance rows from {} sessions", table.len(), sessions.len());
            ctx.say(format_success_message(&format!(
                "Exported {} sessions ({} rows).",
                sessions.len(),
                table.len()
            )))
            .await?;
        }
        Err(ExportFailure::Report(ReportError::NoData)) => {
            ctx.say(format_info_message("No attendance has been recorded yet.")).await?;
        }
        Err(e) => {
            tracing::error!("Attendance export failed: {}", e);
            say_error(ctx, &format!("Export failed: {}", e)).await?;
        }
    }

    Ok(())
}
