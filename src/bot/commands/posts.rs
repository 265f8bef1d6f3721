use crate::bot::commands::{authorize, say_error};
use crate::bot::{Context, Error};
use crate::utils::format::{create_announcement_embed, create_assignment_embed, format_success_message};
use crate::utils::validation::{parse_assignment_args, validate_not_blank};
use poise::serenity_prelude as serenity;

/// Posts an assignment to the assignments channel
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn assignment(
    ctx: Context<'_>,
    #[description = "title | due date | details"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let Some(actor) = authorize(ctx, data.staff_policy(), "post assignments").await? else {
        return Ok(());
    };

    let args = match parse_assignment_args(&text) {
        Ok(args) => args,
        Err(e) => return say_error(ctx, &e.to_string()).await,
    };

    let channel = find_text_channel(ctx, &data.config.assignment_channel).await?;
    let embed = create_assignment_embed(&args.title, &args.due, &args.details, &actor.name);
    channel
        .send_message(ctx.http(), serenity::CreateMessage::new().embed(embed))
        .await?;

    tracing::info!("Assignment '{}' posted by {}", args.title, actor.name);
    ctx.say(format_success_message(&format!("Assignment posted in <#{}>.", channel))).await?;
    Ok(())
}

/// Posts an announcement to the announcements channel
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn announce(
    ctx: Context<'_>,
    #[description = "Announcement text"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let Some(actor) = authorize(ctx, data.staff_policy(), "post announcements").await? else {
        return Ok(());
    };

    let text = match validate_not_blank(&text, "Announcement") {
        Ok(text) => text,
        Err(e) => return say_error(ctx, &e.to_string()).await,
    };

    let channel = find_text_channel(ctx, &data.config.announcement_channel).await?;
    channel
        .send_message(
            ctx.http(),
            serenity::CreateMessage::new().embed(create_announcement_embed(text, &actor.name)),
        )
        .await?;

    tracing::info!("Announcement posted by {}", actor.name);
    ctx.say(format_success_message(&format!("Announcement posted in <#{}>.", channel))).await?;
    Ok(())
}

/// Text channel named `name` (case-insensitive), or the current channel.
async fn find_text_channel(ctx: Context<'_>, name: &str) -> Result<serenity::ChannelId, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(ctx.channel_id());
    };

    let channels = guild_id.channels(ctx.http()).await?;
    let found = channels
        .values()
        .find(|channel| channel.kind == serenity::ChannelType::Text && channel.name.eq_ignore_ascii_case(name))
        .map(|channel| channel.id);

    if found.is_none() {
        tracing::warn!("Channel #{} not found, posting in the current channel", name);
    }
    Ok(found.unwrap_or_else(|| ctx.channel_id()))
}
