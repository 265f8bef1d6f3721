use crate::bot::commands::{authorize, say_error};
use crate::bot::{Context, Error};
use crate::utils::format::format_success_message;
use crate::utils::validation::validate_breakout_count;
use poise::serenity_prelude as serenity;

const DEFAULT_CATEGORY: &str = "Breakout Rooms";

/// Creates a category of voice channels for group work
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn breakout(
    ctx: Context<'_>,
    #[description = "Number of rooms (1-25)"] count: u32,
    #[description = "Category name"] name: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    if authorize(ctx, data.staff_policy(), "create breakout rooms").await?.is_none() {
        return Ok(());
    }
    let Some(guild_id) = ctx.guild_id() else {
        return say_error(ctx, "This command only works in a server").await;
    };
    let count = match validate_breakout_count(count) {
        Ok(count) => count,
        Err(e) => return say_error(ctx, &e.to_string()).await,
    };
    let name = category_name(name);

    let category = guild_id
        .create_channel(
            ctx.http(),
            serenity::CreateChannel::new(name.as_str()).kind(serenity::ChannelType::Category),
        )
        .await?;

    for room in 1..=count {
        guild_id
            .create_channel(
                ctx.http(),
                serenity::CreateChannel::new(format!("Room {}", room))
                    .kind(serenity::ChannelType::Voice)
                    .category(category.id),
            )
            .await?;
    }

    tracing::info!("Created {} breakout rooms under '{}'", count, name);
    ctx.say(format_success_message(&format!("Created {} rooms under **{}**.", count, name)))
        .await?;
    Ok(())
}

/// Deletes a breakout category and its rooms
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn closebreakout(
    ctx: Context<'_>,
    #[description = "Category name"] name: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    if authorize(ctx, data.staff_policy(), "close breakout rooms").await?.is_none() {
        return Ok(());
    }
    let Some(guild_id) = ctx.guild_id() else {
        return say_error(ctx, "This command only works in a server").await;
    };
    let name = category_name(name);

    let channels = guild_id.channels(ctx.http()).await?;
    let Some(category) = channels
        .values()
        .find(|channel| channel.kind == serenity::ChannelType::Category && channel.name.eq_ignore_ascii_case(&name))
        .map(|channel| channel.id)
    else {
        return say_error(ctx, &format!("No category named **{}**", name)).await;
    };

    let rooms: Vec<serenity::ChannelId> = channels
        .values()
        .filter(|channel| channel.parent_id == Some(category))
        .map(|channel| channel.id)
        .collect();
    for room in &rooms {
        room.delete(ctx.http()).await?;
    }
    category.delete(ctx.http()).await?;

    tracing::info!("Removed {} breakout rooms under '{}'", rooms.len(), name);
    ctx.say(format_success_message(&format!("Closed **{}** ({} rooms).", name, rooms.len())))
        .await?;
    Ok(())
}

fn category_name(name: Option<String>) -> String {
    name.map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}
