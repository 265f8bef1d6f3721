use crate::bot::{Context, Error};

/// Checks that the bot is up
#[poise::command(prefix_command, slash_command)]
pub async fn hello(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Hello, World!").await?;
    Ok(())
}
