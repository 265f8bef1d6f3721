use crate::bot::commands::{authorize, say_error};
use crate::bot::{Context, Error};
use crate::session::AuthorizationPolicy;
use crate::session::auth::normalize_role;
use crate::utils::format::format_success_message;
use poise::serenity_prelude as serenity;

/// Gives a member one of the classroom roles
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn assignrole(
    ctx: Context<'_>,
    #[description = "Member to give the role to"] user: serenity::Member,
    #[description = "Role name (student, ta, teacher)"]
    #[rest]
    role_name: String,
) -> Result<(), Error> {
    if authorize(ctx, &AuthorizationPolicy::OwnerOnly, "assign roles").await?.is_none() {
        return Ok(());
    }

    let role = match resolve_assignable_role(ctx, &role_name).await? {
        Some(role) => role,
        None => return Ok(()),
    };

    if user.roles.contains(&role.id) {
        return say_error(ctx, &format!("{} already has the {} role!", user.display_name(), role.name)).await;
    }

    user.add_role(ctx.http(), role.id).await?;
    tracing::info!("Assigned role {} to {}", role.name, user.user.name);
    ctx.say(format_success_message(&format!(
        "{} has been assigned to {}.",
        role.name,
        user.display_name()
    )))
    .await?;

    Ok(())
}

/// Takes one of the classroom roles away from a member
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn unassignrole(
    ctx: Context<'_>,
    #[description = "Member to take the role from"] user: serenity::Member,
    #[description = "Role name (student, ta, teacher)"]
    #[rest]
    role_name: String,
) -> Result<(), Error> {
    if authorize(ctx, &AuthorizationPolicy::OwnerOnly, "unassign roles").await?.is_none() {
        return Ok(());
    }

    let role = match resolve_assignable_role(ctx, &role_name).await? {
        Some(role) => role,
        None => return Ok(()),
    };

    if !user.roles.contains(&role.id) {
        return say_error(ctx, &format!("{} does not have the {} role!", user.display_name(), role.name)).await;
    }

    user.remove_role(ctx.http(), role.id).await?;
    tracing::info!("Removed role {} from {}", role.name, user.user.name);
    ctx.say(format_success_message(&format!(
        "{} has been removed from {}.",
        role.name,
        user.display_name()
    )))
    .await?;

    Ok(())
}

/// Finds a role the bot may hand out. Tells the author why not otherwise.
async fn resolve_assignable_role(ctx: Context<'_>, role_name: &str) -> Result<Option<serenity::Role>, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        say_error(ctx, "This command only works in a server").await?;
        return Ok(None);
    };

    let wanted = normalize_role(role_name);
    let roles = guild_id.roles(ctx.http()).await?;

    let Some(role) = roles.values().find(|role| normalize_role(&role.name) == wanted).cloned() else {
        say_error(ctx, "Role not found!").await?;
        return Ok(None);
    };

    // The bot can only manage roles below its own highest role.
    let bot_id = ctx.cache().current_user().id;
    let bot_member = guild_id.member(ctx.http(), bot_id).await?;
    let bot_top = bot_member
        .roles
        .iter()
        .filter_map(|id| roles.get(id))
        .map(|role| role.position)
        .max()
        .unwrap_or(0);
    if role.position >= bot_top {
        say_error(ctx, "You don't have the permissions to assign this role.").await?;
        return Ok(None);
    }

    if !ctx.data().config.assignable_roles.contains(&wanted) {
        say_error(ctx, "This role cannot be assigned.").await?;
        return Ok(None);
    }

    Ok(Some(role))
}
