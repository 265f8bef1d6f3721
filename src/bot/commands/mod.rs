pub mod attendance;
pub mod breakout;
pub mod general;
pub mod polls;
pub mod posts;
pub mod qa;
pub mod roles;

use crate::bot::platform::actor_for;
use crate::bot::{Context, Error};
use crate::session::{Actor, AuthorizationPolicy};
use crate::utils::format::format_error_message;

/// Resolves the author and checks `policy`. On denial the author is told and
/// `None` is returned.
pub async fn authorize(
    ctx: Context<'_>,
    policy: &AuthorizationPolicy,
    action: &str,
) -> Result<Option<Actor>, Error> {
    let actor = actor_for(ctx).await?;
    match policy.authorize(&actor, action) {
        Ok(()) => Ok(Some(actor)),
        Err(e) => {
            ctx.say(format_error_message(&e.to_string())).await?;
            Ok(None)
        }
    }
}

pub async fn say_error(ctx: Context<'_>, message: &str) -> Result<(), Error> {
    ctx.say(format_error_message(message)).await?;
    Ok(())
}
