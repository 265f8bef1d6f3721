use crate::bot::{Data, Error};
use crate::session::{ParticipantId, SessionId};
use crate::utils::emoji::payload_for_reaction;
use poise::serenity_prelude as serenity;

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Bot logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            handle_reaction(ctx, add_reaction, data);
        }
        _ => {}
    }
    Ok(())
}

/// Forwards a reaction to the session collector. Never blocks on I/O.
fn handle_reaction(ctx: &serenity::Context, reaction: &serenity::Reaction, data: &Data) {
    let Some(user_id) = reaction.user_id else {
        return;
    };
    if user_id == ctx.cache.current_user().id {
        return;
    }
    let Some(payload) = payload_for_reaction(&reaction.emoji) else {
        return;
    };

    data.sessions.collector().on_response_event(
        SessionId(reaction.message_id.get()),
        ParticipantId(user_id.get()),
        payload,
    );
}
