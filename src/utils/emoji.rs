use crate::session::Response;
use poise::serenity_prelude as serenity;

pub const PRESENT_EMOJI: &str = "✅";

pub const OPTION_EMOJIS: [&str; 10] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟"];

pub fn option_emoji(index: usize) -> Option<&'static str> {
    OPTION_EMOJIS.get(index).copied()
}

/// Maps a reaction to a response payload. Custom guild emoji never map.
pub fn payload_for(emoji: &str) -> Option<Response> {
    if emoji == PRESENT_EMOJI {
        return Some(Response::Present);
    }
    OPTION_EMOJIS
        .iter()
        .position(|candidate| *candidate == emoji)
        .map(Response::Choice)
}

pub fn payload_for_reaction(reaction: &serenity::ReactionType) -> Option<Response> {
    match reaction {
        serenity::ReactionType::Unicode(emoji) => payload_for(emoji),
        _ => None,
    }
}

pub fn reaction(emoji: &str) -> serenity::ReactionType {
    serenity::ReactionType::Unicode(emoji.to_string())
}
