use crate::bot::{Context, Error};
use crate::session::delivery::{Delivery, DeliveryHandle, Outbound};
use crate::session::roster::{MemberInfo, RosterFilter, RosterProvider, filter_members};
use crate::session::{Actor, ChannelKey, Participant, PlatformError};
use crate::utils::format::create_summary_embed;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use std::sync::Arc;

const MEMBER_PAGE_SIZE: u64 = 1000;

/// Roster of a guild, fetched over HTTP at session open.
pub struct GuildRoster {
    http: Arc<serenity::Http>,
    guild_id: serenity::GuildId,
}

impl GuildRoster {
    pub fn new(http: Arc<serenity::Http>, guild_id: serenity::GuildId) -> Self {
        Self { http, guild_id }
    }

    async fn fetch_members(&self) -> Result<Vec<serenity::Member>, serenity::Error> {
        let mut members = Vec::new();
        let mut after = None;

        loop {
            let page = self
                .guild_id
                .members(&self.http, Some(MEMBER_PAGE_SIZE), after)
                .await?;
            let page_len = page.len() as u64;
            after = page.last().map(|member| member.user.id);
            members.extend(page);

            if page_len < MEMBER_PAGE_SIZE {
                break;
            }
        }

        Ok(members)
    }
}

#[async_trait]
impl RosterProvider for GuildRoster {
    async fn request_roster(&self, filter: &RosterFilter) -> Result<Vec<Participant>, PlatformError> {
        let unavailable = |e: serenity::Error| PlatformError::RosterUnavailable(e.to_string());

        let roles = self.guild_id.roles(&self.http).await.map_err(unavailable)?;
        let members = self.fetch_members().await.map_err(unavailable)?;

        let infos = members
            .into_iter()
            .map(|member| MemberInfo {
                participant: Participant::new(member.user.id.get(), member.display_name()),
                is_bot: member.user.bot,
                roles: role_names(&roles, &member.roles),
            })
            .collect();

        let roster = filter_members(infos, filter);
        tracing::info!("Fetched roster of {} for guild {} ({:?})", roster.len(), self.guild_id, filter);
        Ok(roster)
    }
}

/// Sends summaries and files to guild channels.
pub struct DiscordDelivery {
    http: Arc<serenity::Http>,
}

impl DiscordDelivery {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Delivery for DiscordDelivery {
    async fn deliver(&self, target: ChannelKey, message: Outbound) -> Result<DeliveryHandle, PlatformError> {
        let builder = match message {
            Outbound::Text(text) => serenity::CreateMessage::new().content(text),
            Outbound::Summary(summary) => serenity::CreateMessage::new().embed(create_summary_embed(&summary)),
        };

        let sent = serenity::ChannelId::new(target.0)
            .send_message(&self.http, builder)
            .await
            .map_err(|e| PlatformError::DeliveryFailure(e.to_string()))?;

        Ok(DeliveryHandle(sent.id.get()))
    }

    async fn export_artifact(
        &self,
        target: ChannelKey,
        payload: Vec<u8>,
        filename: &str,
    ) -> Result<DeliveryHandle, PlatformError> {
        let builder = serenity::CreateMessage::new()
            .content(format!("📎 {}", filename))
            .add_file(serenity::CreateAttachment::bytes(payload, filename));

        let sent = serenity::ChannelId::new(target.0)
            .send_message(&self.http, builder)
            .await
            .map_err(|e| PlatformError::DeliveryFailure(e.to_string()))?;

        Ok(DeliveryHandle(sent.id.get()))
    }
}

pub fn role_names(roles: &HashMap<serenity::RoleId, serenity::Role>, ids: &[serenity::RoleId]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| roles.get(id))
        .map(|role| role.name.clone())
        .collect()
}

/// Builds the permission view of the command author. Bot owners and the guild
/// owner count as owners.
pub async fn actor_for(ctx: Context<'_>) -> Result<Actor, Error> {
    let author = ctx.author();
    let bot_owner = ctx.framework().options().owners.contains(&author.id);
    let guild_owner = ctx.guild().map(|guild| guild.owner_id == author.id).unwrap_or(false);

    let mut roles = Vec::new();
    if let Some(guild_id) = ctx.guild_id() {
        if let Some(member) = ctx.author_member().await {
            let guild_roles = guild_id.roles(ctx.http()).await?;
            roles = role_names(&guild_roles, &member.roles);
        }
    }

    Ok(Actor::new(author.id.get(), author.name.clone(), bot_owner || guild_owner, roles))
}

pub fn channel_key(ctx: Context<'_>) -> ChannelKey {
    ChannelKey(ctx.channel_id().get())
}
