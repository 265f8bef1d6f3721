pub mod commands;
pub mod handlers;
pub mod platform;

use crate::config::Config;
use crate::session::delivery::run_report_loop;
use crate::session::roster::RosterFilter;
use crate::session::{AuthorizationPolicy, Reporter, SessionManager, SessionStore, TokioClock};
use anyhow::Result;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[derive(Clone)]
pub struct Data {
    pub config: Config,
    pub sessions: SessionManager,
    pub reporter: Reporter,
}

impl Data {
    pub fn staff_policy(&self) -> &AuthorizationPolicy {
        self.sessions.policy()
    }

    /// Who takes part in attendance checks, quizzes and polls.
    pub fn student_filter(&self) -> RosterFilter {
        RosterFilter::with_role_or_all(&self.config.student_role)
    }
}

pub async fn create_bot(config: Config) -> Result<serenity::Client> {
    let (sessions, results) = SessionManager::new(
        SessionStore::new(config.retention),
        Arc::new(TokioClock),
        AuthorizationPolicy::role_any_of(&config.staff_roles),
        config.utc_offset,
    );
    let reporter = Reporter::new(config.utc_offset);

    let data = Data {
        sessions,
        reporter,
        config: config.clone(),
    };

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::general::hello(),
                commands::roles::assignrole(),
                commands::roles::unassignrole(),
                commands::attendance::attendance(),
                commands::attendance::exportattendance(),
                commands::polls::quiz(),
                commands::polls::feedback(),
                commands::posts::assignment(),
                commands::posts::announce(),
                commands::breakout::breakout(),
                commands::breakout::closebreakout(),
                commands::qa::question(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tokio::spawn(run_report_loop(
                    results,
                    data.reporter,
                    platform::DiscordDelivery::new(ctx.http.clone()),
                ));
                Ok(data)
            })
        })
        .build();

    let client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    Ok(client)
}
