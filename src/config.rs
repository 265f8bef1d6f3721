use crate::session::{RetentionPolicy, SessionDuration};
use crate::session::model::MAX_WINDOW_SECS;
use anyhow::Result;
use chrono::FixedOffset;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub command_prefix: String,
    pub staff_roles: Vec<String>,
    pub student_role: String,
    pub assignable_roles: Vec<String>,
    pub announcement_channel: String,
    pub assignment_channel: String,
    pub default_window_secs: i64,
    pub utc_offset: FixedOffset,
    pub retention: RetentionPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN environment variable is required"))?;

        let command_prefix = env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string());

        let staff_roles = parse_list(&env::var("STAFF_ROLES").unwrap_or_else(|_| "teacher,ta".to_string()));

        let student_role = env::var("STUDENT_ROLE").unwrap_or_else(|_| "student".to_string());

        let assignable_roles =
            parse_list(&env::var("ASSIGNABLE_ROLES").unwrap_or_else(|_| "student,ta,teacher".to_string()));

        let announcement_channel =
            env::var("ANNOUNCEMENT_CHANNEL").unwrap_or_else(|_| "announcements".to_string());

        let assignment_channel = env::var("ASSIGNMENT_CHANNEL").unwrap_or_else(|_| "assignments".to_string());

        let default_window_secs = match env::var("DEFAULT_WINDOW_SECS") {
            Ok(value) => parse_window_secs(&value)?,
            Err(_) => 60,
        };

        let utc_offset = match env::var("UTC_OFFSET_HOURS") {
            Ok(value) => parse_utc_offset(&value)?,
            Err(_) => parse_utc_offset("0")?,
        };

        let retention = parse_retention(env::var("SESSION_RETENTION").ok().as_deref())?;

        Ok(Config {
            discord_token,
            command_prefix,
            staff_roles,
            student_role,
            assignable_roles,
            announcement_channel,
            assignment_channel,
            default_window_secs,
            utc_offset,
            retention,
        })
    }
}

/// Comma separated, lowercased, blanks dropped.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn parse_window_secs(value: &str) -> Result<i64> {
    let secs: i64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("DEFAULT_WINDOW_SECS must be a whole number of seconds"))?;
    if !SessionDuration::from_secs(secs).is_valid() {
        return Err(anyhow::anyhow!(
            "DEFAULT_WINDOW_SECS must be between 1 and {}",
            MAX_WINDOW_SECS
        ));
    }
    Ok(secs)
}

pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let hours: i32 = value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("UTC_OFFSET_HOURS must be a whole number of hours"))?;
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| anyhow::anyhow!("UTC_OFFSET_HOURS out of range: {}", hours))
}

pub fn parse_retention(value: Option<&str>) -> Result<RetentionPolicy> {
    match value.map(str::trim) {
        None | Some("") | Some("all") => Ok(RetentionPolicy::KeepAll),
        Some(limit) => {
            let limit: usize = limit
                .parse()
                .map_err(|_| anyhow::anyhow!("SESSION_RETENTION must be a number or \"all\""))?;
            Ok(RetentionPolicy::KeepLast(limit))
        }
    }
}
