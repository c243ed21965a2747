use std::env;

use color_eyre::{eyre::eyre, Result};
use poise::serenity_prelude::{GuildId, UserId};
use tracing::{info, instrument, warn};

pub fn discord_token() -> Result<String> {
    env::var("DISCORD_TOKEN").map_err(|_| eyre!("$DISCORD_TOKEN not set"))
}

pub fn database_path() -> String {
    env::var("DATABASE_PATH").unwrap_or_else(|_| "alonebot.db".to_owned())
}

#[instrument]
pub fn testing_guild() -> Option<GuildId> {
    let guild_id = match env::var("TESTING_GUILD") {
        Ok(guild_id) => guild_id,
        Err(e) => {
            info!("$TESTING_GUILD not set ({e})");
            return None;
        }
    };

    match guild_id.parse::<u64>() {
        Ok(guild_id) => Some(GuildId(guild_id)),
        Err(e) => {
            warn!("Ignoring $TESTING_GUILD: {e}");
            None
        }
    }
}

/// Extra owner IDs on top of the application owner, comma separated.
pub fn extra_owners() -> Vec<UserId> {
    let Ok(raw) = env::var("BOT_OWNERS") else {
        return vec![];
    };

    raw.split(',')
        .filter_map(|part| match part.trim().parse::<u64>() {
            Ok(id) => Some(UserId(id)),
            Err(e) => {
                warn!("Ignoring owner id {part:?} in $BOT_OWNERS: {e}");
                None
            }
        })
        .collect()
}

pub fn support_invite() -> Option<String> {
    env::var("SUPPORT_INVITE").ok()
}

pub fn github_url() -> Option<String> {
    env::var("GITHUB_URL").ok()
}

/// Webhook that receives guild join/leave notices and unexpected command errors.
pub fn log_webhook() -> Option<String> {
    match env::var("LOG_WEBHOOK") {
        Ok(url) => Some(url),
        Err(_) => {
            info!("$LOG_WEBHOOK not set, guild and error logging disabled");
            None
        }
    }
}

pub fn reply_sweep_schedule() -> String {
    env::var("REPLY_SWEEP_SCHEDULE").unwrap_or_else(|_| "0 * * * * *".to_owned())
}
