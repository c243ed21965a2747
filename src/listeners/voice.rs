//! Ephemeral per-member voice channels.
//!
//! Joining a guild's lobby channel creates a personal voice channel in the
//! configured category and moves the member into it. Once a personal channel
//! empties it gets five minutes of grace; someone joining in time cancels
//! the reaper, otherwise the channel and its database row are deleted. The
//! whole lifecycle is best effort: failures are logged and swallowed.

use std::{sync::Arc, time::Duration};

use color_eyre::Result;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use sqlx::SqlitePool;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::bot::{Bot, GuildConfig};

const GRACE_PERIOD: Duration = Duration::from_secs(300);

pub async fn dispatch(
    ctx: &serenity::Context,
    old: Option<&serenity::VoiceState>,
    new: &serenity::VoiceState,
    bot: &Bot,
) -> Result<()> {
    let old_channel = old.and_then(|state| state.channel_id);
    let new_channel = new.channel_id;
    if old_channel == new_channel {
        // Mute/deafen churn within the same channel.
        return Ok(());
    }

    if let Some(channel) = new_channel {
        member_joined(ctx, new, channel, bot).await?;
    }
    if let Some(channel) = old_channel {
        member_left(ctx, new, channel, bot).await?;
    }

    Ok(())
}

fn occupants(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    channel: serenity::ChannelId,
) -> usize {
    ctx.cache.guild(guild_id).map_or(0, |guild| {
        guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel))
            .count()
    })
}

async fn dm(
    ctx: &serenity::Context,
    user: serenity::UserId,
    content: &str,
) -> Result<serenity::Message> {
    let channel = user.create_dm_channel(ctx).await?;
    Ok(channel.say(ctx, content).await?)
}

async fn member_joined(
    ctx: &serenity::Context,
    state: &serenity::VoiceState,
    channel: serenity::ChannelId,
    bot: &Bot,
) -> Result<()> {
    // Someone coming back to a personal channel on its grace period calls
    // off the reaper.
    if let Some(waiter) = bot.voice_waiters.get(&channel) {
        waiter.notify_one();
        return Ok(());
    }

    let Some(guild_id) = state.guild_id else {
        return Ok(());
    };
    let Some(member) = &state.member else {
        return Ok(());
    };
    if member.user.bot {
        return Ok(());
    }

    let (lobby, category, enabled, existing) = match bot.guild_configs.get(&guild_id) {
        Some(config) => (
            config.voice_lobby,
            config.voice_category,
            config.voice_enabled,
            config
                .personal_channels
                .values()
                .any(|owner| *owner == member.user.id),
        ),
        None => return Ok(()),
    };

    if !enabled || lobby != Some(channel) {
        return Ok(());
    }
    let Some(category) = category else {
        return Ok(());
    };

    if existing {
        let _ = dm(
            ctx,
            member.user.id,
            "You can only have 1 private channel per server!",
        )
        .await;
        return Ok(());
    }

    let personal = guild_id
        .create_channel(ctx, |builder| {
            builder
                .name(member.display_name().into_owned())
                .kind(serenity::ChannelType::Voice)
                .category(category)
        })
        .await?;
    guild_id.move_member(ctx, member.user.id, personal.id).await?;

    bot.guild_configs
        .entry(guild_id)
        .or_default()
        .personal_channels
        .insert(personal.id, member.user.id);
    sqlx::query(include_str!("queries/voice-claim.sql"))
        .bind(personal.id.to_string())
        .bind(guild_id.to_string())
        .bind(member.user.id.to_string())
        .execute(&bot.db)
        .await?;

    info!(
        "Created personal voice channel {} for {} in guild {guild_id}",
        personal.id,
        member.user.tag(),
    );
    let _ = dm(
        ctx,
        member.user.id,
        "Welcome to your own voice chat! Here, you lay the rules. \
         Your house, your magic. Have fun!",
    )
    .await;

    Ok(())
}

async fn member_left(
    ctx: &serenity::Context,
    state: &serenity::VoiceState,
    channel: serenity::ChannelId,
    bot: &Bot,
) -> Result<()> {
    let Some(guild_id) = state.guild_id else {
        return Ok(());
    };

    let owner = match bot.guild_configs.get(&guild_id) {
        Some(config) => match config.personal_channels.get(&channel) {
            Some(owner) => *owner,
            None => return Ok(()),
        },
        None => return Ok(()),
    };

    if occupants(ctx, guild_id, channel) > 0 || bot.voice_waiters.contains_key(&channel) {
        return Ok(());
    }

    let notify = Arc::new(Notify::new());
    bot.voice_waiters.insert(channel, notify.clone());

    let warning = dm(
        ctx,
        owner,
        "I will delete your private channel for inactivity in 5 minutes if it's not used!",
    )
    .await
    .ok();

    spawn_reaper(ReaperContext {
        ctx: ctx.clone(),
        db: bot.db.clone(),
        guild_configs: bot.guild_configs.clone(),
        waiters: bot.voice_waiters.clone(),
        guild_id,
        channel,
        notify,
        warning,
    });

    Ok(())
}

struct ReaperContext {
    ctx: serenity::Context,
    db: SqlitePool,
    guild_configs: Arc<DashMap<serenity::GuildId, GuildConfig>>,
    waiters: Arc<DashMap<serenity::ChannelId, Arc<Notify>>>,
    guild_id: serenity::GuildId,
    channel: serenity::ChannelId,
    notify: Arc<Notify>,
    warning: Option<serenity::Message>,
}

fn spawn_reaper(reaper: ReaperContext) {
    tokio::spawn(async move {
        let rescued = tokio::time::timeout(GRACE_PERIOD, reaper.notify.notified())
            .await
            .is_ok();

        if rescued {
            if let Some(warning) = &reaper.warning {
                if let Err(e) = warning.delete(&reaper.ctx).await {
                    warn!("Failed to delete inactivity warning: {e}");
                }
            }
        } else {
            if let Err(e) = reaper.channel.delete(&reaper.ctx).await {
                warn!(
                    "Failed to delete inactive personal channel {}: {e}",
                    reaper.channel
                );
            }
            if let Err(e) = sqlx::query(include_str!("queries/voice-release.sql"))
                .bind(reaper.channel.to_string())
                .execute(&reaper.db)
                .await
            {
                warn!("Failed to drop voice channel row: {e}");
            }
            if let Some(mut config) = reaper.guild_configs.get_mut(&reaper.guild_id) {
                config.personal_channels.remove(&reaper.channel);
            }
            info!(
                "Reaped inactive personal voice channel {} in guild {}",
                reaper.channel, reaper.guild_id
            );
        }

        reaper.waiters.remove(&reaper.channel);
    });
}
