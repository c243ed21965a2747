use color_eyre::{eyre::eyre, Result};
use poise::serenity_prelude as serenity;

use crate::{bot::Context, context};

/// Configure personal voice channels for this server.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Voice",
    guild_only,
    required_permissions = "ADMINISTRATOR",
    subcommands("lobby", "category", "enable", "disable")
)]
pub async fn voice(ctx: Context<'_>) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_else(|| eyre!("Command run without guild"))?;
    let (lobby, category, enabled) = ctx
        .data()
        .guild_configs
        .get(&guild_id)
        .map(|config| {
            (
                config.voice_lobby,
                config.voice_category,
                config.voice_enabled,
            )
        })
        .unwrap_or_default();

    let describe = |channel: Option<serenity::ChannelId>| {
        channel.map_or_else(
            || "not set".to_owned(),
            |id| serenity::Mention::from(id).to_string(),
        )
    };

    context::send_embed(ctx, |embed| {
        embed.title("Personal Voice Channels").description(format!(
            "Enabled: {}\nLobby: {}\nCategory: {}",
            if enabled { "yes" } else { "no" },
            describe(lobby),
            describe(category),
        ))
    })
    .await
}

/// Members joining the lobby get their own channel in the configured category.
#[poise::command(prefix_command, slash_command)]
pub async fn lobby(
    ctx: Context<'_>,
    #[description = "The voice channel to use as the lobby"] channel: serenity::GuildChannel,
) -> Result<()> {
    if channel.kind != serenity::ChannelType::Voice {
        return context::say(ctx, "The lobby must be a voice channel!").await;
    }
    let guild_id = ctx.guild_id().ok_or_else(|| eyre!("Command run without guild"))?;

    sqlx::query(include_str!("queries/voice-lobby-set.sql"))
        .bind(guild_id.to_string())
        .bind(channel.id.to_string())
        .execute(&ctx.data().db)
        .await?;
    ctx.data()
        .guild_configs
        .entry(guild_id)
        .or_default()
        .voice_lobby = Some(channel.id);

    context::say(
        ctx,
        format!(
            "The voice lobby is now {}",
            serenity::Mention::from(channel.id)
        ),
    )
    .await
}

/// Personal channels get created inside this category.
#[poise::command(prefix_command, slash_command)]
pub async fn category(
    ctx: Context<'_>,
    #[description = "The category to create personal channels in"] channel: serenity::GuildChannel,
) -> Result<()> {
    if channel.kind != serenity::ChannelType::Category {
        return context::say(ctx, "That's not a category!").await;
    }
    let guild_id = ctx.guild_id().ok_or_else(|| eyre!("Command run without guild"))?;

    sqlx::query(include_str!("queries/voice-category-set.sql"))
        .bind(guild_id.to_string())
        .bind(channel.id.to_string())
        .execute(&ctx.data().db)
        .await?;
    ctx.data()
        .guild_configs
        .entry(guild_id)
        .or_default()
        .voice_category = Some(channel.id);

    context::say(
        ctx,
        format!(
            "Personal channels will be created under {}",
            serenity::Mention::from(channel.id)
        ),
    )
    .await
}

/// Turn personal voice channels on.
#[poise::command(prefix_command, slash_command)]
pub async fn enable(ctx: Context<'_>) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_else(|| eyre!("Command run without guild"))?;

    let ready = ctx
        .data()
        .guild_configs
        .get(&guild_id)
        .is_some_and(|config| config.voice_lobby.is_some() && config.voice_category.is_some());
    if !ready {
        return context::say(
            ctx,
            "Set a lobby and a category first, then enable the feature.",
        )
        .await;
    }

    sqlx::query(include_str!("queries/voice-enabled-set.sql"))
        .bind(guild_id.to_string())
        .bind(true)
        .execute(&ctx.data().db)
        .await?;
    ctx.data()
        .guild_configs
        .entry(guild_id)
        .or_default()
        .voice_enabled = true;

    context::say(ctx, "Personal voice channels are now enabled.").await
}

/// Turn personal voice channels off.
#[poise::command(prefix_command, slash_command)]
pub async fn disable(ctx: Context<'_>) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_else(|| eyre!("Command run without guild"))?;

    sqlx::query(include_str!("queries/voice-enabled-set.sql"))
        .bind(guild_id.to_string())
        .bind(false)
        .execute(&ctx.data().db)
        .await?;
    ctx.data()
        .guild_configs
        .entry(guild_id)
        .or_default()
        .voice_enabled = false;

    context::say(ctx, "Personal voice channels are now disabled.").await
}
