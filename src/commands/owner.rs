use color_eyre::{eyre::eyre, Result};
use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{bot::Context, context};

/// Toggle maintenance mode. While it's on, only owners can run commands.
#[poise::command(prefix_command, slash_command, category = "Owner", owners_only)]
pub async fn maintenance(
    ctx: Context<'_>,
    #[description = "Why the bot is going down"]
    #[rest]
    reason: Option<String>,
) -> Result<()> {
    let bot = ctx.data();
    let currently_on = bot.maintenance_reason().is_some();

    {
        let mut guard = bot
            .maintenance
            .write()
            .map_err(|_| eyre!("Maintenance lock poisoned"))?;
        *guard = if currently_on {
            None
        } else {
            Some(reason.unwrap_or_else(|| "sorry for the inconvenience".to_owned()))
        };
    }

    if currently_on {
        info!("Maintenance mode disabled by {}", ctx.author().tag());
        context::say(ctx, "Maintenance mode is now off.").await
    } else {
        info!("Maintenance mode enabled by {}", ctx.author().tag());
        context::say(ctx, "Maintenance mode is now on.").await
    }
}

/// Manage who is banned from using the bot.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Owner",
    owners_only,
    subcommands("blacklist_list", "blacklist_add", "blacklist_remove")
)]
pub async fn blacklist(ctx: Context<'_>) -> Result<()> {
    blacklist_overview(ctx).await
}

async fn blacklist_overview(ctx: Context<'_>) -> Result<()> {
    let entries: Vec<String> = ctx
        .data()
        .blacklist
        .iter()
        .map(|entry| {
            format!(
                "{}: {}",
                serenity::Mention::from(*entry.key()),
                entry.value()
            )
        })
        .collect();

    if entries.is_empty() {
        return context::say(ctx, "Nobody is blacklisted right now.").await;
    }
    context::send_embed(ctx, |embed| {
        embed.title("Blacklist").description(entries.join("\n"))
    })
    .await
}

/// Show everyone on the blacklist.
#[poise::command(prefix_command, slash_command, rename = "list")]
pub async fn blacklist_list(ctx: Context<'_>) -> Result<()> {
    blacklist_overview(ctx).await
}

/// Blacklist a user.
#[poise::command(prefix_command, slash_command, rename = "add")]
pub async fn blacklist_add(
    ctx: Context<'_>,
    #[description = "The user to blacklist"] user: serenity::User,
    #[description = "Why"]
    #[rest]
    reason: Option<String>,
) -> Result<()> {
    if ctx.data().is_owner(user.id) {
        return context::say(ctx, "You can't blacklist an owner!").await;
    }

    let reason = reason.unwrap_or_else(|| "no reason provided".to_owned());
    sqlx::query(include_str!("queries/blacklist-add.sql"))
        .bind(user.id.to_string())
        .bind(&reason)
        .execute(&ctx.data().db)
        .await?;
    ctx.data().blacklist.insert(user.id, reason);

    context::acknowledge(ctx).await
}

/// Remove a user from the blacklist.
#[poise::command(prefix_command, slash_command, rename = "remove")]
pub async fn blacklist_remove(
    ctx: Context<'_>,
    #[description = "The user to unblacklist"] user: serenity::User,
) -> Result<()> {
    if ctx.data().blacklist.remove(&user.id).is_none() {
        return context::say(ctx, "That user isn't blacklisted!").await;
    }

    sqlx::query(include_str!("queries/blacklist-remove.sql"))
        .bind(user.id.to_string())
        .execute(&ctx.data().db)
        .await?;

    context::acknowledge(ctx).await
}

/// Manage who skips the global command cooldown.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Owner",
    owners_only,
    subcommands("bypass_add", "bypass_remove")
)]
pub async fn bypass(ctx: Context<'_>) -> Result<()> {
    let entries: Vec<String> = ctx
        .data()
        .cooldown_bypass
        .iter()
        .map(|id| serenity::Mention::from(*id).to_string())
        .collect();

    if entries.is_empty() {
        return context::say(ctx, "Nobody has a cooldown bypass right now.").await;
    }
    context::send_embed(ctx, |embed| {
        embed
            .title("Cooldown Bypass")
            .description(entries.join("\n"))
    })
    .await
}

/// Let a user skip the cooldown.
#[poise::command(prefix_command, slash_command, rename = "add")]
pub async fn bypass_add(
    ctx: Context<'_>,
    #[description = "The user to exempt"] user: serenity::User,
) -> Result<()> {
    if !ctx.data().cooldown_bypass.insert(user.id) {
        return context::say(ctx, "They already bypass the cooldown!").await;
    }

    sqlx::query(include_str!("queries/bypass-add.sql"))
        .bind(user.id.to_string())
        .execute(&ctx.data().db)
        .await?;

    context::acknowledge(ctx).await
}

/// Put a user back on the cooldown.
#[poise::command(prefix_command, slash_command, rename = "remove")]
pub async fn bypass_remove(
    ctx: Context<'_>,
    #[description = "The user to put back on cooldown"] user: serenity::User,
) -> Result<()> {
    if ctx.data().cooldown_bypass.remove(&user.id).is_none() {
        return context::say(ctx, "They weren't bypassing the cooldown!").await;
    }

    sqlx::query(include_str!("queries/bypass-remove.sql"))
        .bind(user.id.to_string())
        .execute(&ctx.data().db)
        .await?;

    context::acknowledge(ctx).await
}

/// Runtime-disabled commands live in a set the global check consults, so the
/// canonical name is what gets stored regardless of how it was spelled.
fn canonical_command_name(ctx: Context<'_>, requested: &str) -> Option<String> {
    ctx.framework()
        .options
        .commands
        .iter()
        .find(|command| {
            command.name.eq_ignore_ascii_case(requested)
                || command
                    .aliases
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(requested))
        })
        .map(|command| command.name.to_string())
}

/// Disable a command everywhere until it's enabled again.
#[poise::command(prefix_command, slash_command, category = "Owner", owners_only)]
pub async fn disable(
    ctx: Context<'_>,
    #[description = "The command to disable"] command: String,
) -> Result<()> {
    let Some(name) = canonical_command_name(ctx, &command) else {
        return context::say(ctx, format!("I don't have a command called `{command}`!")).await;
    };

    if !ctx.data().disabled_commands.insert(name.clone()) {
        return context::say(ctx, format!("`{name}` is already disabled!")).await;
    }
    context::say(ctx, format!("`{name}` has been disabled.")).await
}

/// Re-enable a disabled command.
#[poise::command(prefix_command, slash_command, category = "Owner", owners_only)]
pub async fn enable(
    ctx: Context<'_>,
    #[description = "The command to enable"] command: String,
) -> Result<()> {
    let Some(name) = canonical_command_name(ctx, &command) else {
        return context::say(ctx, format!("I don't have a command called `{command}`!")).await;
    };

    if ctx.data().disabled_commands.remove(&name).is_none() {
        return context::say(ctx, format!("`{name}` isn't disabled!")).await;
    }
    context::say(ctx, format!("`{name}` has been enabled.")).await
}

/// Speak through the bot.
#[poise::command(prefix_command, slash_command, category = "Owner", owners_only)]
pub async fn say(
    ctx: Context<'_>,
    #[description = "What to say"]
    #[rest]
    message: String,
) -> Result<()> {
    if let poise::Context::Prefix(prefix_ctx) = ctx {
        let _ = prefix_ctx.msg.delete(ctx.discord()).await;
    }

    ctx.channel_id().say(ctx.discord(), message).await?;

    if let poise::Context::Application(_) = ctx {
        ctx.send(|reply| reply.content("Sent!").ephemeral(true))
            .await?;
    }
    Ok(())
}

/// Delete the message this one replies to.
#[poise::command(prefix_command, category = "Owner", owners_only)]
pub async fn delmsg(ctx: Context<'_>) -> Result<()> {
    let poise::Context::Prefix(prefix_ctx) = ctx else {
        return Ok(());
    };

    let Some(referenced) = &prefix_ctx.msg.referenced_message else {
        return context::say(ctx, "Reply to the message you want me to delete!").await;
    };

    referenced.delete(ctx.discord()).await?;
    prefix_ctx.msg.delete(ctx.discord()).await?;
    Ok(())
}

/// Change the bot's nickname in this server.
#[poise::command(prefix_command, slash_command, category = "Owner", owners_only, guild_only)]
pub async fn nick(
    ctx: Context<'_>,
    #[description = "The new nickname (omit to reset)"]
    #[rest]
    nickname: Option<String>,
) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_else(|| eyre!("Command run without guild"))?;
    guild_id
        .edit_nickname(ctx.discord(), nickname.as_deref())
        .await?;

    context::acknowledge(ctx).await
}

/// Shut the bot down cleanly.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Owner",
    owners_only,
    aliases("logout", "quit")
)]
pub async fn shutdown(ctx: Context<'_>) -> Result<()> {
    context::say(ctx, "Goodbye!").await?;
    info!("Shutdown requested by {}", ctx.author().tag());

    ctx.framework()
        .shard_manager
        .lock()
        .await
        .shutdown_all()
        .await;
    Ok(())
}

/// Interactive slash command (de)registration.
#[poise::command(prefix_command, category = "Owner", owners_only)]
pub async fn register(ctx: Context<'_>) -> Result<()> {
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}
