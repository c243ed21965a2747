use color_eyre::{eyre::eyre, Result};
use poise::serenity_prelude as serenity;

use crate::{bot::Context, context};

/// The invoker must outrank the target, and so must the bot.
fn hierarchy_allows(
    ctx: Context<'_>,
    moderator: serenity::UserId,
    target: serenity::UserId,
) -> Result<bool> {
    let guild = ctx.guild().ok_or_else(|| eyre!("Command run without guild"))?;
    let me = ctx.discord().cache.current_user_id();

    let moderator_wins =
        guild.greater_member_hierarchy(ctx.discord(), moderator, target) == Some(moderator);
    let bot_wins = guild.greater_member_hierarchy(ctx.discord(), me, target) == Some(me);

    Ok(moderator_wins && bot_wins)
}

/// Ban a member from this server.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Moderation",
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "The member to ban"] member: serenity::Member,
    #[description = "Why they are being banned"]
    #[rest]
    reason: Option<String>,
) -> Result<()> {
    if !hierarchy_allows(ctx, ctx.author().id, member.user.id)? {
        return context::say(ctx, "You can't ban someone above or equal to you!").await;
    }

    let reason = reason.unwrap_or_else(|| "no reason provided".to_owned());
    member
        .ban_with_reason(ctx.discord(), 0, &reason)
        .await?;

    context::send_embed(ctx, |embed| {
        embed
            .title("Banned")
            .description(format!("{} has been banned: {reason}", member.user.tag()))
    })
    .await
}

/// Kick a member from this server.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Moderation",
    guild_only,
    required_permissions = "KICK_MEMBERS",
    required_bot_permissions = "KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "The member to kick"] member: serenity::Member,
    #[description = "Why they are being kicked"]
    #[rest]
    reason: Option<String>,
) -> Result<()> {
    if !hierarchy_allows(ctx, ctx.author().id, member.user.id)? {
        return context::say(ctx, "You can't kick someone above or equal to you!").await;
    }

    let reason = reason.unwrap_or_else(|| "no reason provided".to_owned());
    member.kick_with_reason(ctx.discord(), &reason).await?;

    context::send_embed(ctx, |embed| {
        embed
            .title("Kicked")
            .description(format!("{} has been kicked: {reason}", member.user.tag()))
    })
    .await
}

/// Lift a ban by user ID.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Moderation",
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "The ID of the user to unban"] user_id: serenity::UserId,
) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_else(|| eyre!("Command run without guild"))?;
    guild_id.unban(ctx.discord(), user_id).await?;

    context::send_embed(ctx, |embed| {
        embed.title("Unbanned").description(format!(
            "{} has been unbanned.",
            serenity::Mention::from(user_id)
        ))
    })
    .await
}

pub fn clamp_purge_limit(requested: Option<u64>) -> u64 {
    requested.unwrap_or(20).clamp(1, 100)
}

/// Bulk delete recent messages in this channel.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Moderation",
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "MANAGE_MESSAGES"
)]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many messages to delete (1-100)"] amount: Option<u64>,
) -> Result<()> {
    // Prefix invocations get swept up first so they don't count against the
    // requested amount.
    if let poise::Context::Prefix(prefix_ctx) = ctx {
        prefix_ctx.msg.delete(ctx.discord()).await?;
    }

    let limit = clamp_purge_limit(amount);
    let messages = ctx
        .channel_id()
        .messages(ctx.discord(), |builder| builder.limit(limit))
        .await?;
    let ids: Vec<serenity::MessageId> = messages.iter().map(|message| message.id).collect();
    let deleted = ids.len();

    if deleted == 1 {
        ctx.channel_id()
            .delete_message(ctx.discord(), ids[0])
            .await?;
    } else if deleted > 1 {
        ctx.channel_id().delete_messages(ctx.discord(), ids).await?;
    }

    ctx.send(|reply| {
        reply
            .content(format!("Deleted {deleted} messages."))
            .ephemeral(true)
    })
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_limit_is_clamped_to_discords_bulk_range() {
        assert_eq!(clamp_purge_limit(None), 20);
        assert_eq!(clamp_purge_limit(Some(0)), 1);
        assert_eq!(clamp_purge_limit(Some(50)), 50);
        assert_eq!(clamp_purge_limit(Some(5000)), 100);
    }
}
