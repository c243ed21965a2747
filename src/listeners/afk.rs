//! AFK auto-replies and the bare-mention prefix hint.

use color_eyre::Result;
use poise::serenity_prelude as serenity;

use crate::{bot::Bot, prefixes};

pub async fn dispatch(
    ctx: &serenity::Context,
    message: &serenity::Message,
    bot: &Bot,
) -> Result<()> {
    if message.author.bot {
        return Ok(());
    }

    let me = ctx.cache.current_user_id();
    if message.content == format!("<@{me}>") || message.content == format!("<@!{me}>") {
        message
            .reply(ctx, "Hello, I am Alone Bot, my prefix is `alone`.")
            .await?;
        return Ok(());
    }

    for mention in &message.mentions {
        // Clone out of the map guard before awaiting.
        let reason = bot.afk.get(&mention.id).map(|entry| entry.value().clone());
        if let Some(reason) = reason {
            message
                .reply(
                    ctx,
                    format!(
                        "I'm sorry, but {} went afk: {reason}",
                        serenity::Mention::from(mention.id),
                    ),
                )
                .await?;
        }
    }

    if bot.afk.contains_key(&message.author.id) && !is_command_invocation(message, bot) {
        bot.afk.remove(&message.author.id);
        sqlx::query(include_str!("queries/afk-clear.sql"))
            .bind(message.author.id.to_string())
            .execute(&bot.db)
            .await?;

        message
            .reply(
                ctx,
                format!("Welcome back {}!", message.author.name),
            )
            .await?;
    }

    Ok(())
}

/// The message that *sets* AFK status must not immediately clear it again, so
/// anything that parses as a command invocation is left alone.
fn is_command_invocation(message: &serenity::Message, bot: &Bot) -> bool {
    let user_prefixes = bot
        .user_prefixes
        .get(&message.author.id)
        .map(|entry| entry.value().clone())
        .unwrap_or_default();
    let guild_prefix = message.guild_id.and_then(|guild_id| {
        bot.guild_configs
            .get(&guild_id)
            .and_then(|config| config.prefix.clone())
    });
    let empty_allowed = message.guild_id.is_none() || bot.owners.contains(&message.author.id);

    prefixes::match_prefix(
        &message.content,
        &user_prefixes,
        guild_prefix.as_deref(),
        empty_allowed,
    )
    .is_some()
}
