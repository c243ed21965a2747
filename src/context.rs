//! Reply helpers shared by every command. All bot output goes through here so
//! embeds get the house style, replies carry a delete button, and the reply
//! cache stays in sync for the edit/delete listeners.

use color_eyre::Result;
use poise::serenity_prelude as serenity;
use tracing::warn;

use crate::{bot::Context, reply_cache::CachedReply};

pub const ACCENT: serenity::Colour = serenity::Colour::BLURPLE;

/// The author's role colour, when there is one to borrow.
fn accent_colour(ctx: Context<'_>) -> serenity::Colour {
    ctx.guild()
        .and_then(|guild| {
            guild
                .members
                .get(&ctx.author().id)
                .and_then(|member| member.colour(ctx.discord()))
        })
        .unwrap_or(ACCENT)
}

fn delete_button<'a>(
    components: &'a mut serenity::CreateComponents,
    author: serenity::UserId,
) -> &'a mut serenity::CreateComponents {
    components.create_action_row(|row| {
        row.create_button(|button| {
            button
                .custom_id(format!("delete:{author}"))
                .style(serenity::ButtonStyle::Danger)
                .emoji('🗑')
        })
    })
}

/// Sends an embed reply. Colour, timestamp and footer are filled in unless
/// the builder already set them.
pub async fn send_embed<F>(ctx: Context<'_>, build: F) -> Result<()>
where
    F: FnOnce(&mut serenity::CreateEmbed) -> &mut serenity::CreateEmbed,
{
    let author = ctx.author().clone();
    let colour = accent_colour(ctx);

    let handle = ctx
        .send(|reply| {
            reply
                .embed(|embed| {
                    build(embed);
                    if !embed.0.contains_key("color") {
                        embed.colour(colour);
                    }
                    if !embed.0.contains_key("timestamp") {
                        embed.timestamp(serenity::Timestamp::now());
                    }
                    if !embed.0.contains_key("footer") {
                        embed.footer(|footer| {
                            footer
                                .text(format!("Command ran by {}", author.name))
                                .icon_url(author.face())
                        });
                    }
                    embed
                })
                .components(|components| delete_button(components, author.id))
        })
        .await?;

    track_reply(ctx, &handle).await;
    Ok(())
}

/// Sends a plain text reply with the same delete button and tracking.
pub async fn say(ctx: Context<'_>, content: impl Into<String>) -> Result<()> {
    let author_id = ctx.author().id;
    let handle = ctx
        .send(|reply| {
            reply
                .content(content.into())
                .components(|components| delete_button(components, author_id))
        })
        .await?;

    track_reply(ctx, &handle).await;
    Ok(())
}

/// Reacts with a tick on prefix invocations; slash invocations get a short
/// ephemeral confirmation instead.
pub async fn acknowledge(ctx: Context<'_>) -> Result<()> {
    match ctx {
        poise::Context::Prefix(prefix_ctx) => {
            prefix_ctx.msg.react(ctx.discord(), '✅').await?;
        }
        poise::Context::Application(_) => {
            ctx.send(|reply| reply.content("Done!").ephemeral(true))
                .await?;
        }
    }
    Ok(())
}

async fn track_reply(ctx: Context<'_>, handle: &poise::ReplyHandle<'_>) {
    let poise::Context::Prefix(prefix_ctx) = ctx else {
        return;
    };

    match handle.message().await {
        Ok(message) => {
            ctx.data().replies.insert(
                prefix_ctx.msg.id,
                CachedReply {
                    channel_id: message.channel_id,
                    message_id: message.id,
                },
            );
        }
        Err(e) => warn!("Failed to resolve reply for tracking: {e}"),
    }
}
