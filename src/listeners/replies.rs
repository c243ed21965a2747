//! Keeps bot replies tied to the fate of the invocations that produced them:
//! deleting an invocation deletes the reply, editing one into a non-command
//! does too, and every tracked reply carries a delete button for its author.

use color_eyre::Result;
use poise::serenity_prelude as serenity;

use crate::{bot::Bot, prefixes};

pub async fn invocation_deleted(
    ctx: &serenity::Context,
    deleted: serenity::MessageId,
    bot: &Bot,
) -> Result<()> {
    if let Some(reply) = bot.replies.take(deleted) {
        reply
            .channel_id
            .delete_message(ctx, reply.message_id)
            .await?;
    }
    Ok(())
}

/// Edits that still look like commands are re-run by the framework's edit
/// tracker; this only handles the case where the command was edited away.
pub async fn invocation_edited(
    ctx: &serenity::Context,
    event: &serenity::MessageUpdateEvent,
    bot: &Bot,
) -> Result<()> {
    if !bot.replies.contains(event.id) {
        return Ok(());
    }
    let Some(content) = &event.content else {
        return Ok(());
    };

    let author_id = event.author.as_ref().map(|author| author.id);
    let user_prefixes = author_id
        .and_then(|id| bot.user_prefixes.get(&id))
        .map(|entry| entry.value().clone())
        .unwrap_or_default();
    let guild_prefix = event.guild_id.and_then(|guild_id| {
        bot.guild_configs
            .get(&guild_id)
            .and_then(|config| config.prefix.clone())
    });
    let empty_allowed = event.guild_id.is_none()
        || author_id.is_some_and(|id| bot.owners.contains(&id));

    let still_command = prefixes::match_prefix(
        content,
        &user_prefixes,
        guild_prefix.as_deref(),
        empty_allowed,
    )
    .is_some();

    if !still_command {
        if let Some(reply) = bot.replies.take(event.id) {
            reply
                .channel_id
                .delete_message(ctx, reply.message_id)
                .await?;
        }
    }

    Ok(())
}

/// The delete button under every tracked reply. Only the invoker gets to use
/// it; everyone else is told off ephemerally.
pub async fn component_clicked(
    ctx: &serenity::Context,
    component: &serenity::MessageComponentInteraction,
) -> Result<()> {
    let Some(author_id) = component.data.custom_id.strip_prefix("delete:") else {
        return Ok(());
    };
    let author_id = serenity::UserId(author_id.parse()?);

    if component.user.id == author_id {
        component.message.delete(ctx).await?;
    } else {
        component
            .create_interaction_response(ctx, |response| {
                response
                    .kind(serenity::InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|data| {
                        data.ephemeral(true).content(format!(
                            "This command was ran by {}, so you can't delete it!",
                            serenity::Mention::from(author_id)
                        ))
                    })
            })
            .await?;
    }

    Ok(())
}
