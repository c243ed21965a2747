//! Posts guild join/leave notices to the log webhook, when one is configured.

use color_eyre::Result;
use poise::serenity_prelude as serenity;
use serde_json::Value;

use crate::config;

const JOIN_GREEN: u32 = 0x005F_AD68;
const LEAVE_RED: u32 = 0x00FF_0000;

fn guild_embed(title: &str, colour: u32, guild: &serenity::Guild) -> Value {
    let bots = guild
        .members
        .values()
        .filter(|member| member.user.bot)
        .count();
    let metadata = [
        format!("Owner: {}", serenity::Mention::from(guild.owner_id)),
        format!("Name: {}", guild.name),
        format!("Members: {}", guild.member_count),
        format!("Bots: {bots}"),
        format!("Boost Tier: {:?}", guild.premium_tier),
    ];

    serenity::Embed::fake(|embed| {
        embed
            .title(title.to_owned())
            .description(metadata.join("\n"))
            .colour(colour)
    })
}

async fn post(ctx: &serenity::Context, embed: Value) -> Result<()> {
    let Some(url) = config::log_webhook() else {
        return Ok(());
    };

    let webhook = serenity::Webhook::from_url(ctx, &url).await?;
    webhook
        .execute(ctx, false, |message| message.embeds(vec![embed]))
        .await?;
    Ok(())
}

pub async fn guild_joined(ctx: &serenity::Context, guild: &serenity::Guild) -> Result<()> {
    post(ctx, guild_embed("I joined a new guild!", JOIN_GREEN, guild)).await
}

pub async fn guild_left(
    ctx: &serenity::Context,
    incomplete: &serenity::UnavailableGuild,
    full: Option<&serenity::Guild>,
) -> Result<()> {
    // Outages also fire this event; only log actual removals.
    if incomplete.unavailable {
        return Ok(());
    }

    let embed = match full {
        Some(guild) => guild_embed("I have left a guild", LEAVE_RED, guild),
        None => serenity::Embed::fake(|embed| {
            embed
                .title("I have left a guild")
                .description(format!("ID: {}", incomplete.id))
                .colour(LEAVE_RED)
        }),
    };
    post(ctx, embed).await
}
