use std::time::Duration;

use color_eyre::eyre::ErrReport;
use poise::serenity_prelude as serenity;
use thiserror::Error;
use tracing::{error, warn};

use crate::{bot::Bot, config, context};

/// A command was refused before it ran. These are expected outcomes, not
/// failures, and each one gets its own embed in the error handler.
#[derive(Debug, Error)]
pub enum Refusal {
    #[error("You have been blacklisted from using this bot: {0}")]
    Blacklisted(String),
    #[error("The bot is currently in maintenance mode: {0}")]
    Maintenance(String),
    #[error("This command has been disabled.")]
    CommandDisabled,
    #[error("Please wait {:.2} seconds before using another command.", .0.as_secs_f64())]
    OnCooldown(Duration),
}

impl Refusal {
    fn title(&self) -> &'static str {
        match self {
            Self::Blacklisted(_) => "Blacklisted",
            Self::Maintenance(_) => "Maintenance",
            Self::CommandDisabled => "Disabled",
            Self::OnCooldown(_) => "Cooldown",
        }
    }
}

/// A subreddit fetch came back without any posts.
#[derive(Debug, Error)]
#[error("I couldn't find any subreddit with that name.")]
pub struct NoSubredditFound;

const ERROR_RED: serenity::Colour = serenity::Colour(0x00F0_2E2E);

async fn send_error_embed(
    ctx: crate::bot::Context<'_>,
    title: &str,
    description: String,
) {
    let result = context::send_embed(ctx, |e| {
        e.title(title).description(description).colour(ERROR_RED)
    })
    .await;

    if let Err(e) = result {
        warn!("Failed to send error response: {e}");
    }
}

fn permission_names(permissions: serenity::Permissions) -> String {
    permissions.to_string()
}

/// Report an unexpected command error to the log webhook, if one is configured.
async fn report_to_webhook(ctx: crate::bot::Context<'_>, error: &ErrReport) {
    let Some(url) = config::log_webhook() else {
        return;
    };

    let location = ctx
        .guild()
        .map_or_else(|| "DMs".to_owned(), |guild| guild.name);
    let embed = serenity::Embed::fake(|e| {
        e.title(format!("Ignoring exception in {}", ctx.command().qualified_name))
            .description(format!("```\n{error:?}```"))
            .field(
                "Information",
                format!(
                    "User: {}\nLocation: {location}\nInvocation: `{}`",
                    ctx.author().tag(),
                    ctx.invocation_string(),
                ),
                false,
            )
            .colour(ERROR_RED)
    });

    let result = async {
        let webhook = serenity::Webhook::from_url(ctx.discord(), &url).await?;
        webhook
            .execute(ctx.discord(), false, |w| w.embeds(vec![embed]))
            .await
    }
    .await;

    if let Err(e) = result {
        warn!("Failed to report error to webhook: {e}");
    }
}

pub async fn on_error(framework_error: poise::FrameworkError<'_, Bot, ErrReport>) {
    match framework_error {
        poise::FrameworkError::Command { error, ctx } => {
            if let Some(refusal) = error.downcast_ref::<Refusal>() {
                send_error_embed(ctx, refusal.title(), refusal.to_string()).await;
                return;
            }
            if error.downcast_ref::<NoSubredditFound>().is_some() {
                send_error_embed(ctx, "No Subreddit Found", error.to_string()).await;
                return;
            }

            error!(
                "Error in command {}: {error:?}",
                ctx.command().qualified_name
            );
            report_to_webhook(ctx, &error).await;
            send_error_embed(
                ctx,
                "Error",
                "Sorry! An error occurred and has been reported to the developers. \
                 Don't worry, this isn't your fault."
                    .to_owned(),
            )
            .await;
        }
        poise::FrameworkError::CommandCheckFailed { error: Some(error), ctx } => {
            match error.downcast_ref::<Refusal>() {
                Some(refusal) => {
                    send_error_embed(ctx, refusal.title(), refusal.to_string()).await;
                }
                None => {
                    error!("Check error in {}: {error:?}", ctx.command().qualified_name);
                }
            }
        }
        poise::FrameworkError::CommandCheckFailed { error: None, .. } => {}
        poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
            let usage = crate::commands::help::usage_line(ctx.command());
            send_error_embed(
                ctx,
                "Wrong Arguments",
                format!("{error}\nPlease use the correct syntax: `{usage}`"),
            )
            .await;
        }
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
        } => {
            let names = missing_permissions.map_or_else(
                || "the required permissions".to_owned(),
                permission_names,
            );
            send_error_embed(
                ctx,
                "Missing Permissions",
                format!("You do not have the required permissions ({names}) to run this command."),
            )
            .await;
        }
        poise::FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
        } => {
            send_error_embed(
                ctx,
                "Bot Missing Permissions",
                format!(
                    "I do not have the required permissions ({}) to run the actions \
                     for this command.",
                    permission_names(missing_permissions)
                ),
            )
            .await;
        }
        poise::FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
        } => {
            send_error_embed(
                ctx,
                "Cooldown",
                format!(
                    "Please wait {:.2} seconds before using this command again.",
                    remaining_cooldown.as_secs_f64()
                ),
            )
            .await;
        }
        poise::FrameworkError::GuildOnly { ctx } => {
            send_error_embed(
                ctx,
                "Guild Only",
                "This command can only be used in a server.".to_owned(),
            )
            .await;
        }
        poise::FrameworkError::NotAnOwner { ctx } => {
            send_error_embed(
                ctx,
                "Owner Only",
                "Only my owners can use this command.".to_owned(),
            )
            .await;
        }
        // Expected with the empty prefix active in DMs.
        poise::FrameworkError::UnknownCommand { .. } => {}
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}
