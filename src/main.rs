mod bot;
mod commands;
mod config;
mod context;
mod cooldown;
mod errors;
mod jobs;
mod listeners;
mod prefixes;
mod reply_cache;

use color_eyre::eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let token = config::discord_token()?;
    bot::run(&token).await
}
