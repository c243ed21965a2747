use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use color_eyre::{eyre::ErrReport, Result};
use dashmap::{DashMap, DashSet};
use poise::serenity_prelude as serenity;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tokio::sync::Notify;
use tokio_cron_scheduler::JobScheduler;
use tracing::{error, info};

use crate::{
    commands, config,
    cooldown::CooldownBucket,
    errors::{self, Refusal},
    jobs::{self, JobContext},
    listeners, prefixes,
    reply_cache::ReplyCache,
};

pub type Context<'a> = poise::Context<'a, Bot, ErrReport>;

/// One item on a user's to-do list.
#[derive(Debug, Clone)]
pub struct TodoEntry {
    pub task: String,
    pub jump_url: String,
}

/// Per-guild feature toggles, mirrored to the `guilds` and `voice_channels`
/// tables.
#[derive(Debug, Clone, Default)]
pub struct GuildConfig {
    pub prefix: Option<String>,
    pub voice_lobby: Option<serenity::ChannelId>,
    pub voice_category: Option<serenity::ChannelId>,
    pub voice_enabled: bool,
    /// Personal voice channel -> owning member.
    pub personal_channels: HashMap<serenity::ChannelId, serenity::UserId>,
}

pub struct Bot {
    pub db: SqlitePool,
    pub http: reqwest::Client,
    scheduler: JobScheduler,
    scheduler_started: AtomicBool,

    pub owners: HashSet<serenity::UserId>,
    pub launch_time: chrono::DateTime<chrono::Utc>,
    pub command_counter: AtomicU64,
    pub maintenance: RwLock<Option<String>>,

    pub blacklist: DashMap<serenity::UserId, String>,
    pub afk: DashMap<serenity::UserId, String>,
    pub todos: DashMap<serenity::UserId, Vec<TodoEntry>>,
    pub user_prefixes: DashMap<serenity::UserId, Vec<String>>,
    pub disabled_commands: DashSet<String>,
    pub cooldowns: CooldownBucket,
    pub cooldown_bypass: DashSet<serenity::UserId>,

    // Arc'd so detached voice reaper tasks can outlive the event that
    // spawned them.
    pub guild_configs: Arc<DashMap<serenity::GuildId, GuildConfig>>,
    pub replies: Arc<ReplyCache>,
    pub voice_waiters: Arc<DashMap<serenity::ChannelId, Arc<Notify>>>,
}

impl Bot {
    async fn new(db: SqlitePool, owners: HashSet<serenity::UserId>) -> Result<Self> {
        Ok(Self {
            db,
            http: reqwest::Client::builder()
                .user_agent(concat!("AloneBot/", env!("CARGO_PKG_VERSION")))
                .build()?,
            scheduler: JobScheduler::new().await?,
            scheduler_started: AtomicBool::new(false),
            owners,
            launch_time: chrono::Utc::now(),
            command_counter: AtomicU64::new(0),
            maintenance: RwLock::new(None),
            blacklist: DashMap::new(),
            afk: DashMap::new(),
            todos: DashMap::new(),
            user_prefixes: DashMap::new(),
            disabled_commands: DashSet::new(),
            cooldowns: CooldownBucket::default(),
            cooldown_bypass: DashSet::new(),
            guild_configs: Arc::new(DashMap::new()),
            replies: Arc::new(ReplyCache::default()),
            voice_waiters: Arc::new(DashMap::new()),
        })
    }

    pub fn is_owner(&self, user: serenity::UserId) -> bool {
        self.owners.contains(&user)
    }

    pub fn maintenance_reason(&self) -> Option<String> {
        self.maintenance
            .read()
            .ok()
            .and_then(|guard| guard.clone())
    }

    /// Populates the in-memory maps from the database, once, at startup.
    /// Every mutation afterwards writes through.
    async fn load_state(&self) -> Result<()> {
        let rows: Vec<(String, String)> = sqlx::query_as(include_str!("queries/load-prefixes.sql"))
            .fetch_all(&self.db)
            .await?;
        for (user, prefix) in rows {
            self.user_prefixes
                .entry(serenity::UserId(user.parse()?))
                .or_default()
                .push(prefix);
        }

        let rows: Vec<(String, Option<String>, Option<String>, Option<String>, bool)> =
            sqlx::query_as(include_str!("queries/load-guilds.sql"))
                .fetch_all(&self.db)
                .await?;
        for (guild, prefix, lobby, category, enabled) in rows {
            let mut config = self
                .guild_configs
                .entry(serenity::GuildId(guild.parse()?))
                .or_default();
            config.prefix = prefix;
            config.voice_lobby = match lobby {
                Some(id) => Some(serenity::ChannelId(id.parse()?)),
                None => None,
            };
            config.voice_category = match category {
                Some(id) => Some(serenity::ChannelId(id.parse()?)),
                None => None,
            };
            config.voice_enabled = enabled;
        }

        let rows: Vec<(String, String, String)> =
            sqlx::query_as(include_str!("queries/load-voice-channels.sql"))
                .fetch_all(&self.db)
                .await?;
        for (channel, guild, user) in rows {
            self.guild_configs
                .entry(serenity::GuildId(guild.parse()?))
                .or_default()
                .personal_channels
                .insert(
                    serenity::ChannelId(channel.parse()?),
                    serenity::UserId(user.parse()?),
                );
        }

        let rows: Vec<(String, String, String)> =
            sqlx::query_as(include_str!("queries/load-todos.sql"))
                .fetch_all(&self.db)
                .await?;
        for (user, task, jump_url) in rows {
            self.todos
                .entry(serenity::UserId(user.parse()?))
                .or_default()
                .push(TodoEntry { task, jump_url });
        }

        let rows: Vec<(String, String)> = sqlx::query_as(include_str!("queries/load-afk.sql"))
            .fetch_all(&self.db)
            .await?;
        for (user, reason) in rows {
            self.afk.insert(serenity::UserId(user.parse()?), reason);
        }

        let rows: Vec<(String, String)> =
            sqlx::query_as(include_str!("queries/load-blacklist.sql"))
                .fetch_all(&self.db)
                .await?;
        for (user, reason) in rows {
            self.blacklist
                .insert(serenity::UserId(user.parse()?), reason);
        }

        let rows: Vec<(String,)> = sqlx::query_as(include_str!("queries/load-bypass.sql"))
            .fetch_all(&self.db)
            .await?;
        for (user,) in rows {
            self.cooldown_bypass.insert(serenity::UserId(user.parse()?));
        }

        info!(
            "Loaded state: {} user prefixes, {} guilds, {} todos, {} afk, {} blacklisted",
            self.user_prefixes.len(),
            self.guild_configs.len(),
            self.todos.len(),
            self.afk.len(),
            self.blacklist.len(),
        );
        Ok(())
    }

    async fn spawn_scheduler(&self) -> Result<()> {
        if self
            .scheduler_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        info!("Spawning scheduler");

        let job_ctx = JobContext {
            replies: self.replies.clone(),
        };

        self.scheduler
            .add(jobs::make_job(
                "replies::sweep",
                &config::reply_sweep_schedule(),
                jobs::sweep_replies,
                job_ctx,
            )?)
            .await?;

        self.scheduler.start().await?;

        Ok(())
    }
}

/// Runs before every command: blacklist, maintenance mode, runtime-disabled
/// commands, and the global member cooldown. Owners skip all four.
async fn global_check(ctx: Context<'_>) -> Result<bool, ErrReport> {
    let bot = ctx.data();
    let author = ctx.author().id;

    if bot.is_owner(author) {
        return Ok(true);
    }

    if let Some(reason) = bot.blacklist.get(&author) {
        return Err(Refusal::Blacklisted(reason.clone()).into());
    }

    if let Some(reason) = bot.maintenance_reason() {
        return Err(Refusal::Maintenance(reason).into());
    }

    if bot.disabled_commands.contains(&*ctx.command().name) {
        return Err(Refusal::CommandDisabled.into());
    }

    if !bot.cooldown_bypass.contains(&author) {
        bot.cooldowns
            .check(author, ctx.guild_id(), ctx.id())
            .map_err(Refusal::OnCooldown)?;
    }

    Ok(true)
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &poise::Event<'_>,
    _framework: poise::FrameworkContext<'_, Bot, ErrReport>,
    bot: &Bot,
) -> Result<(), ErrReport> {
    match event {
        poise::Event::Ready { data_about_bot } => {
            info!("{} connected successfully", data_about_bot.user.name);
        }
        poise::Event::CacheReady { guilds: _ } => {
            if let Err(e) = bot.spawn_scheduler().await {
                error!("Failed to setup scheduler: {e}");
            }
        }
        poise::Event::Message { new_message } => {
            if let Err(e) = listeners::afk::dispatch(ctx, new_message, bot).await {
                error!("Failure in message listeners: {e}");
            }
        }
        poise::Event::MessageUpdate { event, .. } => {
            if let Err(e) = listeners::replies::invocation_edited(ctx, event, bot).await {
                error!("Failure handling message edit: {e}");
            }
        }
        poise::Event::MessageDelete {
            deleted_message_id, ..
        } => {
            if let Err(e) =
                listeners::replies::invocation_deleted(ctx, *deleted_message_id, bot).await
            {
                error!("Failure handling message delete: {e}");
            }
        }
        poise::Event::InteractionCreate { interaction } => {
            if let serenity::Interaction::MessageComponent(component) = interaction {
                if let Err(e) = listeners::replies::component_clicked(ctx, component).await {
                    error!("Failure handling component interaction: {e}");
                }
            }
        }
        poise::Event::GuildCreate { guild, is_new } => {
            if *is_new {
                if let Err(e) = listeners::guild_log::guild_joined(ctx, guild).await {
                    error!("Failure logging guild join: {e}");
                }
            }
        }
        poise::Event::GuildDelete { incomplete, full } => {
            if let Err(e) = listeners::guild_log::guild_left(ctx, incomplete, full.as_ref()).await
            {
                error!("Failure logging guild leave: {e}");
            }
        }
        poise::Event::VoiceStateUpdate { old, new } => {
            if let Err(e) = listeners::voice::dispatch(ctx, old.as_ref(), new, bot).await {
                error!("Failure in voice listener: {e}");
            }
        }
        _ => {}
    }
    Ok(())
}

pub async fn run(token: &str) -> Result<()> {
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(config::database_path())
                .create_if_missing(true),
        )
        .await?;

    // The schema is idempotent; sqlite prepares one statement at a time.
    for statement in include_str!("../schema.sql").split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement).execute(&db).await?;
        }
    }

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_PRESENCES;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                stripped_dynamic_prefix: Some(|ctx, message, bot| {
                    Box::pin(prefixes::stripped_prefix(ctx, message, bot))
                }),
                edit_tracker: Some(poise::EditTracker::for_timespan(
                    crate::reply_cache::REPLY_TTL,
                )),
                case_insensitive_commands: true,
                ..Default::default()
            },
            command_check: Some(|ctx| Box::pin(global_check(ctx))),
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "{} used {} in channel {}",
                        ctx.author().tag(),
                        ctx.command().qualified_name,
                        ctx.channel_id(),
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    ctx.data().command_counter.fetch_add(1, Ordering::Relaxed);
                })
            },
            on_error: |error| Box::pin(errors::on_error(error)),
            event_handler: |ctx, event, framework, bot| {
                Box::pin(event_handler(ctx, event, framework, bot))
            },
            owners: config::extra_owners().into_iter().collect(),
            ..Default::default()
        })
        .token(token)
        .intents(intents)
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                if let Some(guild_id) = config::testing_guild() {
                    info!("Setting up slash commands for testing guild {guild_id}");
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        guild_id,
                    )
                    .await?;
                } else {
                    info!("Setting up global slash commands");
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                }

                let bot = Bot::new(db, framework.options().owners.clone()).await?;
                bot.load_state().await?;
                Ok(bot)
            })
        });

    framework.run().await?;

    Ok(())
}
