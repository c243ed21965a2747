use std::time::Instant;

use color_eyre::{eyre::eyre, Result};
use poise::serenity_prelude as serenity;
use rand::seq::SliceRandom;

use crate::{
    bot::{Context, TodoEntry},
    config, context, prefixes,
};

const MAX_USER_PREFIX_LEN: usize = 25;
const MAX_GUILD_PREFIX_LEN: usize = 5;

/// Mark yourself AFK. Anyone who mentions you gets your reason back.
#[poise::command(prefix_command, slash_command, category = "Utility")]
pub async fn afk(
    ctx: Context<'_>,
    #[description = "Why you are going afk"]
    #[rest]
    reason: Option<String>,
) -> Result<()> {
    let reason = reason.unwrap_or_else(|| "no reason".to_owned());

    sqlx::query(include_str!("queries/afk-set.sql"))
        .bind(ctx.author().id.to_string())
        .bind(&reason)
        .execute(&ctx.data().db)
        .await?;
    ctx.data().afk.insert(ctx.author().id, reason.clone());

    context::say(ctx, format!("**AFK**\nYou are now afk for {reason}")).await
}

/// Show a user's avatar.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Utility",
    aliases("av", "pfp"),
    track_edits
)]
pub async fn avatar(
    ctx: Context<'_>,
    #[description = "The user to show (defaults to you)"] user: Option<serenity::User>,
) -> Result<()> {
    let user = user.unwrap_or_else(|| ctx.author().clone());

    context::send_embed(ctx, |embed| {
        embed
            .title(format!("{}'s avatar", user.name))
            .image(user.face())
    })
    .await
}

/// Pick one of the given options at random.
#[poise::command(prefix_command, slash_command, category = "Utility", track_edits)]
pub async fn choose(
    ctx: Context<'_>,
    #[description = "Space separated options"]
    #[rest]
    options: String,
) -> Result<()> {
    let pick = {
        let candidates: Vec<&str> = options.split_whitespace().collect();
        candidates
            .choose(&mut rand::thread_rng())
            .map(|choice| (*choice).to_owned())
    };

    match pick {
        Some(choice) => context::say(ctx, choice).await,
        None => context::say(ctx, "You need to give me options to choose from!").await,
    }
}

/// Delete the bot's own recent messages in this channel.
#[poise::command(prefix_command, slash_command, category = "Utility")]
pub async fn cleanup(
    ctx: Context<'_>,
    #[description = "How many messages to look back through"] limit: Option<u64>,
) -> Result<()> {
    let limit = limit.unwrap_or(50).min(100);
    let me = ctx.discord().cache.current_user_id();

    let messages = ctx
        .channel_id()
        .messages(ctx.discord(), |builder| builder.limit(limit))
        .await?;
    let mine: Vec<serenity::MessageId> = messages
        .iter()
        .filter(|message| message.author.id == me)
        .map(|message| message.id)
        .collect();

    if mine.len() > 1 && ctx.guild_id().is_some() {
        ctx.channel_id()
            .delete_messages(ctx.discord(), mine)
            .await?;
    } else {
        // DMs have no bulk endpoint.
        for id in mine {
            ctx.channel_id().delete_message(ctx.discord(), id).await?;
        }
    }

    context::acknowledge(ctx).await
}

fn oauth_url(bot_id: serenity::UserId) -> String {
    format!(
        "https://discord.com/api/oauth2/authorize?client_id={bot_id}&permissions=0&scope=bot%20applications.commands"
    )
}

/// Get an invite link for this bot, or any other bot.
#[poise::command(prefix_command, slash_command, category = "Utility", track_edits)]
pub async fn invite(
    ctx: Context<'_>,
    #[description = "Another bot to invite"] bot: Option<serenity::User>,
) -> Result<()> {
    if let Some(user) = bot {
        if !user.bot {
            return context::say(ctx, "You can't invite someone who isn't a bot!").await;
        }
        let link = oauth_url(user.id);
        return context::send_embed(ctx, |embed| {
            embed
                .title(format!("Invite {}", user.name))
                .description(format!("[Invite]({link})"))
        })
        .await;
    }

    let link = oauth_url(ctx.discord().cache.current_user_id());
    context::send_embed(ctx, |embed| {
        embed
            .title("Thank you for supporting me!")
            .description(format!("[Invite Me!]({link})"))
    })
    .await
}

/// Measure message and database round-trip times.
#[poise::command(prefix_command, slash_command, category = "Utility")]
pub async fn ping(ctx: Context<'_>) -> Result<()> {
    let db_start = Instant::now();
    sqlx::query("SELECT 1").execute(&ctx.data().db).await?;
    let db_ms = db_start.elapsed().as_secs_f64() * 1000.0;

    let send_start = Instant::now();
    let reply = ctx.say("Pong!").await?;
    let send_ms = send_start.elapsed().as_secs_f64() * 1000.0;

    reply
        .edit(ctx, |builder| {
            builder.content(format!(
                "Pong!\nMessage: `{send_ms:.2}ms`\nDatabase: `{db_ms:.2}ms`"
            ))
        })
        .await?;

    Ok(())
}

async fn prefix_overview(ctx: Context<'_>) -> Result<()> {
    let bot = ctx.data();
    let mut lines: Vec<String> = prefixes::DEFAULT_PREFIXES
        .iter()
        .map(|prefix| format!("`{}`", prefix.trim_end()))
        .collect();
    lines.dedup();
    lines.push(serenity::Mention::from(ctx.discord().cache.current_user_id()).to_string());

    if let Some(user_prefixes) = bot.user_prefixes.get(&ctx.author().id) {
        lines.extend(user_prefixes.iter().map(|prefix| format!("`{prefix}`")));
    }
    if let Some(guild_id) = ctx.guild_id() {
        if let Some(prefix) = bot
            .guild_configs
            .get(&guild_id)
            .and_then(|config| config.prefix.clone())
        {
            lines.push(format!("`{prefix}` (this server)"));
        }
    }

    context::send_embed(ctx, |embed| {
        embed
            .title("Prefixes you can use")
            .description(lines.join("\n"))
    })
    .await
}

/// Show and manage the prefixes you can use.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Utility",
    subcommands("prefix_list", "prefix_add", "prefix_remove", "prefix_guild")
)]
pub async fn prefix(ctx: Context<'_>) -> Result<()> {
    prefix_overview(ctx).await
}

/// List every prefix that works for you here.
#[poise::command(prefix_command, slash_command, rename = "list")]
pub async fn prefix_list(ctx: Context<'_>) -> Result<()> {
    prefix_overview(ctx).await
}

/// Add a personal prefix.
#[poise::command(prefix_command, slash_command, rename = "add")]
pub async fn prefix_add(
    ctx: Context<'_>,
    #[description = "The prefix to add"]
    #[rest]
    prefix: String,
) -> Result<()> {
    if prefix.is_empty() {
        return context::say(ctx, "You need to give me a prefix to add!").await;
    }
    if prefix.len() > MAX_USER_PREFIX_LEN {
        return context::say(
            ctx,
            format!(
                "You can't have a prefix that's longer than {MAX_USER_PREFIX_LEN} characters, sorry!"
            ),
        )
        .await;
    }

    let bot = ctx.data();
    let mut user_prefixes = bot.user_prefixes.entry(ctx.author().id).or_default();
    if user_prefixes.contains(&prefix) {
        return context::say(ctx, "That's already one of your prefixes!").await;
    }
    user_prefixes.push(prefix.clone());
    drop(user_prefixes);

    sqlx::query(include_str!("queries/prefix-add.sql"))
        .bind(ctx.author().id.to_string())
        .bind(&prefix)
        .execute(&bot.db)
        .await?;

    context::acknowledge(ctx).await
}

/// Remove one of your prefixes, or all of them.
#[poise::command(prefix_command, slash_command, rename = "remove")]
pub async fn prefix_remove(
    ctx: Context<'_>,
    #[description = "The prefix to remove (all of them if omitted)"]
    #[rest]
    prefix: Option<String>,
) -> Result<()> {
    let bot = ctx.data();
    let author = ctx.author().id;

    if !bot.user_prefixes.contains_key(&author) {
        return context::say(ctx, "You don't have custom prefixes setup!").await;
    }

    let Some(prefix) = prefix else {
        bot.user_prefixes.remove(&author);
        sqlx::query(include_str!("queries/prefix-clear.sql"))
            .bind(author.to_string())
            .execute(&bot.db)
            .await?;
        return context::acknowledge(ctx).await;
    };

    let removed = bot
        .user_prefixes
        .get_mut(&author)
        .map(|mut user_prefixes| {
            let before = user_prefixes.len();
            user_prefixes.retain(|candidate| candidate != &prefix);
            before != user_prefixes.len()
        })
        .unwrap_or(false);

    if !removed {
        return context::say(ctx, "That's not one of your prefixes!").await;
    }

    sqlx::query(include_str!("queries/prefix-remove.sql"))
        .bind(author.to_string())
        .bind(&prefix)
        .execute(&bot.db)
        .await?;

    context::acknowledge(ctx).await
}

/// Set or clear this server's prefix.
#[poise::command(
    prefix_command,
    slash_command,
    rename = "guild",
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn prefix_guild(
    ctx: Context<'_>,
    #[description = "The new prefix (omit or say \"remove\" to clear)"]
    #[rest]
    prefix: Option<String>,
) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_else(|| eyre!("Command run without guild"))?;
    let bot = ctx.data();

    if clears_guild_prefix(prefix.as_deref()) {
        let had_prefix = bot
            .guild_configs
            .get_mut(&guild_id)
            .and_then(|mut config| config.prefix.take())
            .is_some();
        if !had_prefix {
            return context::say(ctx, "There is no guild prefix to remove!").await;
        }

        sqlx::query(include_str!("queries/guild-prefix-clear.sql"))
            .bind(guild_id.to_string())
            .execute(&bot.db)
            .await?;
        return context::say(ctx, "The prefix for this guild has been removed.").await;
    }

    let prefix = prefix.unwrap_or_default();
    if prefix.len() > MAX_GUILD_PREFIX_LEN {
        return context::say(
            ctx,
            format!(
                "You can't have a prefix that's longer than {MAX_GUILD_PREFIX_LEN} characters, sorry!"
            ),
        )
        .await;
    }

    bot.guild_configs.entry(guild_id).or_default().prefix = Some(prefix.clone());
    sqlx::query(include_str!("queries/guild-prefix-set.sql"))
        .bind(guild_id.to_string())
        .bind(&prefix)
        .execute(&bot.db)
        .await?;

    context::say(ctx, format!("The prefix for this guild is now `{prefix}`")).await
}

/// Show some facts about this server.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Utility",
    guild_only,
    aliases("si", "guildinfo"),
    track_edits
)]
pub async fn serverinfo(ctx: Context<'_>) -> Result<()> {
    let guild = ctx.guild().ok_or_else(|| eyre!("Command run without guild"))?;
    let bots = guild
        .members
        .values()
        .filter(|member| member.user.bot)
        .count();

    context::send_embed(ctx, |embed| {
        embed
            .title(format!("Server Info for {}", guild.name))
            .description(format!(
                "Owner: {}\nID: {}\nMembers: {}\nBots: {bots}\nBoost Tier: {:?}",
                serenity::Mention::from(guild.owner_id),
                guild.id,
                guild.member_count,
                guild.premium_tier,
            ));
        if let Some(icon) = guild.icon_url() {
            embed.thumbnail(icon);
        }
        embed
    })
    .await
}

/// Where to find my source code.
#[poise::command(prefix_command, slash_command, category = "Utility", track_edits)]
pub async fn source(
    ctx: Context<'_>,
    #[description = "A command to find the source of"]
    #[rest]
    command: Option<String>,
) -> Result<()> {
    let Some(url) = config::github_url() else {
        return context::say(ctx, "I don't have a public source link configured.").await;
    };

    let Some(command) = command else {
        return context::send_embed(ctx, |embed| {
            embed
                .title("Source")
                .description(format!("I live at {url} and contributions are welcome!"))
        })
        .await;
    };

    let found = ctx.framework().options.commands.iter().find(|candidate| {
        candidate.name.eq_ignore_ascii_case(&command)
            || candidate
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(&command))
    });
    let Some(found) = found else {
        return context::say(ctx, format!("I don't have a command called `{command}`!")).await;
    };

    let module = found
        .category
        .as_deref()
        .unwrap_or("utility")
        .to_lowercase();
    context::send_embed(ctx, |embed| {
        embed.title(format!("Source for {}", found.name)).description(format!(
            "{url}/blob/main/src/commands/{module}.rs"
        ))
    })
    .await
}

/// Show what a member is listening to on Spotify.
#[poise::command(prefix_command, slash_command, category = "Utility", guild_only, track_edits)]
pub async fn spotify(
    ctx: Context<'_>,
    #[description = "The member to peek at (defaults to you)"] member: Option<serenity::Member>,
) -> Result<()> {
    let guild = ctx.guild().ok_or_else(|| eyre!("Command run without guild"))?;
    let user_id = member.map_or_else(|| ctx.author().id, |member| member.user.id);
    let display_name = guild
        .members
        .get(&user_id)
        .map_or_else(|| "They".to_owned(), |member| member.display_name().into_owned());

    let listening = guild.presences.get(&user_id).and_then(|presence| {
        presence
            .activities
            .iter()
            .find(|activity| {
                activity.kind == serenity::ActivityType::Listening && activity.name == "Spotify"
            })
            .cloned()
    });

    let Some(activity) = listening else {
        return context::say(ctx, format!("{display_name} isn't listening to Spotify!")).await;
    };

    let track = activity.details.as_deref().unwrap_or("Unknown track");
    let artists = activity.state.as_deref().unwrap_or("Unknown artist");
    let album = activity
        .assets
        .as_ref()
        .and_then(|assets| assets.large_text.clone());
    let art = activity
        .assets
        .as_ref()
        .and_then(|assets| assets.large_image.as_deref())
        .and_then(album_art_url);

    context::send_embed(ctx, |embed| {
        embed
            .title(format!("{display_name}'s Spotify"))
            .description(format!("**{track}** by **{artists}**"));
        if let Some(album) = album {
            embed.field("Album", album, true);
        }
        if let Some(art) = art {
            embed.thumbnail(art);
        }
        embed
    })
    .await
}

/// No argument, an empty argument, and the literal "remove" all clear the
/// guild prefix rather than storing something unusable.
fn clears_guild_prefix(argument: Option<&str>) -> bool {
    argument.map_or(true, |argument| {
        argument.is_empty() || argument.eq_ignore_ascii_case("remove")
    })
}

/// Spotify exposes album art through the activity's asset id.
fn album_art_url(large_image: &str) -> Option<String> {
    large_image
        .strip_prefix("spotify:")
        .map(|id| format!("https://i.scdn.co/image/{id}"))
}

/// Join my support server.
#[poise::command(prefix_command, slash_command, category = "Utility", track_edits)]
pub async fn support(ctx: Context<'_>) -> Result<()> {
    match config::support_invite() {
        Some(invite) => {
            context::send_embed(ctx, |embed| {
                embed.title("Support").description(format!(
                    "Join my [support server](https://discord.gg/{invite})!"
                ))
            })
            .await
        }
        None => context::say(ctx, "I don't have a support server configured.").await,
    }
}

fn format_todo_list(entries: &[TodoEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            format!(
                "**__[{}]({})__**: **{}**",
                index + 1,
                entry.jump_url,
                entry.task
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn invocation_link(ctx: Context<'_>) -> String {
    match ctx {
        poise::Context::Prefix(prefix_ctx) => prefix_ctx.msg.link(),
        poise::Context::Application(_) => match ctx.guild_id() {
            Some(guild_id) => {
                format!("https://discord.com/channels/{guild_id}/{}", ctx.channel_id())
            }
            None => format!("https://discord.com/channels/@me/{}", ctx.channel_id()),
        },
    }
}

async fn todo_overview(ctx: Context<'_>) -> Result<()> {
    let Some(entries) = ctx
        .data()
        .todos
        .get(&ctx.author().id)
        .map(|entry| entry.value().clone())
    else {
        return context::say(ctx, "You don't have a to-do list!").await;
    };

    context::send_embed(ctx, |embed| {
        embed.title("Todo").description(format_todo_list(&entries))
    })
    .await
}

/// Your personal to-do list.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Utility",
    subcommands("todo_list", "todo_add", "todo_remove")
)]
pub async fn todo(ctx: Context<'_>) -> Result<()> {
    todo_overview(ctx).await
}

/// Show your to-do list.
#[poise::command(prefix_command, slash_command, rename = "list")]
pub async fn todo_list(ctx: Context<'_>) -> Result<()> {
    todo_overview(ctx).await
}

/// Add a task to your to-do list.
#[poise::command(prefix_command, slash_command, rename = "add")]
pub async fn todo_add(
    ctx: Context<'_>,
    #[description = "The task to remember"]
    #[rest]
    task: String,
) -> Result<()> {
    let entry = TodoEntry {
        task,
        jump_url: invocation_link(ctx),
    };

    sqlx::query(include_str!("queries/todo-add.sql"))
        .bind(ctx.author().id.to_string())
        .bind(&entry.task)
        .bind(&entry.jump_url)
        .execute(&ctx.data().db)
        .await?;
    ctx.data()
        .todos
        .entry(ctx.author().id)
        .or_default()
        .push(entry);

    context::acknowledge(ctx).await
}

/// Cross a task off, or clear the whole list.
#[poise::command(prefix_command, slash_command, rename = "remove")]
pub async fn todo_remove(
    ctx: Context<'_>,
    #[description = "The task number to remove (everything if omitted)"] number: Option<usize>,
) -> Result<()> {
    let bot = ctx.data();
    let author = ctx.author().id;

    if !bot.todos.contains_key(&author) {
        return context::say(ctx, "You don't have a to-do list!").await;
    }

    let Some(number) = number else {
        bot.todos.remove(&author);
        sqlx::query(include_str!("queries/todo-clear.sql"))
            .bind(author.to_string())
            .execute(&bot.db)
            .await?;
        return context::acknowledge(ctx).await;
    };

    let removed = bot.todos.get_mut(&author).and_then(|mut entries| {
        (number >= 1 && number <= entries.len()).then(|| entries.remove(number - 1))
    });

    let Some(removed) = removed else {
        return context::say(ctx, "That's not a task in your todo list!").await;
    };

    sqlx::query(include_str!("queries/todo-remove.sql"))
        .bind(author.to_string())
        .bind(&removed.task)
        .execute(&bot.db)
        .await?;

    context::acknowledge(ctx).await
}

fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    format!("{days}d, {hours}h, {minutes}m, {seconds}s")
}

/// How long I've been awake.
#[poise::command(prefix_command, slash_command, category = "Utility", track_edits)]
pub async fn uptime(ctx: Context<'_>) -> Result<()> {
    let bot = ctx.data();
    let uptime = (chrono::Utc::now() - bot.launch_time)
        .to_std()
        .unwrap_or_default();
    let commands_run = bot
        .command_counter
        .load(std::sync::atomic::Ordering::Relaxed);

    context::send_embed(ctx, |embed| {
        embed.title("Current Uptime").description(format!(
            "Uptime: {}\nStartup Time: <t:{}:F>\nCommands run since startup: {commands_run}",
            format_uptime(uptime.as_secs()),
            bot.launch_time.timestamp(),
        ))
    })
    .await
}

/// Show some facts about a user.
#[poise::command(prefix_command, slash_command, category = "Utility", track_edits)]
pub async fn userinfo(
    ctx: Context<'_>,
    #[description = "The user to show (defaults to you)"] user: Option<serenity::User>,
) -> Result<()> {
    let user = user.unwrap_or_else(|| ctx.author().clone());
    let joined_at = ctx.guild().and_then(|guild| {
        guild
            .members
            .get(&user.id)
            .and_then(|member| member.joined_at)
    });

    context::send_embed(ctx, |embed| {
        let mut description = format!(
            "Name: {}\nID: {}\nCreated At: <t:{}:F>\n",
            user.name,
            user.id,
            user.created_at().unix_timestamp(),
        );
        if let Some(joined_at) = joined_at {
            description.push_str(&format!("Joined At: <t:{}:F>\n", joined_at.unix_timestamp()));
        }
        description.push_str(&format!("Avatar: [Click Here]({})", user.face()));

        embed
            .title("Userinfo")
            .description(description)
            .thumbnail(user.face())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_list_is_numbered_from_one() {
        let entries = vec![
            TodoEntry {
                task: "water the plants".to_owned(),
                jump_url: "https://discord.com/channels/1/2/3".to_owned(),
            },
            TodoEntry {
                task: "buy milk".to_owned(),
                jump_url: "https://discord.com/channels/1/2/4".to_owned(),
            },
        ];

        let rendered = format_todo_list(&entries);
        assert!(rendered.starts_with("**__[1](https://discord.com/channels/1/2/3)__**"));
        assert!(rendered.contains("**buy milk**"));
        assert_eq!(rendered.lines().count(), 2);
    }

    #[test]
    fn uptime_breaks_down_units() {
        assert_eq!(format_uptime(0), "0d, 0h, 0m, 0s");
        assert_eq!(format_uptime(59), "0d, 0h, 0m, 59s");
        assert_eq!(format_uptime(3_661), "0d, 1h, 1m, 1s");
        assert_eq!(format_uptime(90_061), "1d, 1h, 1m, 1s");
    }

    #[test]
    fn album_art_comes_from_spotify_assets_only() {
        assert_eq!(
            album_art_url("spotify:ab67616d").as_deref(),
            Some("https://i.scdn.co/image/ab67616d")
        );
        assert_eq!(album_art_url("mp:external/whatever"), None);
    }

    #[test]
    fn oauth_url_embeds_the_client_id() {
        assert!(oauth_url(serenity::UserId(42)).contains("client_id=42"));
    }

    #[test]
    fn empty_guild_prefix_arguments_clear_instead_of_storing() {
        assert!(clears_guild_prefix(None));
        assert!(clears_guild_prefix(Some("")));
        assert!(clears_guild_prefix(Some("Remove")));
        assert!(!clears_guild_prefix(Some("!")));
    }
}
