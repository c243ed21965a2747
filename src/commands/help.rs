use std::collections::BTreeMap;

use color_eyre::eyre::ErrReport;
use color_eyre::Result;
use itertools::Itertools;

use crate::{
    bot::{Bot, Context},
    context,
};

const USAGE_FOOTER: &str = "< > = Required | [ ] = Optional";

/// Renders a command signature: required parameters in angle brackets,
/// optional ones in square brackets.
fn format_usage(name: &str, parameters: &[(String, bool)]) -> String {
    let mut usage = name.to_owned();
    for (parameter, required) in parameters {
        if *required {
            usage.push_str(&format!(" <{parameter}>"));
        } else {
            usage.push_str(&format!(" [{parameter}]"));
        }
    }
    usage
}

pub fn usage_line(command: &poise::Command<Bot, ErrReport>) -> String {
    let parameters: Vec<(String, bool)> = command
        .parameters
        .iter()
        .map(|parameter| (parameter.name.to_string(), parameter.required))
        .collect();
    format_usage(&command.qualified_name, &parameters)
}

fn find_command<'a>(
    commands: &'a [poise::Command<Bot, ErrReport>],
    query: &str,
) -> Option<&'a poise::Command<Bot, ErrReport>> {
    let (head, rest) = match query.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, Some(rest.trim())),
        None => (query, None),
    };

    let command = commands.iter().find(|command| {
        command.name.eq_ignore_ascii_case(head)
            || command
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(head))
    })?;

    match rest {
        Some(rest) if !rest.is_empty() => find_command(&command.subcommands, rest),
        _ => Some(command),
    }
}

async fn overview(ctx: Context<'_>) -> Result<()> {
    let mut categories: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for command in &ctx.framework().options.commands {
        if command.hide_in_help {
            continue;
        }
        categories
            .entry(command.category.as_deref().unwrap_or("Other"))
            .or_default()
            .push(format!("`{}`", command.name));
    }

    context::send_embed(ctx, |embed| {
        embed
            .title("Help")
            .description(
                "Use `help <command>` to learn more about any of these.",
            );
        for (category, commands) in &categories {
            embed.field(*category, commands.iter().join(", "), false);
        }
        embed.footer(|footer| footer.text(USAGE_FOOTER))
    })
    .await
}

async fn detail(ctx: Context<'_>, query: &str) -> Result<()> {
    let Some(command) = find_command(&ctx.framework().options.commands, query) else {
        return context::say(
            ctx,
            format!("I don't have a command called `{query}`, maybe check the spelling?"),
        )
        .await;
    };

    let description = command
        .description
        .as_deref()
        .unwrap_or("No description yet.")
        .to_owned();
    let aliases = command.aliases.iter().map(|alias| format!("`{alias}`")).join(", ");
    let subcommands = command
        .subcommands
        .iter()
        .map(|subcommand| format!("`{}`", subcommand.name))
        .join(", ");
    let usage = usage_line(command);

    context::send_embed(ctx, |embed| {
        embed
            .title(format!("Help: {}", command.qualified_name))
            .description(description)
            .field("Usage", format!("`{usage}`"), false);
        if !aliases.is_empty() {
            embed.field("Aliases", aliases, true);
        }
        if !subcommands.is_empty() {
            embed.field("Subcommands", subcommands, true);
        }
        embed.footer(|footer| footer.text(USAGE_FOOTER))
    })
    .await
}

/// Learn what my commands do.
#[poise::command(prefix_command, slash_command, category = "Utility", track_edits)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "A command to look up"]
    #[rest]
    command: Option<String>,
) -> Result<()> {
    match command.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => detail(ctx, query).await,
        _ => overview(ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_brackets_follow_requiredness() {
        let parameters = vec![
            ("user".to_owned(), true),
            ("reason".to_owned(), false),
        ];
        assert_eq!(format_usage("ban", &parameters), "ban <user> [reason]");
    }

    #[test]
    fn usage_without_parameters_is_just_the_name() {
        assert_eq!(format_usage("ping", &[]), "ping");
    }

    #[test]
    fn every_visible_command_is_findable() {
        let commands = crate::commands::all();
        for command in commands.iter().filter(|command| !command.hide_in_help) {
            assert!(find_command(&commands, &command.name).is_some());
        }
    }

    #[test]
    fn lookup_follows_aliases_and_subcommands() {
        let mut commands = crate::commands::all();
        // The framework calls this on startup; mirror it so qualified
        // names are filled in like they are at runtime.
        poise::set_qualified_names(&mut commands);
        assert_eq!(find_command(&commands, "pfp").unwrap().name, "avatar");
        assert_eq!(
            find_command(&commands, "todo add").unwrap().qualified_name,
            "todo add"
        );
        assert!(find_command(&commands, "no-such-command").is_none());
    }
}
