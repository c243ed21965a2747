use color_eyre::eyre::ErrReport;
use poise::serenity_prelude as serenity;

use crate::bot::Bot;

/// Prefixes every user gets, matched case-insensitively.
pub const DEFAULT_PREFIXES: [&str; 2] = ["alone ", "alone"];

/// Splits `content` into a matched prefix (including any whitespace after it)
/// and the rest. Candidates are tried longest first so a custom `alone!` is
/// not shadowed by the default `alone`; the defaults ignore ASCII case. In
/// DMs, and for owners anywhere, a bare message works too.
pub fn match_prefix<'a>(
    content: &'a str,
    user_prefixes: &[String],
    guild_prefix: Option<&str>,
    empty_allowed: bool,
) -> Option<(&'a str, &'a str)> {
    // Bool marks case-insensitive matching, which only the defaults get.
    let mut candidates: Vec<(&str, bool)> = user_prefixes
        .iter()
        .map(|prefix| (prefix.as_str(), false))
        .chain(guild_prefix.map(|prefix| (prefix, false)))
        .chain(DEFAULT_PREFIXES.map(|prefix| (prefix, true)))
        .filter(|(candidate, _)| !candidate.is_empty())
        .collect();
    candidates.sort_by_key(|(candidate, _)| std::cmp::Reverse(candidate.len()));

    for (candidate, ignore_case) in candidates {
        let Some(head) = content.get(..candidate.len()) else {
            continue;
        };
        if head == candidate || (ignore_case && head.eq_ignore_ascii_case(candidate)) {
            let split = candidate.len()
                + content[candidate.len()..]
                    .len()
                    .saturating_sub(content[candidate.len()..].trim_start().len());
            return Some(content.split_at(split));
        }
    }

    if empty_allowed {
        return Some(("", content));
    }

    None
}

/// The `stripped_dynamic_prefix` hook. Mention prefixes are handled by the
/// framework itself.
pub async fn stripped_prefix<'a>(
    _ctx: &'a serenity::Context,
    message: &'a serenity::Message,
    bot: &'a Bot,
) -> Result<Option<(&'a str, &'a str)>, ErrReport> {
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

    Ok(match_prefix(
        &message.content,
        &user_prefixes,
        guild_prefix.as_deref(),
        empty_allowed,
    ))
}

#[cfg(test)]
mod tests {
    use super::match_prefix;

    #[test]
    fn default_prefix_matches_case_insensitively() {
        let (prefix, rest) = match_prefix("Alone ping", &[], None, false).unwrap();
        assert_eq!(prefix, "Alone ");
        assert_eq!(rest, "ping");
    }

    #[test]
    fn whitespace_after_prefix_is_stripped() {
        let (prefix, rest) = match_prefix("alone   ping", &[], None, false).unwrap();
        assert_eq!(prefix, "alone   ");
        assert_eq!(rest, "ping");
    }

    #[test]
    fn longest_candidate_wins() {
        let user = vec!["alone!".to_owned()];
        let (prefix, rest) = match_prefix("alone!ping", &user, None, false).unwrap();
        assert_eq!(prefix, "alone!");
        assert_eq!(rest, "ping");
    }

    #[test]
    fn guild_prefix_matches() {
        let (prefix, rest) = match_prefix("!ping", &[], Some("!"), false).unwrap();
        assert_eq!(prefix, "!");
        assert_eq!(rest, "ping");
    }

    #[test]
    fn bare_message_is_a_command_only_when_allowed() {
        assert_eq!(match_prefix("ping", &[], None, false), None);
        assert_eq!(match_prefix("ping", &[], None, true), Some(("", "ping")));
    }

    #[test]
    fn empty_stored_prefix_is_ignored() {
        // An empty custom prefix must not turn every guild message into a
        // command for everyone.
        let user = vec![String::new()];
        assert_eq!(match_prefix("ping", &user, None, false), None);
    }

    #[test]
    fn multibyte_content_does_not_panic() {
        assert_eq!(match_prefix("日本語テスト", &[], Some("!!"), false), None);
    }
}
