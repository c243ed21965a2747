use color_eyre::Result;
use poise::serenity_prelude as serenity;
use rand::Rng;
use serde::Deserialize;

use crate::{bot::Context, context, errors::NoSubredditFound};

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    title: String,
    permalink: String,
    url: String,
    #[serde(default)]
    over_18: bool,
    #[serde(default)]
    stickied: bool,
}

#[derive(Debug, Deserialize)]
struct UrbanResponse {
    list: Vec<UrbanEntry>,
}

#[derive(Debug, Deserialize)]
struct UrbanEntry {
    word: String,
    definition: String,
    example: String,
    permalink: String,
    thumbs_up: i64,
}

#[derive(Debug, Deserialize)]
struct WaifuResponse {
    images: Vec<WaifuImage>,
}

#[derive(Debug, Deserialize)]
struct WaifuImage {
    url: String,
}

/// Urban's markup wraps cross-references in square brackets.
fn strip_brackets(text: &str) -> String {
    text.replace(['[', ']'], "")
}

fn pick_post(posts: &[RedditPost], allow_nsfw: bool) -> Option<&RedditPost> {
    let eligible: Vec<&RedditPost> = posts
        .iter()
        .filter(|post| !post.stickied && (allow_nsfw || !post.over_18))
        .collect();
    if eligible.is_empty() {
        return None;
    }
    let index = rand::thread_rng().gen_range(0..eligible.len());
    Some(eligible[index])
}

async fn fetch_subreddit(ctx: Context<'_>, subreddit: &str) -> Result<Vec<RedditPost>> {
    let url = format!("https://www.reddit.com/r/{subreddit}/hot.json?limit=50");
    let listing: RedditListing = ctx
        .data()
        .http
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|_| NoSubredditFound)?
        .json()
        .await
        .map_err(|_| NoSubredditFound)?;

    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .collect())
}

async fn channel_is_nsfw(ctx: Context<'_>) -> bool {
    match ctx.channel_id().to_channel(ctx.discord()).await {
        Ok(channel) => channel.is_nsfw(),
        Err(_) => false,
    }
}

async fn send_post(ctx: Context<'_>, post: &RedditPost) -> Result<()> {
    context::send_embed(ctx, |embed| {
        embed
            .title(post.title.clone())
            .url(format!("https://reddit.com{}", post.permalink))
            .image(post.url.clone())
    })
    .await
}

/// Look a term up on Urban Dictionary.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Fun",
    aliases("define"),
    track_edits
)]
pub async fn urban(
    ctx: Context<'_>,
    #[description = "The term to define"]
    #[rest]
    term: String,
) -> Result<()> {
    let response: UrbanResponse = ctx
        .data()
        .http
        .get("https://api.urbandictionary.com/v0/define")
        .query(&[("term", term.as_str())])
        .send()
        .await?
        .json()
        .await?;

    let Some(entry) = response
        .list
        .iter()
        .max_by_key(|entry| entry.thumbs_up)
    else {
        return context::say(ctx, format!("No definitions found for `{term}`.")).await;
    };

    context::send_embed(ctx, |embed| {
        embed
            .title(entry.word.clone())
            .url(entry.permalink.clone())
            .description(strip_brackets(&entry.definition));
        if !entry.example.is_empty() {
            embed.field("Example", strip_brackets(&entry.example), false);
        }
        embed.field("👍", entry.thumbs_up.to_string(), true)
    })
    .await
}

/// An extremely scientific measurement.
#[poise::command(prefix_command, slash_command, category = "Fun")]
pub async fn pp(
    ctx: Context<'_>,
    #[description = "Whose pp to measure (defaults to yours)"] user: Option<serenity::User>,
) -> Result<()> {
    let user = user.unwrap_or_else(|| ctx.author().clone());
    let size = rand::thread_rng().gen_range(0..=20);
    let shaft = "=".repeat(size);

    context::send_embed(ctx, |embed| {
        embed
            .title(format!("{}'s pp", user.name))
            .description(format!("8{shaft}D"))
    })
    .await
}

/// A hot meme, straight off the press.
#[poise::command(prefix_command, slash_command, category = "Fun")]
pub async fn meme(ctx: Context<'_>) -> Result<()> {
    let posts = fetch_subreddit(ctx, "dankmemes").await?;
    let allow_nsfw = channel_is_nsfw(ctx).await;
    match pick_post(&posts, allow_nsfw) {
        Some(post) => send_post(ctx, post).await,
        None => context::say(ctx, "I couldn't find a meme to show you right now!").await,
    }
}

/// A random hot post from any subreddit.
#[poise::command(prefix_command, slash_command, category = "Fun", track_edits)]
pub async fn reddit(
    ctx: Context<'_>,
    #[description = "The subreddit to pull from"] subreddit: String,
) -> Result<()> {
    let subreddit = subreddit.trim_start_matches("r/");
    let posts = fetch_subreddit(ctx, subreddit).await?;
    if posts.is_empty() {
        return Err(NoSubredditFound.into());
    }

    let allow_nsfw = channel_is_nsfw(ctx).await;
    match pick_post(&posts, allow_nsfw) {
        Some(post) => send_post(ctx, post).await,
        None => {
            context::say(
                ctx,
                "That subreddit only had NSFW posts, which don't belong in this channel!",
            )
            .await
        }
    }
}

/// A random anime girl.
#[poise::command(prefix_command, slash_command, category = "Fun")]
pub async fn waifu(ctx: Context<'_>) -> Result<()> {
    let response: WaifuResponse = ctx
        .data()
        .http
        .get("https://api.waifu.im/search")
        .query(&[("included_tags", "waifu")])
        .send()
        .await?
        .json()
        .await?;

    let Some(image) = response.images.first() else {
        return context::say(ctx, "The waifu well has run dry, try again later!").await;
    };

    context::send_embed(ctx, |embed| {
        embed
            .title(format!("Here's your waifu, {}", ctx.author().name))
            .image(image.url.clone())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reddit_listing_parses() {
        let json = r#"{
            "data": {
                "children": [
                    {"data": {"title": "A", "permalink": "/r/x/1", "url": "https://i.redd.it/a.png", "over_18": false, "stickied": true}},
                    {"data": {"title": "B", "permalink": "/r/x/2", "url": "https://i.redd.it/b.png", "over_18": true}}
                ]
            }
        }"#;
        let listing: RedditListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.data.children.len(), 2);
        assert!(listing.data.children[0].data.stickied);
        assert!(!listing.data.children[1].data.stickied);
    }

    #[test]
    fn stickied_and_nsfw_posts_are_filtered() {
        let posts = vec![
            RedditPost {
                title: "sticky".into(),
                permalink: "/1".into(),
                url: "u1".into(),
                over_18: false,
                stickied: true,
            },
            RedditPost {
                title: "spicy".into(),
                permalink: "/2".into(),
                url: "u2".into(),
                over_18: true,
                stickied: false,
            },
            RedditPost {
                title: "fine".into(),
                permalink: "/3".into(),
                url: "u3".into(),
                over_18: false,
                stickied: false,
            },
        ];

        let safe = pick_post(&posts, false).unwrap();
        assert_eq!(safe.title, "fine");

        let spicy_only = &posts[..2];
        assert!(pick_post(spicy_only, false).is_none());
        assert_eq!(pick_post(spicy_only, true).unwrap().title, "spicy");
    }

    #[test]
    fn waifu_response_parses() {
        let json = r#"{"images": [{"url": "https://cdn.waifu.im/1.png", "tags": []}]}"#;
        let response: WaifuResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.images[0].url, "https://cdn.waifu.im/1.png");
    }

    #[test]
    fn urban_response_parses() {
        let json = r#"{
            "list": [
                {"word": "rust", "definition": "[oxidation]", "example": "some [rust]", "permalink": "https://urbanup.com/1", "thumbs_up": 10},
                {"word": "rust", "definition": "a language", "example": "", "permalink": "https://urbanup.com/2", "thumbs_up": 99}
            ]
        }"#;
        let response: UrbanResponse = serde_json::from_str(json).unwrap();
        let best = response.list.iter().max_by_key(|e| e.thumbs_up).unwrap();
        assert_eq!(best.thumbs_up, 99);
        assert_eq!(strip_brackets("[oxidation]"), "oxidation");
    }
}
