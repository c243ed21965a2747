use color_eyre::eyre::ErrReport;

use crate::bot::Bot;

pub mod fun;
pub mod help;
pub mod moderation;
pub mod owner;
pub mod utility;
pub mod voice;

pub fn all() -> Vec<poise::Command<Bot, ErrReport>> {
    vec![
        utility::afk(),
        utility::avatar(),
        utility::choose(),
        utility::cleanup(),
        utility::invite(),
        utility::ping(),
        utility::prefix(),
        utility::serverinfo(),
        utility::source(),
        utility::spotify(),
        utility::support(),
        utility::todo(),
        utility::uptime(),
        utility::userinfo(),
        fun::urban(),
        fun::pp(),
        fun::meme(),
        fun::reddit(),
        fun::waifu(),
        moderation::ban(),
        moderation::kick(),
        moderation::unban(),
        moderation::purge(),
        owner::maintenance(),
        owner::blacklist(),
        owner::bypass(),
        owner::disable(),
        owner::enable(),
        owner::say(),
        owner::delmsg(),
        owner::nick(),
        owner::shutdown(),
        owner::register(),
        voice::voice(),
        help::help(),
    ]
}
