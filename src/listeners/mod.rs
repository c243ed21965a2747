pub mod afk;
pub mod guild_log;
pub mod replies;
pub mod voice;
