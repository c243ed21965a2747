use std::time::{Duration, Instant};

use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};

/// One-invocation-per-interval rate limit, bucketed per member (user + guild,
/// with DMs in their own bucket).
pub struct CooldownBucket {
    interval: Duration,
    last_seen: DashMap<(UserId, Option<GuildId>), (Instant, u64)>,
}

impl Default for CooldownBucket {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

impl CooldownBucket {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_seen: DashMap::new(),
        }
    }

    /// Records an invocation, or returns how long the member still has to
    /// wait. The framework runs the global check once per level of a
    /// subcommand chain, so re-checks of the invocation that armed the
    /// cooldown pass. Refused attempts do not push the window back.
    pub fn check(
        &self,
        user: UserId,
        guild: Option<GuildId>,
        invocation: u64,
    ) -> Result<(), Duration> {
        self.check_at(user, guild, invocation, Instant::now())
    }

    fn check_at(
        &self,
        user: UserId,
        guild: Option<GuildId>,
        invocation: u64,
        now: Instant,
    ) -> Result<(), Duration> {
        let key = (user, guild);
        if let Some(entry) = self.last_seen.get(&key) {
            let (last, last_invocation) = *entry;
            if last_invocation == invocation {
                return Ok(());
            }
            let elapsed = now.duration_since(last);
            if elapsed < self.interval {
                return Err(self.interval - elapsed);
            }
        }

        self.last_seen.insert(key, (now, invocation));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId(1);
    const GUILD: GuildId = GuildId(2);

    #[test]
    fn first_invocation_passes() {
        let bucket = CooldownBucket::default();
        assert!(bucket
            .check_at(USER, Some(GUILD), 1, Instant::now())
            .is_ok());
    }

    #[test]
    fn rapid_second_invocation_is_refused() {
        let bucket = CooldownBucket::new(Duration::from_millis(1500));
        let start = Instant::now();

        bucket.check_at(USER, Some(GUILD), 1, start).unwrap();
        let remaining = bucket
            .check_at(USER, Some(GUILD), 2, start + Duration::from_millis(500))
            .unwrap_err();
        assert_eq!(remaining, Duration::from_millis(1000));
    }

    #[test]
    fn subcommand_chains_recheck_without_refusal() {
        // Parent and leaf both run the global check for one invocation.
        let bucket = CooldownBucket::new(Duration::from_millis(1500));
        let start = Instant::now();

        bucket.check_at(USER, Some(GUILD), 1, start).unwrap();
        assert!(bucket
            .check_at(USER, Some(GUILD), 1, start + Duration::from_micros(50))
            .is_ok());
        // A genuinely new invocation is still refused.
        assert!(bucket
            .check_at(USER, Some(GUILD), 2, start + Duration::from_millis(100))
            .is_err());
    }

    #[test]
    fn cooldown_expires() {
        let bucket = CooldownBucket::new(Duration::from_millis(1500));
        let start = Instant::now();

        bucket.check_at(USER, Some(GUILD), 1, start).unwrap();
        assert!(bucket
            .check_at(USER, Some(GUILD), 2, start + Duration::from_millis(1500))
            .is_ok());
    }

    #[test]
    fn buckets_are_per_member() {
        let bucket = CooldownBucket::new(Duration::from_millis(1500));
        let start = Instant::now();

        bucket.check_at(USER, Some(GUILD), 1, start).unwrap();
        // Same user in DMs, different bucket.
        assert!(bucket.check_at(USER, None, 2, start).is_ok());
        // Different user, same guild.
        assert!(bucket.check_at(UserId(3), Some(GUILD), 3, start).is_ok());
    }

    #[test]
    fn refused_attempts_do_not_extend_the_window() {
        let bucket = CooldownBucket::new(Duration::from_millis(1500));
        let start = Instant::now();

        bucket.check_at(USER, Some(GUILD), 1, start).unwrap();
        let _ = bucket.check_at(USER, Some(GUILD), 2, start + Duration::from_millis(1000));
        assert!(bucket
            .check_at(USER, Some(GUILD), 3, start + Duration::from_millis(1500))
            .is_ok());
    }
}
