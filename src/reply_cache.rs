use std::time::{Duration, Instant};

use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, MessageId};

/// Where the bot answered a command invocation. Kept around for a short
/// window so deleting or editing the invocation can take the reply with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedReply {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Fixed-capacity, fixed-TTL map from invocation message to the bot's reply.
/// Expired entries are dropped on lookup and by the scheduled sweep job;
/// overflowing the capacity evicts the oldest entry.
pub struct ReplyCache {
    capacity: usize,
    ttl: Duration,
    entries: DashMap<MessageId, (CachedReply, Instant)>,
}

pub const REPLY_CAPACITY: usize = 2000;
pub const REPLY_TTL: Duration = Duration::from_secs(300);

impl Default for ReplyCache {
    fn default() -> Self {
        Self::new(REPLY_CAPACITY, REPLY_TTL)
    }
}

impl ReplyCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn insert(&self, invocation: MessageId, reply: CachedReply) {
        self.insert_at(invocation, reply, Instant::now());
    }

    fn insert_at(&self, invocation: MessageId, reply: CachedReply, now: Instant) {
        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().1)
                .map(|entry| *entry.key());
            match oldest {
                Some(key) => self.entries.remove(&key),
                None => break,
            };
        }

        self.entries.insert(invocation, (reply, now));
    }

    /// Removes and returns the reply for an invocation, if it hasn't expired.
    pub fn take(&self, invocation: MessageId) -> Option<CachedReply> {
        self.take_at(invocation, Instant::now())
    }

    fn take_at(&self, invocation: MessageId, now: Instant) -> Option<CachedReply> {
        let (_, (reply, inserted)) = self.entries.remove(&invocation)?;
        (now.duration_since(inserted) < self.ttl).then_some(reply)
    }

    pub fn contains(&self, invocation: MessageId) -> bool {
        self.entries.contains_key(&invocation)
    }

    /// Drops expired entries and returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, inserted)| now.duration_since(*inserted) < self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(n: u64) -> CachedReply {
        CachedReply {
            channel_id: ChannelId(100),
            message_id: MessageId(n),
        }
    }

    #[test]
    fn take_returns_and_removes() {
        let cache = ReplyCache::default();
        cache.insert(MessageId(1), reply(10));

        assert_eq!(cache.take(MessageId(1)), Some(reply(10)));
        assert_eq!(cache.take(MessageId(1)), None);
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = ReplyCache::new(10, Duration::from_secs(300));
        let start = Instant::now();
        cache.insert_at(MessageId(1), reply(10), start);

        assert_eq!(
            cache.take_at(MessageId(1), start + Duration::from_secs(301)),
            None
        );
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let cache = ReplyCache::new(10, Duration::from_secs(300));
        let start = Instant::now();
        cache.insert_at(MessageId(1), reply(10), start);
        cache.insert_at(MessageId(2), reply(20), start + Duration::from_secs(200));

        assert_eq!(cache.sweep_at(start + Duration::from_secs(301)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(MessageId(2)));
    }

    #[test]
    fn capacity_overflow_evicts_the_oldest() {
        let cache = ReplyCache::new(2, Duration::from_secs(300));
        let start = Instant::now();
        cache.insert_at(MessageId(1), reply(10), start);
        cache.insert_at(MessageId(2), reply(20), start + Duration::from_secs(1));
        cache.insert_at(MessageId(3), reply(30), start + Duration::from_secs(2));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(MessageId(1)));
        assert!(cache.contains(MessageId(2)));
        assert!(cache.contains(MessageId(3)));
    }
}
