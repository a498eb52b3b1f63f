//! # Audio Module
//!
//! Queue state and the playback seam used by the bot commands.
//!
//! ## Components
//!
//! ### [`track`] - Track
//! - Immutable value describing one queued item (URL, title, duration,
//!   requester)
//!
//! ### [`queue`] - Queue Store
//! - One ordered queue per guild, created on first insert and dropped as
//!   soon as it becomes empty
//! - The head of each queue is the track currently being played
//! - Per-guild atomic operations backed by [`dashmap::DashMap`]
//!
//! ### [`playback`] - Playback State
//! - [`playback::PlaybackState`] trait answering "is audio flowing for this
//!   guild?", starting the head of the queue and reporting finished tracks
//! - Songbird-backed implementation that plays one track at a time; the
//!   pending tracks only live in the queue store
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use serenity::all::{GuildId, UserId};
//!
//! let store = QueueStore::new();
//! let guild_id = GuildId::new(123456789);
//!
//! store.add_tracks(guild_id, vec![Track::new("https://soundcloud.com/a/b", "Song", UserId::new(1))]);
//! assert_eq!(store.len(guild_id), 1);
//!
//! store.remove_first(guild_id);
//! assert!(store.get_queue(guild_id).is_empty());
//! ```

pub mod playback;
pub mod queue;
pub mod track;
