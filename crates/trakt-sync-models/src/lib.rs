pub mod error;
pub mod imdb_id;
pub mod media;
pub mod mutation;
pub mod rating;
pub mod remote;
pub mod watch_history;
pub mod watchlist;

pub use error::InputError;
pub use imdb_id::ImdbId;
pub use media::MediaKind;
pub use mutation::{format_timestamp, BatchItem, KindCounts, KindSets, MutationBatch, NotFound, NotFoundItem, SyncResponse};
pub use rating::{parse_rating, RatingEntry, RemoteRating};
pub use remote::{RemoteItem, WatchingStatus};
pub use watch_history::HistoryEntry;
pub use watchlist::WatchlistEntry;
