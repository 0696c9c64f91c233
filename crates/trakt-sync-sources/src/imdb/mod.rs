pub mod feed;
pub mod parser;

pub use feed::{FeedReader, FeedSource};
pub use parser::{csv_to_json, parse_history, parse_ratings, parse_watchlist, TitleTypePolicy};
