pub mod error;
pub mod imdb;
pub mod traits;
pub mod trakt;

pub use error::{FeedError, TransportError};
pub use imdb::{FeedReader, FeedSource, TitleTypePolicy};
pub use traits::TraktService;
pub use trakt::client::TraktClientOptions;
pub use trakt::{PacingStrategy, TraktClient, TraktCredentials};
