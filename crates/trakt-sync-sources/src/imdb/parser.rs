use chrono::NaiveDate;
use csv::{Reader, ReaderBuilder, StringRecord};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Read;
use trakt_sync_models::{parse_rating, HistoryEntry, ImdbId, MediaKind, RatingEntry, WatchlistEntry};

use crate::error::FeedError;

pub const CONST_COLUMN: &str = "Const";
pub const TITLE_TYPE_COLUMN: &str = "Title Type";
pub const RATING_COLUMN: &str = "Your Rating";
pub const DATE_RATED_COLUMN: &str = "Date Rated";
pub const CREATED_COLUMN: &str = "Created";

/// What to do with a row whose `Title Type` has no Trakt counterpart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleTypePolicy {
    /// Fail the whole feed
    Strict,
    /// Log a warning and skip the row
    #[default]
    Lenient,
}

struct Columns {
    index: HashMap<String, usize>,
    available: Vec<String>,
}

impl Columns {
    fn read<R: Read>(reader: &mut Reader<R>) -> Result<Self, FeedError> {
        let available: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        tracing::debug!("Available CSV columns: {:?}", available);

        let index = available.iter().enumerate().map(|(i, h)| (h.clone(), i)).collect();
        Ok(Self { index, available })
    }

    fn require(&self, column: &str) -> Result<usize, FeedError> {
        self.index.get(column).copied().ok_or_else(|| FeedError::MissingColumn {
            column: column.to_string(),
            available: self.available.clone(),
        })
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

fn parse_date(row: usize, value: &str) -> Result<NaiveDate, FeedError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| FeedError::InvalidDate {
        row,
        value: value.to_string(),
    })
}

/// Identifier and kind shared by every feed. `Ok(None)` means skip the row.
fn parse_title(
    row: usize,
    record: &StringRecord,
    const_idx: usize,
    type_idx: usize,
    policy: TitleTypePolicy,
) -> Result<Option<(ImdbId, MediaKind)>, FeedError> {
    let raw_id = field(record, const_idx);
    if raw_id.is_empty() {
        tracing::debug!(row, "Skipping row with empty IMDb ID");
        return Ok(None);
    }
    let id = ImdbId::parse(raw_id).map_err(|source| FeedError::Input { row, source })?;

    let title_type = field(record, type_idx);
    match MediaKind::from_title_type(title_type) {
        Ok(kind) => Ok(Some((id, kind))),
        Err(source) => match policy {
            TitleTypePolicy::Strict => Err(FeedError::Input { row, source }),
            TitleTypePolicy::Lenient => {
                tracing::warn!(row, imdb_id = %id, title_type, "Skipping row with unknown title type");
                Ok(None)
            }
        },
    }
}

/// Parse an IMDb watchlist export
pub fn parse_watchlist<R: Read>(input: R, policy: TitleTypePolicy) -> Result<Vec<WatchlistEntry>, FeedError> {
    let mut reader = Reader::from_reader(input);
    let columns = Columns::read(&mut reader)?;
    let const_idx = columns.require(CONST_COLUMN)?;
    let type_idx = columns.require(TITLE_TYPE_COLUMN)?;

    let mut entries = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record?;
        if let Some((id, kind)) = parse_title(row, &record, const_idx, type_idx, policy)? {
            entries.push(WatchlistEntry::new(id, kind));
        }
    }

    tracing::info!("Parsed {} watchlist entries", entries.len());
    Ok(entries)
}

/// Parse an IMDb ratings export
pub fn parse_ratings<R: Read>(input: R, policy: TitleTypePolicy) -> Result<Vec<RatingEntry>, FeedError> {
    let mut reader = Reader::from_reader(input);
    let columns = Columns::read(&mut reader)?;
    let const_idx = columns.require(CONST_COLUMN)?;
    let type_idx = columns.require(TITLE_TYPE_COLUMN)?;
    let rating_idx = columns.require(RATING_COLUMN)?;
    let date_idx = columns.require(DATE_RATED_COLUMN)?;

    let mut entries = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record?;
        let Some((id, kind)) = parse_title(row, &record, const_idx, type_idx, policy)? else {
            continue;
        };

        let rating = parse_rating(field(&record, rating_idx)).map_err(|source| FeedError::Input { row, source })?;
        let rated_on = parse_date(row, field(&record, date_idx))?;
        entries.push(RatingEntry {
            id,
            kind,
            rating,
            rated_on,
        });
    }

    tracing::info!("Parsed {} ratings", entries.len());
    Ok(entries)
}

/// Parse an IMDb list export used as watch history.
///
/// The watch date comes from `Date Rated` when the export has it, else from
/// `Created`. Blank dates leave the entry undated.
pub fn parse_history<R: Read>(input: R, policy: TitleTypePolicy) -> Result<Vec<HistoryEntry>, FeedError> {
    let mut reader = Reader::from_reader(input);
    let columns = Columns::read(&mut reader)?;
    let const_idx = columns.require(CONST_COLUMN)?;
    let type_idx = columns.require(TITLE_TYPE_COLUMN)?;
    let date_idx = columns
        .optional(DATE_RATED_COLUMN)
        .or_else(|| columns.optional(CREATED_COLUMN));
    if date_idx.is_none() {
        tracing::warn!("History feed has no date column, entries will be sent without a watch date");
    }

    let mut entries = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record?;
        let Some((id, kind)) = parse_title(row, &record, const_idx, type_idx, policy)? else {
            continue;
        };

        let watched_on = match date_idx.map(|idx| field(&record, idx)) {
            Some(raw) if !raw.is_empty() => Some(parse_date(row, raw)?),
            _ => None,
        };
        entries.push(HistoryEntry { id, kind, watched_on });
    }

    tracing::info!("Parsed {} history entries", entries.len());
    Ok(entries)
}

/// Convert any CSV table into a JSON array of header → value objects,
/// keeping column order. Cells missing from a short row become `null`;
/// cells beyond the header are dropped.
pub fn csv_to_json<R: Read>(input: R) -> Result<Value, FeedError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let object: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let value = record.get(i).map_or(Value::Null, |v| Value::String(v.to_string()));
                (h.to_string(), value)
            })
            .collect();
        rows.push(Value::Object(object));
    }
    Ok(Value::Array(rows))
}
