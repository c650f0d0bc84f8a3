use chrono::{DateTime, Utc};
use rss::Channel;
use thiserror::Error;

/// The response body was not a well-formed RSS 2.0 document.
#[derive(Debug, Error)]
#[error("invalid RSS document: {0}")]
pub struct ParseError(String);

/// A fetched and parsed feed document: the channel header plus its entries
/// in document order.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub title: String,
    pub description: String,
    pub entries: Vec<FeedEntry>,
}

/// One syndicated item. `pub_date` is the raw string from the document;
/// the ingestion pipeline decides whether it parses.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub link: String,
    pub title: String,
    pub description: Option<String>,
    pub pub_date: Option<String>,
}

/// Parse RSS 2.0 bytes into a [`FeedDocument`].
///
/// Items without a link are dropped: the link is the dedup key, so an
/// entry without one can never be ingested.
pub fn parse_document(bytes: &[u8]) -> Result<FeedDocument, ParseError> {
    let channel = Channel::read_from(bytes).map_err(|e| ParseError(e.to_string()))?;
    Ok(FeedDocument::from(channel))
}

impl From<Channel> for FeedDocument {
    fn from(channel: Channel) -> Self {
        let entries = channel
            .items()
            .iter()
            .filter(|item| item.link().is_some())
            .map(|item| FeedEntry {
                link: item.link().unwrap().to_string(),
                title: item.title().unwrap_or_default().to_string(),
                description: item.description().map(str::to_string),
                pub_date: item.pub_date().map(str::to_string),
            })
            .collect();

        FeedDocument {
            title: channel.title().to_string(),
            description: channel.description().to_string(),
            entries,
        }
    }
}

/// Parse an entry's publication date against the RFC 2822 format RSS uses
/// (`Mon, 02 Jan 2006 15:04:05 -0700`).
///
/// A malformed date is not an error — the entry simply has no publication
/// timestamp, and the rest of the feed ingests normally.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw).ok().map(Into::into)
}
