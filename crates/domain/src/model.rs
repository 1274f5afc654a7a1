//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Origin a content record is pulled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// NASA imagery (APOD and rover photos)
    #[default]
    Nasa,
    /// arXiv papers
    Arxiv,
}

impl ContentSource {
    /// Rotation order used when alternating sources
    pub const ALL: [ContentSource; 2] = [ContentSource::Nasa, ContentSource::Arxiv];

    /// The source that follows this one in the rotation
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentSource::Nasa => "nasa",
            ContentSource::Arxiv => "arxiv",
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nasa" => Ok(ContentSource::Nasa),
            "arxiv" => Ok(ContentSource::Arxiv),
            other => Err(format!("unknown content source: {}", other)),
        }
    }
}

/// Kind of a content record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Paper,
    ImageOfDay,
    RoverPhoto,
}

/// An arXiv paper
#[derive(Debug, Clone, PartialEq)]
pub struct PaperPayload {
    /// arXiv identifier including version (e.g. `2401.01234v1`)
    pub arxiv_id: String,
    pub title: Option<String>,
    /// Author names joined with ", "
    pub authors: Option<String>,
    /// Abstract page URL
    pub url: Option<String>,
    pub summary: Option<String>,
    /// Category the paper was drawn from
    pub category: String,
}

/// NASA Astronomy Picture of the Day
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOfDayPayload {
    /// `YYYY-MM-DD`
    pub date: String,
    pub title: Option<String>,
    pub explanation: Option<String>,
    pub url: Option<String>,
    /// `image` or `video`
    pub media_type: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// A Mars rover photo
#[derive(Debug, Clone, PartialEq)]
pub struct RoverPhotoPayload {
    pub photo_id: u64,
    pub img_src: Option<String>,
    /// `YYYY-MM-DD`
    pub earth_date: Option<String>,
    pub camera_name: Option<String>,
    pub camera_full_name: Option<String>,
    pub rover_name: Option<String>,
}

/// Source-specific fields of a content record
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPayload {
    Paper(PaperPayload),
    ImageOfDay(ImageOfDayPayload),
    RoverPhoto(RoverPhotoPayload),
}

/// A normalized unit of postable material
///
/// The id is derived from the payload, so the same real-world item always
/// maps to the same id and ids never collide across kinds. Records are only
/// built through the constructors below; there is no deserializer that could
/// pair an id with a different payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    id: String,
    payload: ContentPayload,
}

impl ContentRecord {
    pub fn paper(payload: PaperPayload) -> Self {
        Self {
            id: format!("arxiv_{}", payload.arxiv_id),
            payload: ContentPayload::Paper(payload),
        }
    }

    pub fn image_of_day(payload: ImageOfDayPayload) -> Self {
        Self {
            id: apod_content_id(&payload.date),
            payload: ContentPayload::ImageOfDay(payload),
        }
    }

    pub fn rover_photo(payload: RoverPhotoPayload) -> Self {
        Self {
            id: rover_photo_content_id(payload.photo_id),
            payload: ContentPayload::RoverPhoto(payload),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ContentKind {
        match self.payload {
            ContentPayload::Paper(_) => ContentKind::Paper,
            ContentPayload::ImageOfDay(_) => ContentKind::ImageOfDay,
            ContentPayload::RoverPhoto(_) => ContentKind::RoverPhoto,
        }
    }

    pub fn payload(&self) -> &ContentPayload {
        &self.payload
    }
}

/// Ledger id of the APOD for a `YYYY-MM-DD` date
pub fn apod_content_id(date: &str) -> String {
    format!("nasa_apod_{}", date)
}

/// Ledger id of a rover photo
pub fn rover_photo_content_id(photo_id: u64) -> String {
    format!("nasa_mars_{}", photo_id)
}

/// Formatted text ready for publishing
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPost {
    /// The text content
    pub text: String,
    /// Ledger id of the record the text was rendered from
    pub content_id: String,
}

/// When a content id was posted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub posted_at: OffsetDateTime,
}

/// Ledger contents keyed by content id
pub type LedgerEntries = HashMap<String, LedgerEntry>;

/// Result of one poll cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Content was published and recorded
    Published {
        content_id: String,
        source: ContentSource,
        post_id: String,
    },
    /// No unused content could be acquired from any source
    NoContent,
    /// Content was acquired but could not be formatted
    FormatFailed { content_id: String, error: String },
    /// The publisher rejected the post
    PublishFailed { content_id: String, error: String },
}
