//! Rendering use case - transforms content records into platform-length posts

use time::Date;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::model::{
    ContentPayload, ContentRecord, ImageOfDayPayload, PaperPayload, RenderedPost,
    RoverPhotoPayload,
};

const ELLIPSIS: &str = "...";
const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const LONG_DATE: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day], [year]");

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Hard limit for the whole message
    pub max_chars: usize,
    /// Limit for title and author fields before composition
    pub field_max_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_chars: 280,
            field_max_chars: 100,
        }
    }
}

/// Why a record could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid date '{0}'")]
    InvalidDate(String),
}

/// Renderer for turning content records into post text
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render a record. Never touches the network or the ledger.
    pub fn render(&self, record: &ContentRecord) -> Result<RenderedPost, FormatError> {
        let text = match record.payload() {
            ContentPayload::Paper(paper) => self.render_paper(paper)?,
            ContentPayload::ImageOfDay(apod) => self.render_image_of_day(apod)?,
            ContentPayload::RoverPhoto(photo) => self.render_rover_photo(photo)?,
        };

        Ok(RenderedPost {
            text: truncate_chars(&text, self.config.max_chars),
            content_id: record.id().to_string(),
        })
    }

    fn render_paper(&self, paper: &PaperPayload) -> Result<String, FormatError> {
        let title = required(&paper.title, "title")?;
        let authors = required(&paper.authors, "authors")?;
        let url = required(&paper.url, "url")?;

        Ok(format!(
            "{}\n\nBy: {}\n\nLink: {}",
            truncate_chars(title, self.config.field_max_chars),
            clip_authors(authors, self.config.field_max_chars),
            url
        ))
    }

    fn render_image_of_day(&self, apod: &ImageOfDayPayload) -> Result<String, FormatError> {
        let title = present(&apod.title).unwrap_or("Astronomy Picture of the Day");

        // Videos link to their thumbnail so the post gets an image preview
        let url = if apod.media_type.as_deref() == Some("video") {
            present(&apod.thumbnail_url).or(present(&apod.url))
        } else {
            present(&apod.url)
        }
        .ok_or(FormatError::MissingField("url"))?;

        let mut text = format!(
            "NASA's Astronomy Picture of the Day\n\n{}\n\n",
            truncate_chars(title, self.config.field_max_chars)
        );

        if !apod.date.trim().is_empty() {
            let date = long_date(&apod.date)
                .ok_or_else(|| FormatError::InvalidDate(apod.date.clone()))?;
            text.push_str(&format!("Date: {}\n", date));
        }

        text.push_str(&format!("Link: {}", url));
        Ok(text)
    }

    fn render_rover_photo(&self, photo: &RoverPhotoPayload) -> Result<String, FormatError> {
        let img_src = required(&photo.img_src, "img_src")?;
        let rover = present(&photo.rover_name).unwrap_or("Curiosity");
        let camera = present(&photo.camera_full_name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} Rover Camera", rover));

        let mut text = format!("Mars {} Rover\n\nCaptured by: {}\n", rover, camera);

        if let Some(earth_date) = present(&photo.earth_date) {
            let date = long_date(earth_date).unwrap_or_else(|| earth_date.to_string());
            text.push_str(&format!("Date: {}\n\n", date));
        }

        text.push_str(&format!("Link: {}", img_src));
        Ok(text)
    }
}

/// Truncate to at most `max_chars` characters, ending in an ellipsis when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Authors keep the full `max_chars` and gain the ellipsis on top
fn clip_authors(authors: &str, max_chars: usize) -> String {
    if authors.chars().count() <= max_chars {
        return authors.to_string();
    }

    let mut clipped: String = authors.chars().take(max_chars).collect();
    clipped.push_str(ELLIPSIS);
    clipped
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, FormatError> {
    present(field).ok_or(FormatError::MissingField(name))
}

/// `2024-01-05` -> `January 05, 2024`
fn long_date(iso: &str) -> Option<String> {
    Date::parse(iso.trim(), ISO_DATE)
        .ok()
        .and_then(|date| date.format(LONG_DATE).ok())
}
