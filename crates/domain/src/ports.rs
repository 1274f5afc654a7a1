//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{ContentRecord, LedgerEntries, RenderedPost};

/// Error type for content provider operations
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Read-only view of what has already been posted
pub trait PostedLookup: Send + Sync {
    /// True if the content id was already posted
    fn is_posted(&self, content_id: &str) -> bool;
}

/// Nothing is ever posted
#[derive(Debug, Clone, Copy, Default)]
pub struct NothingPosted;

impl PostedLookup for NothingPosted {
    fn is_posted(&self, _content_id: &str) -> bool {
        false
    }
}

/// Context handed to a provider for one fetch
pub struct FetchHint<'a> {
    /// 1-based attempt number within the selector's budget
    pub attempt: u32,
    /// Lets providers that try several items skip ones already posted
    pub posted: &'a dyn PostedLookup,
}

impl<'a> FetchHint<'a> {
    pub fn new(attempt: u32, posted: &'a dyn PostedLookup) -> Self {
        Self { attempt, posted }
    }
}

/// Port for pulling a candidate record from one content origin
///
/// "Nothing found" is `Ok(None)`. Only transport and parsing faults are errors.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch one candidate record
    async fn fetch_candidate(
        &self,
        hint: &FetchHint<'_>,
    ) -> Result<Option<ContentRecord>, SourceError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
}

/// Result of a successful publish operation
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform-specific post ID
    pub id: String,
    /// URL to the published content, if available
    pub url: Option<String>,
}

/// Port for the social platform the bot posts to
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Establish a session. A no-op when already authenticated.
    async fn authenticate(&self) -> Result<(), PublishError>;

    /// Whether a session is currently established
    fn is_authenticated(&self) -> bool;

    /// Publish a rendered post
    async fn publish(&self, post: &RenderedPost) -> Result<PublishResult, PublishError>;

    /// Release session resources. Safe to call more than once.
    async fn close(&self);

    /// Get the platform name (e.g., "x", "outbox")
    fn platform(&self) -> &'static str;
}

/// Error type for ledger persistence
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed ledger: {0}")]
    Malformed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the ledger's durable representation
///
/// Implementations must replace the stored state as a whole so a reader never
/// observes a partial write.
pub trait LedgerStore: Send + Sync {
    /// Load all entries. A missing store is an empty ledger.
    fn load(&self) -> Result<LedgerEntries, LedgerError>;

    /// Replace the stored entries
    fn save(&self, entries: &LedgerEntries) -> Result<(), LedgerError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
