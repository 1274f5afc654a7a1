//! Content selection - pulls fresh candidates from the active source with
//! bounded retries and at most one switch to the next source

use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, sleep};

use crate::model::{ContentRecord, ContentSource};
use crate::ports::{ContentProvider, FetchHint, PostedLookup, SourceError};

/// Configuration for the selector
#[derive(Debug, Clone)]
pub struct SelectConfig {
    /// Attempts per source before giving up on it
    pub max_attempts: u32,
    /// Pause between attempts that produced nothing usable
    pub retry_delay: Duration,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Outcome of one acquisition
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// First unused candidate found, if any
    pub record: Option<ContentRecord>,
    /// Source that was active when acquisition ended
    pub source: ContentSource,
}

/// Providers keyed by the source they serve
pub type Providers = HashMap<ContentSource, Arc<dyn ContentProvider>>;

/// Selects one not-yet-posted content record
///
/// The first acceptable candidate wins. Catalogs are large and randomly
/// sampled, so a few quick attempts are preferred over an exhaustive scan.
pub struct ContentSelector {
    providers: Providers,
    config: SelectConfig,
}

impl ContentSelector {
    pub fn new(providers: Providers, config: SelectConfig) -> Self {
        Self { providers, config }
    }

    pub fn config(&self) -> &SelectConfig {
        &self.config
    }

    /// Acquire a candidate starting from `source`.
    ///
    /// Empty or duplicate results are retried on the same source after
    /// `retry_delay`. A provider fault on the final attempt switches to the
    /// next source once; a second exhaustion returns no record.
    pub async fn acquire(&self, source: ContentSource, posted: &dyn PostedLookup) -> Acquisition {
        let max_attempts = self.config.max_attempts.max(1);
        let mut source = source;
        let mut switched = false;

        'sources: loop {
            for attempt in 1..=max_attempts {
                match self.fetch(source, attempt, posted).await {
                    Ok(Some(record)) if !posted.is_posted(record.id()) => {
                        tracing::info!(
                            source = %source,
                            attempt = attempt,
                            content_id = %record.id(),
                            "Acquired content"
                        );
                        return Acquisition {
                            record: Some(record),
                            source,
                        };
                    }
                    Ok(Some(record)) => {
                        tracing::debug!(
                            source = %source,
                            attempt = attempt,
                            content_id = %record.id(),
                            "Candidate already posted"
                        );
                    }
                    Ok(None) => {
                        tracing::debug!(source = %source, attempt = attempt, "No candidate");
                    }
                    Err(e) => {
                        tracing::error!(
                            source = %source,
                            attempt = attempt,
                            error = %e,
                            "Error getting content"
                        );
                        if attempt == max_attempts {
                            if switched {
                                break 'sources;
                            }
                            switched = true;
                            source = source.next();
                            tracing::info!(source = %source, "Switched content source");
                            continue 'sources;
                        }
                        continue;
                    }
                }

                if attempt < max_attempts {
                    tracing::info!(source = %source, attempt = attempt, "Retrying content fetch");
                    sleep(self.config.retry_delay).await;
                }
            }
            break;
        }

        Acquisition {
            record: None,
            source,
        }
    }

    async fn fetch(
        &self,
        source: ContentSource,
        attempt: u32,
        posted: &dyn PostedLookup,
    ) -> Result<Option<ContentRecord>, SourceError> {
        let provider = self
            .providers
            .get(&source)
            .ok_or_else(|| SourceError::Api(format!("No provider configured for {}", source)))?;

        provider
            .fetch_candidate(&FetchHint::new(attempt, posted))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageOfDayPayload, PaperPayload};
    use async_trait::async_trait;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    type Scripted = Result<Option<ContentRecord>, SourceError>;

    /// Replays scripted responses, then repeats the fallback forever
    struct ScriptedProvider {
        script: Mutex<VecDeque<Scripted>>,
        fallback: fn() -> Scripted,
        calls: Mutex<Vec<u32>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Scripted>, fallback: fn() -> Scripted) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: Mutex::new(vec![]),
            })
        }

        fn attempts(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentProvider for ScriptedProvider {
        async fn fetch_candidate(
            &self,
            hint: &FetchHint<'_>,
        ) -> Result<Option<ContentRecord>, SourceError> {
            self.calls.lock().unwrap().push(hint.attempt);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(self.fallback)
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    struct Posted(HashSet<String>);

    impl PostedLookup for Posted {
        fn is_posted(&self, content_id: &str) -> bool {
            self.0.contains(content_id)
        }
    }

    fn posted(ids: &[&str]) -> Posted {
        Posted(ids.iter().map(|s| s.to_string()).collect())
    }

    fn apod(date: &str) -> ContentRecord {
        ContentRecord::image_of_day(ImageOfDayPayload {
            date: date.to_string(),
            title: Some("Nebula".to_string()),
            explanation: None,
            url: Some("https://apod.nasa.gov/x.jpg".to_string()),
            media_type: Some("image".to_string()),
            thumbnail_url: None,
        })
    }

    fn paper(id: &str) -> ContentRecord {
        ContentRecord::paper(PaperPayload {
            arxiv_id: id.to_string(),
            title: Some("Paper".to_string()),
            authors: Some("Author".to_string()),
            url: Some(format!("http://arxiv.org/abs/{}", id)),
            summary: None,
            category: "cs.AI".to_string(),
        })
    }

    fn nothing() -> Scripted {
        Ok(None)
    }

    fn always_apod() -> Scripted {
        Ok(Some(apod("2024-01-01")))
    }

    fn always_fails() -> Scripted {
        Err(SourceError::Network("connection reset".to_string()))
    }

    fn selector(nasa: Arc<ScriptedProvider>, arxiv: Arc<ScriptedProvider>) -> ContentSelector {
        let mut providers: Providers = HashMap::new();
        providers.insert(ContentSource::Nasa, nasa);
        providers.insert(ContentSource::Arxiv, arxiv);
        ContentSelector::new(providers, SelectConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fresh_candidate_wins() {
        let nasa = ScriptedProvider::new(vec![Ok(Some(apod("2024-02-02")))], nothing);
        let arxiv = ScriptedProvider::new(vec![], nothing);
        let selector = selector(nasa.clone(), arxiv.clone());

        let result = selector.acquire(ContentSource::Nasa, &posted(&[])).await;

        assert_eq!(result.record.unwrap().id(), "nasa_apod_2024-02-02");
        assert_eq!(result.source, ContentSource::Nasa);
        assert_eq!(nasa.attempts(), vec![1]);
        assert!(arxiv.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_every_attempt_yields_none() {
        let nasa = ScriptedProvider::new(vec![], always_apod);
        let arxiv = ScriptedProvider::new(vec![], nothing);
        let selector = selector(nasa.clone(), arxiv.clone());

        let result = selector
            .acquire(ContentSource::Nasa, &posted(&["nasa_apod_2024-01-01"]))
            .await;

        assert!(result.record.is_none());
        assert_eq!(result.source, ContentSource::Nasa);
        assert_eq!(nasa.attempts(), vec![1, 2, 3]);
        assert!(arxiv.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_wait_between_attempts() {
        let nasa = ScriptedProvider::new(
            vec![Ok(None), Ok(None), Ok(Some(apod("2024-02-03")))],
            nothing,
        );
        let arxiv = ScriptedProvider::new(vec![], nothing);
        let selector = selector(nasa.clone(), arxiv);

        let started = tokio::time::Instant::now();
        let result = selector.acquire(ContentSource::Nasa, &posted(&[])).await;

        assert_eq!(result.record.unwrap().id(), "nasa_apod_2024-02-03");
        assert_eq!(nasa.attempts(), vec![1, 2, 3]);
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_on_final_attempt_switches_source_once() {
        let nasa = ScriptedProvider::new(vec![], always_fails);
        let arxiv = ScriptedProvider::new(vec![Ok(None), Ok(Some(paper("2401.7v1")))], nothing);
        let selector = selector(nasa.clone(), arxiv.clone());

        let result = selector.acquire(ContentSource::Nasa, &posted(&[])).await;

        assert_eq!(result.record.unwrap().id(), "arxiv_2401.7v1");
        assert_eq!(result.source, ContentSource::Arxiv);
        assert_eq!(nasa.attempts(), vec![1, 2, 3]);
        assert_eq!(arxiv.attempts(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_sources_broken_terminates() {
        let nasa = ScriptedProvider::new(vec![], always_fails);
        let arxiv = ScriptedProvider::new(vec![], always_fails);
        let selector = selector(nasa.clone(), arxiv.clone());

        let result = selector.acquire(ContentSource::Arxiv, &posted(&[])).await;

        assert!(result.record.is_none());
        assert_eq!(result.source, ContentSource::Nasa);
        assert_eq!(arxiv.attempts(), vec![1, 2, 3]);
        assert_eq!(nasa.attempts(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_fault_retries_same_source() {
        let nasa = ScriptedProvider::new(
            vec![
                Err(SourceError::RateLimited),
                Ok(Some(apod("2024-02-04"))),
            ],
            nothing,
        );
        let arxiv = ScriptedProvider::new(vec![], nothing);
        let selector = selector(nasa.clone(), arxiv.clone());

        let result = selector.acquire(ContentSource::Nasa, &posted(&[])).await;

        assert_eq!(result.record.unwrap().id(), "nasa_apod_2024-02-04");
        assert_eq!(result.source, ContentSource::Nasa);
        assert!(arxiv.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_returns_a_posted_record() {
        let nasa = ScriptedProvider::new(
            vec![
                Ok(Some(apod("2024-01-01"))),
                Ok(Some(apod("2024-01-02"))),
                Ok(Some(apod("2024-01-03"))),
            ],
            nothing,
        );
        let arxiv = ScriptedProvider::new(vec![], nothing);
        let selector = selector(nasa, arxiv);
        let seen = posted(&["nasa_apod_2024-01-01", "nasa_apod_2024-01-02"]);

        let result = selector.acquire(ContentSource::Nasa, &seen).await;

        let record = result.record.unwrap();
        assert_eq!(record.id(), "nasa_apod_2024-01-03");
        assert!(!seen.is_posted(record.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_provider_falls_back_to_other_source() {
        let arxiv = ScriptedProvider::new(vec![Ok(Some(paper("2402.1v1")))], nothing);
        let mut providers: Providers = HashMap::new();
        providers.insert(ContentSource::Arxiv, arxiv);
        let selector = ContentSelector::new(providers, SelectConfig::default());

        let result = selector.acquire(ContentSource::Nasa, &posted(&[])).await;

        assert_eq!(result.record.unwrap().id(), "arxiv_2402.1v1");
        assert_eq!(result.source, ContentSource::Arxiv);
    }
}
