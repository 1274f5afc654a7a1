//! Run loop use case - orchestrates acquiring, formatting, publishing and recording

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{Duration, sleep};

use crate::{
    ledger::Ledger,
    model::{ContentSource, CycleOutcome},
    ports::{PublishError, Publisher},
    usecases::{
        render::{RenderConfig, Renderer},
        select::{ContentSelector, SelectConfig},
    },
};

/// Configuration for the run loop
#[derive(Debug, Clone)]
pub struct RunLoopConfig {
    /// Sleep between cycles
    pub poll_interval: Duration,
    /// Sleep after a cycle failed unexpectedly
    pub error_backoff: Duration,
    /// Source the first cycle starts from
    pub initial_source: ContentSource,
    /// Selection config
    pub select_config: SelectConfig,
    /// Render config
    pub render_config: RenderConfig,
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            error_backoff: Duration::from_secs(300),
            initial_source: ContentSource::Nasa,
            select_config: SelectConfig::default(),
            render_config: RenderConfig::default(),
        }
    }
}

/// Run loop orchestrator
///
/// Owns the ledger and the current source; one cycle runs to completion
/// before the next begins.
pub struct RunLoop<P>
where
    P: Publisher + ?Sized,
{
    selector: ContentSelector,
    renderer: Renderer,
    publisher: Arc<P>,
    ledger: Ledger,
    current_source: ContentSource,
    config: RunLoopConfig,
}

impl<P> RunLoop<P>
where
    P: Publisher + ?Sized,
{
    pub fn new(
        selector: ContentSelector,
        publisher: Arc<P>,
        ledger: Ledger,
        config: RunLoopConfig,
    ) -> Self {
        Self {
            renderer: Renderer::new(config.render_config.clone()),
            current_source: config.initial_source,
            selector,
            publisher,
            ledger,
            config,
        }
    }

    pub fn current_source(&self) -> ContentSource {
        self.current_source
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run a single acquire -> format -> publish -> record cycle
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, RunLoopError> {
        tracing::info!(source = %self.current_source, "Starting post cycle");

        if !self.publisher.is_authenticated() {
            tracing::info!(platform = self.publisher.platform(), "Logging in");
            self.publisher.authenticate().await?;
        }

        let acquisition = self
            .selector
            .acquire(self.current_source, &self.ledger)
            .await;
        self.current_source = acquisition.source;

        let Some(record) = acquisition.record else {
            tracing::error!("Failed to get content after all retries");
            self.switch_source();
            return Ok(CycleOutcome::NoContent);
        };

        let rendered = match self.renderer.render(&record) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!(content_id = %record.id(), error = %e, "Failed to format post");
                return Ok(CycleOutcome::FormatFailed {
                    content_id: record.id().to_string(),
                    error: e.to_string(),
                });
            }
        };

        match self.publisher.publish(&rendered).await {
            Ok(result) => {
                self.ledger.mark_posted(record.id());
                let source = self.current_source;
                self.switch_source();
                tracing::info!(
                    content_id = %record.id(),
                    post_id = %result.id,
                    url = ?result.url,
                    text = %rendered.text,
                    "Post published"
                );
                Ok(CycleOutcome::Published {
                    content_id: record.id().to_string(),
                    source,
                    post_id: result.id,
                })
            }
            Err(e) => {
                // Source was fine, so the same source is retried next cycle
                tracing::error!(content_id = %record.id(), error = %e, "Failed to publish post");
                Ok(CycleOutcome::PublishFailed {
                    content_id: record.id().to_string(),
                    error: e.to_string(),
                })
            }
        }
    }

    /// Loop cycles until `shutdown` resolves, then close the publisher
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let pause = tokio::select! {
                result = AssertUnwindSafe(self.run_cycle()).catch_unwind() => match result {
                    Ok(Ok(outcome)) => {
                        tracing::debug!(outcome = ?outcome, "Cycle complete");
                        self.config.poll_interval
                    }
                    Ok(Err(e)) => {
                        tracing::error!(
                            error = %e,
                            backoff_secs = self.config.error_backoff.as_secs(),
                            "Cycle error"
                        );
                        self.config.error_backoff
                    }
                    Err(panic) => {
                        tracing::error!(
                            panic = %panic_message(panic.as_ref()),
                            backoff_secs = self.config.error_backoff.as_secs(),
                            "Cycle panicked"
                        );
                        self.config.error_backoff
                    }
                },
                _ = &mut shutdown => break,
            };

            tracing::info!(wait_secs = pause.as_secs(), "Waiting for next cycle");

            tokio::select! {
                _ = sleep(pause) => {}
                _ = &mut shutdown => break,
            }
        }

        tracing::info!("Shutting down, closing publisher session");
        self.publisher.close().await;
    }

    fn switch_source(&mut self) {
        self.current_source = self.current_source.next();
        tracing::info!(source = %self.current_source, "Switched content source");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Errors that abort a cycle
#[derive(Debug, thiserror::Error)]
pub enum RunLoopError {
    #[error("Publisher session error: {0}")]
    Session(#[from] PublishError),
}
