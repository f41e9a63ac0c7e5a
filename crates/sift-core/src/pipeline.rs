//! Drives many URLs through fetch → extract with bounded concurrency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::extractor::PageModelExtractor;
use crate::traits::Fetcher;

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of pages fetched and extracted at once.
    pub concurrency: usize,
    /// Per-request timeout handed to the fetcher.
    pub fetch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    /// Read configuration from environment variables.
    ///
    /// - `SIFT_CONCURRENCY` (optional, defaults to 4)
    /// - `SIFT_FETCH_TIMEOUT_SECS` (optional, defaults to 30)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let concurrency = match std::env::var("SIFT_CONCURRENCY") {
            Err(_) => defaults.concurrency,
            Ok(raw) => parse_positive("SIFT_CONCURRENCY", &raw)? as usize,
        };
        let fetch_timeout = match std::env::var("SIFT_FETCH_TIMEOUT_SECS") {
            Err(_) => defaults.fetch_timeout,
            Ok(raw) => Duration::from_secs(parse_positive("SIFT_FETCH_TIMEOUT_SECS", &raw)?),
        };
        Ok(Self {
            concurrency,
            fetch_timeout,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

fn parse_positive(var: &str, raw: &str) -> Result<u64, AppError> {
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {var} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{var} must be at least 1")));
    }
    Ok(parsed)
}

/// Events emitted by the pipeline for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    Started { model: &'a str, urls: usize },
    Rejected { url: &'a str },
    Extracted { url: &'a str },
    Skipped { url: &'a str },
    Failed { url: &'a str, error: &'a AppError },
    Finished { stats: &'a PipelineStats },
}

/// Trait for receiving pipeline events (decoupled logging).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::Started { model, urls } => {
                tracing::info!(%model, %urls, "Pipeline started");
            }
            PipelineEvent::Rejected { url } => {
                tracing::debug!(%url, "Not a target URL");
            }
            PipelineEvent::Extracted { url } => {
                tracing::info!(%url, "Record extracted");
            }
            PipelineEvent::Skipped { url } => {
                tracing::info!(%url, "Record skipped");
            }
            PipelineEvent::Failed { url, error } => {
                tracing::warn!(%url, %error, "Page failed");
            }
            PipelineEvent::Finished { stats } => {
                tracing::info!(
                    extracted = stats.extracted,
                    skipped = stats.skipped,
                    rejected = stats.rejected,
                    failed = stats.failed,
                    "Pipeline finished"
                );
            }
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub extracted: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// A record together with the URL it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub url: String,
    pub record: T,
}

/// Records kept by a run, in completion order, plus counters.
#[derive(Debug)]
pub struct PipelineOutput<T> {
    pub records: Vec<Extracted<T>>,
    pub stats: PipelineStats,
}

enum Outcome<T> {
    Extracted(T),
    Skipped,
    Rejected,
    Failed(AppError),
}

/// Fetches pages and applies a compiled extractor to each.
///
/// One page failing (fetch error or extraction error) never stops the run.
/// Records whose page was marked skip are dropped.
pub struct ExtractPipeline<F, T>
where
    F: Fetcher,
{
    fetcher: F,
    extractor: Arc<PageModelExtractor<T>>,
    config: PipelineConfig,
}

impl<F, T> ExtractPipeline<F, T>
where
    F: Fetcher,
    T: Send + 'static,
{
    pub fn new(fetcher: F, extractor: Arc<PageModelExtractor<T>>, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            extractor,
            config,
        }
    }

    /// Process every URL. After cancellation no new page is started; pages
    /// already in flight finish and are counted.
    pub async fn run<R: PipelineReporter>(
        &self,
        urls: Vec<String>,
        cancel_token: CancellationToken,
        reporter: &R,
    ) -> PipelineOutput<T> {
        reporter.report(PipelineEvent::Started {
            model: self.extractor.name(),
            urls: urls.len(),
        });

        let mut stats = PipelineStats::default();
        let mut records = Vec::new();
        let mut pending = urls.into_iter();
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        let limit = self.config.concurrency.max(1);

        loop {
            while tasks.len() < limit && !cancel_token.is_cancelled() {
                let Some(url) = pending.next() else {
                    break;
                };
                let fetcher = self.fetcher.clone();
                let extractor = Arc::clone(&self.extractor);
                let task_url = url.clone();
                let handle = tasks.spawn(async move {
                    let outcome = process_url(&fetcher, &extractor, &task_url).await;
                    (task_url, outcome)
                });
                in_flight.insert(handle.id(), url);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            let (url, outcome) = match joined {
                Ok((id, done)) => {
                    in_flight.remove(&id);
                    done
                }
                Err(e) => {
                    let url = in_flight.remove(&e.id()).unwrap_or_default();
                    tracing::error!(%url, error = %e, "Extraction task panicked");
                    let error = AppError::RecordError(format!("extraction task panicked: {e}"));
                    reporter.report(PipelineEvent::Failed {
                        url: &url,
                        error: &error,
                    });
                    stats.failed += 1;
                    continue;
                }
            };

            match outcome {
                Outcome::Extracted(record) => {
                    reporter.report(PipelineEvent::Extracted { url: &url });
                    stats.extracted += 1;
                    records.push(Extracted { url, record });
                }
                Outcome::Skipped => {
                    reporter.report(PipelineEvent::Skipped { url: &url });
                    stats.skipped += 1;
                }
                Outcome::Rejected => {
                    reporter.report(PipelineEvent::Rejected { url: &url });
                    stats.rejected += 1;
                }
                Outcome::Failed(error) => {
                    reporter.report(PipelineEvent::Failed {
                        url: &url,
                        error: &error,
                    });
                    stats.failed += 1;
                }
            }
        }

        reporter.report(PipelineEvent::Finished { stats: &stats });
        PipelineOutput { records, stats }
    }
}

async fn process_url<F, T>(fetcher: &F, extractor: &PageModelExtractor<T>, url: &str) -> Outcome<T>
where
    F: Fetcher,
    T: 'static,
{
    if !extractor.matches_target(url) {
        return Outcome::Rejected;
    }

    let mut page = match fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) => return Outcome::Failed(e),
    };

    match extractor.try_apply(&mut page) {
        Ok(Some(_)) if page.result_items().is_skip() => Outcome::Skipped,
        Ok(Some(record)) => Outcome::Extracted(record),
        // Redirected to a URL outside the target set.
        Ok(None) => Outcome::Rejected,
        Err(e) => Outcome::Failed(e),
    }
}
