//! One progress stream across the wiki and repository phases.

use async_trait::async_trait;
use tokio::sync::Mutex;

use docscout_shared::{Result, ScraperProgressEvent};

use crate::strategy::ProgressCallback;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Running totals reported by the wiki phase.
    InWikiPhase { discovered: usize, scraped: usize },
    /// Wiki totals added to every repository event.
    InRepoPhase { discovered: usize, scraped: usize },
}

/// Forwards events to the caller, offsetting repository-phase counters by the
/// wiki totals so `pages_scraped` keeps increasing across both phases.
pub(crate) struct MergedProgress<'a> {
    inner: &'a dyn ProgressCallback,
    max_pages: usize,
    phase: Mutex<Phase>,
}

impl<'a> MergedProgress<'a> {
    pub(crate) fn new(inner: &'a dyn ProgressCallback, max_pages: usize) -> Self {
        Self {
            inner,
            max_pages,
            phase: Mutex::new(Phase::InWikiPhase {
                discovered: 0,
                scraped: 0,
            }),
        }
    }

    /// End the wiki phase and return how many wiki pages were scraped.
    ///
    /// Only the first call transitions; later calls return the same count.
    pub(crate) async fn finish_wiki(&self) -> usize {
        let mut phase = self.phase.lock().await;
        match *phase {
            Phase::InWikiPhase {
                discovered,
                scraped,
            } => {
                *phase = Phase::InRepoPhase {
                    discovered,
                    scraped,
                };
                scraped
            }
            Phase::InRepoPhase { scraped, .. } => scraped,
        }
    }
}

#[async_trait]
impl<'a> ProgressCallback for MergedProgress<'a> {
    async fn on_progress(&self, mut event: ScraperProgressEvent) -> Result<()> {
        {
            let mut phase = self.phase.lock().await;
            match &mut *phase {
                Phase::InWikiPhase {
                    discovered,
                    scraped,
                } => {
                    *discovered = event.total_discovered;
                    *scraped = event.pages_scraped;
                }
                Phase::InRepoPhase {
                    discovered,
                    scraped,
                } => {
                    event.pages_scraped += *scraped;
                    event.total_pages += *scraped;
                    event.total_discovered += *discovered;
                    event.max_pages = self.max_pages;
                }
            }
        }
        self.inner.on_progress(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::Recorder;

    fn event(scraped: usize, discovered: usize, max_pages: usize) -> ScraperProgressEvent {
        ScraperProgressEvent {
            current_url: format!("https://github.com/acme/widgets/page{scraped}"),
            pages_scraped: scraped,
            max_pages,
            total_pages: discovered.min(max_pages),
            total_discovered: discovered,
            depth: 1,
            max_depth: 3,
            document: None,
        }
    }

    #[tokio::test]
    async fn repo_events_continue_after_wiki_totals() {
        let recorder = Recorder::default();
        let merged = MergedProgress::new(&recorder, 10);

        merged.on_progress(event(1, 3, 10)).await.unwrap();
        merged.on_progress(event(2, 4, 10)).await.unwrap();
        assert_eq!(merged.finish_wiki().await, 2);

        merged.on_progress(event(1, 5, 8)).await.unwrap();
        merged.on_progress(event(2, 5, 8)).await.unwrap();

        let events = recorder.events.lock().unwrap();
        let scraped: Vec<usize> = events.iter().map(|e| e.pages_scraped).collect();
        assert_eq!(scraped, vec![1, 2, 3, 4]);
        assert_eq!(events[2].total_discovered, 9);
        assert_eq!(events[2].total_pages, 7);
        assert_eq!(events[3].max_pages, 10);
    }

    #[tokio::test]
    async fn finishing_twice_does_not_double_count() {
        let recorder = Recorder::default();
        let merged = MergedProgress::new(&recorder, 10);
        merged.on_progress(event(3, 3, 10)).await.unwrap();
        assert_eq!(merged.finish_wiki().await, 3);
        assert_eq!(merged.finish_wiki().await, 3);

        merged.on_progress(event(1, 1, 7)).await.unwrap();
        assert_eq!(recorder.events.lock().unwrap()[1].pages_scraped, 4);
    }

    #[tokio::test]
    async fn no_wiki_events_means_no_offset() {
        let recorder = Recorder::default();
        let merged = MergedProgress::new(&recorder, 5);
        assert_eq!(merged.finish_wiki().await, 0);
        merged.on_progress(event(1, 2, 5)).await.unwrap();
        assert_eq!(recorder.events.lock().unwrap()[0].pages_scraped, 1);
    }
}
