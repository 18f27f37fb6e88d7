//! Background historical loads.
//!
//! Every request gets a fresh generation number; issuing a new request is
//! how the previous one is cancelled. A slow response carrying a stale
//! generation is discarded by the engine without touching any state, so a
//! stale fetch can never overwrite newer data.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use tokio::runtime::Builder;

use crate::config::DF;
use crate::data::HistoryProvider;
use crate::domain::Instrument;
use crate::engine::FeedEvent;

pub struct HistoryLoader {
    provider: Arc<dyn HistoryProvider>,
    generation: u64,
}

impl HistoryLoader {
    pub fn new(provider: Arc<dyn HistoryProvider>) -> Self {
        HistoryLoader {
            provider,
            generation: 0,
        }
    }

    /// The generation of the most recent request; only results tagged with
    /// it are current.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Outdates any in-flight request without issuing a new one. Used at
    /// teardown so a late response cannot update state.
    pub fn cancel(&mut self) {
        self.generation += 1;
    }

    /// Cancels any in-flight request (by outdating its generation) and
    /// issues a new one on a dedicated thread.
    pub fn request(&mut self, instrument: Instrument, events: Sender<FeedEvent>) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let provider = self.provider.clone();

        if DF.log_history_loads {
            log::info!("history request #{generation} for {instrument}");
        }

        thread::spawn(move || {
            let result = match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt
                    .block_on(provider.fetch(&instrument))
                    .map_err(|err| format!("{err:#}")),
                Err(err) => Err(format!("history runtime failed to start: {err}")),
            };
            // The receiver being gone just means the chart unmounted.
            let _ = events.send(FeedEvent::History { generation, result });
        });

        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::domain::{Candle, Timeframe};

    struct StubProvider;

    #[async_trait]
    impl HistoryProvider for StubProvider {
        async fn fetch(&self, _instrument: &Instrument) -> Result<Vec<Candle>> {
            Ok(vec![Candle::new(1_000, 1.0, 2.0, 0.5, 1.5, 10.0)])
        }
    }

    #[test]
    fn each_request_outdates_the_previous_generation() {
        let (tx, rx) = mpsc::channel();
        let mut loader = HistoryLoader::new(Arc::new(StubProvider));
        let instrument = Instrument::new("AAPL.US", Timeframe::D1);

        let first = loader.request(instrument.clone(), tx.clone());
        let second = loader.request(instrument, tx);
        assert!(second > first);
        assert_eq!(loader.generation(), second);

        // Both responses arrive; only the one tagged `second` is current.
        let mut seen = Vec::new();
        for _ in 0..2 {
            match rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap() {
                FeedEvent::History { generation, result } => {
                    assert!(result.is_ok());
                    seen.push(generation);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![first, second]);
    }
}
