use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};

use super::instrument::Instrument;
use super::samples::{InstrumentStore, SampleBuffer};

/// Request to decode every listed note of one instrument.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub generation: u64,
    pub instrument: Arc<Instrument>,
    pub notes: Vec<String>,
}

/// One decoded note, tagged with the instrument switch it belongs to.
#[derive(Debug, Clone)]
pub struct LoadedSample {
    pub generation: u64,
    pub note: String,
    pub buffer: SampleBuffer,
}

/// Background worker that fetches samples off the frame loop.
///
/// Only the newest request matters: once a later generation has been
/// requested, the worker stops fetching for older ones.
pub struct SampleLoader {
    requests: Option<Sender<LoadRequest>>,
    current: Arc<AtomicU64>,
    results: Receiver<LoadedSample>,
    worker: Option<JoinHandle<()>>,
}

impl SampleLoader {
    pub fn spawn(store: Arc<dyn InstrumentStore>) -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (result_tx, result_rx) = unbounded();
        let current = Arc::new(AtomicU64::new(0));

        let worker_current = Arc::clone(&current);
        let worker = thread::Builder::new()
            .name("sample-loader".into())
            .spawn(move || run_worker(store, worker_current, request_rx, result_tx))
            .context("Failed to spawn sample loader thread")?;

        Ok(Self {
            requests: Some(request_tx),
            current,
            results: result_rx,
            worker: Some(worker),
        })
    }

    /// Queue `request` and mark every earlier generation as superseded.
    pub fn request(&self, request: LoadRequest) {
        self.current.fetch_max(request.generation, Ordering::SeqCst);
        let sent = self
            .requests
            .as_ref()
            .map(|tx| tx.send(request).is_ok())
            .unwrap_or(false);
        if !sent {
            warn!("sample loader has stopped, request dropped");
        }
    }

    /// Everything decoded since the last call.
    pub fn try_results(&self) -> Vec<LoadedSample> {
        self.results.try_iter().collect()
    }

    pub fn results(&self) -> &Receiver<LoadedSample> {
        &self.results
    }
}

impl Drop for SampleLoader {
    fn drop(&mut self) {
        // closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("sample loader thread panicked");
            }
        }
    }
}

fn run_worker(
    store: Arc<dyn InstrumentStore>,
    current: Arc<AtomicU64>,
    requests: Receiver<LoadRequest>,
    results: Sender<LoadedSample>,
) {
    for request in requests.iter() {
        debug!(
            "loading {} samples for {} (generation {})",
            request.notes.len(),
            request.instrument.id,
            request.generation
        );
        for note in &request.notes {
            if request.generation < current.load(Ordering::SeqCst) {
                debug!(
                    "generation {} superseded, skipping the rest of {}",
                    request.generation, request.instrument.id
                );
                break;
            }
            match store.fetch_sample_buffer(&request.instrument, note) {
                Ok(buffer) => {
                    let loaded = LoadedSample {
                        generation: request.generation,
                        note: note.clone(),
                        buffer,
                    };
                    if results.send(loaded).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("could not load {} for {}: {:#}", note, request.instrument.id, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::playback::instrument::InstrumentCatalog;
    use crate::core::playback::tone::ToneStore;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Takes a while per note and remembers what it was asked for.
    #[derive(Default)]
    struct SlowStore {
        fetched: Mutex<Vec<String>>,
    }

    impl InstrumentStore for SlowStore {
        fn fetch_sample_buffer(&self, _instrument: &Instrument, note: &str) -> Result<SampleBuffer> {
            std::thread::sleep(Duration::from_millis(20));
            self.fetched.lock().unwrap().push(note.to_string());
            Ok(SampleBuffer::new(vec![0.0; 4], 8_000))
        }
    }

    #[test]
    fn loads_each_note_and_skips_failures() {
        let loader = SampleLoader::spawn(Arc::new(ToneStore::new(8_000))).unwrap();
        let catalog = InstrumentCatalog::builtin(["C4", "D4"]);
        loader.request(LoadRequest {
            generation: 3,
            instrument: Arc::new(catalog.get("piano").unwrap().clone()),
            notes: vec!["C4".into(), "bogus".into(), "D4".into()],
        });

        let timeout = Duration::from_secs(5);
        let first = loader.results().recv_timeout(timeout).unwrap();
        let second = loader.results().recv_timeout(timeout).unwrap();
        assert_eq!((first.note.as_str(), first.generation), ("C4", 3));
        assert_eq!((second.note.as_str(), second.generation), ("D4", 3));
        assert!(!first.buffer.is_empty());
        assert!(loader.results().recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn newer_request_cuts_off_an_older_one() {
        let store = Arc::new(SlowStore::default());
        let loader = SampleLoader::spawn(store.clone()).unwrap();
        let catalog = InstrumentCatalog::builtin(["C4"]);
        let piano = Arc::new(catalog.get("piano").unwrap().clone());

        let old_notes: Vec<String> = (0..10).map(|i| format!("old{}", i)).collect();
        loader.request(LoadRequest {
            generation: 1,
            instrument: Arc::clone(&piano),
            notes: old_notes,
        });
        loader.request(LoadRequest {
            generation: 2,
            instrument: piano,
            notes: vec!["new".into()],
        });

        let timeout = Duration::from_secs(5);
        let current = loop {
            let loaded = loader.results().recv_timeout(timeout).unwrap();
            if loaded.generation == 2 {
                break loaded;
            }
        };
        assert_eq!(current.note, "new");

        let fetched = store.fetched.lock().unwrap().clone();
        let stale = fetched.iter().filter(|n| n.starts_with("old")).count();
        // at most the note already in flight when the switch arrived
        assert!(stale <= 1, "fetched {:?}", fetched);
    }
}
