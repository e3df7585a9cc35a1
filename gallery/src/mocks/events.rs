//! Mock event repository for testing.

use crate::error::{GalleryError, Result};
use crate::providers::EventRepository;
use crate::state::{DownloadRecord, Event, EventId, Image, NewEvent, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Knobs {
    fail_reads: AtomicBool,
    fail_creates: AtomicBool,
    fail_image_appends: AtomicBool,
    fail_image_removals: AtomicBool,
    fail_download_appends: AtomicBool,
}

#[derive(Debug, Default)]
struct Calls {
    reads: AtomicUsize,
    image_appends: AtomicUsize,
    download_appends: AtomicUsize,
}

/// Mock event repository.
///
/// Uses in-memory storage. Array operations mirror the document store:
/// appends skip equal elements, removals drop every equal element.
#[derive(Debug, Clone, Default)]
pub struct MockEventRepository {
    events: Arc<Mutex<HashMap<EventId, Event>>>,
    next_id: Arc<AtomicUsize>,
    knobs: Arc<Knobs>,
    calls: Arc<Calls>,
}

impl MockEventRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an event directly.
    pub fn insert(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.insert(event.id.clone(), event);
        }
    }

    /// Stored event.
    #[must_use]
    pub fn event(&self, event_id: &EventId) -> Option<Event> {
        self.events.lock().ok()?.get(event_id).cloned()
    }

    /// Make reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.knobs.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make event creation fail.
    pub fn fail_creates(&self, fail: bool) {
        self.knobs.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make image appends fail.
    pub fn fail_image_appends(&self, fail: bool) {
        self.knobs.fail_image_appends.store(fail, Ordering::SeqCst);
    }

    /// Make image removals fail.
    pub fn fail_image_removals(&self, fail: bool) {
        self.knobs.fail_image_removals.store(fail, Ordering::SeqCst);
    }

    /// Make download appends fail.
    pub fn fail_download_appends(&self, fail: bool) {
        self.knobs.fail_download_appends.store(fail, Ordering::SeqCst);
    }

    /// Reads so far (single event and owner queries).
    #[must_use]
    pub fn reads(&self) -> usize {
        self.calls.reads.load(Ordering::SeqCst)
    }

    /// Image append attempts so far.
    #[must_use]
    pub fn image_appends(&self) -> usize {
        self.calls.image_appends.load(Ordering::SeqCst)
    }

    /// Download append attempts so far.
    #[must_use]
    pub fn download_appends(&self) -> usize {
        self.calls.download_appends.load(Ordering::SeqCst)
    }

    fn update<F>(&self, event_id: &EventId, failing: bool, apply: F) -> impl Future<Output = Result<()>> + Send
    where
        F: FnOnce(&mut Event) + Send + 'static,
    {
        let events = Arc::clone(&self.events);
        let event_id = event_id.clone();

        async move {
            if failing {
                return Err(GalleryError::DocumentStore("simulated write failure".into()));
            }
            let mut events = events.lock().map_err(|_| GalleryError::InternalError)?;
            let event = events
                .get_mut(&event_id)
                .ok_or(GalleryError::NotFound { what: "Event" })?;
            apply(event);
            Ok(())
        }
    }
}

impl EventRepository for MockEventRepository {
    fn get_event(&self, event_id: &EventId) -> impl Future<Output = Result<Option<Event>>> + Send {
        let events = Arc::clone(&self.events);
        let failing = self.knobs.fail_reads.load(Ordering::SeqCst);
        let event_id = event_id.clone();
        self.calls.reads.fetch_add(1, Ordering::SeqCst);

        async move {
            if failing {
                return Err(GalleryError::DocumentStore("simulated read failure".into()));
            }
            Ok(events
                .lock()
                .map_err(|_| GalleryError::InternalError)?
                .get(&event_id)
                .cloned())
        }
    }

    fn events_by_owner(&self, owner: &UserId) -> impl Future<Output = Result<Vec<Event>>> + Send {
        let events = Arc::clone(&self.events);
        let failing = self.knobs.fail_reads.load(Ordering::SeqCst);
        let owner = owner.clone();
        self.calls.reads.fetch_add(1, Ordering::SeqCst);

        async move {
            if failing {
                return Err(GalleryError::DocumentStore("simulated read failure".into()));
            }
            Ok(events
                .lock()
                .map_err(|_| GalleryError::InternalError)?
                .values()
                .filter(|event| event.is_owned_by(&owner))
                .cloned()
                .collect())
        }
    }

    fn create_event(&self, event: &NewEvent) -> impl Future<Output = Result<Event>> + Send {
        let events = Arc::clone(&self.events);
        let failing = self.knobs.fail_creates.load(Ordering::SeqCst);
        let id = EventId::new(format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1));
        let event = event.clone();

        async move {
            if failing {
                return Err(GalleryError::DocumentStore("simulated write failure".into()));
            }
            let event = event.into_event(id);
            events
                .lock()
                .map_err(|_| GalleryError::InternalError)?
                .insert(event.id.clone(), event.clone());
            Ok(event)
        }
    }

    fn append_image(&self, event_id: &EventId, image: &Image) -> impl Future<Output = Result<()>> + Send {
        self.calls.image_appends.fetch_add(1, Ordering::SeqCst);
        let image = image.clone();
        self.update(
            event_id,
            self.knobs.fail_image_appends.load(Ordering::SeqCst),
            move |event| {
                if !event.images.contains(&image) {
                    event.images.push(image);
                }
            },
        )
    }

    fn remove_image(&self, event_id: &EventId, image: &Image) -> impl Future<Output = Result<()>> + Send {
        let image = image.clone();
        self.update(
            event_id,
            self.knobs.fail_image_removals.load(Ordering::SeqCst),
            move |event| event.images.retain(|stored| stored != &image),
        )
    }

    fn append_download(
        &self,
        event_id: &EventId,
        record: &DownloadRecord,
    ) -> impl Future<Output = Result<()>> + Send {
        self.calls.download_appends.fetch_add(1, Ordering::SeqCst);
        let record = record.clone();
        self.update(
            event_id,
            self.knobs.fail_download_appends.load(Ordering::SeqCst),
            move |event| {
                if !event.downloads.contains(&record) {
                    event.downloads.push(record);
                }
            },
        )
    }
}
