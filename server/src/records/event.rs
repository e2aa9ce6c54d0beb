use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::normalize::{normalize_date, normalize_time, slugify};
use super::{Persist, RecordError};
use crate::models::{Event, EventDraft, EventField, EventPatch, NormalizedEvent};
use crate::store::{RecordStore, StoreError};

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 2000;
const OVERVIEW_MAX: usize = 500;

/// An event about to be written: the caller's fields plus the slug it
/// currently carries (none for a new event).
#[derive(Debug, Clone)]
pub struct EventCandidate {
    pub slug: Option<String>,
    pub details: EventDraft,
}

impl EventCandidate {
    pub fn new(details: EventDraft) -> Self {
        Self {
            slug: None,
            details,
        }
    }
}

impl From<Event> for EventCandidate {
    fn from(event: Event) -> Self {
        Self {
            slug: Some(event.slug),
            details: event.details,
        }
    }
}

#[derive(Clone)]
pub struct EventRecordManager {
    store: Arc<dyn RecordStore>,
}

impl EventRecordManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Validates a candidate and brings its derived fields into canonical
    /// form. Slug, date and time are recomputed on create and otherwise only
    /// when the field they derive from changed.
    pub fn prepare(
        candidate: EventCandidate,
        persist: Persist<'_, EventField>,
    ) -> Result<NormalizedEvent, RecordError> {
        let EventCandidate { slug, mut details } = candidate;

        trim_fields(&mut details);
        check_required(&details)?;
        check_length("title", &details.title, TITLE_MAX)?;
        check_length("description", &details.description, DESCRIPTION_MAX)?;
        check_length("overview", &details.overview, OVERVIEW_MAX)?;

        let slug = match slug {
            Some(slug) if !persist.touches(EventField::Title) => slug,
            _ => {
                let derived = slugify(&details.title);
                if derived.is_empty() {
                    warn!(title = %details.title, "Event title produced an empty slug");
                }
                derived
            }
        };

        if persist.touches(EventField::Date) {
            details.date = normalize_date(&details.date)?;
        }
        if persist.touches(EventField::Time) {
            details.time = normalize_time(&details.time)?;
        }

        if details.agenda.is_empty() {
            return Err(RecordError::EmptyRequiredList("agenda"));
        }
        if details.tags.is_empty() {
            return Err(RecordError::EmptyRequiredList("tags"));
        }

        Ok(NormalizedEvent::new(slug, details))
    }

    pub async fn create(&self, draft: EventDraft) -> Result<Event, RecordError> {
        let normalized = Self::prepare(EventCandidate::new(draft), Persist::Create)?;

        let event = self
            .store
            .insert_event(&normalized)
            .await
            .map_err(|e| slug_conflict(e, normalized.slug()))?;

        info!(event_id = %event.id, slug = %event.slug, "Event created");
        Ok(event)
    }

    pub async fn update(&self, id: Uuid, patch: EventPatch) -> Result<Event, RecordError> {
        let existing = self
            .store
            .find_event(id)
            .await?
            .ok_or(RecordError::EventNotFound(id))?;

        let mut candidate = EventCandidate::from(existing);
        let changed = patch.apply_to(&mut candidate.details);
        debug!(event_id = %id, ?changed, "Applying event patch");

        let normalized = Self::prepare(candidate, Persist::Update(&changed))?;

        let event = self
            .store
            .update_event(id, &normalized)
            .await
            .map_err(|e| slug_conflict(e, normalized.slug()))?
            .ok_or(RecordError::EventNotFound(id))?;

        info!(event_id = %event.id, slug = %event.slug, "Event updated");
        Ok(event)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, RecordError> {
        Ok(self.store.find_event_by_slug(slug).await?)
    }

    pub async fn list(&self) -> Result<Vec<Event>, RecordError> {
        Ok(self.store.list_events().await?)
    }

    /// Other events sharing at least one tag with the event at `slug`.
    /// Unknown slugs have no similar events.
    pub async fn similar_to(&self, slug: &str) -> Result<Vec<Event>, RecordError> {
        let Some(event) = self.store.find_event_by_slug(slug).await? else {
            return Ok(Vec::new());
        };
        Ok(self
            .store
            .find_events_sharing_tags(&event.details.tags, event.id)
            .await?)
    }
}

fn slug_conflict(err: StoreError, slug: &str) -> RecordError {
    if err.is_conflict() {
        warn!(slug = %slug, "Event slug already taken");
        RecordError::DuplicateSlug(slug.to_string())
    } else {
        RecordError::StorageFailure(err)
    }
}

fn trim_fields(details: &mut EventDraft) {
    for field in [
        &mut details.title,
        &mut details.description,
        &mut details.overview,
        &mut details.image,
        &mut details.venue,
        &mut details.location,
        &mut details.date,
        &mut details.time,
        &mut details.audience,
        &mut details.organizer,
    ] {
        let trimmed = field.trim();
        if trimmed.len() != field.len() {
            *field = trimmed.to_string();
        }
    }
}

fn check_required(details: &EventDraft) -> Result<(), RecordError> {
    let required = [
        ("title", &details.title),
        ("description", &details.description),
        ("overview", &details.overview),
        ("image", &details.image),
        ("venue", &details.venue),
        ("location", &details.location),
        ("date", &details.date),
        ("time", &details.time),
        ("audience", &details.audience),
        ("organizer", &details.organizer),
    ];
    match required.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => Err(RecordError::MissingField(*name)),
        None => Ok(()),
    }
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), RecordError> {
    if value.chars().count() > max {
        return Err(RecordError::FieldTooLong { field, max });
    }
    Ok(())
}
