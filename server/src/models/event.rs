use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How attendees take part in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventMode {
    Online,
    Offline,
    Hybrid,
}

impl EventMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventMode::Online => "online",
            EventMode::Offline => "offline",
            EventMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for EventMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(EventMode::Online),
            "offline" => Ok(EventMode::Offline),
            "hybrid" => Ok(EventMode::Hybrid),
            other => Err(format!("unknown event mode '{}'", other)),
        }
    }
}

/// Caller-supplied event fields, before normalization.
///
/// `date` and `time` hold whatever the caller sent; they only become
/// canonical once the record manager has prepared the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub overview: String,
    pub image: String,
    pub venue: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub mode: EventMode,
    pub audience: String,
    pub agenda: Vec<String>,
    pub organizer: String,
    pub tags: Vec<String>,
}

/// Fields of an event that an update can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventField {
    Title,
    Description,
    Overview,
    Image,
    Venue,
    Location,
    Date,
    Time,
    Mode,
    Audience,
    Agenda,
    Organizer,
    Tags,
}

/// Partial update of an event. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub overview: Option<String>,
    pub image: Option<String>,
    pub venue: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub mode: Option<EventMode>,
    pub audience: Option<String>,
    pub agenda: Option<Vec<String>>,
    pub organizer: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl EventPatch {
    /// Writes the patch into `draft` and returns the fields whose value
    /// actually changed.
    pub fn apply_to(self, draft: &mut EventDraft) -> Vec<EventField> {
        let mut changed = Vec::new();
        set(&mut draft.title, self.title, EventField::Title, &mut changed);
        set(&mut draft.description, self.description, EventField::Description, &mut changed);
        set(&mut draft.overview, self.overview, EventField::Overview, &mut changed);
        set(&mut draft.image, self.image, EventField::Image, &mut changed);
        set(&mut draft.venue, self.venue, EventField::Venue, &mut changed);
        set(&mut draft.location, self.location, EventField::Location, &mut changed);
        set(&mut draft.date, self.date, EventField::Date, &mut changed);
        set(&mut draft.time, self.time, EventField::Time, &mut changed);
        set(&mut draft.mode, self.mode, EventField::Mode, &mut changed);
        set(&mut draft.audience, self.audience, EventField::Audience, &mut changed);
        set(&mut draft.agenda, self.agenda, EventField::Agenda, &mut changed);
        set(&mut draft.organizer, self.organizer, EventField::Organizer, &mut changed);
        set(&mut draft.tags, self.tags, EventField::Tags, &mut changed);
        changed
    }
}

fn set<T: PartialEq>(
    slot: &mut T,
    value: Option<T>,
    field: EventField,
    changed: &mut Vec<EventField>,
) {
    if let Some(value) = value {
        if *slot != value {
            *slot = value;
            changed.push(field);
        }
    }
}

/// An event whose slug, date and time are canonical and whose fields passed
/// validation. Only the event record manager builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    slug: String,
    details: EventDraft,
}

impl NormalizedEvent {
    pub(crate) fn new(slug: String, details: EventDraft) -> Self {
        Self { slug, details }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn details(&self) -> &EventDraft {
        &self.details
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub slug: String,
    #[serde(flatten)]
    pub details: EventDraft,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            title: self.details.title.clone(),
            date: self.details.date.clone(),
            venue: self.details.venue.clone(),
        }
    }
}

/// Display projection of an event attached to its bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub title: String,
    pub date: String,
    pub venue: String,
}

#[cfg(test)]
pub(crate) fn sample_draft(title: &str) -> EventDraft {
    EventDraft {
        title: title.to_string(),
        description: "A day of talks about systems programming.".to_string(),
        overview: "Talks and workshops.".to_string(),
        image: "https://cdn.example.com/events/rustconf.png".to_string(),
        venue: "Moscone Center".to_string(),
        location: "San Francisco, CA".to_string(),
        date: "2025-03-15".to_string(),
        time: "2:30pm".to_string(),
        mode: EventMode::Hybrid,
        audience: "Developers".to_string(),
        agenda: vec!["Keynote".to_string()],
        organizer: "Rust Foundation".to_string(),
        tags: vec!["rust".to_string(), "systems".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_reports_only_changed_fields() {
        let mut draft = sample_draft("RustConf");
        let patch = EventPatch {
            title: Some("RustConf".to_string()),
            venue: Some("Oakland Marriott".to_string()),
            tags: Some(vec!["rust".to_string()]),
            ..EventPatch::default()
        };

        let changed = patch.apply_to(&mut draft);

        assert_eq!(changed, vec![EventField::Venue, EventField::Tags]);
        assert_eq!(draft.venue, "Oakland Marriott");
        assert_eq!(draft.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn test_mode_round_trips_through_its_storage_form() {
        for mode in [EventMode::Online, EventMode::Offline, EventMode::Hybrid] {
            assert_eq!(mode.as_str().parse::<EventMode>(), Ok(mode));
        }
        assert!("virtual".parse::<EventMode>().is_err());
    }

    #[test]
    fn test_event_serializes_flat_camel_case() {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            slug: "rustconf".to_string(),
            details: sample_draft("RustConf"),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["slug"], "rustconf");
        assert_eq!(json["title"], "RustConf");
        assert_eq!(json["mode"], "hybrid");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("details").is_none());
    }
}
