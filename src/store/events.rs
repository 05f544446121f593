//! Event catalog operations. Admin-only by construction: only the admin
//! pages call these, the store keeps them unprivileged.

use super::Store;
use crate::model::{self, Event, EventInput};

impl Store {
    /// Insert or update an event.
    ///
    /// An input carrying an id merges into the matching event; an unknown id
    /// is ignored. Without an id a new event is created and prepended, so
    /// the catalog stays recency-ordered.
    pub fn add_or_update_event(&self, input: EventInput) {
        let mut state = self.write();

        match input.id.clone() {
            Some(id) => {
                let Some(event) =
                    state.events.iter_mut().find(|e| e.id == id)
                else {
                    tracing::warn!(event = %id, "update for unknown event ignored");
                    return;
                };
                event.title = input.title;
                event.description = input.description;
                event.image_url = input.image_url;
                event.value = input.value;
            },
            None => {
                let event = Event {
                    id: model::id::generate("event"),
                    title: input.title,
                    description: input.description,
                    image_url: input.image_url,
                    value: input.value,
                    created_at: chrono::Utc::now(),
                };
                state.events.insert(0, event);
            },
        }

        self.persist_events(&state);
    }

    /// Remove an event. Unknown ids are a no-op.
    pub fn delete_event(&self, event_id: &str) {
        let mut state = self.write();
        state.events.retain(|e| e.id != event_id);
        self.persist_events(&state);
    }

    /// Recency-ordered catalog.
    pub fn events(&self) -> Vec<Event> {
        self.read().events.clone()
    }

    pub fn event(&self, event_id: &str) -> Option<Event> {
        self.read().events.iter().find(|e| e.id == event_id).cloned()
    }
}
