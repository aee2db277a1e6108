//! In-memory entity state

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{HassError, Result};
use virtual_scheduler::Kwargs;

/// State of one entity as the platform reports it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    pub attributes: Kwargs,
    pub last_updated: Option<DateTime<FixedOffset>>,
    pub last_changed: Option<DateTime<FixedOffset>>,
}

impl EntityState {
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Kwargs::new(),
            last_updated: None,
            last_changed: None,
        }
    }

    /// Full platform representation, timestamps as RFC 3339 or null
    pub fn to_full_json(&self) -> Value {
        json!({
            "entity_id": self.entity_id,
            "state": self.state,
            "attributes": self.attributes,
            "last_updated": self.last_updated.map(format_timestamp),
            "last_changed": self.last_changed.map(format_timestamp),
        })
    }
}

fn format_timestamp(time: DateTime<FixedOffset>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Entity id to state
#[derive(Debug, Default)]
pub(crate) struct StateStore {
    entities: BTreeMap<String, EntityState>,
}

impl StateStore {
    pub fn get(&self, entity_id: &str) -> Result<&EntityState> {
        self.entities.get(entity_id).ok_or_else(|| HassError::StateNotSet(entity_id.to_string()))
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    /// Replace the entity's state, returning the previous one
    pub fn insert(&mut self, entity: EntityState) -> Option<EntityState> {
        self.entities.insert(entity.entity_id.clone(), entity)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// `{entity_id: {"state": .., "attributes": ..}}` for every entity
    pub fn all(&self) -> Value {
        let map = self
            .entities
            .values()
            .map(|entity| {
                (
                    entity.entity_id.clone(),
                    json!({ "state": entity.state, "attributes": entity.attributes }),
                )
            })
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unset_entity_is_an_error() {
        let store = StateStore::default();
        assert_eq!(store.get("light.kitchen"), Err(HassError::StateNotSet("light.kitchen".into())));
        assert!(!store.contains("light.kitchen"));
    }

    #[test]
    fn test_full_json_timestamps() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let mut entity = EntityState::new("sensor.door", "open");
        entity.last_updated =
            Some(offset.with_ymd_and_hms(2020, 3, 3, 11, 27, 37).unwrap() + chrono::Duration::microseconds(3));

        let full = entity.to_full_json();
        assert_eq!(full["last_updated"], "2020-03-03T11:27:37.000003+03:00");
        assert_eq!(full["last_changed"], Value::Null);
        assert_eq!(full["state"], "open");
    }

    #[test]
    fn test_all_states_shape() {
        let mut store = StateStore::default();
        let mut light = EntityState::new("light.bed", "on");
        light.attributes.insert("brightness".into(), json!(80));
        store.insert(light);
        store.insert(EntityState::new("switch.fan", "off"));

        let all = store.all();
        assert_eq!(all["light.bed"]["attributes"]["brightness"], 80);
        assert_eq!(all["switch.fan"]["state"], "off");
    }
}
