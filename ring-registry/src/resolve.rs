//! Turning configuration records into ring specs.

use ring_config::RingConfig;
use ring_primitives::{RingSpec, SpecId};
use ring_store::{Record, RecordStore, StoreError};

/// A configuration record that cannot be enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Unresolved {
    pub(crate) target: String,
    pub(crate) reason: String,
}

/// Returns the spec identifier of a configuration record: its identity field,
/// or its row identity when the field is absent.
pub(crate) fn spec_id(record: &Record, identity_field: &str) -> SpecId {
    record
        .get_str(identity_field)
        .map_or_else(|| SpecId::new(record.row_id().to_string()), SpecId::from)
}

/// Reads a spec from `record` and resolves its target to a canonical
/// collection name.
pub(crate) async fn resolve_spec(
    store: &dyn RecordStore,
    config: &RingConfig,
    record: &Record,
) -> Result<RingSpec, Unresolved> {
    let target = record
        .get_str(config.target_field())
        .unwrap_or_default()
        .to_owned();
    let capacity = record.get_u64(config.capacity_field()).unwrap_or_default();

    let spec = RingSpec::new(spec_id(record, store.identity_field()), &*target, capacity)
        .map_err(|err| Unresolved {
            target: target.clone(),
            reason: err.to_string(),
        })?;

    let info = store
        .find_collection(spec.target())
        .await
        .map_err(|err| Unresolved {
            target: target.clone(),
            reason: match err {
                StoreError::CollectionNotFound { .. } => "collection does not exist".to_owned(),
                other => other.to_string(),
            },
        })?;

    if info.name() == config.config_collection() {
        return Err(Unresolved {
            target,
            reason: "the configuration collection cannot be a ring".to_owned(),
        });
    }

    Ok(spec.with_target(info.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring_primitives::ColumnValues;
    use ring_store::MemoryStore;
    use serde_json::{Value, json};

    fn values(value: Value) -> ColumnValues {
        let Value::Object(map) = value else {
            unreachable!("test values must be objects")
        };
        map
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_collection("rings").await.unwrap();
        store.create_collection("events").await.unwrap();
        store
    }

    async fn spec_record(store: &MemoryStore, value: Value) -> Record {
        store
            .create("rings", values(value))
            .await
            .unwrap()
            .record()
            .clone()
    }

    #[tokio::test]
    async fn resolves_target_by_name_or_id() {
        let store = store().await;
        let config = RingConfig::default();
        let events_id = store.find_collection("events").await.unwrap().id().to_owned();

        let by_name = spec_record(&store, json!({"collection": "events", "size": 3})).await;
        let spec = resolve_spec(&store, &config, &by_name).await.unwrap();
        assert_eq!(spec.target(), "events");
        assert_eq!(spec.capacity().get(), 3);
        assert_eq!(spec.id().as_str(), by_name.get_str("id").unwrap());

        let by_id = spec_record(&store, json!({"collection": events_id, "size": "2"})).await;
        let spec = resolve_spec(&store, &config, &by_id).await.unwrap();
        assert_eq!(spec.target(), "events");
        assert_eq!(spec.capacity().get(), 2);
    }

    #[tokio::test]
    async fn unresolvable_records_carry_a_reason() {
        let store = store().await;
        let config = RingConfig::default();

        let missing = spec_record(&store, json!({"collection": "nope", "size": 3})).await;
        let unresolved = resolve_spec(&store, &config, &missing).await.unwrap_err();
        assert_eq!(unresolved.target, "nope");
        assert_eq!(unresolved.reason, "collection does not exist");

        let zero = spec_record(&store, json!({"collection": "events", "size": 0})).await;
        let unresolved = resolve_spec(&store, &config, &zero).await.unwrap_err();
        assert!(unresolved.reason.contains("positive integer"));

        let blank = spec_record(&store, json!({"size": 4})).await;
        assert!(resolve_spec(&store, &config, &blank).await.is_err());

        let own = spec_record(&store, json!({"collection": "rings", "size": 4})).await;
        let unresolved = resolve_spec(&store, &config, &own).await.unwrap_err();
        assert!(unresolved.reason.contains("configuration collection"));
    }

    #[test]
    fn spec_id_falls_back_to_row_identity() {
        let record = Record::new(ring_primitives::RowId::FIRST, values(json!({"size": 1})));
        assert_eq!(spec_id(&record, "id").as_str(), "1");
    }
}
