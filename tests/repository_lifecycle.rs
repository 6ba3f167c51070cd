use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use firestore_orm::error::remote_error;
use firestore_orm::{
    from_field_map, to_field_map, ChangeKind, ChannelSet, CollectionId, DocumentKey, DocumentStore,
    Entity, FieldMap, Lifecycle, MemoryStore, MutationPolicy, ObjectId, Orm, OrmResult,
    Persistable, Predicate, Record, Repository, WriteOperation,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
struct City {
    name: String,
    population: u64,
}

impl Persistable for City {
    fn collection() -> &'static str {
        "cities"
    }

    fn to_fields(&self) -> OrmResult<FieldMap> {
        to_field_map(self)
    }

    fn from_record(record: &Record) -> OrmResult<Self> {
        from_field_map(record.fields())
    }
}

/// Model without an edited channel; repeat saves announce nothing.
#[derive(Clone, Serialize, Deserialize)]
struct Note {
    body: String,
}

impl Persistable for Note {
    fn collection() -> &'static str {
        "notes"
    }

    fn to_fields(&self) -> OrmResult<FieldMap> {
        to_field_map(self)
    }

    fn from_record(record: &Record) -> OrmResult<Self> {
        from_field_map(record.fields())
    }

    fn channels() -> ChannelSet {
        ChannelSet::for_collection(Self::collection()).without_edited()
    }
}

/// Model whose delete hook counts its invocations.
#[derive(Clone)]
struct Tracked {
    name: String,
    deletions: Arc<AtomicUsize>,
}

#[async_trait]
impl Persistable for Tracked {
    fn collection() -> &'static str {
        "tracked"
    }

    fn to_fields(&self) -> OrmResult<FieldMap> {
        let mut fields = FieldMap::new();
        fields.insert("name".into(), json!(self.name));
        Ok(fields)
    }

    fn from_record(record: &Record) -> OrmResult<Self> {
        let name = record
            .field("name")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            name,
            deletions: Arc::new(AtomicUsize::new(0)),
        })
    }

    async fn delete_complete(&self) {
        self.deletions.fetch_add(1, Ordering::SeqCst);
    }
}

/// Store wrapper with injectable failures for delete and commit.
#[derive(Clone)]
struct FlakyStore {
    inner: MemoryStore,
    fail_delete: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_delete: Arc::new(AtomicBool::new(false)),
            fail_commit: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn query(
        &self,
        collection: &CollectionId,
        predicate: Option<&Predicate>,
    ) -> OrmResult<Vec<Record>> {
        self.inner.query(collection, predicate).await
    }

    async fn set(&self, key: &DocumentKey, fields: FieldMap, merge: bool) -> OrmResult<()> {
        self.inner.set(key, fields, merge).await
    }

    async fn delete(&self, key: &DocumentKey) -> OrmResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(remote_error("injected delete failure"));
        }
        self.inner.delete(key).await
    }

    async fn commit(&self, writes: Vec<WriteOperation>) -> OrmResult<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(remote_error("injected commit failure"));
        }
        self.inner.commit(writes).await
    }
}

fn seed_city(store: &MemoryStore, id: &str, name: &str, population: u64) {
    let key = DocumentKey::new(
        CollectionId::new("cities").unwrap(),
        ObjectId::from(id),
    );
    let mut fields = FieldMap::new();
    fields.insert("name".into(), json!(name));
    fields.insert("population".into(), json!(population));
    store.insert(&key, fields);
}

fn drain_kinds(receiver: &async_channel::Receiver<firestore_orm::ChangeEvent>) -> Vec<ChangeKind> {
    let mut kinds = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        kinds.push(event.kind());
    }
    kinds
}

fn city_repository(store: Arc<MemoryStore>) -> Arc<Repository<City>> {
    Orm::new(store).repository::<City>().unwrap()
}

#[tokio::test]
async fn created_entities_are_cached_immediately() {
    let cities = city_repository(Arc::new(MemoryStore::new()));
    let events = cities.subscribe();

    let sf = cities.create(City {
        name: "SF".into(),
        population: 900_000,
    });

    assert!(sf.is_new());
    assert!(cities.cached_entity(sf.id()).is_some());
    assert_eq!(drain_kinds(&events), vec![ChangeKind::Added]);
}

#[tokio::test]
async fn overlapping_fetches_build_the_union() {
    let store = Arc::new(MemoryStore::new());
    seed_city(&store, "sf", "SF", 900_000);
    seed_city(&store, "la", "LA", 4_000_000);

    let cities = city_repository(Arc::clone(&store));
    let events = cities.subscribe();

    let first = cities.fetch(None).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(cities.cache_len(), 2);
    // One Added for the whole batch, not one per item.
    assert_eq!(drain_kinds(&events), vec![ChangeKind::Added]);

    seed_city(&store, "nyc", "NYC", 8_000_000);
    let second = cities.fetch(None).await.unwrap();
    assert_eq!(second.len(), 3);
    assert_eq!(cities.cache_len(), 3);
    assert_eq!(drain_kinds(&events), vec![ChangeKind::Added]);

    // Nothing unseen: the full list still comes back, no event fires.
    let third = cities.fetch(None).await.unwrap();
    assert_eq!(third.len(), 3);
    assert_eq!(cities.cache_len(), 3);
    assert!(drain_kinds(&events).is_empty());
}

#[tokio::test]
async fn fetch_forwards_predicates_to_the_store() {
    let store = Arc::new(MemoryStore::new());
    seed_city(&store, "sf", "SF", 900_000);
    seed_city(&store, "la", "LA", 4_000_000);

    let cities = city_repository(store);
    let predicate = Predicate::field_equals("name", json!("LA"));
    let fetched = cities.fetch(Some(&predicate)).await.unwrap();

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].model().name, "LA");
    assert_eq!(cities.cache_len(), 1);
}

#[tokio::test]
async fn first_save_announces_added_then_edited() {
    let store = Arc::new(MemoryStore::new());
    let cities = city_repository(Arc::clone(&store));

    let mut sf = cities.create(City {
        name: "SF".into(),
        population: 900_000,
    });
    let events = cities.subscribe();

    cities.save(&mut sf).await.unwrap();
    assert_eq!(sf.lifecycle(), Lifecycle::Persisted);
    assert_eq!(drain_kinds(&events), vec![ChangeKind::Added]);

    sf.model_mut().population = 905_000;
    cities.save(&mut sf).await.unwrap();
    cities.save(&mut sf).await.unwrap();
    assert_eq!(
        drain_kinds(&events),
        vec![ChangeKind::Edited, ChangeKind::Edited]
    );

    let key = DocumentKey::new(CollectionId::new("cities").unwrap(), sf.id().clone());
    assert_eq!(store.document(&key).unwrap().get("population"), Some(&json!(905_000)));
}

#[tokio::test]
async fn repeat_saves_without_edited_channel_announce_nothing() {
    let notes = Orm::new(Arc::new(MemoryStore::new()))
        .repository::<Note>()
        .unwrap();
    let mut note = notes.create(Note {
        body: "remember".into(),
    });
    let events = notes.subscribe();

    notes.save(&mut note).await.unwrap();
    assert_eq!(drain_kinds(&events), vec![ChangeKind::Added]);

    notes.save(&mut note).await.unwrap();
    assert!(drain_kinds(&events).is_empty());
}

#[tokio::test]
async fn optimistic_delete_empties_cache_before_confirmation() {
    let store = Arc::new(FlakyStore::new());
    let orm = Orm::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
    let tracked = orm.repository::<Tracked>().unwrap();

    let mut entity = tracked.create(Tracked {
        name: "ghost".into(),
        deletions: Arc::new(AtomicUsize::new(0)),
    });
    tracked.save(&mut entity).await.unwrap();
    let events = tracked.subscribe();

    store.fail_delete.store(true, Ordering::SeqCst);
    let err = tracked.delete(&mut entity).await.unwrap_err();
    assert_eq!(err.code_str(), "orm/remote");

    // Cache entry and Removed event precede the (failed) remote call.
    assert!(tracked.cached_entity(entity.id()).is_none());
    assert_eq!(drain_kinds(&events), vec![ChangeKind::Removed]);
    // The hook only runs on confirmed deletes.
    assert_eq!(entity.model().deletions.load(Ordering::SeqCst), 0);
    assert_ne!(entity.lifecycle(), Lifecycle::Deleted);
}

#[tokio::test]
async fn confirmed_delete_waits_for_the_store() {
    let store = Arc::new(FlakyStore::new());
    let orm = Orm::with_policy(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        MutationPolicy::Confirmed,
    );
    let tracked = orm.repository::<Tracked>().unwrap();

    let mut entity = tracked.create(Tracked {
        name: "careful".into(),
        deletions: Arc::new(AtomicUsize::new(0)),
    });
    tracked.save(&mut entity).await.unwrap();
    let events = tracked.subscribe();

    store.fail_delete.store(true, Ordering::SeqCst);
    tracked.delete(&mut entity).await.unwrap_err();
    assert!(tracked.cached_entity(entity.id()).is_some());
    assert!(drain_kinds(&events).is_empty());

    store.fail_delete.store(false, Ordering::SeqCst);
    tracked.delete(&mut entity).await.unwrap();
    assert!(tracked.cached_entity(entity.id()).is_none());
    assert_eq!(drain_kinds(&events), vec![ChangeKind::Removed]);
    assert_eq!(entity.model().deletions.load(Ordering::SeqCst), 1);
    assert_eq!(entity.lifecycle(), Lifecycle::Deleted);
}

#[tokio::test]
async fn save_batch_commits_atomically_and_announces_once() {
    let store = Arc::new(MemoryStore::new());
    let cities = city_repository(Arc::clone(&store));

    let mut batch_entities = vec![
        cities.create(City {
            name: "SF".into(),
            population: 900_000,
        }),
        cities.create(City {
            name: "LA".into(),
            population: 4_000_000,
        }),
    ];
    // Make one of them pre-existing so both channels are exercised.
    cities.save(&mut batch_entities[0]).await.unwrap();
    let events = cities.subscribe();

    cities.save_batch(&mut batch_entities).await.unwrap();

    assert!(batch_entities.iter().all(|e| e.lifecycle() == Lifecycle::Persisted));
    assert_eq!(store.len(), 2);
    assert_eq!(
        drain_kinds(&events),
        vec![ChangeKind::Added, ChangeKind::Edited]
    );
}

#[tokio::test]
async fn failed_batched_delete_runs_no_hooks_and_stays_silent() {
    let store = Arc::new(FlakyStore::new());
    let orm = Orm::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
    let tracked = orm.repository::<Tracked>().unwrap();

    let deletions = Arc::new(AtomicUsize::new(0));
    let mut entities: Vec<Entity<Tracked>> = (0..3)
        .map(|index| {
            tracked.create(Tracked {
                name: format!("doc-{index}"),
                deletions: Arc::clone(&deletions),
            })
        })
        .collect();
    tracked.save_batch(&mut entities).await.unwrap();
    let events = tracked.subscribe();

    store.fail_commit.store(true, Ordering::SeqCst);
    let err = tracked.delete_batch(&mut entities).await.unwrap_err();
    assert_eq!(err.code_str(), "orm/remote");

    // No hook ran, no Removed fired, yet the optimistic removals already
    // emptied the cache: the documented inconsistency window.
    assert_eq!(deletions.load(Ordering::SeqCst), 0);
    assert!(drain_kinds(&events).is_empty());
    for entity in &entities {
        assert!(tracked.cached_entity(entity.id()).is_none());
        assert_ne!(entity.lifecycle(), Lifecycle::Deleted);
    }
}

#[tokio::test]
async fn successful_batched_delete_runs_every_hook() {
    let store = Arc::new(MemoryStore::new());
    let orm = Orm::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
    let tracked = orm.repository::<Tracked>().unwrap();

    let deletions = Arc::new(AtomicUsize::new(0));
    let mut entities: Vec<Entity<Tracked>> = (0..3)
        .map(|index| {
            tracked.create(Tracked {
                name: format!("doc-{index}"),
                deletions: Arc::clone(&deletions),
            })
        })
        .collect();
    tracked.save_batch(&mut entities).await.unwrap();
    let events = tracked.subscribe();

    tracked.delete_batch(&mut entities).await.unwrap();

    assert_eq!(deletions.load(Ordering::SeqCst), 3);
    assert_eq!(drain_kinds(&events), vec![ChangeKind::Removed]);
    assert_eq!(tracked.cache_len(), 0);
    assert!(store.is_empty());
    assert!(entities.iter().all(|e| e.lifecycle() == Lifecycle::Deleted));
}

#[tokio::test]
async fn entities_with_equal_ids_compare_and_hash_equal() {
    let store = Arc::new(MemoryStore::new());
    seed_city(&store, "sf", "SF", 900_000);

    let cities = city_repository(Arc::clone(&store));
    let first = cities.fetch(None).await.unwrap().remove(0);

    seed_city(&store, "sf", "San Francisco", 905_000);
    let second = cities.fetch(None).await.unwrap().remove(0);

    assert_ne!(first.model(), second.model());
    assert_eq!(first, second);

    let hash_of = |entity: &Entity<City>| {
        let mut hasher = DefaultHasher::new();
        entity.hash(&mut hasher);
        hasher.finish()
    };
    assert_eq!(hash_of(&first), hash_of(&second));
}

#[tokio::test]
async fn fetched_records_replace_locally_saved_versions() {
    let store = Arc::new(MemoryStore::new());
    let cities = city_repository(Arc::clone(&store));

    let mut sf = cities.create(City {
        name: "SF".into(),
        population: 900_000,
    });
    cities.save(&mut sf).await.unwrap();

    // The remote record moves on under the same identifier.
    let key = DocumentKey::new(CollectionId::new("cities").unwrap(), sf.id().clone());
    let mut fields = FieldMap::new();
    fields.insert("name".into(), json!("San Francisco"));
    fields.insert("population".into(), json!(910_000));
    store.insert(&key, fields);

    let fetched = cities.fetch(None).await.unwrap();
    assert_eq!(fetched.len(), 1);

    let cached = cities.cached_entity(sf.id()).unwrap();
    assert_eq!(cached.model().name, "San Francisco");
    assert_eq!(cached.model().population, 910_000);
}

#[tokio::test]
async fn saving_a_deleted_entity_is_rejected() {
    let cities = city_repository(Arc::new(MemoryStore::new()));
    let mut sf = cities.create(City {
        name: "SF".into(),
        population: 900_000,
    });
    cities.save(&mut sf).await.unwrap();
    cities.delete(&mut sf).await.unwrap();

    let err = cities.save(&mut sf).await.unwrap_err();
    assert_eq!(err.code_str(), "orm/failed-precondition");
}
