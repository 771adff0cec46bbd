use chrono::{DateTime, Duration, TimeZone, Utc};
use medicare::models::DoctorSummary;
use medicare::storage::{KeyValueStorage, MemoryStorage};
use medicare::store::{
    rehydrate, RecentlyViewedState, RecentlyViewedStore, MAX_RECENT_DOCTORS,
    RECENTLY_VIEWED_STORAGE_KEY,
};
use medicare::test_utils::{test_collections, FakeBackend};
use medicare::AppContext;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// A clock that advances one second per reading.
fn ticking_clock() -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
    let ticks = AtomicI64::new(0);
    move || start() + Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst))
}

fn context(storage: Arc<dyn KeyValueStorage>, store: RecentlyViewedStore) -> AppContext {
    let backend = FakeBackend::new();
    let ctx = AppContext::with_recently_viewed(
        backend.clone(),
        backend,
        storage,
        test_collections(),
        store,
    );
    ctx.hydrate();
    ctx
}

fn doctor(id: &str, name: &str) -> DoctorSummary {
    DoctorSummary {
        speciality: Some("Cardiology".to_string()),
        rating: Some(4.8),
        ..DoctorSummary::new(id, name)
    }
}

fn ids(store: &RecentlyViewedStore, limit: usize) -> Vec<String> {
    store
        .get_recent_doctors(limit)
        .into_iter()
        .map(|d| d.id().to_string())
        .collect()
}

#[test]
fn test_most_recent_first_and_deduplicated() {
    let store = RecentlyViewedStore::with_clock(ticking_clock());

    store.add_recent_doctor(doctor("d1", "Meredith Grey"));
    store.add_recent_doctor(doctor("d2", "Derek Shepherd"));
    store.add_recent_doctor(doctor("d3", "Cristina Yang"));
    store.add_recent_doctor(doctor("d1", "Meredith Grey"));

    assert_eq!(ids(&store, 10), vec!["d1", "d3", "d2"]);
    assert_eq!(store.len(), 3);
}

#[test]
fn test_limit_and_capacity() {
    let store = RecentlyViewedStore::with_clock(ticking_clock());
    for i in 0..25 {
        store.add_recent_doctor(doctor(&format!("d{}", i), "Doctor"));
    }

    assert_eq!(store.len(), MAX_RECENT_DOCTORS);
    assert_eq!(ids(&store, 3), vec!["d24", "d23", "d22"]);
    assert_eq!(store.get_recent_doctors(100).len(), MAX_RECENT_DOCTORS);
    assert!(store.get_recent_doctors(0).is_empty());
}

#[test]
fn test_frozen_clock_still_orders_views() {
    let store = RecentlyViewedStore::with_clock(start);

    store.add_recent_doctor(doctor("d1", "A"));
    store.add_recent_doctor(doctor("d2", "B"));
    store.add_recent_doctor(doctor("d3", "C"));

    let recent = store.get_recent_doctors(10);
    assert_eq!(ids(&store, 10), vec!["d3", "d2", "d1"]);
    assert!(recent[0].viewed_at > recent[1].viewed_at);
    assert!(recent[1].viewed_at > recent[2].viewed_at);
}

#[test]
fn test_clear() {
    let store = RecentlyViewedStore::with_clock(ticking_clock());
    store.add_recent_doctor(doctor("d1", "A"));

    store.clear_recent_doctors();
    assert!(store.is_empty());
    assert!(store.get_recent_doctors(10).is_empty());
}

#[test]
fn test_views_survive_restart() {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());

    let ctx = context(storage.clone(), RecentlyViewedStore::with_clock(ticking_clock()));
    ctx.recently_viewed_store.add_recent_doctor(doctor("d1", "Meredith Grey"));
    ctx.recently_viewed_store.add_recent_doctor(doctor("d2", "Derek Shepherd"));
    let before = ctx.recently_viewed_store.get_recent_doctors(10);
    drop(ctx);

    let restarted = context(storage, RecentlyViewedStore::with_clock(ticking_clock()));
    assert_eq!(restarted.recently_viewed_store.get_recent_doctors(10), before);
}

#[test]
fn test_persisted_format() {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
    let ctx = context(storage.clone(), RecentlyViewedStore::with_clock(start));

    ctx.recently_viewed_store.add_recent_doctor(doctor("d1", "Meredith Grey"));

    let raw = storage
        .get(RECENTLY_VIEWED_STORAGE_KEY)
        .expect("readable")
        .expect("written");
    let value: Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["version"], 0);

    let entry = &value["state"]["recentDoctors"][0];
    assert_eq!(entry["name"], "Meredith Grey");
    assert_eq!(entry["speciality"], "Cardiology");
    assert!(entry["viewedAt"].is_string());
}

#[test]
fn test_clear_is_persisted() {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
    let ctx = context(storage.clone(), RecentlyViewedStore::with_clock(ticking_clock()));
    ctx.recently_viewed_store.add_recent_doctor(doctor("d1", "A"));
    ctx.recently_viewed_store.clear_recent_doctors();
    drop(ctx);

    let restarted = context(storage, RecentlyViewedStore::new());
    assert!(restarted.recently_viewed_store.is_empty());
}

#[test]
fn test_concurrent_views_persist_the_final_list() {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
    let ctx = context(storage.clone(), RecentlyViewedStore::with_clock(ticking_clock()));
    let store = &ctx.recently_viewed_store;

    for round in 0..10 {
        std::thread::scope(|scope| {
            for worker in 0..4 {
                scope.spawn(move || {
                    for i in 0..50 {
                        let id = format!("d{}", (round * 7 + worker * 50 + i) % 40);
                        store.add_recent_doctor(doctor(&id, "Doctor"));
                    }
                });
            }
        });

        let persisted: RecentlyViewedState =
            rehydrate(storage.as_ref(), RECENTLY_VIEWED_STORAGE_KEY).expect("persisted");
        assert_eq!(persisted, store.state(), "round {}", round);
    }
}

#[test]
fn test_viewing_same_doctor_twice_refreshes_single_entry() {
    let store = RecentlyViewedStore::with_clock(ticking_clock());

    store.add_recent_doctor(DoctorSummary::new("d1", "A"));
    let first = store.get_recent_doctors(10)[0].viewed_at;
    store.add_recent_doctor(DoctorSummary::new("d1", "A"));

    let recent = store.get_recent_doctors(10);
    assert_eq!(recent.len(), 1);
    assert!(recent[0].viewed_at > first);
}

#[test]
fn test_any_sequence_stays_bounded_unique_and_ordered() {
    let store = RecentlyViewedStore::with_clock(ticking_clock());

    // Deterministic walk over 30 ids with plenty of repeats
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..500 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        store.add_recent_doctor(doctor(&format!("d{}", seed % 30), "Doctor"));

        let list = store.state().recent_doctors;
        assert!(list.len() <= MAX_RECENT_DOCTORS);

        let mut seen = std::collections::HashSet::new();
        assert!(list.iter().all(|d| seen.insert(d.id().to_string())));
        assert!(list.windows(2).all(|w| w[0].viewed_at > w[1].viewed_at));
    }
}
