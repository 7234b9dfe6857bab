mod utils;

use chrono::{DateTime, Utc};
use amplify::s;
use rstest::rstest;
use stories::{
    CollectionManager, FsStore, HistoryItem, KeyValueStore, RecentSearch, WatchStatus, HISTORY,
    RECENTS,
};

use crate::utils::store::CountingStore;

fn recent(query: &str) -> RecentSearch { RecentSearch::new(query).unwrap() }

fn recents(queries: &[&str]) -> Vec<RecentSearch> { queries.iter().map(|q| recent(q)).collect() }

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

fn item(id: &str, title: &str, progress: u8, secs: i64) -> HistoryItem {
    HistoryItem::new(id, title, progress, WatchStatus::Watching, at(secs))
}

fn demo_history() -> Vec<HistoryItem> {
    vec![
        item("m1", "Arrival", 40, 0),
        item("m2", "Dune: Part Two", 100, 10),
        item("m3", "Past Lives", 5, 20),
    ]
}

#[test]
fn capped_upsert_evicts_exactly_one() {
    let manager = CollectionManager::new(CountingStore::new());
    let mut list = manager.open::<RecentSearch>(RECENTS);
    for n in 0..8 {
        list.upsert(recent(&format!("query {n}")));
    }
    assert_eq!(list.len(), 8);

    list.upsert(recent("query 8"));
    assert_eq!(list.len(), 8);
    assert_eq!(list.get("query 8"), Some(recent("query 8")));
    assert_eq!(list.get("query 0"), None);
    assert!(list.get("query 1").is_some());
}

#[rstest]
#[case(3)]
#[case(1)]
fn custom_cap(#[case] cap: usize) {
    let manager = CollectionManager::new(CountingStore::new());
    let mut list = manager.open::<RecentSearch>(RECENTS.with_cap(cap));
    for query in ["a", "b", "c", "d"] {
        list.push_query(query);
    }
    assert_eq!(list.len(), cap);
    assert_eq!(list.to_vec().first(), Some(&recent("d")));
}

#[test]
fn same_id_updates_in_place() {
    let manager = CollectionManager::new(CountingStore::new());
    let mut history = manager.open_seeded(HISTORY, demo_history());

    history.upsert(item("m2", "Dune: Part Two", 55, 30));

    assert_eq!(history.len(), 3);
    let ids = history.to_vec().into_iter().map(|item| item.id).collect::<Vec<_>>();
    assert_eq!(ids, ["m1", "m2", "m3"]);
    assert_eq!(history.get("m2").unwrap().progress, 55);
    assert_eq!(history.get("m2").unwrap().updated_at, at(30));
}

#[test]
fn upsert_then_load() {
    let manager = CollectionManager::new(CountingStore::new());
    let entry = item("m9", "Perfect Days", 70, 0).with_poster("https://img.example/m9.jpg");

    manager.upsert(HISTORY, entry.clone());

    assert_eq!(manager.load::<HistoryItem>(HISTORY), vec![entry]);
}

#[rstest]
#[case("{not json")]
#[case("{\"id\": 1}")]
#[case("[1, 2, 3]")]
fn corrupt_data_loads_empty(#[case] data: &str) {
    let store = CountingStore::new();
    store.put_raw(HISTORY.name, data);
    let manager = CollectionManager::new(store);

    assert!(manager.load::<HistoryItem>(HISTORY).is_empty());
    // corrupted data is not replaced with the seed
    assert!(manager.open_seeded(HISTORY, demo_history()).is_empty());
    assert_eq!(manager.store().writes(), 0);
}

#[test]
fn repeated_recent_stays_in_place() {
    let manager = CollectionManager::new(CountingStore::new());
    let mut list = manager.open::<RecentSearch>(RECENTS);
    for query in ["c", "b", "a"] {
        list.push_query(query);
    }
    assert_eq!(list.to_vec(), recents(&["a", "b", "c"]));

    list.push_query("a");
    assert_eq!(list.to_vec(), recents(&["a", "b", "c"]));

    list.push_query("c");
    assert_eq!(list.to_vec(), recents(&["c", "a", "b"]));
}

#[test]
fn stored_recents_format() {
    let manager = CollectionManager::new(CountingStore::new());
    manager.upsert(RECENTS, recent("b"));
    manager.upsert(RECENTS, recent(" a "));
    assert_eq!(
        manager.store().get(RECENTS.name).unwrap().as_deref(),
        Some(r#"["a","b"]"#)
    );
}

#[test]
fn failed_write_keeps_memory_state() {
    let manager = CollectionManager::new(CountingStore::failing());
    let mut list = manager.open::<RecentSearch>(RECENTS);

    list.push_query("dune");
    list.push_query("arrival");

    assert_eq!(list.to_vec(), recents(&["arrival", "dune"]));
    assert_eq!(manager.store().writes(), 2);
    assert_eq!(manager.load::<RecentSearch>(RECENTS), recents(&["arrival", "dune"]));
}

#[test]
fn failed_write_keeps_manager_state() {
    let manager = CollectionManager::new(CountingStore::failing());

    manager.upsert(RECENTS, recent("dune"));
    let list = manager.upsert(RECENTS, recent("arrival"));

    assert_eq!(list, recents(&["arrival", "dune"]));
    assert_eq!(manager.load::<RecentSearch>(RECENTS), recents(&["arrival", "dune"]));
    assert_eq!(manager.remove::<RecentSearch>(RECENTS, &s!("dune")), recents(&["arrival"]));
    assert_eq!(manager.load::<RecentSearch>(RECENTS), recents(&["arrival"]));
    assert_eq!(manager.store().writes(), 3);
    assert_eq!(manager.store().get(RECENTS.name).unwrap(), None);
}

#[test]
fn handles_share_one_list() {
    let manager = CollectionManager::new(CountingStore::new());
    let mut first = manager.open::<HistoryItem>(HISTORY);
    let mut second = manager.open::<HistoryItem>(HISTORY);

    first.upsert(item("m1", "Arrival", 40, 0));
    second.upsert(item("m2", "Past Lives", 5, 10));
    assert_eq!(first.len(), 2);
    assert!(second.toggle_status("m1"));
    assert_eq!(first.get("m1").unwrap().status, WatchStatus::Completed);

    first.remove("m2");
    assert_eq!(second.to_vec().len(), 1);
    assert_eq!(manager.load::<HistoryItem>(HISTORY), first.to_vec());
    assert_eq!(manager.store().writes(), 4);
}

#[test]
fn store_is_read_once_per_session() {
    let manager = CollectionManager::new(CountingStore::new());
    assert!(manager.load::<RecentSearch>(RECENTS).is_empty());

    // data written behind the manager's back is not picked up during the session
    manager.store().put_raw(RECENTS.name, r#"["dune"]"#);
    assert!(manager.load::<RecentSearch>(RECENTS).is_empty());

    let reopened = CollectionManager::new(manager.store());
    assert_eq!(reopened.load::<RecentSearch>(RECENTS), recents(&["dune"]));
}

#[test]
fn one_write_per_mutation() {
    let manager = CollectionManager::new(CountingStore::new());
    let mut history = manager.open::<HistoryItem>(HISTORY);
    assert_eq!(manager.store().writes(), 0);

    history.upsert(item("m1", "Arrival", 40, 0));
    assert_eq!(manager.store().writes(), 1);
    history.upsert(item("m1", "Arrival", 41, 1));
    assert_eq!(manager.store().writes(), 2);
    assert!(history.toggle_status("m1"));
    assert_eq!(manager.store().writes(), 3);
    assert!(!history.remove("missing"));
    assert_eq!(manager.store().writes(), 4);
    assert!(history.remove("m1"));
    assert_eq!(manager.store().writes(), 5);
    history.clear();
    assert_eq!(manager.store().writes(), 6);
    assert!(history.is_empty());
}

#[test]
fn seed_is_persisted_once() {
    let manager = CollectionManager::new(CountingStore::new());

    let history = manager.open_seeded(HISTORY, demo_history());
    assert_eq!(history.to_vec(), demo_history());
    assert_eq!(manager.store().writes(), 1);
    drop(history);

    let mut history = manager.open_seeded(HISTORY, demo_history());
    assert_eq!(manager.store().writes(), 1);
    history.clear();

    // an emptied list stays empty
    assert!(manager.open_seeded(HISTORY, demo_history()).is_empty());
    assert_eq!(manager.store().writes(), 2);
}

#[test]
fn missing_list_is_empty() {
    let manager = CollectionManager::new(CountingStore::new());
    assert!(manager.load::<RecentSearch>(RECENTS).is_empty());
    manager.clear::<RecentSearch>(RECENTS);
    assert!(manager.load::<RecentSearch>(RECENTS).is_empty());
}

#[test]
fn file_store_survives_reopening() {
    let dir = std::env::temp_dir().join(format!("stories-collections-{}", std::process::id()));
    {
        let manager = CollectionManager::new(FsStore::new(&dir).unwrap());
        let mut history = manager.open_seeded(HISTORY, demo_history());
        history.toggle_status("m3");
        manager.upsert(RECENTS, recent("past lives"));
    }

    let manager = CollectionManager::new(FsStore::new(&dir).unwrap());
    let history = manager.open_seeded(HISTORY, Vec::<HistoryItem>::new());
    assert_eq!(history.len(), 3);
    assert_eq!(history.get("m3").unwrap().status, WatchStatus::Completed);
    assert_eq!(history.search(Some(WatchStatus::Completed), "").len(), 1);
    assert_eq!(manager.load::<RecentSearch>(RECENTS), recents(&["past lives"]));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn file_store_keys_do_not_collide() {
    let dir = std::env::temp_dir().join(format!("stories-keys-{}", std::process::id()));
    let store = FsStore::new(&dir).unwrap();
    let keys = ["profile:plan", "profile.plan", "profile_plan", "a/b", "a:b", "a%3Ab", "a:b.tmp"];
    for key in keys {
        store.set(key, key).unwrap();
    }
    for key in keys {
        assert_eq!(store.get(key).unwrap().as_deref(), Some(key));
    }
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), keys.len());

    std::fs::remove_dir_all(dir).unwrap();
}
