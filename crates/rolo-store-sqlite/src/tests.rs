//! Integration tests for `SqliteStore` against an in-memory database.

use rolo_core::{
  card::{CardField, CardFields, CardPatch, NewCard},
  dedup::DedupKeys,
  store::{CardStore, SubmitterSummary},
  visibility::CardScope,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn card(by: &str, name: &str, company: &str, email: Option<&str>) -> NewCard {
  NewCard {
    fields:            CardFields {
      name: Some(name.into()),
      company: Some(company.into()),
      email: email.map(Into::into),
      ..Default::default()
    },
    submitted_by:      by.into(),
    original_filename: Some("card.jpg".into()),
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get() {
  let s = store().await;
  let stored = s.insert(card("alice", "X Y", "Acme", Some("x@y.com"))).await.unwrap();
  assert!(!stored.shared);

  let fetched = s.get(stored.id).await.unwrap().expect("stored card");
  assert_eq!(fetched.id, stored.id);
  assert_eq!(fetched.submitted_by, "alice");
  assert_eq!(fetched.fields.email.as_deref(), Some("x@y.com"));
  assert_eq!(fetched.original_filename.as_deref(), Some("card.jpg"));
  assert_eq!(fetched.created_at, stored.created_at);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_replaces_patched_fields_and_keys() {
  let s = store().await;
  let stored = s.insert(card("alice", "X Y", "Acme", Some("x@y.com"))).await.unwrap();

  let patch = CardPatch::default().set(CardField::Company, Some("Globex"));
  let updated = s.update_fields(stored.id, &patch).await.unwrap().expect("stored card");
  assert_eq!(updated.fields.company.as_deref(), Some("Globex"));
  assert_eq!(updated.fields.email.as_deref(), Some("x@y.com"));

  let fetched = s.get(stored.id).await.unwrap().unwrap();
  assert_eq!(fetched, updated);

  // The comparison keys follow the edit.
  let old = DedupKeys::of(&card("alice", "x y", "acme", None).fields);
  assert!(s.find_duplicate("alice", &old).await.unwrap().is_none());
  let new = DedupKeys::of(&card("alice", "x y", "GLOBEX", None).fields);
  assert!(s.find_duplicate("alice", &new).await.unwrap().is_some());
}

#[tokio::test]
async fn writes_on_missing_id_report_absence() {
  let s = store().await;
  let id = Uuid::new_v4();
  let patch = CardPatch::default().set(CardField::Phone, Some("1"));
  assert!(s.update_fields(id, &patch).await.unwrap().is_none());
  assert!(s.toggle_shared(id).await.unwrap().is_none());
  assert!(!s.delete(id).await.unwrap());
}

#[tokio::test]
async fn share_and_delete() {
  let s = store().await;
  let stored = s.insert(card("alice", "X Y", "Acme", None)).await.unwrap();

  assert_eq!(s.toggle_shared(stored.id).await.unwrap(), Some(true));
  assert!(s.get(stored.id).await.unwrap().unwrap().shared);
  assert_eq!(s.toggle_shared(stored.id).await.unwrap(), Some(false));
  assert_eq!(s.toggle_shared(stored.id).await.unwrap(), Some(true));

  assert!(s.delete(stored.id).await.unwrap());
  assert!(s.get(stored.id).await.unwrap().is_none());
}

// ─── Concurrent writes ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_are_not_lost() {
  let s = store().await;
  let id = s.insert(card("alice", "X Y", "Acme", None)).await.unwrap().id;

  let handles: Vec<_> = (0..50)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move { s.toggle_shared(id).await })
    })
    .collect();
  for h in handles {
    assert!(h.await.unwrap().unwrap().is_some());
  }

  // An even number of flips leaves the card unshared.
  assert!(!s.get(id).await.unwrap().unwrap().shared);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_disjoint_updates_all_persist() {
  let s = store().await;
  let id = s.insert(card("alice", "X Y", "Acme", Some("x@y.com"))).await.unwrap().id;

  let patches = [
    (CardField::Phone, "+1 555 0100"),
    (CardField::Website, "https://acme.example"),
    (CardField::Address, "1 Main St"),
    (CardField::Designation, "CTO"),
  ];
  let handles: Vec<_> = patches
    .into_iter()
    .map(|(field, value)| {
      let s = s.clone();
      tokio::spawn(async move {
        let patch = CardPatch::default().set(field, Some(value));
        s.update_fields(id, &patch).await
      })
    })
    .collect();
  for h in handles {
    assert!(h.await.unwrap().unwrap().is_some());
  }

  let fetched = s.get(id).await.unwrap().unwrap();
  for (field, value) in patches {
    assert_eq!(fetched.fields.get(field), Some(value), "{field} was lost");
  }
  assert_eq!(fetched.fields.name.as_deref(), Some("X Y"));
  assert_eq!(fetched.fields.email.as_deref(), Some("x@y.com"));
}

// ─── Scopes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_by_scope() {
  let s = store().await;
  let a = s.insert(card("alice", "A", "Acme", None)).await.unwrap();
  let b = s.insert(card("bob", "B", "Acme", None)).await.unwrap();
  let p = s.insert(card("priv", "P", "Acme", None)).await.unwrap();
  let shared = s.insert(card("carol", "C", "Acme", None)).await.unwrap();
  s.toggle_shared(shared.id).await.unwrap();

  let ids = |cards: Vec<rolo_core::card::CardRecord>| {
    cards.into_iter().map(|c| c.id).collect::<Vec<_>>()
  };

  assert_eq!(ids(s.list(&CardScope::All).await.unwrap()), vec![a.id, b.id, p.id, shared.id]);
  assert!(s.list(&CardScope::Nothing).await.unwrap().is_empty());
  assert_eq!(
    ids(s.list(&CardScope::SubmittedBy("bob".into())).await.unwrap()),
    vec![b.id]
  );
  assert_eq!(
    ids(
      s.list(&CardScope::Published { privileged: "priv".into(), own: None })
        .await
        .unwrap()
    ),
    vec![p.id, shared.id]
  );
  assert_eq!(
    ids(
      s.list(&CardScope::Published { privileged: "priv".into(), own: Some("alice".into()) })
        .await
        .unwrap()
    ),
    vec![a.id, p.id, shared.id]
  );
}

// ─── Duplicates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_rules() {
  let s = store().await;
  let mut first = card("alice", "X Y", "Acme", Some("x@y.com"));
  first.fields.phone = Some("555-0100".into());
  s.insert(first).await.unwrap();

  let keys = |name: &str, company: &str, email: Option<&str>, phone: Option<&str>| {
    let mut c = card("alice", name, company, email);
    c.fields.phone = phone.map(Into::into);
    DedupKeys::of(&c.fields)
  };

  // Email alone.
  assert!(s.find_duplicate("alice", &keys("Other", "Co", Some("X@Y.com"), None)).await.unwrap().is_some());
  // Phone alone, surrounding space ignored.
  assert!(s.find_duplicate("alice", &keys("Other", "Co", None, Some(" 555-0100 "))).await.unwrap().is_some());
  // Name and company together, case-insensitive.
  assert!(s.find_duplicate("alice", &keys("x y", "ACME", None, None)).await.unwrap().is_some());
  // Name without company is not enough.
  assert!(s.find_duplicate("alice", &keys("X Y", "Globex", None, None)).await.unwrap().is_none());
  // Never across submitters.
  assert!(s.find_duplicate("bob", &keys("X Y", "Acme", Some("x@y.com"), None)).await.unwrap().is_none());
}

#[tokio::test]
async fn absent_keys_never_match() {
  let s = store().await;
  s.insert(NewCard {
    fields:            CardFields { designation: Some("CTO".into()), ..Default::default() },
    submitted_by:      "alice".into(),
    original_filename: None,
  })
  .await
  .unwrap();

  let keys = DedupKeys::of(&CardFields { designation: Some("CTO".into()), ..Default::default() });
  assert!(s.find_duplicate("alice", &keys).await.unwrap().is_none());
}

// ─── Admin reads ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn counts_and_submitters() {
  let s = store().await;
  s.insert(card("bob", "B1", "Acme", None)).await.unwrap();
  s.insert(card("alice", "A", "Acme", None)).await.unwrap();
  s.insert(card("bob", "B2", "Acme", None)).await.unwrap();

  assert_eq!(s.count(None).await.unwrap(), 3);
  assert_eq!(s.count(Some("bob")).await.unwrap(), 2);
  assert_eq!(s.count(Some("nobody")).await.unwrap(), 0);

  assert_eq!(
    s.submitters().await.unwrap(),
    vec![
      SubmitterSummary { identity: "alice".into(), cards: 1 },
      SubmitterSummary { identity: "bob".into(), cards: 2 },
    ]
  );
}

#[tokio::test]
async fn reopening_a_file_keeps_cards() {
  let dir = std::env::temp_dir().join(format!("rolo-store-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("rolo.db");

  let id = {
    let s = SqliteStore::open(&path).await.unwrap();
    s.insert(card("alice", "X Y", "Acme", None)).await.unwrap().id
  };

  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.get(id).await.unwrap().is_some());
  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}
