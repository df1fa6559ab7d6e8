use crate::store::InMemoryStore;
use alma_core::{
    Character, CharacterStore, MemoryStore, Message, MessageStore, NarrativeMemory, NewMemory,
    Profile, ProfileStore, RelationshipVector, Role, Trait, TraitKind, TraitStore,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn memory(profile_id: Uuid, content: &str, embedding: Vec<f32>, intensity: f32) -> NarrativeMemory {
    NewMemory {
        profile_id,
        content: content.into(),
        embedding,
        importance: 8,
        emotional_weight: 8,
        emotional_intensity: Some(intensity),
        emotion_category: "tristeza".into(),
        happened_at: None,
    }
    .into_memory()
}

#[tokio::test]
async fn test_search_pure_similarity_without_weight() {
    let store = InMemoryStore::new();
    let pid = Uuid::new_v4();
    store.insert_memory(memory(pid, "close", vec![1.0, 0.1], 0.0)).await;
    store.insert_memory(memory(pid, "far but intense", vec![0.7, 0.7], 100.0)).await;

    let hits = store.search(pid, &[1.0, 0.0], 5, 0.0).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].memory.content, "close");
    assert!(hits[0].similarity > hits[1].similarity);
}

#[tokio::test]
async fn test_search_weight_factor_lifts_intense_memories() {
    let store = InMemoryStore::new();
    let pid = Uuid::new_v4();
    // similarity 0.995 vs 0.894: the 0.2 lift at full intensity flips them
    store.insert_memory(memory(pid, "mild", vec![1.0, 0.1], 0.0)).await;
    store.insert_memory(memory(pid, "intense", vec![1.0, 0.5], 100.0)).await;

    let hits = store.search(pid, &[1.0, 0.0], 5, 1.0).await.unwrap();
    assert_eq!(hits[0].memory.content, "intense");
    // Reported similarity stays the raw cosine
    assert!(hits[0].similarity < 0.9);
}

#[tokio::test]
async fn test_search_scoped_to_profile_and_k() {
    let store = InMemoryStore::new();
    let pid = Uuid::new_v4();
    for i in 0..5 {
        store.insert_memory(memory(pid, &format!("m{}", i), vec![1.0, i as f32], 10.0)).await;
    }
    store.insert_memory(memory(Uuid::new_v4(), "other", vec![1.0, 0.0], 10.0)).await;
    store.insert_memory(memory(pid, "wrong dims", vec![1.0, 0.0, 0.0], 10.0)).await;

    let hits = store.search(pid, &[1.0, 0.0], 3, 1.0).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.memory.profile_id == pid));
    assert_eq!(hits[0].memory.content, "m0");
}

#[tokio::test]
async fn test_recent_high_impact_filters_and_orders() {
    let store = InMemoryStore::new();
    let pid = Uuid::new_v4();
    let mut older = memory(pid, "older", vec![], 90.0);
    older.created_at = Utc::now() - Duration::hours(5);
    store.insert_memory(older).await;
    store.insert_memory(memory(pid, "newer", vec![], 80.0)).await;
    store.insert_memory(memory(pid, "mild", vec![], 30.0)).await;
    let mut minor = memory(pid, "minor", vec![], 95.0);
    minor.importance = 3;
    store.insert_memory(minor).await;

    let hits = store.get_recent_high_impact(pid, 5, 7, 70.0).await.unwrap();
    let contents: Vec<_> = hits.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["newer", "older"]);

    let one = store.get_recent_high_impact(pid, 1, 7, 70.0).await.unwrap();
    assert_eq!(one.len(), 1);
}

#[tokio::test]
async fn test_profile_lookup_and_relationship_update() {
    let store = InMemoryStore::new();
    let profile = store.insert_profile(Profile::new("u1", "Alma", "Una amiga")).await;

    let found = store.get_by_user_id("u1").await.unwrap().unwrap();
    assert_eq!(found.id, profile.id);
    assert!(store.get_by_user_id("nobody").await.unwrap().is_none());

    store
        .update_relationship(profile.id, RelationshipVector::new(120.0, 40.0, -3.0))
        .await
        .unwrap();
    let rel = store.profile(profile.id).await.unwrap().relationship;
    assert_eq!((rel.trust, rel.intimacy, rel.respect), (100.0, 40.0, 0.0));

    assert!(store
        .update_relationship(Uuid::new_v4(), RelationshipVector::default())
        .await
        .is_err());
}

#[tokio::test]
async fn test_trait_upsert_replaces_by_name() {
    let store = InMemoryStore::new();
    let pid = Uuid::new_v4();
    assert!(store.find_by_profile_id(pid).await.unwrap().is_empty());

    store.upsert(pid, Trait::new(TraitKind::Neuroticism, 60.0)).await.unwrap();
    store.upsert(pid, Trait::new(TraitKind::Openness, 70.0)).await.unwrap();
    store.upsert(pid, Trait::new(TraitKind::Neuroticism, 55.0)).await.unwrap();

    let traits = store.find_by_profile_id(pid).await.unwrap();
    assert_eq!(traits.len(), 2);
    let n = traits.iter().find(|t| t.name == "neuroticism").unwrap();
    assert_eq!(n.value, 55.0);
}

#[tokio::test]
async fn test_characters_and_messages() {
    let store = InMemoryStore::new();
    let pid = Uuid::new_v4();
    CharacterStore::create(&store, Character::new(pid, "Jorge", RelationshipVector::default()))
        .await
        .unwrap();
    store
        .insert_character(Character::new(Uuid::new_v4(), "Ana", RelationshipVector::default()))
        .await;
    let chars = store.list_by_profile(pid).await.unwrap();
    assert_eq!(chars.len(), 1);
    assert_eq!(chars[0].name, "Jorge");

    MessageStore::create(&store, Message::new("u1", "s1", Role::User, "hola")).await.unwrap();
    MessageStore::create(&store, Message::new("u1", "s1", Role::Assistant, "¡hola!")).await.unwrap();
    MessageStore::create(&store, Message::new("u1", "s2", Role::User, "otra")).await.unwrap();
    let msgs = store.list_by_session("s1").await.unwrap();
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].role, Role::User);
    assert_eq!(msgs[1].content, "¡hola!");
}
