//! End-to-end migration scenarios driven through the payload layer, the way
//! the transport collaborator drives a live directory.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use locus_directory::{
    DirectoryRegistry, HandlerRegistry, LocationKind, Payload, register_handlers,
    model::{
        self, Address, ObjectAddRequest, ObjectGetRequest, ObjectGetResponse, ObjectLockRequest,
        ObjectUnlockRequest,
    },
};
use locus_integration_tests::init_tracing;

fn setup() -> (Arc<HandlerRegistry>, Arc<DirectoryRegistry>) {
    init_tracing();
    let directories = Arc::new(DirectoryRegistry::default());
    let mut registry = HandlerRegistry::new();
    register_handlers(&mut registry, directories.clone()).unwrap();
    (Arc::new(registry), directories)
}

fn add(kind: LocationKind, key: u64, address: Address) -> Payload {
    Payload::of(model::OBJECT_ADD_REQUEST, &ObjectAddRequest { kind, key, address })
}

fn lock(kind: LocationKind, key: u64, holder: Address, timeout_ms: u64) -> Payload {
    Payload::of(
        model::OBJECT_LOCK_REQUEST,
        &ObjectLockRequest {
            kind,
            key,
            holder,
            timeout_ms,
        },
    )
}

fn unlock(kind: LocationKind, key: u64, expected_holder: Address, new_address: Address) -> Payload {
    Payload::of(
        model::OBJECT_UNLOCK_REQUEST,
        &ObjectUnlockRequest {
            kind,
            key,
            expected_holder,
            new_address,
        },
    )
}

fn get(kind: LocationKind, key: u64) -> Payload {
    Payload::of(model::OBJECT_GET_REQUEST, &ObjectGetRequest { kind, key })
}

async fn resolve(registry: &HandlerRegistry, kind: LocationKind, key: u64) -> Address {
    let reply = registry.dispatch(&get(kind, key)).await.unwrap();
    let response: ObjectGetResponse = serde_json::from_value(reply.body).unwrap();
    response.address
}

#[tokio::test(flavor = "current_thread")]
async fn scene_transfer_holds_readers_until_the_new_host_confirms() {
    let (registry, _) = setup();
    let kind = LocationKind::Unit;
    let source = Address::new(1, 10);
    let target = Address::new(2, 20);

    registry.dispatch(&add(kind, 100, source)).await.unwrap();
    registry.dispatch(&lock(kind, 100, target, 0)).await.unwrap();

    // A message router resolving the unit mid-transfer must wait
    let resolved = Arc::new(AtomicBool::new(false));
    let registry2 = registry.clone();
    let resolved2 = resolved.clone();
    let router = tokio::spawn(async move {
        let address = resolve(&registry2, kind, 100).await;
        resolved2.store(true, Ordering::SeqCst);
        address
    });
    tokio::task::yield_now().await;
    assert!(!resolved.load(Ordering::SeqCst));

    // The target host confirms arrival
    registry
        .dispatch(&unlock(kind, 100, target, target))
        .await
        .unwrap();

    assert_eq!(router.await.unwrap(), target);
    assert_eq!(resolve(&registry, kind, 100).await, target);
}

#[tokio::test(flavor = "current_thread")]
async fn queued_readers_all_observe_the_final_address() {
    let (registry, _) = setup();
    let kind = LocationKind::Session;
    let target = Address::new(7, 70);

    registry.dispatch(&add(kind, 5, Address::new(1, 1))).await.unwrap();
    registry.dispatch(&lock(kind, 5, target, 0)).await.unwrap();

    let results = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut readers = Vec::new();
    for i in 0..8u32 {
        let registry = registry.clone();
        let results = results.clone();
        readers.push(tokio::spawn(async move {
            let address = resolve(&registry, kind, 5).await;
            results.lock().push((i, address));
        }));
        tokio::task::yield_now().await;
    }
    assert!(results.lock().is_empty());

    registry.dispatch(&unlock(kind, 5, target, target)).await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    let results = results.lock().clone();
    assert_eq!(results.len(), 8);
    for (i, (issued, address)) in results.iter().enumerate() {
        assert_eq!(*issued as usize, i);
        assert_eq!(*address, target);
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_migration_self_heals_through_the_lock_timeout() {
    let (registry, directories) = setup();
    let kind = LocationKind::Unit;
    let target = Address::new(3, 30);

    registry.dispatch(&add(kind, 42, Address::new(1, 1))).await.unwrap();
    registry.dispatch(&lock(kind, 42, target, 50)).await.unwrap();
    assert!(directories.directory(kind).is_locked(42));

    // The target host dies and never confirms; the liveness guard resolves
    // the key to the holder after the timeout
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert!(!directories.directory(kind).is_locked(42));
    assert_eq!(resolve(&registry, kind, 42).await, target);
}

#[tokio::test(start_paused = true)]
async fn confirmed_migration_is_not_double_applied_by_the_timer() {
    let (registry, directories) = setup();
    let kind = LocationKind::Unit;
    let target = Address::new(3, 30);
    let relocked = Address::new(4, 40);

    registry.dispatch(&add(kind, 42, Address::new(1, 1))).await.unwrap();
    registry.dispatch(&lock(kind, 42, target, 1_000)).await.unwrap();
    registry.dispatch(&unlock(kind, 42, target, target)).await.unwrap();

    // A second migration starts before the stale timer fires
    registry.dispatch(&lock(kind, 42, relocked, 0)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_000)).await;

    // The stale timer was superseded; the second ticket is intact
    let directory = directories.directory(kind);
    assert!(directory.is_locked(42));
    assert_eq!(directory.lock_holder(42), Some(relocked));

    registry.dispatch(&unlock(kind, 42, relocked, relocked)).await.unwrap();
    assert_eq!(resolve(&registry, kind, 42).await, relocked);
}

#[tokio::test]
async fn kinds_never_interfere() {
    let (registry, _) = setup();
    let unit_home = Address::new(1, 1);
    let session_home = Address::new(2, 2);

    registry
        .dispatch(&add(LocationKind::Unit, 9, unit_home))
        .await
        .unwrap();
    registry
        .dispatch(&add(LocationKind::Session, 9, session_home))
        .await
        .unwrap();
    registry
        .dispatch(&lock(LocationKind::Unit, 9, Address::new(5, 5), 0))
        .await
        .unwrap();

    // Same numeric key, different kind: resolves immediately
    assert_eq!(resolve(&registry, LocationKind::Session, 9).await, session_home);

    registry
        .dispatch(&unlock(LocationKind::Unit, 9, Address::new(5, 5), Address::new(5, 5)))
        .await
        .unwrap();
}

#[tokio::test]
async fn removed_entity_resolves_to_the_zero_sentinel() {
    let (registry, _) = setup();
    let kind = LocationKind::Account;

    registry.dispatch(&add(kind, 1, Address::new(1, 1))).await.unwrap();
    registry
        .dispatch(&Payload::of(
            model::OBJECT_REMOVE_REQUEST,
            &locus_directory::model::ObjectRemoveRequest { kind, key: 1 },
        ))
        .await
        .unwrap();

    assert!(resolve(&registry, kind, 1).await.is_zero());

    // Removing again is a silent no-op
    registry
        .dispatch(&Payload::of(
            model::OBJECT_REMOVE_REQUEST,
            &locus_directory::model::ObjectRemoveRequest { kind, key: 1 },
        ))
        .await
        .unwrap();
}
