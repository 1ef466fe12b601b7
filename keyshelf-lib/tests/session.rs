use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use keyshelf_cache::{Cache, KeyValueStore, MemoryStore};
use keyshelf_core::{FetchError, Identity, IdentityKind, LibrarySnapshot, Listing, RawIdentity, SiteProfile, Status};
use keyshelf_lib::async_util::run_with_events;
use keyshelf_lib::enricher::LIBRARY_KEY;
use keyshelf_lib::session::HALT_MESSAGE;
use keyshelf_lib::{
    ListingOutcome, ResolveMethod, SchedulerConfig, Session, SessionConfig, SessionEvent,
};
use keyshelf_steam::SearchHit;
use keyshelf_steam::mock::{Endpoint, MockSteam};
use tokio::sync::mpsc;

fn config(listing_concurrency: usize) -> SessionConfig {
    SessionConfig {
        scheduler: SchedulerConfig {
            min_interval: Duration::ZERO,
            concurrency: 1,
        },
        listing_concurrency,
        ..SessionConfig::default()
    }
}

fn library(owned: &[u32], wishlisted: &[u32]) -> LibrarySnapshot {
    LibrarySnapshot {
        owned: owned.iter().copied().collect::<HashSet<_>>(),
        wishlisted: wishlisted.iter().copied().collect::<HashSet<_>>(),
        ..Default::default()
    }
}

async fn run_all(session: &Session<MockSteam>, listings: Vec<Listing>) -> Vec<SessionEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut events = Vec::new();
    run_with_events(session.process_all(listings, tx), rx, |e| events.push(e)).await;
    events
}

#[tokio::test]
async fn offline_dictionary_resolves_without_search() {
    let steam = Arc::new(
        MockSteam::new()
            .with_dictionary([("halflife2", 220)])
            .with_library(library(&[], &[220])),
    );
    let cache = Cache::new(Arc::new(MemoryStore::new()));
    let session = Session::new(SiteProfile::HumbleBundle, steam.clone(), cache, config(1));

    let outcome = session
        .process(Listing::new("Half-Life 2: GOTY Edition"))
        .await
        .unwrap();
    match outcome {
        ListingOutcome::Enriched { record, method, .. } => {
            assert_eq!(record.identity, Identity::new(220, IdentityKind::Title).unwrap());
            assert_eq!(method, ResolveMethod::OfflineDictionary);
            assert_eq!(record.status, Status::Wishlisted);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(steam.calls(Endpoint::Search), 0);
}

#[tokio::test]
async fn empty_library_is_refetched_not_cached() {
    let steam = Arc::new(MockSteam::new().with_library(LibrarySnapshot::default()));
    let store = Arc::new(MemoryStore::new());
    let cache = Cache::new(store.clone());
    let session = Session::new(SiteProfile::HumbleBundle, steam.clone(), cache, config(1));

    let portal = Listing::new("Portal").with_direct_hint(RawIdentity::new("400", IdentityKind::Title));
    let portal2 = Listing::new("Portal 2").with_direct_hint(RawIdentity::new("620", IdentityKind::Title));
    session.process(portal).await.unwrap();
    session.process(portal2).await.unwrap();

    assert_eq!(steam.calls(Endpoint::Library), 2);
    assert_eq!(store.get(LIBRARY_KEY).unwrap(), None);
}

#[tokio::test]
async fn process_all_emits_events_and_counts() {
    let hit = SearchHit {
        identity: RawIdentity::new("70", IdentityKind::Title),
        name: "Half-Life".to_string(),
        discount_percent: Some(80),
    };
    let steam = Arc::new(
        MockSteam::new()
            .with_library(library(&[400], &[70]))
            .with_search_hit("half-life", hit),
    );
    let cache = Cache::new(Arc::new(MemoryStore::new()));
    let session = Session::new(SiteProfile::HumbleBundle, steam.clone(), cache, config(2));

    let listings = vec![
        Listing::new("Portal").with_asset_ref("https://store.steampowered.com/app/400/Portal/"),
        Listing::new("Half-Life"),
        Listing::new("Unknown Indie"),
        Listing::new("A Book").with_link("https://www.humblebundle.com/books/a-book"),
        // Same key as the first listing
        Listing::new("Portal").with_asset_ref("https://store.steampowered.com/app/400/"),
    ];
    let events = run_all(&session, listings).await;

    let started = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Started { .. }))
        .count();
    let completed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Completed { record, search_hit, .. } => Some((record.clone(), search_hit.clone())),
            _ => None,
        })
        .collect();
    let no_data = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::NoData { .. }))
        .count();

    assert_eq!(started, 5);
    assert_eq!(completed.len(), 3);
    assert!(
        completed
            .iter()
            .any(|(r, hit)| r.identity.id() == 70 && hit.as_ref().and_then(|h| h.discount_percent) == Some(80))
    );
    assert_eq!(no_data, 1);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Halted { .. })));

    match events.last() {
        Some(SessionEvent::Done { stats }) => {
            assert_eq!(stats.total, 3);
            assert_eq!(stats.owned, 1);
            assert_eq!(stats.wishlisted, 1);
            assert_eq!(stats.no_data, 1);
        }
        other => panic!("expected Done last, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_halts_the_session_once() {
    let steam = Arc::new(
        MockSteam::new()
            .with_library(library(&[400], &[]))
            .with_search_error("first", FetchError::RateLimited { status: 403 }),
    );
    let cache = Cache::new(Arc::new(MemoryStore::new()));
    let session = Session::new(SiteProfile::HumbleBundle, steam.clone(), cache, config(1));

    let listings = vec![
        Listing::new("First"),
        Listing::new("Second"),
        Listing::new("Portal").with_direct_hint(RawIdentity::new("400", IdentityKind::Title)),
    ];
    let events = run_all(&session, listings).await;

    let halts: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Halted { message } => Some(message.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(halts, vec![HALT_MESSAGE.to_string()]);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Completed { .. })));
    assert_eq!(steam.calls(Endpoint::Search), 1);
    assert_eq!(session.stats().total, 0);
    assert!(session.is_halted());
    assert_eq!(session.scheduler().pending_len(), 0);
}

#[tokio::test]
async fn writes_report_file() {
    let steam = Arc::new(MockSteam::new().with_library(library(&[400], &[])));
    let cache = Cache::new(Arc::new(MemoryStore::new()));
    let session = Session::new(SiteProfile::Gog, steam, cache, config(1));

    let listing = Listing::new("Portal")
        .with_native_id("1234")
        .with_asset_ref("https://store.steampowered.com/app/400/");
    session.process(listing).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.txt");
    session.write_report(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("Site: GOG"));
    assert!(text.contains("[OWNED] gog_1234"));
}
