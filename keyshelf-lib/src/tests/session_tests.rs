use super::*;
use std::collections::HashSet;
use std::time::Duration;

use keyshelf_cache::MemoryStore;
use keyshelf_steam::mock::{Endpoint, MockSteam};

fn session(profile: SiteProfile, steam: MockSteam) -> (Arc<MockSteam>, Session<MockSteam>) {
    let steam = Arc::new(steam);
    let cache = Cache::new(Arc::new(MemoryStore::new()));
    let config = SessionConfig {
        scheduler: SchedulerConfig {
            min_interval: Duration::ZERO,
            concurrency: 1,
        },
        ..SessionConfig::default()
    };
    (steam.clone(), Session::new(profile, steam, cache, config))
}

fn owning(ids: &[u32]) -> MockSteam {
    MockSteam::new().with_library(keyshelf_core::LibrarySnapshot {
        owned: ids.iter().copied().collect::<HashSet<_>>(),
        ..Default::default()
    })
}

#[tokio::test]
async fn ignored_section_is_skipped_and_not_counted() {
    let (steam, session) = session(SiteProfile::HumbleBundle, MockSteam::new());
    let listing = Listing::new("Some Novel").with_link("https://www.humblebundle.com/books/some-novel");

    assert_eq!(session.process(listing).await.unwrap(), ListingOutcome::Skipped);
    assert_eq!(session.stats().total, 0);
    assert_eq!(steam.calls(Endpoint::Search), 0);
}

#[tokio::test]
async fn site_hint_extracted_from_asset_refs() {
    let (steam, session) = session(SiteProfile::DailyIndieGame, owning(&[4000]));
    let listing = Listing::new("Garry's Mod")
        .with_asset_ref("https://www.dailyindiegame.com/site_gamelisting_4000.html");

    let outcome = session.process(listing).await.unwrap();
    match outcome {
        ListingOutcome::Enriched { record, method, .. } => {
            assert_eq!(method, ResolveMethod::DirectHint);
            assert_eq!(record.identity.id(), 4000);
            assert_eq!(record.status, Status::Owned);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(steam.calls(Endpoint::Search), 0);
}

#[tokio::test]
async fn duplicate_keys_counted_once() {
    let (_, session) = session(SiteProfile::HumbleBundle, owning(&[400]));
    let listing = Listing::new("Portal")
        .with_link("https://www.humblebundle.com/store/portal?hmb_source=search")
        .with_asset_ref("https://store.steampowered.com/app/400/");

    session.process(listing.clone()).await.unwrap();
    let again = listing.with_link("https://www.humblebundle.com/store/portal?other=1");
    session.process(again).await.unwrap();

    let stats = session.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.owned, 1);
}

#[tokio::test]
async fn unresolved_counts_as_no_data() {
    let (_, session) = session(SiteProfile::HumbleBundle, MockSteam::new());
    let outcome = session.process(Listing::new("Unknown Thing")).await.unwrap();

    assert!(matches!(
        outcome,
        ListingOutcome::NoData { resolution: Resolution::Unresolved, .. }
    ));
    assert_eq!(session.stats().no_data, 1);
}

#[tokio::test]
async fn breaker_errors_are_not_counted() {
    let steam = MockSteam::new().with_search_error("portal", FetchError::RateLimited { status: 403 });
    let (steam, session) = session(SiteProfile::HumbleBundle, steam);

    let err = session.process(Listing::new("Portal")).await.unwrap_err();
    assert!(err.is_breaker());
    assert!(session.is_halted());

    let err = session.process(Listing::new("Portal 2")).await.unwrap_err();
    assert_eq!(err, FetchError::QueueStopped);
    assert_eq!(session.stats().total, 0);
    assert_eq!(steam.calls(Endpoint::Search), 1);
}

#[test]
fn no_data_reasons() {
    assert_eq!(no_data_reason(&Resolution::Unresolved), "no match");
    let invalid = Resolution::InvalidIdentity {
        method: ResolveMethod::Search,
        raw: keyshelf_core::RawIdentity::new("", keyshelf_core::IdentityKind::Bundle),
    };
    assert_eq!(no_data_reason(&invalid), "invalid id '' from search");
}
