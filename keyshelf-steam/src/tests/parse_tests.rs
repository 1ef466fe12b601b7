use super::*;

const SEARCH_PAGE: &str = r#"
<html><body>
<div id="search_resultsRows">
  <a href="https://store.steampowered.com/app/220/HalfLife_2/" class="search_result_row ds_collapse_flag"
     data-ds-appid="220" data-ds-itemkey="App_220">
    <div class="responsive_search_name_combined">
      <div class="search_name"><span class="title">Half-Life 2</span></div>
      <div class="search_discount responsive_secondrow"><span>-90%</span></div>
    </div>
  </a>
  <a href="https://store.steampowered.com/app/380/" class="search_result_row" data-ds-appid="380">
    <span class="title">Half-Life 2: Episode One</span>
  </a>
</div>
</body></html>
"#;

#[test]
fn rate_limit_on_403() {
    assert_eq!(
        check_rate_limit(403, "{}"),
        Err(FetchError::RateLimited { status: 403 })
    );
}

#[test]
fn rate_limit_on_access_denied_body() {
    let body = "<HTML><HEAD><TITLE>Access Denied</TITLE></HEAD></HTML>";
    assert_eq!(
        check_rate_limit(200, body),
        Err(FetchError::RateLimited { status: 200 })
    );
    assert_eq!(
        check_rate_limit(429, "Access Denied"),
        Err(FetchError::RateLimited { status: 429 })
    );
    assert!(check_rate_limit(200, "{\"success\":1}").is_ok());
}

#[test]
fn access_denied_title_in_results_is_not_a_block() {
    let html = r#"<html><head><title>Search</title></head><body>
        <div id="search_resultsRows">
          <a class="search_result_row" data-ds-appid="12345" href="https://store.steampowered.com/app/12345/">
            <span class="title">Access Denied</span>
          </a>
        </div></body></html>"#;
    assert!(check_rate_limit(200, html).is_ok());
    let hit = parse_search_results(html).unwrap();
    assert_eq!(hit.name, "Access Denied");
}

#[test]
fn library_parses_all_wishlist_shapes() {
    let body = r#"{
        "rgOwnedApps": [220, 400],
        "rgWishlist": [620, {"appid": 730, "priority": 1}],
        "rgIgnoredApps": {"570": 0, "440": true}
    }"#;
    let snapshot = parse_library(body, 1234).unwrap();
    assert!(snapshot.owned.contains(&220));
    assert!(snapshot.owned.contains(&400));
    assert!(snapshot.wishlisted.contains(&620));
    assert!(snapshot.wishlisted.contains(&730));
    assert_eq!(snapshot.ignored.get(&570), Some(&false));
    assert_eq!(snapshot.ignored.get(&440), Some(&true));
    assert_eq!(snapshot.fetched_at, 1234);
}

#[test]
fn library_accepts_empty_array_for_ignored() {
    let body = r#"{"rgOwnedApps": [], "rgWishlist": [], "rgIgnoredApps": []}"#;
    let snapshot = parse_library(body, 0).unwrap();
    assert!(snapshot.is_empty());
    assert!(snapshot.ignored.is_empty());
}

#[test]
fn library_missing_fields_default_to_empty() {
    let snapshot = parse_library("{}", 0).unwrap();
    assert!(snapshot.is_empty());
}

#[test]
fn library_rejects_garbage() {
    assert!(matches!(parse_library("<html>", 0), Err(FetchError::Parse(_))));
}

#[test]
fn search_takes_first_row() {
    let hit = parse_search_results(SEARCH_PAGE).unwrap();
    assert_eq!(hit.identity, RawIdentity::new("220", IdentityKind::Title));
    assert_eq!(hit.name, "Half-Life 2");
    assert_eq!(hit.discount_percent, Some(90));
}

#[test]
fn search_package_row_is_collection() {
    let html = r#"<div id="search_resultsRows">
        <a class="search_result_row" data-ds-appid="220,380,420" data-ds-packageid="36">
          <span class="title">Half-Life 2 Complete</span>
        </a></div>"#;
    let hit = parse_search_results(html).unwrap();
    assert_eq!(hit.identity.kind, IdentityKind::Collection);
    assert_eq!(hit.identity.validate().map(|i| i.id()), Some(220));
    assert_eq!(hit.discount_percent, None);
}

#[test]
fn search_bundle_row_is_bundle() {
    let html = r#"<div id="search_resultsRows">
        <a class="search_result_row" data-ds-appid="" data-ds-bundleid="232">
          <span class="title">Valve Complete Pack</span>
        </a></div>"#;
    let hit = parse_search_results(html).unwrap();
    assert_eq!(hit.identity.kind, IdentityKind::Bundle);
    // Bundle rows have no app id; validation is the resolver's call
    assert!(hit.identity.validate().is_none());
}

#[test]
fn search_without_results_list_falls_back_to_any_row() {
    let html = r#"<a class="search_result_row" data-ds-appid="70"><span class="title">Half-Life</span></a>"#;
    let hit = parse_search_results(html).unwrap();
    assert_eq!(hit.identity.id, "70");
}

#[test]
fn search_no_rows_is_none() {
    let html = r#"<div id="search_resultsRows"></div><div class="search_results_count">0 results</div>"#;
    assert!(parse_search_results(html).is_none());
}

#[test]
fn reviews_floor_percent() {
    let body = r#"{"success":1,"query_summary":{"num_reviews":0,"review_score":8,
        "review_score_desc":"Very Positive","total_positive":2,"total_negative":1,"total_reviews":3}}"#;
    let review = parse_review_summary(body).unwrap().unwrap();
    assert_eq!(review.percent_positive, 66);
    assert_eq!(review.total_reviews, 3);
    assert_eq!(review.label, "Very Positive");
}

#[test]
fn reviews_absent_when_zero_or_missing() {
    let zero = r#"{"query_summary":{"total_reviews":0,"total_positive":0,"review_score_desc":"No user reviews"}}"#;
    assert_eq!(parse_review_summary(zero).unwrap(), None);
    assert_eq!(parse_review_summary(r#"{"success":2}"#).unwrap(), None);
}

#[test]
fn tier_prefers_trending() {
    let body = r#"{"tier":"silver","trendingTier":"gold","confidence":"strong"}"#;
    assert_eq!(
        parse_compatibility_tier(body).unwrap(),
        Some(CompatibilityTier("gold".to_string()))
    );
    assert_eq!(
        parse_compatibility_tier(r#"{"tier":"platinum"}"#).unwrap(),
        Some(CompatibilityTier("platinum".to_string()))
    );
    assert_eq!(parse_compatibility_tier("{}").unwrap(), None);
    assert!(parse_compatibility_tier("not json").is_err());
}

#[test]
fn dictionary_and_app_list() {
    let dict = parse_app_dictionary(r#"{"halflife2":220,"portal":400}"#).unwrap();
    assert_eq!(dict.get("halflife2"), Some(&220));

    let apps = parse_app_list(
        r#"{"applist":{"apps":[{"appid":220,"name":"Half-Life 2"},{"appid":400,"name":"Portal"}]}}"#,
    )
    .unwrap();
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[1], AppListEntry { appid: 400, name: "Portal".to_string() });
}
