use keyshelf_core::title::{clean_title, edit_distance, normalize_title, similarity, strip_non_alphanumeric};

#[test]
fn goty_edition_matches_base_title() {
    assert_eq!(
        normalize_title("Half-Life 2: Game of the Year Edition"),
        normalize_title("Half-Life 2")
    );
}

#[test]
fn goty_abbreviation_stripped() {
    assert_eq!(normalize_title("Half-Life 2: GOTY Edition"), "halflife2");
}

#[test]
fn dash_separated_deluxe_bundle() {
    assert_eq!(clean_title("DOOM Eternal - Deluxe Edition Bundle"), "doom eternal");
}

#[test]
fn the_definitive_cut() {
    assert_eq!(clean_title("Disco Elysium - The Final Cut"), "disco elysium - the final cut");
    assert_eq!(clean_title("Some Game: The Definitive Edition"), "some game");
}

#[test]
fn trailing_ellipsis_after_edition() {
    assert_eq!(clean_title("Borderlands 2 Game of the Year..."), "borderlands 2");
}

#[test]
fn steam_key_and_preorder_noise() {
    assert_eq!(normalize_title("Hades Steam Key"), "hades");
    assert_eq!(normalize_title("Hollow Knight: Silksong Pre-Order"), "hollowknightsilksong");
}

#[test]
fn noise_is_case_insensitive() {
    assert_eq!(clean_title("Portal: ultimate edition"), "portal");
}

#[test]
fn plain_title_only_lowercased_and_stripped() {
    assert_eq!(normalize_title("  Stardew Valley!  "), "stardewvalley");
}

#[test]
fn strip_drops_non_ascii() {
    assert_eq!(strip_non_alphanumeric("Pokémon™ 3"), "pokmon3");
}

#[test]
fn edit_distance_basics() {
    assert_eq!(edit_distance("", ""), 0);
    assert_eq!(edit_distance("", "abc"), 3);
    assert_eq!(edit_distance("abc", ""), 3);
    assert_eq!(edit_distance("kitten", "sitting"), 3);
    assert_eq!(edit_distance("portal", "portl"), 1);
}

#[test]
fn similarity_identical_and_empty() {
    assert_eq!(similarity("Portal", "Portal"), 1.0);
    assert_eq!(similarity("", ""), 1.0);
    assert_eq!(similarity("PORTAL", "portal"), 1.0);
}

#[test]
fn similarity_partial_match_in_open_interval() {
    let s = similarity("Portal", "Portl");
    assert!(s > 0.0 && s < 1.0, "got {s}");
    assert!((s - (1.0 - 1.0 / 6.0)).abs() < 1e-9);
}

#[test]
fn similarity_completely_dissimilar_is_zero() {
    assert_eq!(similarity("abc", "xyz"), 0.0);
    assert_eq!(similarity("abc", ""), 0.0);
}
