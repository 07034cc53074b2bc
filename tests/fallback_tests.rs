//! Fallback layering tests
//!
//! Every test checks both answers a layered config gives: the eagerly merged
//! root (what rendering and deserialization see) and the whole-path lookup
//! through the fallback chain.

use hocon_config::{Config, from_config};
use serde::Deserialize;

fn parse(text: &str) -> Config {
    Config::parse_str(text).unwrap()
}

/// Path lookups through the chain, compared against the merged root alone
fn assert_views_agree(config: &Config, paths: &[&str]) {
    let merged_only = config.root().to_config().unwrap();
    for path in paths {
        assert_eq!(
            config.try_get_string(path),
            merged_only.try_get_string(path),
            "views disagree at {path}"
        );
    }
}

#[test]
fn test_primary_wins_and_fallback_fills_gaps() {
    let primary = parse("{a:1}");
    let fallback = parse("{a:2,b:3}");
    let config = primary.with_fallback(&fallback);

    assert_eq!(config.get_i32("a"), 1);
    assert_eq!(config.get_i32("b"), 3);
    assert_views_agree(&config, &["a", "b", "c"]);
}

#[test]
fn test_nested_objects_take_the_union_of_keys() {
    let primary = parse("a { x = 1, shared = primary }");
    let fallback = parse("a { y = 2, shared = fallback }");
    let config = primary.with_fallback(&fallback);

    assert_eq!(config.get_i32("a.x"), 1);
    assert_eq!(config.get_i32("a.y"), 2);
    assert_eq!(config.get_string("a.shared"), "primary");

    let mut keys = config.get_config("a").unwrap().unwrap().keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["shared", "x", "y"]);
    assert_views_agree(&config, &["a.x", "a.y", "a.shared"]);
}

#[test]
fn test_inputs_stay_unchanged_and_reusable() {
    let primary = parse("a = 1");
    let fallback = parse("b = 2");
    let first = primary.with_fallback(&fallback);
    let second = primary.with_fallback(&parse("b = 3"));

    assert!(!primary.has_path("b"));
    assert!(!fallback.has_path("a"));
    assert_eq!(first.get_i32("b"), 2);
    assert_eq!(second.get_i32("b"), 3);
}

#[test]
fn test_missing_segment_asks_fallback_for_whole_path() {
    let primary = parse("a { b { c = 1 } }");
    let fallback = parse("a { x { c = 2 } }");
    let config = primary.with_fallback(&fallback);

    assert_eq!(config.get_i32("a.b.c"), 1);
    assert_eq!(config.get_i32("a.x.c"), 2);
    assert!(!config.has_path("a.y.c"));
}

#[test]
fn test_scalar_in_primary_shadows_fallback_object() {
    let primary = parse("a = flat");
    let fallback = parse("a { nested = 1 }");
    let config = primary.with_fallback(&fallback);

    assert_eq!(config.get_string("a"), "flat");
    assert!(!config.is_object("a"));
    assert_views_agree(&config, &["a"]);
}

#[test]
fn test_chained_fallbacks() {
    let config = parse("a = 1")
        .with_fallback(&parse("a = 2\nb = 2"))
        .with_fallback(&parse("a = 3\nb = 3\nc = 3"));

    assert_eq!(config.get_i32("a"), 1);
    assert_eq!(config.get_i32("b"), 2);
    assert_eq!(config.get_i32("c"), 3);
    assert_eq!(config.keys().unwrap(), vec!["a", "b", "c"]);
    assert_views_agree(&config, &["a", "b", "c"]);

    let mut layers = 0;
    let mut layer = config.fallback();
    while let Some(next) = layer {
        layers += 1;
        layer = next.fallback();
    }
    assert_eq!(layers, 2);
}

#[test]
fn test_unbound_optional_falls_through() {
    let primary = parse("timeout = ${?NO_TIMEOUT_OVERRIDE}\nname = app");
    let fallback = parse("timeout = 30s\nname = default");
    let config = primary.with_fallback(&fallback);

    assert_eq!(config.get_string("timeout"), "30s");
    assert_eq!(config.get_string("name"), "app");
    assert_views_agree(&config, &["timeout", "name"]);
}

#[test]
fn test_substitutions_keep_their_own_document() {
    let primary = parse("host = primary-host\nurl = ${host}");
    let fallback = parse("host = fallback-host\nbackup = ${host}");
    let config = primary.with_fallback(&fallback);

    assert_eq!(config.get_string("url"), "primary-host");
    assert_eq!(config.get_string("backup"), "fallback-host");
    assert_views_agree(&config, &["url", "backup", "host"]);
}

#[test]
fn test_substituted_object_merges_with_fallback_object() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Section {
        x: i32,
        y: i32,
    }

    #[derive(Debug, Deserialize)]
    struct Document {
        a: Section,
    }

    let primary = parse("a = ${b}\nb { x = 1 }");
    let fallback = parse("a { y = 2 }");
    let config = primary.with_fallback(&fallback);

    assert_eq!(config.get_i32("a.x"), 1);
    assert_eq!(config.get_i32("a.y"), 2);
    assert!(!config.has_path("b.y"));
    assert_views_agree(&config, &["a.x", "a.y", "b.x", "b.y"]);

    let document: Document = from_config(&config).unwrap();
    assert_eq!(document.a, Section { x: 1, y: 2 });

    let rendered = parse(&config.render().unwrap());
    assert_eq!(rendered.get_i32("a.x"), 1);
    assert_eq!(rendered.get_i32("a.y"), 2);
    assert!(!rendered.has_path("b.y"));
}

#[test]
fn test_fallback_substitution_merges_under_primary_object() {
    let primary = parse("a { x = 1 }");
    let fallback = parse("a = ${shared}\nshared { x = 9, y = 2 }");
    let config = primary.with_fallback(&fallback);

    assert_eq!(config.get_i32("a.x"), 1);
    assert_eq!(config.get_i32("a.y"), 2);
    assert_eq!(config.get_i32("shared.x"), 9);
    assert_views_agree(&config, &["a.x", "a.y", "shared.x", "shared.y"]);
}

#[test]
fn test_text_fallback_and_deserialization() {
    #[derive(Debug, Deserialize)]
    struct Settings {
        name: String,
        workers: u32,
        limits: Limits,
    }

    #[derive(Debug, Deserialize)]
    struct Limits {
        cpu: f64,
        memory: String,
    }

    let config = parse("name = custom\nlimits.cpu = 2.5")
        .with_text_fallback("name = default\nworkers = 4\nlimits { cpu = 1, memory = 1GiB }")
        .unwrap();
    let settings: Settings = from_config(&config).unwrap();

    assert_eq!(settings.name, "custom");
    assert_eq!(settings.workers, 4);
    assert_eq!(settings.limits.cpu, 2.5);
    assert_eq!(settings.limits.memory, "1GiB");
}

#[test]
fn test_sub_config_keeps_fallback_chain() {
    let config = parse("db { host = local }").with_fallback(&parse("db { port = 5432 }"));
    let db = config.get_config("db").unwrap().unwrap();

    assert_eq!(db.get_string("host"), "local");
    assert_eq!(db.get_i32("port"), 5432);
    assert!(db.fallback().is_some());
}

#[test]
fn test_sub_config_from_fallback_only() {
    let config = parse("a = 1").with_fallback(&parse("db { port = 5432 }"));
    let db = config.get_config("db").unwrap().unwrap();
    assert_eq!(db.get_i32("port"), 5432);
}

#[test]
#[should_panic(expected = "a config cannot be its own fallback")]
fn test_config_cannot_be_its_own_fallback() {
    let config = parse("a = 1");
    let _ = config.with_fallback(&config);
}

#[test]
#[should_panic(expected = "own fallback")]
fn test_clone_is_the_same_config() {
    let config = parse("a = 1");
    let copy = config.clone();
    let _ = config.with_fallback(&copy);
}
