//! Include directive tests
//!
//! File-system includes go through temporary directories; in-memory
//! includes use `MapIncludeHandler` and plain closures.

use hocon_config::{
    Config, FileIncludeHandler, HoconError, MapIncludeHandler, ParseError, load_config,
    parse_str,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[test]
fn test_root_include_from_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "defaults.conf", "app { name = default, threads = 4 }");
    write(
        dir.path(),
        "main.conf",
        "include \"defaults.conf\"\napp.name = main\n",
    );

    let config = load_config(dir.path().join("main.conf")).unwrap();
    assert_eq!(config.get_string("app.name"), "main");
    assert_eq!(config.get_i32("app.threads"), 4);
}

#[test]
fn test_include_inside_object_prefixes_substitutions() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "sub/db.conf",
        "host = localhost\nurl = \"jdbc://\"${host}\"/app\"\n",
    );
    write(
        dir.path(),
        "main.conf",
        "database { include \"sub/db.conf\" }\nprimary = ${database.url}\n",
    );

    let config = load_config(dir.path().join("main.conf")).unwrap();
    assert_eq!(config.get_string("database.host"), "localhost");
    assert_eq!(config.get_string("database.url"), "jdbc://localhost/app");
    assert_eq!(config.get_string("primary"), "jdbc://localhost/app");
}

#[test]
fn test_prefixed_substitution_sees_enclosing_overrides() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "db.conf", "host = localhost\nurl = ${host}\n");
    write(
        dir.path(),
        "main.conf",
        "database { host = prod-db\ninclude \"db.conf\" }\n",
    );

    let config = load_config(dir.path().join("main.conf")).unwrap();
    assert_eq!(config.get_string("database.host"), "prod-db");
    assert_eq!(config.get_string("database.url"), "prod-db");
}

#[test]
fn test_nested_includes_resolve_relative_to_including_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "conf/b.conf", "b = 2");
    write(dir.path(), "conf/a.conf", "a = 1\ninclude \"b.conf\"");
    write(dir.path(), "main.conf", "include \"conf/a.conf\"\nc = 3");

    let config = load_config(dir.path().join("main.conf")).unwrap();
    assert_eq!(config.get_i32("a"), 1);
    assert_eq!(config.get_i32("b"), 2);
    assert_eq!(config.get_i32("c"), 3);
}

#[test]
fn test_enclosing_keys_win_over_included_keys() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "d.conf",
        "port = 2\nhost = h\nnested { x = included, y = included }",
    );
    write(
        dir.path(),
        "main.conf",
        "port = 1\nnested { x = local }\ninclude \"d.conf\"",
    );

    let config = load_config(dir.path().join("main.conf")).unwrap();
    assert_eq!(config.get_i32("port"), 1);
    assert_eq!(config.get_string("host"), "h");
    assert_eq!(config.get_string("nested.x"), "local");
    assert_eq!(config.get_string("nested.y"), "included");
}

#[test]
fn test_missing_include_file_aborts_the_load() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "main.conf", "a = 1\ninclude \"absent.conf\"");

    let err = load_config(dir.path().join("main.conf")).unwrap_err();
    match err {
        HoconError::Parse(ParseError::Include { target, source, .. }) => {
            assert_eq!(target, "absent.conf");
            assert!(matches!(*source, HoconError::Io { .. }));
        }
        other => panic!("Expected Include error, got: {:?}", other),
    }
}

#[test]
fn test_include_cycle_between_files_is_bounded() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.conf", "include \"b.conf\"");
    write(dir.path(), "b.conf", "include \"a.conf\"");

    let handler = FileIncludeHandler::new(dir.path()).with_max_include_depth(8);
    let err = handler.load(&dir.path().join("a.conf")).unwrap_err();
    assert!(err.to_string().contains("maximum include depth 8"));
}

#[test]
fn test_include_depth_limit_matches_between_handlers() {
    let documents = [
        ("one.conf", "one = 1\ninclude \"two.conf\""),
        ("two.conf", "two = 2\ninclude \"three.conf\""),
        ("three.conf", "three = 3"),
    ];
    let dir = TempDir::new().unwrap();
    let mut map_handler = MapIncludeHandler::new();
    for (name, text) in documents {
        write(dir.path(), name, text);
        map_handler.insert(name.to_string(), text.to_string());
    }
    let main = "include \"one.conf\"";

    // three nested includes: one, two, three
    for (limit, allowed) in [(2, false), (3, true)] {
        let map_handler = map_handler.clone().with_max_include_depth(limit);
        let file_handler = FileIncludeHandler::new(dir.path()).with_max_include_depth(limit);

        let from_map = Config::parse_with_includes(main, &map_handler);
        let from_files = Config::parse_with_includes(main, &file_handler);
        assert_eq!(from_map.is_ok(), allowed, "map handler at limit {limit}");
        assert_eq!(from_files.is_ok(), allowed, "file handler at limit {limit}");
        if allowed {
            assert_eq!(from_map.unwrap().get_i32("three"), 3);
            assert_eq!(from_files.unwrap().get_i32("three"), 3);
        }
    }
}

#[test]
fn test_file_handler_as_include_callback() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "shared.conf", "timeout = 5s");

    let handler = FileIncludeHandler::new(dir.path());
    assert_eq!(handler.base_dir(), dir.path());
    let config = Config::parse_with_includes("http { include \"shared.conf\" }", &handler).unwrap();
    assert_eq!(config.get_string("http.timeout"), "5s");
}

#[test]
fn test_map_include_handler() {
    let mut handler = MapIncludeHandler::new();
    handler.insert(
        "base".to_string(),
        "level = 1\ninclude \"deeper\"\ntotal = ${depth}".to_string(),
    );
    handler.insert("deeper".to_string(), "depth = 2".to_string());

    let config = Config::parse_with_includes("outer { include \"base\" }", &handler).unwrap();
    assert_eq!(config.get_i32("outer.level"), 1);
    assert_eq!(config.get_i32("outer.depth"), 2);
    assert_eq!(config.get_i32("outer.total"), 2);
    assert_eq!(handler.documents().len(), 2);
}

#[test]
fn test_closure_include_handler() {
    let handler = |target: &str| parse_str(&format!("source = \"{target}\""));
    let config =
        Config::parse_with_includes("a { include \"one\" }\nb { include \"two\" }", &handler)
            .unwrap();
    assert_eq!(config.get_string("a.source"), "one");
    assert_eq!(config.get_string("b.source"), "two");
}

#[test]
fn test_forward_reference_into_included_content() {
    let mut handler = MapIncludeHandler::new();
    handler.insert("db".to_string(), "host = db.example.org".to_string());

    let config =
        Config::parse_with_includes("url = ${db.host}\ndb { include \"db\" }", &handler).unwrap();
    assert_eq!(config.get_string("url"), "db.example.org");
}
