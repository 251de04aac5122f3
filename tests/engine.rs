//! Engine behavior against real template files.

use safran::{Engine, Freshness, Scope, Template, Value};
use std::fs;
use std::thread::sleep;
use std::time::Duration;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

/// Rewrite a template file with a sleep first, so the new mtime is
/// distinguishable on filesystems with coarse timestamps.
fn rewrite(dir: &TempDir, name: &str, content: &str) {
    sleep(Duration::from_millis(1100));
    write(dir, name, content);
}

fn root(dir: &TempDir) -> &str {
    dir.path().to_str().unwrap()
}

#[test]
fn preloads_named_templates() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.html", "A [x]");
    write(&dir, "b.html", "B");
    let engine = Engine::with_templates(root(&dir), ["a.html", "b.html"]).unwrap();
    assert_eq!(engine.len(), 2);
    assert!(engine.contains("a.html"));
    let scope: Scope = [("x", "1")].into_iter().collect();
    assert_eq!(engine.parse("a.html", &scope).unwrap(), "A 1");
}

#[test]
fn preloading_a_missing_template_fails() {
    let dir = TempDir::new().unwrap();
    assert!(Engine::with_templates(root(&dir), ["ghost.html"]).is_err());
}

#[test]
fn loads_on_first_access() {
    let dir = TempDir::new().unwrap();
    write(&dir, "lazy.html", "loaded");
    let engine = Engine::new(root(&dir));
    assert!(!engine.contains("lazy.html"));
    assert_eq!(engine.parse("lazy.html", &Scope::new()).unwrap(), "loaded");
    assert!(engine.contains("lazy.html"));
}

#[test]
fn recompiles_when_file_changes() {
    let dir = TempDir::new().unwrap();
    write(&dir, "page.html", "first");
    let engine = Engine::new(root(&dir));
    assert_eq!(engine.parse("page.html", &Scope::new()).unwrap(), "first");
    rewrite(&dir, "page.html", "second");
    assert_eq!(engine.parse("page.html", &Scope::new()).unwrap(), "second");
}

#[test]
fn serves_cached_copy_when_file_disappears() {
    let dir = TempDir::new().unwrap();
    write(&dir, "page.html", "kept");
    let engine = Engine::new(root(&dir));
    assert_eq!(engine.parse("page.html", &Scope::new()).unwrap(), "kept");
    fs::remove_file(dir.path().join("page.html")).unwrap();
    assert_eq!(engine.freshness("page.html"), Some(Freshness::Unreadable));
    assert_eq!(engine.parse("page.html", &Scope::new()).unwrap(), "kept");
}

#[test]
fn serves_cached_copy_when_reload_fails() {
    let dir = TempDir::new().unwrap();
    write(&dir, "page.html", "good");
    let engine = Engine::new(root(&dir));
    assert_eq!(engine.parse("page.html", &Scope::new()).unwrap(), "good");
    // keyword arguments are a compile error, so the reload fails
    rewrite(&dir, "page.html", "[a|f(b=1)]");
    assert_eq!(engine.parse("page.html", &Scope::new()).unwrap(), "good");
}

#[test]
fn freshness_reporting() {
    let dir = TempDir::new().unwrap();
    write(&dir, "t.html", "x");
    let engine = Engine::new(root(&dir));
    assert_eq!(engine.freshness("t.html"), None);
    engine.add_template("t.html").unwrap();
    assert_eq!(engine.freshness("t.html"), Some(Freshness::Fresh));
    rewrite(&dir, "t.html", "y");
    assert_eq!(engine.freshness("t.html"), Some(Freshness::Stale));
    fs::remove_file(dir.path().join("t.html")).unwrap();
    assert_eq!(engine.freshness("t.html"), Some(Freshness::Unreadable));
}

#[test]
fn add_template_replaces_cached_entry() {
    let dir = TempDir::new().unwrap();
    write(&dir, "t.html", "from disk");
    let engine = Engine::new(root(&dir));
    engine.insert("t.html", Template::new("from memory").unwrap());
    assert_eq!(engine.parse("t.html", &Scope::new()).unwrap(), "from memory");
    engine.add_template("t.html").unwrap();
    assert_eq!(engine.parse("t.html", &Scope::new()).unwrap(), "from disk");
}

#[test]
fn inline_reads_cache_while_direct_access_refreshes() {
    let dir = TempDir::new().unwrap();
    write(&dir, "inner.html", "old");
    write(&dir, "outer.html", "<{{ inline inner.html }}>");
    let engine = Engine::new(root(&dir));
    assert_eq!(engine.parse("outer.html", &Scope::new()).unwrap(), "<old>");

    rewrite(&dir, "inner.html", "new");
    // inlining serves whatever the cache holds
    assert_eq!(engine.parse("outer.html", &Scope::new()).unwrap(), "<old>");
    // fetching the inner template directly notices the change
    assert_eq!(engine.parse("inner.html", &Scope::new()).unwrap(), "new");
    // and the refreshed entry is what inlining sees from then on
    assert_eq!(engine.parse("outer.html", &Scope::new()).unwrap(), "<new>");
}

#[test]
fn inline_loads_uncached_templates_from_disk() {
    let dir = TempDir::new().unwrap();
    write(&dir, "partial.html", "[greeting]!");
    let engine = Engine::new(root(&dir));
    let scope: Scope = [("greeting", "hi")].into_iter().collect();
    assert_eq!(
        engine
            .parse_string("{{ inline partial.html }}", &scope)
            .unwrap(),
        "hi!"
    );
    assert!(engine.contains("partial.html"));
}

#[test]
fn parse_string_matches_stored_rendering() {
    let dir = TempDir::new().unwrap();
    let raw = "{{ for n in [nums] }}[n];{{ endfor }}";
    write(&dir, "loop.html", raw);
    let engine = Engine::new(root(&dir));
    let scope: Scope = [("nums", vec![1i64, 2, 3])].into_iter().collect();
    assert_eq!(
        engine.parse("loop.html", &scope).unwrap(),
        engine.parse_string(raw, &scope).unwrap()
    );
}

#[test]
fn engine_functions_reach_file_templates() {
    let dir = TempDir::new().unwrap();
    write(&dir, "page.html", "[text|strlimit(10)]");
    let mut engine = Engine::new(root(&dir));
    engine.register_function("strlimit", |value, args| {
        let limit = args.first().and_then(Value::as_int).unwrap_or(0).max(0) as usize;
        Ok(Value::Str(value.to_text().chars().take(limit).collect()))
    });
    let scope: Scope = [("text", "hello wide world")].into_iter().collect();
    assert_eq!(engine.parse("page.html", &scope).unwrap(), "hello wide");
}
