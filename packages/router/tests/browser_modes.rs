use std::rc::Rc;

use futures::executor::LocalPool;
use pretty_assertions::assert_eq;
use waymark_history::FakeWindow;
use waymark_router::prelude::*;

fn routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("/").view(View::new("Home")),
        RouteConfig::new("/foo").view(View::new("Foo")),
        RouteConfig::new("/bar").view(View::new("Bar")),
        RouteConfig::new("/users/:id").name("user"),
    ]
}

fn build(window: &Rc<FakeWindow>, pool: &LocalPool, mode: Mode, base: &str) -> Router {
    RouterConfig::default()
        .routes(routes())
        .mode(mode)
        .base(base)
        .window(window.clone())
        .spawner(pool.spawner())
        .build()
        .unwrap()
}

/// Deliver host events and run the navigations they started.
fn settle(window: &FakeWindow, pool: &mut LocalPool) {
    while window.dispatch() > 0 {
        pool.run_until_stalled();
    }
}

#[test]
fn hash_mode_writes_the_fragment() {
    let window = FakeWindow::new("/");
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::Hash, "/");

    assert_eq!(window.location(), "/#/");
    pool.run_until(router.start());
    settle(&window, &mut pool);
    assert_eq!(router.current_route().path(), "/");

    assert!(pool.run_until(router.push("/foo?q=1")).is_committed());
    assert_eq!(window.location(), "/#/foo?q=1");
    settle(&window, &mut pool);
    assert_eq!(router.current_route().full_path(), "/foo?q=1");

    assert!(pool.run_until(router.replace("/bar")).is_committed());
    assert_eq!(window.entries(), ["/#/", "/#/bar"]);

    assert_eq!(router.href("/foo"), "/#/foo");
}

#[test]
fn hash_mode_follows_back_button() {
    let window = FakeWindow::new("/#/foo");
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::Hash, "/");
    pool.run_until(router.start());
    assert_eq!(router.current_route().path(), "/foo");

    assert!(pool.run_until(router.push("/bar")).is_committed());
    settle(&window, &mut pool);

    assert!(matches!(
        pool.run_until(router.back()),
        NavigationOutcome::Delegated
    ));
    assert_eq!(router.current_route().path(), "/bar");

    settle(&window, &mut pool);
    assert_eq!(router.current_route().path(), "/foo");
    assert_eq!(window.location(), "/#/foo");
}

#[test]
fn hash_mode_corrects_missing_slash() {
    let window = FakeWindow::new("/app/#foo");
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::Hash, "/app");

    assert_eq!(window.location(), "/app/#/foo");
    pool.run_until(router.start());
    assert_eq!(router.current_route().path(), "/foo");
    assert_eq!(router.href("/bar"), "/app/#/bar");

    // a fragment edited by hand is corrected before the router acts on it
    window.set_hash("bar");
    settle(&window, &mut pool);
    assert_eq!(window.location(), "/app/#/bar");
    assert_eq!(router.current_route().path(), "/bar");
}

#[test]
fn aborted_push_keeps_the_fragment() {
    let window = FakeWindow::new("/#/foo");
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::Hash, "/");
    router.before_each(sync_guard(|to, _| (to.path() != "/bar").into()));
    pool.run_until(router.start());

    assert!(matches!(
        pool.run_until(router.push("/bar")),
        NavigationOutcome::Aborted
    ));
    assert_eq!(window.location(), "/#/foo");
    assert_eq!(router.current_route().path(), "/foo");
}

#[test]
fn history_mode_writes_the_path() {
    let window = FakeWindow::new("/app/users/1");
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::History, "/app/");
    assert_eq!(router.mode(), Mode::History);

    pool.run_until(router.start());
    let route = router.current_route();
    assert_eq!(route.name(), Some("user"));
    assert_eq!(route.param("id"), Some("1"));

    let user = Location::named("user").param("id", "2").hash("#bio");
    assert!(pool.run_until(router.push(user)).is_committed());
    assert_eq!(window.location(), "/app/users/2#bio");
    assert_eq!(window.entries().len(), 2);
    assert_eq!(router.href("/foo"), "/app/foo");

    assert!(matches!(
        pool.run_until(router.back()),
        NavigationOutcome::Delegated
    ));
    settle(&window, &mut pool);
    assert_eq!(router.current_route().path(), "/users/1");
    assert_eq!(window.entries().len(), 2);
}

#[test]
fn history_mode_restores_url_after_aborted_back() {
    let window = FakeWindow::new("/foo");
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::History, "/");
    pool.run_until(router.start());
    assert!(pool.run_until(router.push("/bar")).is_committed());

    router.before_each(sync_guard(|to, _| (to.path() != "/foo").into()));
    pool.run_until(router.back());
    settle(&window, &mut pool);

    assert_eq!(router.current_route().path(), "/bar");
    assert_eq!(window.location(), "/bar");
    assert_eq!(window.entries(), ["/foo", "/bar"]);
}

#[test]
fn history_mode_reloads_when_push_fails() {
    let window = FakeWindow::new("/foo");
    window.set_push_quota(Some(0));
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::History, "/");
    pool.run_until(router.start());

    assert!(pool.run_until(router.push("/bar")).is_committed());
    assert_eq!(window.page_loads(), ["/bar"]);
    assert_eq!(window.location(), "/bar");
}

#[test]
fn history_mode_falls_back_to_hash() {
    let window = FakeWindow::new("/foo?q=1");
    window.set_supports_history(false);
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::History, "/");

    assert_eq!(router.mode(), Mode::Hash);
    assert_eq!(window.page_loads(), ["/#/foo?q=1"]);

    pool.run_until(router.start());
    assert_eq!(router.current_route().full_path(), "/foo?q=1");

    assert!(pool.run_until(router.push("/bar")).is_committed());
    assert_eq!(window.location(), "/#/bar");
}

#[test]
fn superseded_host_navigation_does_not_commit() {
    let window = FakeWindow::new("/#/foo");
    let mut pool = LocalPool::new();
    let router = build(&window, &pool, Mode::Hash, "/");
    pool.run_until(router.start());

    assert!(pool.run_until(router.push("/bar")).is_committed());
    settle(&window, &mut pool);

    // the host reports the back step, but the app navigates before it runs
    pool.run_until(router.back());
    window.dispatch();
    assert!(pool.run_until(router.push("/users/5")).is_committed());
    pool.run_until_stalled();
    settle(&window, &mut pool);

    assert_eq!(router.current_route().path(), "/users/5");
    assert_eq!(window.location(), "/#/users/5");
}
