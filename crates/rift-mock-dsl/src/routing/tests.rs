//! Tests for the routing module.
//!
//! This module covers:
//! - Registry resolution order and one-off consumption
//! - Composite tier priority
//! - Observer failure collection
//! - Recording and counting decorators

use super::*;
use crate::error::Failure;
use crate::predicate::RequestMatcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn observer() -> Arc<RoutingObserver> {
    Arc::new(RoutingObserver::new())
}

fn text(body: &str) -> MockResponse {
    MockResponse::new().body(body.to_string())
}

fn resolve_body(routing: &dyn Routing, request: &RecordedRequest) -> Option<String> {
    routing
        .resolve(request)
        .unwrap()
        .map(|resolved| resolved.response.body_text().into_owned())
}

#[test]
fn test_static_resolves_added_route() {
    let routing = StaticRouting::new(observer());
    let route = routing
        .get("feed", |r| r.path("/feed"), text("feed"))
        .unwrap();

    let request = RecordedRequest::get("/feed");
    assert_eq!(resolve_body(&routing, &request).as_deref(), Some("feed"));
    // Persistent routes survive resolution
    assert_eq!(resolve_body(&routing, &request).as_deref(), Some("feed"));

    assert!(routing.remove(route.as_ref()));
    assert_eq!(resolve_body(&routing, &request), None);
    assert!(!routing.remove(route.as_ref()));
}

#[test]
fn test_unmatched_request_yields_none() {
    let routing = StaticRouting::new(observer());
    routing
        .get("feed", |r| r.path("/feed"), text("feed"))
        .unwrap();
    assert_eq!(resolve_body(&routing, &RecordedRequest::post("/feed")), None);
}

#[test]
fn test_most_recent_route_wins() {
    let routing = StaticRouting::new(observer());
    routing
        .get("page 1", |r| r.path("/feed"), text("page_1"))
        .unwrap();
    routing
        .get("page 1 viewed", |r| r.path("/feed"), text("page_1_viewed"))
        .unwrap();

    assert_eq!(
        resolve_body(&routing, &RecordedRequest::get("/feed")).as_deref(),
        Some("page_1_viewed")
    );
}

#[test]
fn test_re_adding_route_moves_it_to_top() {
    let routing = StaticRouting::new(observer());
    let first = routing
        .get("first", |r| r.path("/feed"), text("first"))
        .unwrap();
    routing
        .get("second", |r| r.path("/feed"), text("second"))
        .unwrap();

    routing.route(Arc::clone(&first));
    assert_eq!(routing.len(), 2);
    assert_eq!(
        resolve_body(&routing, &RecordedRequest::get("/feed")).as_deref(),
        Some("first")
    );
}

#[test]
fn test_one_off_route_is_consumed() {
    let routing = OneOffRouting::new(observer());
    routing
        .get("once", |r| r.path("/feed"), text("once"))
        .unwrap();

    let request = RecordedRequest::get("/feed");
    assert_eq!(resolve_body(&routing, &request).as_deref(), Some("once"));
    assert_eq!(resolve_body(&routing, &request), None);
    assert!(routing.is_empty());
}

#[test]
fn test_one_off_non_matching_routes_remain() {
    let routing = OneOffRouting::new(observer());
    routing
        .get("feed", |r| r.path("/feed"), text("feed"))
        .unwrap();
    routing
        .get("offer", |r| r.path("/offer"), text("offer"))
        .unwrap();

    assert_eq!(
        resolve_body(&routing, &RecordedRequest::get("/feed")).as_deref(),
        Some("feed")
    );
    assert_eq!(routing.len(), 1);
    assert_eq!(
        resolve_body(&routing, &RecordedRequest::get("/offer")).as_deref(),
        Some("offer")
    );
}

#[test]
fn test_composite_priority() {
    let routing = CompositeRouting::new(observer());
    routing.stub(|stub| {
        stub.get("stub", |r| r.path("/feed"), text("stub")).unwrap();
    });
    routing
        .get("root", |r| r.path("/feed"), text("root"))
        .unwrap();
    routing.one_off(|once| {
        once.get("once", |r| r.path("/feed"), text("once")).unwrap();
    });

    let request = RecordedRequest::get("/feed");
    assert_eq!(resolve_body(&routing, &request).as_deref(), Some("once"));
    assert_eq!(resolve_body(&routing, &request).as_deref(), Some("root"));
    assert_eq!(resolve_body(&routing, &request).as_deref(), Some("root"));

    routing.clear();
    assert_eq!(resolve_body(&routing, &request).as_deref(), Some("stub"));

    routing.clear_all();
    assert_eq!(resolve_body(&routing, &request), None);
}

#[test]
fn test_composite_falls_through_to_stub() {
    let routing = CompositeRouting::new(observer());
    routing.stub(|stub| {
        stub.get("feed stub", |r| r.path("/feed"), text("stub"))
            .unwrap();
    });
    routing
        .get("offer", |r| r.path("/offer"), text("offer"))
        .unwrap();

    assert_eq!(
        resolve_body(&routing, &RecordedRequest::get("/feed")).as_deref(),
        Some("stub")
    );
    assert_eq!(routing.stubs().len(), 1);
    assert_eq!(routing.len(), 1);
}

#[test]
fn test_one_off_consumed_once_under_concurrency() {
    let routing = Arc::new(OneOffRouting::new(observer()));
    routing
        .get("once", |r| r.path("/feed"), text("once"))
        .unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let routing = Arc::clone(&routing);
            let hits = Arc::clone(&hits);
            thread::spawn(move || {
                if routing
                    .resolve(&RecordedRequest::get("/feed"))
                    .unwrap()
                    .is_some()
                {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dynamic_responder_sees_request() {
    let routing = StaticRouting::new(observer());
    routing
        .post(
            "echo",
            |r| r.path("/echo"),
            Responder::from_fn(|request| Ok(MockResponse::new().body(request.body.clone()))),
        )
        .unwrap();

    let request = RecordedRequest::post("/echo").with_body("ping");
    assert_eq!(resolve_body(&routing, &request).as_deref(), Some("ping"));
}

#[test]
fn test_responder_error_propagates() {
    let routing = StaticRouting::new(observer());
    routing
        .get(
            "broken",
            |r| r.path("/broken"),
            Responder::from_fn(|_| anyhow::bail!("asset missing")),
        )
        .unwrap();

    let error = routing
        .resolve(&RecordedRequest::get("/broken"))
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Route \"broken\" failed to produce a response: asset missing"
    );
}

#[test]
fn test_route_description() {
    let routing = StaticRouting::new(observer());
    let route = routing
        .get("feed", |r| r.path("/feed"), text("feed"))
        .unwrap();
    assert_eq!(
        route.describe(),
        r#"Route(description="feed", requestMatcher="method "GET" and path "/feed"")"#
    );
}

#[test]
fn test_route_with_custom_matcher() {
    let routing = StaticRouting::new(observer());
    routing.route_with("anything", RequestMatcher::any(), text("any"));
    assert_eq!(
        resolve_body(&routing, &RecordedRequest::new("PATCH", "/x")).as_deref(),
        Some("any")
    );
}

#[test]
fn test_predicate_errors_surface_at_declaration() {
    let routing = StaticRouting::new(observer());
    let result = routing.get("twice", |r| r.get().path("/feed"), text("feed"));
    assert!(result.is_err());
    assert!(routing.is_empty());
}

#[test]
fn test_observer_collects_failures_without_stopping() {
    let observer = observer();
    let calls = Arc::new(AtomicUsize::new(0));

    observer.on_shutdown(|| Err(Failure::Other(anyhow::anyhow!("first"))));
    observer.on_shutdown(|| panic!("second"));
    let counter = Arc::clone(&calls);
    observer.on_shutdown(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    observer.dispatch_on_shutdown();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let failures = observer.take_failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].to_string(), "first");
    assert_eq!(failures[1].to_string(), "Listener panicked: second");
    assert!(observer.take_failures().is_empty());
}

#[test]
fn test_observer_listener_may_register_listeners() {
    let observer = observer();
    let inner = Arc::clone(&observer);
    observer.on_shutdown(move || {
        inner.on_shutdown(|| Ok(()));
        Ok(())
    });

    observer.dispatch_on_shutdown();
    assert_eq!(observer.failure_count(), 0);
}

#[test]
fn test_removed_listener_is_not_notified() {
    let observer = observer();
    let id = observer.on_shutdown(|| Err(Failure::Other(anyhow::anyhow!("removed"))));
    assert!(observer.remove_on_shutdown_listener(id));
    assert!(!observer.remove_on_shutdown_listener(id));

    observer.dispatch_on_shutdown();
    assert_eq!(observer.failure_count(), 0);
}

#[test]
fn test_recording_filters_by_route_identity() {
    let observer = observer();
    let routing = StaticRouting::new(Arc::clone(&observer));
    let feed = routing
        .get("feed", |r| r.path_contains("feed"), text("feed"))
        .unwrap();
    routing
        .get("offer", |r| r.path("/offer"), text("offer"))
        .unwrap();

    let recording = feed.record();
    let counting = feed.count();

    for target in ["/feed?page=1", "/offer", "/feed?page=2"] {
        let resolved = routing
            .resolve(&RecordedRequest::get(target))
            .unwrap()
            .unwrap();
        observer.dispatch_on_resolve(&resolved);
    }

    let recorded: Vec<String> = recording
        .recorded_requests()
        .iter()
        .map(|r| r.request_line())
        .collect();
    assert_eq!(
        recorded,
        vec!["GET /feed?page=1 HTTP/1.1", "GET /feed?page=2 HTTP/1.1"]
    );
    assert_eq!(counting.count(), 2);
}

#[test]
fn test_decorator_shares_identity_with_inner_route() {
    let routing = StaticRouting::new(observer());
    let feed = routing
        .get("feed", |r| r.path("/feed"), text("feed"))
        .unwrap();
    let recording = feed.record();

    assert_eq!(recording.id(), feed.id());
    assert_eq!(recording.describe(), feed.describe());
    assert!(routing.remove(recording.as_ref()));
    assert!(routing.is_empty());
}

#[test]
fn test_route_on_resolve_sees_only_its_route() {
    let observer = observer();
    let routing = StaticRouting::new(Arc::clone(&observer));
    let feed = routing
        .get("feed", |r| r.path("/feed"), text("feed"))
        .unwrap();
    routing
        .get("offer", |r| r.path("/offer"), text("offer"))
        .unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    feed.on_resolve(move |resolved| {
        assert_eq!(resolved.route.description(), "feed");
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    for target in ["/feed", "/offer"] {
        let resolved = routing
            .resolve(&RecordedRequest::get(target))
            .unwrap()
            .unwrap();
        observer.dispatch_on_resolve(&resolved);
    }
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(observer.failure_count(), 0);
}

#[test]
fn test_route_on_resolve_ignores_routes_declared_after_consumption() {
    let observer = observer();
    let routing = OneOffRouting::new(Arc::clone(&observer));
    let seen = Arc::new(AtomicUsize::new(0));

    let first = routing
        .get("first", |r| r.path("/a"), text("a"))
        .unwrap();
    let counter = Arc::clone(&seen);
    first.on_resolve(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    drop(first);

    let resolved = routing
        .resolve(&RecordedRequest::get("/a"))
        .unwrap()
        .unwrap();
    observer.dispatch_on_resolve(&resolved);
    drop(resolved);
    assert!(routing.is_empty());

    for i in 0..50 {
        let path = format!("/b{i}");
        routing
            .get("later", |r| r.path(path.as_str()), text("b"))
            .unwrap();
        let resolved = routing
            .resolve(&RecordedRequest::get(&path))
            .unwrap()
            .unwrap();
        observer.dispatch_on_resolve(&resolved);
    }

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_route_ids_are_distinct() {
    let routing = StaticRouting::new(observer());
    let first = routing.get("a", |r| r.path("/a"), text("a")).unwrap();
    let second = routing.get("a", |r| r.path("/a"), text("a")).unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(routing.len(), 2);
}
