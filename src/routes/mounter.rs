//! Route mounter: attaches every registry entry under a prefix, fail-fast.
//!
//! Any structural defect aborts the whole mount with a [`RouteError`]; there is no partial result.
//! Paths are compared by shape, so `/listings/:id` and `/listings/:slug` are the same route, and a
//! nested router owns every path below its mount point.

use super::registry::{Handler, RouteRegistry};
use crate::error::RouteError;
use axum::Router;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Absolute paths mounted, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountResult {
    pub paths: Vec<String>,
}

struct Mounted<S> {
    server: Router<S>,
    /// Route shapes mounted so far.
    seen: HashSet<String>,
    /// (shape, absolute path) of every mounted entry; `true` for nested routers.
    mounted: Vec<(String, String, bool)>,
    paths: Vec<String>,
}

fn relative_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(/|(/[A-Za-z0-9._~:*{}\-]+)+)$").expect("constant route path pattern")
    })
}

/// `prefix` without its trailing `/`, followed by `relative`. A relative `/` maps to the prefix.
pub fn absolute_path(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match (prefix.is_empty(), relative) {
        (true, r) => r.to_string(),
        (false, "/") => prefix.to_string(),
        (false, r) => format!("{}{}", prefix, r),
    }
}

/// `path` with every parameter segment reduced to its kind: `:id` and `:slug` both become `:`.
fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.chars().next() {
            Some(':') => ":",
            Some('*') => "*",
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `shape` lies strictly below the router mounted at `nested`.
fn is_below(shape: &str, nested: &str) -> bool {
    if nested == "/" {
        return shape != "/";
    }
    shape
        .strip_prefix(nested)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn has_wildcard(path: &str) -> bool {
    path.split('/').any(|segment| segment.contains('*'))
}

fn attach<S>(server: Router<S>, path: &str, handler: Handler<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    match handler {
        Handler::Method(m) => server.route(path, m),
        Handler::Router(r) if path == "/" => server.merge(r),
        Handler::Router(r) => server.nest(path, r),
    }
}

/// Mount every entry of `registry` onto `server` under `prefix`.
pub fn mount<S>(
    server: Router<S>,
    registry: RouteRegistry<S>,
    prefix: &str,
) -> Result<(Router<S>, MountResult), RouteError>
where
    S: Clone + Send + Sync + 'static,
{
    if !prefix.is_empty() && !prefix.starts_with('/') {
        return Err(RouteError::InvalidPrefix(prefix.to_string()));
    }

    let init = Mounted {
        server,
        seen: HashSet::new(),
        mounted: Vec::new(),
        paths: Vec::new(),
    };
    let mounted = registry.groups.into_iter().try_fold(init, |acc, group| {
        let group_name = group.name;
        group.entries.into_iter().try_fold(acc, |mut acc, entry| {
            let Some(handler) = entry.handler else {
                return Err(RouteError::InvalidHandler {
                    group: group_name.clone(),
                    path: entry.relative_path,
                });
            };
            if !relative_path_re().is_match(&entry.relative_path) {
                return Err(RouteError::InvalidPath {
                    group: group_name.clone(),
                    path: entry.relative_path,
                });
            }
            let nests = matches!(handler, Handler::Router(_));
            if nests && has_wildcard(&entry.relative_path) {
                return Err(RouteError::InvalidPath {
                    group: group_name.clone(),
                    path: entry.relative_path,
                });
            }
            let absolute = absolute_path(prefix, &entry.relative_path);
            let shape = route_shape(&absolute);
            if !acc.seen.insert(shape.clone()) {
                return Err(RouteError::DuplicateRoute { path: absolute });
            }
            let overlap = acc.mounted.iter().find(|(other, _, other_nests)| {
                (*other_nests && is_below(&shape, other)) || (nests && is_below(other, &shape))
            });
            if let Some((_, other, other_nests)) = overlap {
                let (path, nested) = if *other_nests {
                    (absolute, other.clone())
                } else {
                    (other.clone(), absolute)
                };
                return Err(RouteError::OverlappingRoute { path, nested });
            }
            tracing::debug!(group = %group_name, path = %absolute, "mount");
            acc.server = attach(acc.server, &absolute, handler);
            acc.mounted.push((shape, absolute.clone(), nests));
            acc.paths.push(absolute);
            Ok(acc)
        })
    })?;

    tracing::info!(routes = mounted.paths.len(), prefix = %prefix, "routes mounted");
    Ok((
        mounted.server,
        MountResult {
            paths: mounted.paths,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::registry::{RouteEntry, RouteGroup};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    fn mount_err(registry: RouteRegistry, prefix: &str) -> RouteError {
        match mount(Router::new(), registry, prefix) {
            Ok(_) => panic!("mount should fail"),
            Err(e) => e,
        }
    }

    fn listings_router() -> Router {
        Router::new()
            .route("/", get(|| async { "all listings" }))
            .route("/:id", get(|| async { "one listing" }))
    }

    #[test]
    fn absolute_path_joins_prefix() {
        assert_eq!(absolute_path("/api/v1", "/listings"), "/api/v1/listings");
        assert_eq!(absolute_path("/api/v1/", "/listings"), "/api/v1/listings");
        assert_eq!(absolute_path("/api/v1", "/"), "/api/v1");
        assert_eq!(absolute_path("", "/listings"), "/listings");
        assert_eq!(absolute_path("/", "/"), "/");
    }

    #[test]
    fn mounts_all_entries_in_order() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("inventory").entry("/listings", listings_router()))
            .group(
                RouteGroup::new("content")
                    .entry("/blogs", get(|| async { "blogs" }))
                    .entry("/blog-categories", get(|| async { "categories" })),
            );
        let (_, result) = mount(Router::<()>::new(), registry, "/api/v1").expect("mount");
        assert_eq!(
            result.paths,
            vec!["/api/v1/listings", "/api/v1/blogs", "/api/v1/blog-categories"]
        );
    }

    #[test]
    fn duplicate_across_groups_is_fatal() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("inventory").entry("/listings", listings_router()))
            .group(RouteGroup::new("analytics").entry("/listings", get(|| async { "dup" })));
        let err = mount_err(registry, "/api/v1");
        assert_eq!(
            err,
            RouteError::DuplicateRoute {
                path: "/api/v1/listings".into()
            }
        );
    }

    #[test]
    fn trailing_slash_prefix_still_collides() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("a").entry("/", get(|| async { "root" })))
            .group(RouteGroup::new("b").entry("/", get(|| async { "again" })));
        let err = mount_err(registry, "/api/v1/");
        assert_eq!(err, RouteError::DuplicateRoute { path: "/api/v1".into() });
    }

    #[test]
    fn missing_handler_is_fatal_and_named() {
        let registry = RouteRegistry::new().group(
            RouteGroup::new("chat")
                .entry("/chat-flows", get(|| async { "flows" }))
                .push(RouteEntry::optional("/chat-sessions", None)),
        );
        let err = mount_err(registry, "/api/v1");
        assert_eq!(
            err,
            RouteError::InvalidHandler {
                group: "chat".into(),
                path: "/chat-sessions".into()
            }
        );
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for bad in ["", "listings", "/listings/", "//listings", "/has space"] {
            let registry = RouteRegistry::new()
                .group(RouteGroup::new("inventory").entry(bad, get(|| async { "x" })));
            let err = mount_err(registry, "/api/v1");
            assert!(
                matches!(err, RouteError::InvalidPath { ref path, .. } if path == bad),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn route_shape_ignores_parameter_names() {
        assert_eq!(route_shape("/api/v1/listings/:id"), "/api/v1/listings/:");
        assert_eq!(route_shape("/api/v1/listings/:slug/images"), "/api/v1/listings/:/images");
        assert_eq!(route_shape("/files/*rest"), "/files/*");
        assert_eq!(route_shape("/"), "/");
    }

    #[test]
    fn parameter_name_variants_are_duplicates() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("inventory").entry("/listings/:id", get(|| async { "by id" })))
            .group(RouteGroup::new("content").entry("/listings/:slug", get(|| async { "by slug" })));
        let err = mount_err(registry, "/api/v1");
        assert_eq!(
            err,
            RouteError::DuplicateRoute {
                path: "/api/v1/listings/:slug".into()
            }
        );
    }

    #[test]
    fn method_below_nested_router_overlaps() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("inventory").entry("/listings", listings_router()))
            .group(RouteGroup::new("engagement").entry("/listings/:id", get(|| async { "shadow" })));
        let err = mount_err(registry, "/api/v1");
        assert_eq!(
            err,
            RouteError::OverlappingRoute {
                path: "/api/v1/listings/:id".into(),
                nested: "/api/v1/listings".into()
            }
        );
    }

    #[test]
    fn nested_router_over_existing_method_overlaps() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("engagement").entry("/listings/:id/favorite", get(|| async { "fav" })))
            .group(RouteGroup::new("inventory").entry("/listings", listings_router()));
        let err = mount_err(registry, "/api/v1");
        assert_eq!(
            err,
            RouteError::OverlappingRoute {
                path: "/api/v1/listings/:id/favorite".into(),
                nested: "/api/v1/listings".into()
            }
        );
    }

    #[test]
    fn siblings_sharing_a_name_prefix_do_not_overlap() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("inventory").entry("/listings", listings_router()))
            .group(RouteGroup::new("media").entry("/listing-images", listings_router()))
            .group(RouteGroup::new("analytics").entry("/listings-report", get(|| async { "r" })));
        let (_, result) = mount(Router::<()>::new(), registry, "/api/v1").expect("mount");
        assert_eq!(result.paths.len(), 3);
    }

    #[test]
    fn nested_router_path_cannot_hold_wildcard() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("media").entry("/files/*rest", listings_router()));
        let err = mount_err(registry, "/api/v1");
        assert_eq!(
            err,
            RouteError::InvalidPath {
                group: "media".into(),
                path: "/files/*rest".into()
            }
        );
    }

    #[test]
    fn method_route_may_hold_wildcard() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("media").entry("/files/*rest", get(|| async { "file" })));
        let (_, result) = mount(Router::<()>::new(), registry, "/api/v1").expect("mount");
        assert_eq!(result.paths, vec!["/api/v1/files/*rest"]);
    }

    #[test]
    fn relative_prefix_is_rejected() {
        let err = mount_err(RouteRegistry::new(), "api/v1");
        assert_eq!(err, RouteError::InvalidPrefix("api/v1".into()));
    }

    #[tokio::test]
    async fn mounted_routes_serve_requests() {
        let registry = RouteRegistry::new()
            .group(RouteGroup::new("inventory").entry("/listings", listings_router()))
            .group(RouteGroup::new("content").entry("/blogs", get(|| async { "blogs" })));
        let (app, _) = mount(Router::<()>::new(), registry, "/api/v1").expect("mount");

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/api/v1/listings/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"one listing");

        let resp = app
            .oneshot(Request::builder().uri("/api/v1/blogs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
