//! Route registry: ordered groups of (relative path, handler) entries.
//! Groups exist for readability; they carry no runtime semantics.

use axum::routing::MethodRouter;
use axum::Router;

/// Something attachable at a path: a composite router (nested) or a method router.
pub enum Handler<S = ()> {
    Router(Router<S>),
    Method(MethodRouter<S>),
}

impl<S> From<Router<S>> for Handler<S> {
    fn from(r: Router<S>) -> Self {
        Handler::Router(r)
    }
}

impl<S> From<MethodRouter<S>> for Handler<S> {
    fn from(m: MethodRouter<S>) -> Self {
        Handler::Method(m)
    }
}

pub struct RouteEntry<S = ()> {
    pub relative_path: String,
    /// `None` when the providing module had nothing to attach; rejected by the mounter.
    pub handler: Option<Handler<S>>,
}

impl<S> RouteEntry<S> {
    pub fn new(relative_path: impl Into<String>, handler: impl Into<Handler<S>>) -> Self {
        RouteEntry {
            relative_path: relative_path.into(),
            handler: Some(handler.into()),
        }
    }

    pub fn optional(relative_path: impl Into<String>, handler: Option<Handler<S>>) -> Self {
        RouteEntry {
            relative_path: relative_path.into(),
            handler,
        }
    }
}

pub struct RouteGroup<S = ()> {
    pub name: String,
    pub entries: Vec<RouteEntry<S>>,
}

impl<S> RouteGroup<S> {
    pub fn new(name: impl Into<String>) -> Self {
        RouteGroup {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, relative_path: impl Into<String>, handler: impl Into<Handler<S>>) -> Self {
        self.entries.push(RouteEntry::new(relative_path, handler));
        self
    }

    pub fn push(mut self, entry: RouteEntry<S>) -> Self {
        self.entries.push(entry);
        self
    }
}

pub struct RouteRegistry<S = ()> {
    pub groups: Vec<RouteGroup<S>>,
}

impl<S> Default for RouteRegistry<S> {
    fn default() -> Self {
        RouteRegistry { groups: Vec::new() }
    }
}

impl<S> RouteRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: RouteGroup<S>) -> Self {
        self.groups.push(group);
        self
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }
}
