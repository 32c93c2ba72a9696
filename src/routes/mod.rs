//! Route Tree Module
//!
//! The panel's routes are assembled through `RouteGroup`, an explicit builder
//! that only exists during setup. A group is a path prefix plus an ordered
//! chain of gates; controllers receive a `&mut RouteGroup` and register their
//! routes on it. `RouteGroup::into_router` consumes the tree and freezes it
//! into an `axum::Router`, so nothing can be registered once requests are
//! being served.
//!
//! Gates attached to a group are applied when the group is mounted on its
//! parent, not when they are attached. Every route the group ever receives is
//! therefore covered, including routes added later by child controllers.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Request, State},
    handler::Handler,
    http::{Method, request::Parts},
    middleware::{self, Next},
    response::Response,
    routing::{MethodRouter, get, post},
};

use crate::error::RouteError;

/// Public login/logout routes on the root scope.
pub mod index;

/// The gated `/xpanel` scope.
pub mod panel;

/// Inbound management under `/xpanel/inbound`.
pub mod inbound;

/// Panel settings under `/xpanel/setting`.
pub mod setting;

pub use index::IndexController;
pub use inbound::InboundController;
pub use panel::PanelController;
pub use setting::SettingController;

/// Controller
///
/// A unit that, given a routing scope, registers its routes under it and may
/// construct child controllers of its own.
pub trait Controller<S>: Sized {
    fn new(group: &mut RouteGroup<S>) -> Result<Self, RouteError>;
}

/// Gate
///
/// One link in a group's middleware chain. A gate inspects the request head
/// and either lets it continue (`Ok`) or answers it itself (`Err`), in which
/// case no later gate and no handler runs. Gates may attach data to the
/// request extensions but never touch the route tree.
#[async_trait]
pub trait Gate<S>: Send + Sync {
    async fn check(&self, state: &S, parts: &mut Parts) -> Result<(), Response>;
}

#[derive(Clone)]
struct GateChain<S> {
    state: S,
    gates: Arc<[Arc<dyn Gate<S>>]>,
}

async fn run_gates<S>(State(chain): State<GateChain<S>>, request: Request, next: Next) -> Response
where
    S: Clone + Send + Sync + 'static,
{
    let (mut parts, body) = request.into_parts();

    for gate in chain.gates.iter() {
        if let Err(rejection) = gate.check(&chain.state, &mut parts).await {
            return rejection;
        }
    }

    next.run(Request::from_parts(parts, body)).await
}

#[derive(Default)]
struct PathEntry {
    methods: BTreeSet<String>,
    // Set when the path arrived through `mount` and belongs to a child group.
    mounted: bool,
}

/// RouteGroup
///
/// A prefix, its gate chain and the routes registered beneath it.
pub struct RouteGroup<S> {
    prefix: String,
    state: S,
    router: Router<S>,
    gates: Vec<Arc<dyn Gate<S>>>,
    paths: BTreeMap<String, PathEntry>,
    // Prefixes of child groups created here and not yet mounted.
    pending: BTreeSet<String>,
    // Groups created further down that their own parent never mounted.
    orphaned: BTreeSet<String>,
    // Every prefix ever reserved on this scope.
    groups: BTreeSet<String>,
}

impl<S> RouteGroup<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// The empty-prefix scope every tree starts from.
    pub fn root(state: S) -> Self {
        Self::with_prefix(String::new(), state)
    }

    fn with_prefix(prefix: String, state: S) -> Self {
        RouteGroup {
            prefix,
            state,
            router: Router::new(),
            gates: Vec::new(),
            paths: BTreeMap::new(),
            pending: BTreeSet::new(),
            orphaned: BTreeSet::new(),
            groups: BTreeSet::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Creates a child scope at `self.prefix + prefix`. The child starts
    /// without gates of its own; this scope's gates reach it on `mount`.
    pub fn group(&mut self, prefix: &str) -> Result<RouteGroup<S>, RouteError> {
        let full = self.join(prefix)?;

        if !self.groups.insert(full.clone()) {
            return Err(RouteError::DuplicateGroup(full));
        }
        self.pending.insert(full.clone());

        tracing::debug!(group = %full, "Route group created");
        Ok(Self::with_prefix(full, self.state.clone()))
    }

    /// Appends `gate` to this scope's chain.
    pub fn use_gate<G>(&mut self, gate: G) -> &mut Self
    where
        G: Gate<S> + 'static,
    {
        self.gates.push(Arc::new(gate));
        self
    }

    pub fn get<H, T>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(Method::GET, path, get(handler))
    }

    pub fn post<H, T>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(Method::POST, path, post(handler))
    }

    fn route(
        &mut self,
        method: Method,
        path: &str,
        method_router: MethodRouter<S>,
    ) -> Result<&mut Self, RouteError> {
        let full = self.join(path)?;
        let entry = self.paths.entry(full.clone()).or_default();

        if entry.mounted {
            return Err(RouteError::PathConflict(full));
        }
        if !entry.methods.insert(method.to_string()) {
            return Err(RouteError::DuplicateRoute {
                method: method.to_string(),
                path: full,
            });
        }

        tracing::debug!(%method, path = %full, "Route registered");
        self.router = mem::take(&mut self.router).route(&full, method_router);
        Ok(self)
    }

    /// Folds a child scope created by `group` back into this one, wrapping
    /// its routes in the child's gate chain.
    pub fn mount(&mut self, mut child: RouteGroup<S>) -> Result<&mut Self, RouteError> {
        if !self.pending.contains(&child.prefix) {
            return Err(RouteError::ForeignGroup(child.prefix.clone()));
        }

        if let Some(path) = child.paths.keys().find(|path| self.paths.contains_key(*path)) {
            return Err(RouteError::PathConflict(path.clone()));
        }

        self.pending.remove(&child.prefix);
        self.groups.append(&mut child.groups);

        // The child's unmounted groups can no longer be mounted anywhere.
        for group in &child.pending {
            tracing::warn!(
                group = %group,
                parent = %child.prefix,
                "Route group was created but never mounted"
            );
        }
        self.orphaned.append(&mut child.pending);
        self.orphaned.append(&mut child.orphaned);

        for (path, entry) in &child.paths {
            self.paths.insert(
                path.clone(),
                PathEntry {
                    methods: entry.methods.clone(),
                    mounted: true,
                },
            );
        }

        tracing::debug!(group = %child.prefix, gates = child.gates.len(), "Route group mounted");
        let routes = child.freeze();
        self.router = mem::take(&mut self.router).merge(routes);
        Ok(self)
    }

    /// Every registered route as `"METHOD /path"`, sorted by path.
    pub fn routes(&self) -> Vec<String> {
        self.paths
            .iter()
            .flat_map(|(path, entry)| {
                entry
                    .methods
                    .iter()
                    .map(move |method| format!("{} {}", method, path))
            })
            .collect()
    }

    /// Prefixes of groups created anywhere below this scope that were never
    /// mounted. Their routes are not part of the tree.
    pub fn unmounted_groups(&self) -> Vec<String> {
        self.pending.union(&self.orphaned).cloned().collect()
    }

    /// Ends the setup phase: applies this scope's gates and returns the
    /// immutable router.
    pub fn into_router(mut self) -> Router {
        for group in &self.pending {
            tracing::warn!(group = %group, "Route group was created but never mounted");
        }
        if !self.orphaned.is_empty() {
            tracing::warn!(groups = ?self.orphaned, "Route tree frozen with unmounted nested groups");
        }

        tracing::info!(routes = self.routes().len(), "Route tree frozen");
        let state = self.state.clone();
        self.freeze().with_state(state)
    }

    fn freeze(&mut self) -> Router<S> {
        let router = mem::take(&mut self.router);
        let gates = mem::take(&mut self.gates);

        // axum refuses a route layer on a router without routes.
        if gates.is_empty() || self.paths.is_empty() {
            return router;
        }

        let chain = GateChain {
            state: self.state.clone(),
            gates: gates.into(),
        };
        router.route_layer(middleware::from_fn_with_state(chain, run_gates::<S>))
    }

    fn join(&self, path: &str) -> Result<String, RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath(path.to_string()));
        }

        if self.prefix.is_empty() {
            Ok(path.to_string())
        } else if path == "/" {
            Ok(format!("{}/", self.prefix))
        } else {
            Ok(format!("{}{}", self.prefix, path))
        }
    }
}
