// Route Classification
// Ordered glob table mapping request paths to access classes

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::RoutesConfig;

/// Access class of a page route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Reachable with or without a session
    Public,
    /// Login and registration pages; a signed-in caller is sent home
    AuthOnly,
    /// Requires a valid session
    Protected,
}

/// Outcome of classifying a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Assets, framework internals and API paths bypass the guard entirely
    Excluded,
    Classified(RouteClass),
}

/// What the guard does with a classified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    PassThrough,
    RedirectHome,
    RedirectLogin,
}

/// The guard's state table.
pub fn decide(class: RouteClass, authenticated: bool) -> Decision {
    match (class, authenticated) {
        (RouteClass::Public, _) => Decision::PassThrough,
        (RouteClass::AuthOnly, true) => Decision::RedirectHome,
        (RouteClass::AuthOnly, false) => Decision::PassThrough,
        (RouteClass::Protected, true) => Decision::PassThrough,
        (RouteClass::Protected, false) => Decision::RedirectLogin,
    }
}

/// Ordered pattern table: the first matching rule wins, unmatched paths are public.
#[derive(Debug, Clone)]
pub struct RouteTable {
    patterns: Vec<String>,
    routes: Vec<Route>,
    set: GlobSet,
}

impl RouteTable {
    /// Build from `(pattern, route)` rules in priority order.
    pub fn new<I, S>(rules: I) -> Result<Self, globset::Error>
    where
        I: IntoIterator<Item = (S, Route)>,
        S: Into<String>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut patterns = Vec::new();
        let mut routes = Vec::new();

        for (pattern, route) in rules {
            let pattern = pattern.into();
            builder.add(GlobBuilder::new(&pattern).literal_separator(true).build()?);
            patterns.push(pattern);
            routes.push(route);
        }

        Ok(Self {
            patterns,
            routes,
            set: builder.build()?,
        })
    }

    /// Exclusions first, then auth-only pages, then protected namespaces.
    pub fn from_config(config: &RoutesConfig) -> Result<Self, globset::Error> {
        let excluded = config.excluded.iter().map(|p| (p.clone(), Route::Excluded));
        let auth_only = config
            .auth_only
            .iter()
            .map(|p| (p.clone(), Route::Classified(RouteClass::AuthOnly)));
        let protected = config
            .protected
            .iter()
            .map(|p| (p.clone(), Route::Classified(RouteClass::Protected)));

        Self::new(excluded.chain(auth_only).chain(protected))
    }

    /// Classify `path` as received and in normalized form, keeping the stricter
    /// outcome. The router matches the raw path, so normalization must never
    /// move a request into a looser class than its raw form gets.
    pub fn classify(&self, path: &str) -> Route {
        self.resolve(path).0
    }

    /// The pattern that decided `path`, if any. Used in guard diagnostics.
    pub fn matched_pattern(&self, path: &str) -> Option<&str> {
        self.resolve(path)
            .1
            .map(|index| self.patterns[index].as_str())
    }

    fn resolve(&self, path: &str) -> (Route, Option<usize>) {
        let raw = self.lookup(path);
        let normalized = self.lookup(&normalize_path(path));

        if strictness(normalized.0) > strictness(raw.0) {
            normalized
        } else {
            raw
        }
    }

    fn lookup(&self, path: &str) -> (Route, Option<usize>) {
        match self.set.matches(path).into_iter().min() {
            Some(index) => (self.routes[index], Some(index)),
            None => (Route::Classified(RouteClass::Public), None),
        }
    }
}

fn strictness(route: Route) -> u8 {
    match route {
        Route::Excluded => 0,
        Route::Classified(RouteClass::Public) => 1,
        Route::Classified(RouteClass::AuthOnly) => 2,
        Route::Classified(RouteClass::Protected) => 3,
    }
}

/// Canonical form of a request path used for classification.
///
/// Percent-escapes are decoded first so that encoded separators and dot
/// segments cannot sneak past a pattern, then empty and `.` segments are
/// dropped and `..` resolved without climbing above the root.
pub fn normalize_path(path: &str) -> String {
    let decoded = urlencoding::decode(path)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| path.to_string());

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    format!("/{}", segments.join("/"))
}
