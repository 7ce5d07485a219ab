//! The in-memory route table.
//!
//! A concurrent map from URL path to a shared, immutable [`Route`]. All
//! routes are built up front from a directory walk; request handling only
//! ever reads. The dev refresher is the single writer after startup, and a
//! replacement swaps the `Arc` atomically, so readers holding the prior
//! route stay valid until they drop it.

use crate::compress::Levels;
use crate::route::{self, Route};
use crate::template::TemplateContext;
use crate::{debug, log};
use anyhow::{Result, bail};
use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::FxBuildHasher;
use std::path::Path;
use std::sync::Arc;

/// Concurrent URL path → route mapping.
pub struct RouteCache {
    map: DashMap<String, Arc<Route>, FxBuildHasher>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Walk `root`, build a route for every file, and register it.
    ///
    /// Builds fan out across the rayon pool; a file that cannot be read is
    /// logged and skipped. Only a missing or unreadable root is fatal.
    /// Returns the number of registered paths, aliases included.
    pub fn populate(
        &self,
        root: &Path,
        templates: &TemplateContext,
        levels: Levels,
    ) -> Result<usize> {
        if !root.is_dir() {
            bail!("served directory not found: {}", root.display());
        }

        let files: Vec<_> = jwalk::WalkDir::new(root)
            .skip_hidden(false)
            .into_iter()
            .filter_map(|entry| {
                let entry = entry
                    .map_err(|e| log!("error"; "walk error under {}: {e}", root.display()))
                    .ok()?;
                entry.file_type().is_file().then(|| entry.path())
            })
            .collect();

        let routes: Vec<_> = files
            .par_iter()
            .filter_map(|path| {
                let url_path = url_path_for(path, root)?;
                let mtime = path
                    .metadata()
                    .and_then(|m| m.modified())
                    .map_err(|e| log!("error"; "cannot stat {}: {e}", path.display()))
                    .ok()?;
                let bytes = std::fs::read(path)
                    .map_err(|e| log!("error"; "cannot read {}: {e}", path.display()))
                    .ok()?;
                let route = route::build(path, bytes, mtime, templates, levels);
                Some((url_path, Arc::new(route)))
            })
            .collect();

        for (url_path, route) in routes {
            self.register(url_path, route);
        }

        Ok(self.map.len())
    }

    /// Insert a route, adding the directory alias for index files.
    ///
    /// `<dir>/index.html` is additionally registered under `<dir>/`, which
    /// is `/` for the root index.
    pub fn register(&self, url_path: String, route: Arc<Route>) {
        if let Some(dir) = url_path.strip_suffix("index.html")
            && dir.ends_with('/')
        {
            debug!("routes"; "aliasing {dir} -> {url_path}");
            self.map.insert(dir.to_string(), route.clone());
        }
        debug!("routes"; "registered {url_path}");
        self.map.insert(url_path, route);
    }

    /// Replace (or add) a single entry. Concurrent readers keep whatever
    /// route they already resolved.
    pub fn replace(&self, url_path: &str, route: Arc<Route>) {
        self.map.insert(url_path.to_string(), route);
    }

    /// Look up the route for an exact URL path.
    pub fn lookup(&self, url_path: &str) -> Option<Arc<Route>> {
        self.map.get(url_path).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the URL path for a file: strip the served root, normalize
/// separators, ensure a leading slash.
fn url_path_for(path: &Path, root: &Path) -> Option<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| log!("error"; "{} escapes served root", path.display()))
        .ok()?;
    let mut url = String::with_capacity(relative.as_os_str().len() + 1);
    for component in relative.components() {
        url.push('/');
        url.push_str(&component.as_os_str().to_string_lossy());
    }
    (!url.is_empty()).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn populated(files: &[(&str, &str)]) -> (TempDir, RouteCache) {
        let dir = TempDir::new().unwrap();
        for (rel, body) in files {
            write(dir.path(), rel, body);
        }
        let cache = RouteCache::new();
        cache
            .populate(
                dir.path(),
                &TemplateContext::from_vars(Default::default()),
                Levels::default(),
            )
            .unwrap();
        (dir, cache)
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let cache = RouteCache::new();
        let result = cache.populate(
            Path::new("/no/such/dir"),
            &TemplateContext::from_vars(Default::default()),
            Levels::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_populate_registers_files() {
        let (_dir, cache) = populated(&[
            ("index.html", "<p>home</p>"),
            ("about.html", "<p>about</p>"),
            ("assets/app.js", "console.log(1);"),
        ]);
        assert!(cache.lookup("/index.html").is_some());
        assert!(cache.lookup("/about.html").is_some());
        assert!(cache.lookup("/assets/app.js").is_some());
        assert!(cache.lookup("/missing.html").is_none());
    }

    #[test]
    fn test_root_index_alias() {
        let (_dir, cache) = populated(&[("index.html", "<p>home</p>")]);
        let by_file = cache.lookup("/index.html").unwrap();
        let by_root = cache.lookup("/").unwrap();
        assert!(Arc::ptr_eq(&by_file, &by_root));
    }

    #[test]
    fn test_directory_index_alias() {
        let (_dir, cache) = populated(&[("docs/index.html", "<p>docs</p>")]);
        let by_file = cache.lookup("/docs/index.html").unwrap();
        let by_dir = cache.lookup("/docs/").unwrap();
        assert!(Arc::ptr_eq(&by_file, &by_dir));
        // No alias without the trailing slash; the dispatcher adds it
        assert!(cache.lookup("/docs").is_none());
    }

    #[test]
    fn test_non_index_gets_no_alias() {
        let (_dir, cache) = populated(&[("docs/page.html", "<p>p</p>")]);
        assert!(cache.lookup("/docs/").is_none());
        // A file merely ending in "index.html" is not an index file
        let (_dir2, cache2) = populated(&[("docs/no-index.html", "<p>p</p>")]);
        assert!(cache2.lookup("/docs/no-").is_none());
    }

    #[test]
    fn test_dotfiles_are_served() {
        let (_dir, cache) = populated(&[(".well-known/thing.txt", "ok")]);
        assert!(cache.lookup("/.well-known/thing.txt").is_some());
    }

    #[test]
    fn test_replace_swaps_route() {
        let (_dir, cache) = populated(&[("index.html", "<p>old</p>")]);
        let old = cache.lookup("/index.html").unwrap();

        let fresh = Arc::new(route::build(
            &old.source,
            b"<p>new</p>".to_vec(),
            old.mtime,
            &TemplateContext::from_vars(Default::default()),
            Levels::default(),
        ));
        cache.replace("/index.html", fresh.clone());

        let seen = cache.lookup("/index.html").unwrap();
        assert!(Arc::ptr_eq(&seen, &fresh));
        // The old reference stays readable
        assert_eq!(&*old.content.plain, b"<p>old</p>");
    }
}
