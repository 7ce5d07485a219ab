//! Dev-mode route refresh.
//!
//! With `--dev` enabled, every lookup re-stats the backing file and
//! rebuilds the route when the file changed on disk. Production mode
//! never reaches this module. Refresh failures are deliberately quiet:
//! a stat or read error keeps the stale route serving.

use super::ServerState;
use crate::route::{self, Route};
use crate::{debug, log};
use std::fs;
use std::sync::Arc;

/// Return `route`, or a freshly rebuilt replacement when the backing file
/// is newer than the route's recorded mtime.
///
/// The cache entry under `key` is swapped on success; concurrent readers
/// of the prior route are unaffected.
pub fn refresh_if_modified(state: &ServerState, key: &str, route: Arc<Route>) -> Arc<Route> {
    let mtime = match fs::metadata(&route.source).and_then(|m| m.modified()) {
        Ok(mtime) => mtime,
        Err(e) => {
            log!("error"; "cannot stat {}: {e}; serving cached route", route.source.display());
            return route;
        }
    };

    if mtime <= route.mtime {
        return route;
    }

    match fs::read(&route.source) {
        Ok(bytes) => {
            let fresh = Arc::new(route::build(
                &route.source,
                bytes,
                mtime,
                &state.templates,
                state.config.levels,
            ));
            state.cache.replace(key, fresh.clone());
            debug!("serve"; "reloaded {key}");
            fresh
        }
        Err(e) => {
            log!("error"; "cannot read {}: {e}; serving cached route", route.source.display());
            route
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServeConfig;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn state() -> (TempDir, ServerState) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<p>v1</p>").unwrap();
        let mut config = ServeConfig::for_tests(dir.path());
        config.dev = true;
        (dir, ServerState::new(config).unwrap())
    }

    /// Bump a file's mtime well past the cached route's.
    fn touch_future(path: &std::path::Path) {
        let future = SystemTime::now() + Duration::from_secs(5);
        let file = fs::File::options().append(true).open(path).unwrap();
        file.set_modified(future).unwrap();
    }

    #[test]
    fn test_unmodified_file_keeps_route() {
        let (_dir, state) = state();
        let route = state.cache.lookup("/index.html").unwrap();
        let same = refresh_if_modified(&state, "/index.html", route.clone());
        assert!(Arc::ptr_eq(&route, &same));
    }

    #[test]
    fn test_modified_file_rebuilds_route() {
        let (dir, state) = state();
        let stale = state.cache.lookup("/index.html").unwrap();

        let path = dir.path().join("index.html");
        fs::write(&path, "<p>v2</p>").unwrap();
        touch_future(&path);

        let fresh = refresh_if_modified(&state, "/index.html", stale.clone());
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert_eq!(&*fresh.content.plain, b"<p>v2</p>");
        assert_ne!(fresh.headers.etag, stale.headers.etag);
        assert_ne!(fresh.headers.last_modified, stale.headers.last_modified);

        // The cache now hands out the fresh route
        let seen = state.cache.lookup("/index.html").unwrap();
        assert!(Arc::ptr_eq(&seen, &fresh));
        // The stale reference is still intact for readers that hold it
        assert_eq!(&*stale.content.plain, b"<p>v1</p>");
    }

    #[test]
    fn test_deleted_file_keeps_stale_route() {
        let (dir, state) = state();
        let route = state.cache.lookup("/index.html").unwrap();

        fs::remove_file(dir.path().join("index.html")).unwrap();

        let same = refresh_if_modified(&state, "/index.html", route.clone());
        assert!(Arc::ptr_eq(&route, &same));
        assert_eq!(&*same.content.plain, b"<p>v1</p>");
    }
}
