//! Maps routes to files under the output directory and persists captured pages.

use crate::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File name for the root route and for nested-mode pages.
pub const INDEX_FILE: &str = "index.html";

/// Converts a non-root route into the name used for its file or directory:
/// the leading slash is dropped and remaining slashes become hyphens, so
/// `/blog/getting-started` becomes `blog-getting-started`.
pub fn safe_name(route: &str) -> String {
    let stripped = route.strip_prefix('/').unwrap_or(route);
    if stripped.is_empty() {
        return "root".to_string();
    }
    stripped.replace('/', "-")
}

/// Destination of `route` under `out_dir`. The root route always lands on
/// `out_dir/index.html`, whatever the naming mode.
pub fn route_output_path(out_dir: &Path, route: &str, flat: bool) -> PathBuf {
    if route == "/" {
        return out_dir.join(INDEX_FILE);
    }

    let name = safe_name(route);
    if flat {
        out_dir.join(format!("{name}.html"))
    } else {
        out_dir.join(name).join(INDEX_FILE)
    }
}

/// Groups of routes that map to the same destination file.
///
/// Hyphen-joining is lossy (`/a/b-c` and `/a-b/c` share a name); collisions
/// are reported, not resolved, and the later route overwrites the earlier one.
pub fn find_collisions(
    routes: &[String],
    out_dir: &Path,
    flat: bool,
) -> Vec<(PathBuf, Vec<String>)> {
    let mut by_path: HashMap<PathBuf, Vec<String>> = HashMap::new();
    let mut order = Vec::new();
    for route in routes {
        let path = route_output_path(out_dir, route, flat);
        let entry = by_path.entry(path.clone()).or_default();
        if entry.is_empty() {
            order.push(path);
        }
        entry.push(route.clone());
    }

    order
        .into_iter()
        .filter_map(|path| {
            let routes = by_path.remove(&path)?;
            (routes.len() > 1).then_some((path, routes))
        })
        .collect()
}

/// Writes captured documents according to the flat-or-nested naming policy.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    out_dir: PathBuf,
    flat: bool,
}

impl OutputWriter {
    pub fn new(out_dir: impl Into<PathBuf>, flat: bool) -> Self {
        Self {
            out_dir: out_dir.into(),
            flat,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn path_for(&self, route: &str) -> PathBuf {
        route_output_path(&self.out_dir, route, self.flat)
    }

    /// Creates the output directory (recursively). Called once before the route loop.
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.out_dir).await?;
        Ok(())
    }

    /// Persists `html` for `route` and returns the file written.
    pub async fn write(&self, route: &str, html: &str) -> Result<PathBuf> {
        let path = self.path_for(route);
        if let Some(parent) = path.parent() {
            if parent != self.out_dir {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&path, html.as_bytes()).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn root_route_maps_to_index_in_both_modes() {
        let out = Path::new("out");
        assert_eq!(route_output_path(out, "/", false), out.join("index.html"));
        assert_eq!(route_output_path(out, "/", true), out.join("index.html"));
    }

    #[test]
    fn nested_route_gets_its_own_directory() {
        let out = Path::new("out");
        assert_eq!(
            route_output_path(out, "/about", false),
            out.join("about").join("index.html")
        );
        assert_eq!(
            route_output_path(out, "/blog/getting-started", false),
            out.join("blog-getting-started").join("index.html")
        );
    }

    #[test]
    fn flat_route_becomes_html_file() {
        let out = Path::new("out");
        assert_eq!(
            route_output_path(out, "/blog/getting-started", true),
            out.join("blog-getting-started.html")
        );
    }

    #[test]
    fn safe_name_falls_back_to_root() {
        assert_eq!(safe_name("/"), "root");
        assert_eq!(safe_name(""), "root");
        assert_eq!(safe_name("/docs/api/v1"), "docs-api-v1");
    }

    #[test]
    fn collisions_are_reported_in_first_seen_order() {
        let routes = vec![
            "/blog/getting-started".to_string(),
            "/about".to_string(),
            "/blog-getting/started".to_string(),
        ];
        let collisions = find_collisions(&routes, Path::new("out"), true);
        assert_eq!(collisions.len(), 1);
        let (path, colliding) = &collisions[0];
        assert_eq!(path, &Path::new("out").join("blog-getting-started.html"));
        assert_eq!(
            colliding,
            &vec![
                "/blog/getting-started".to_string(),
                "/blog-getting/started".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn writes_nested_and_flat_pages() {
        let dir = TempDir::new().unwrap();
        let nested = OutputWriter::new(dir.path().join("nested"), false);
        nested.prepare().await.unwrap();
        let root = nested.write("/", "<html>home</html>").await.unwrap();
        let about = nested.write("/about", "<html>about</html>").await.unwrap();
        assert_eq!(std::fs::read_to_string(root).unwrap(), "<html>home</html>");
        assert_eq!(
            about,
            dir.path().join("nested").join("about").join("index.html")
        );

        let flat = OutputWriter::new(dir.path().join("flat"), true);
        flat.prepare().await.unwrap();
        let page = flat.write("/blog/getting-started", "<p>post</p>").await.unwrap();
        assert_eq!(page, dir.path().join("flat").join("blog-getting-started.html"));
        assert_eq!(std::fs::read_to_string(page).unwrap(), "<p>post</p>");
    }
}
