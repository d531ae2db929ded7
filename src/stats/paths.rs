use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub method: String,
    pub path: String,
}

impl Path {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedPaths(pub Vec<Path>);

impl ScannedPaths {
    pub fn new(paths: Vec<Path>) -> Self {
        Self(paths)
    }

    // Ordering is by path bytes first, method second, independent of
    // discovery order. Equal pairs are kept; deduplication is the
    // caller's concern.
    pub fn sort(&mut self) {
        self.0
            .sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.cmp(&b.method)));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Path> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(pairs: &[(&str, &str)]) -> ScannedPaths {
        ScannedPaths::new(
            pairs
                .iter()
                .map(|(method, path)| Path::new(*method, *path))
                .collect(),
        )
    }

    #[test]
    fn test_sort_by_path_then_method() {
        let mut scanned = paths(&[("GET", "/b"), ("POST", "/a"), ("GET", "/a")]);
        scanned.sort();
        assert_eq!(
            scanned,
            paths(&[("GET", "/a"), ("POST", "/a"), ("GET", "/b")])
        );
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut scanned = paths(&[("POST", "/z"), ("GET", "/z"), ("DELETE", "/a")]);
        scanned.sort();
        let once = scanned.clone();
        scanned.sort();
        assert_eq!(scanned, once);
    }

    #[test]
    fn test_sort_ignores_discovery_order() {
        let mut first = paths(&[("GET", "/a"), ("GET", "/b"), ("POST", "/a")]);
        let mut second = paths(&[("POST", "/a"), ("GET", "/a"), ("GET", "/b")]);
        first.sort();
        second.sort();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sort_keeps_duplicates() {
        let mut scanned = paths(&[("GET", "/a"), ("GET", "/a")]);
        scanned.sort();
        assert_eq!(scanned.len(), 2);
    }
}
