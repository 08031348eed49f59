//! Resource paths: `table[/id][/child[/id]]...` and the structural facts derived from them.

use crate::error::AppError;
use crate::uri::QueryParams;
use std::collections::BTreeMap;
use std::fmt;

/// One path segment: a table (collection) name or a numeric row id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Table(String),
    /// Kept in its original string form ("007" stays "007").
    Id(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if is_id(raw) {
            Segment::Id(raw.to_string())
        } else {
            Segment::Table(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Segment::Table(s) | Segment::Id(s) => s,
        }
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Segment::Id(_))
    }
}

fn is_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn pairs(segments: &[Segment]) -> Vec<(&str, &str)> {
    segments
        .windows(2)
        .filter_map(|w| match (&w[0], &w[1]) {
            (Segment::Table(t), Segment::Id(id)) => Some((t.as_str(), id.as_str())),
            _ => None,
        })
        .collect()
}

/// Nearest fully-bound ancestor scope of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentBinding {
    pub parent_column_name: String,
    pub parent_id: String,
}

/// Parsed path. Ids only ever follow a table segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourcePath {
    segments: Vec<Segment>,
}

impl ResourcePath {
    /// Parse a slash-separated path. Empty segments (leading, trailing, doubled slashes) are ignored.
    pub fn parse(path: &str) -> Result<Self, AppError> {
        let segments: Vec<Segment> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();
        Self::from_segments(segments)
    }

    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, AppError> {
        let mut prev_is_table = false;
        for seg in &segments {
            if seg.is_id() && !prev_is_table {
                return Err(AppError::MalformedPath(format!(
                    "id '{}' must follow a table segment",
                    seg.as_str()
                )));
            }
            prev_is_table = !seg.is_id();
        }
        Ok(ResourcePath { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the path ends in `table, id`, whatever precedes that pair.
    /// `/root/item/1` counts, so a root prefix without its own id does not change the answer.
    pub fn is_numbered_entry_within_collection(&self) -> bool {
        self.segments.last().map(Segment::is_id).unwrap_or(false)
    }

    /// Trailing id when the path addresses a single item.
    pub fn item_id(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Id(id)) => Some(id),
            _ => None,
        }
    }

    fn terminal_table_index(&self) -> Option<usize> {
        self.segments.iter().rposition(|s| !s.is_id())
    }

    /// Name of the terminal table: the collection addressed, or the table of the trailing `table, id` pair.
    pub fn item_dir_id(&self) -> Option<&str> {
        self.terminal_table_index().map(|i| self.segments[i].as_str())
    }

    /// Same as [`item_dir_id`](Self::item_dir_id) after removing a known `root` prefix (e.g. `"parent/child"`).
    pub fn item_dir_id_under(&self, root: &str) -> Option<&str> {
        let skip = self.root_len(root)?;
        let rel = self.segments[skip..].iter().rposition(|s| !s.is_id())?;
        Some(self.segments[skip + rel].as_str())
    }

    /// True when, after removing `root`, what remains addresses a single item.
    pub fn is_item_under(&self, root: &str) -> bool {
        match self.root_len(root) {
            Some(skip) => {
                let rest = &self.segments[skip..];
                rest.len() >= 2 && rest.last().map(Segment::is_id).unwrap_or(false)
            }
            None => false,
        }
    }

    /// Number of leading segments matched by `root`, if the path starts with it.
    fn root_len(&self, root: &str) -> Option<usize> {
        let root: Vec<&str> = root.split('/').filter(|s| !s.is_empty()).collect();
        if root.len() > self.segments.len() {
            return None;
        }
        let matches = root
            .iter()
            .zip(&self.segments)
            .all(|(r, s)| *r == s.as_str());
        matches.then_some(root.len())
    }

    /// Path with `root` removed, or None when the path does not start with it.
    pub fn strip_root(&self, root: &str) -> Option<ResourcePath> {
        let skip = self.root_len(root)?;
        ResourcePath::from_segments(self.segments[skip..].to_vec()).ok()
    }

    /// Every `(table, id)` pair in the path, including the terminal one.
    pub fn bindings(&self) -> Vec<(&str, &str)> {
        pairs(&self.segments)
    }

    /// Bound ancestors: each table/id pair that precedes the terminal table segment.
    pub fn map_ids(&self) -> BTreeMap<String, String> {
        self.ancestors()
            .into_iter()
            .map(|(t, id)| (t.to_string(), id.to_string()))
            .collect()
    }

    fn ancestors(&self) -> Vec<(&str, &str)> {
        match self.terminal_table_index() {
            Some(end) => pairs(&self.segments[..end]),
            None => Vec::new(),
        }
    }

    pub fn parent_binding(&self) -> Option<ParentBinding> {
        self.ancestors().last().map(|(t, id)| ParentBinding {
            parent_column_name: t.to_string(),
            parent_id: id.to_string(),
        })
    }

    pub fn has_parent(&self) -> bool {
        self.parent_binding().is_some()
    }

    /// Column name of the nearest bound ancestor, or "" when there is none.
    pub fn parent_column_name(&self) -> String {
        self.parent_binding()
            .map(|b| b.parent_column_name)
            .unwrap_or_default()
    }

    /// Id of the nearest bound ancestor, or "" when there is none.
    pub fn parent_id(&self) -> String {
        self.parent_binding().map(|b| b.parent_id).unwrap_or_default()
    }

    /// The path without a trailing id.
    pub fn collection(&self) -> ResourcePath {
        let mut segments = self.segments.clone();
        if segments.last().map(Segment::is_id).unwrap_or(false) {
            segments.pop();
        }
        ResourcePath { segments }
    }

    /// Replace the terminal table segment (used to point a view at its base table).
    pub fn with_terminal_table(&self, table: &str) -> ResourcePath {
        let mut segments = self.segments.clone();
        if let Some(i) = self.terminal_table_index() {
            segments[i] = Segment::Table(table.to_string());
        }
        ResourcePath { segments }
    }

    pub fn with_appended_id(&self, id: i64) -> ResourcePath {
        let mut segments = self.segments.clone();
        segments.push(Segment::Id(id.to_string()));
        ResourcePath { segments }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.segments {
            write!(f, "/{}", s.as_str())?;
        }
        Ok(())
    }
}

/// A full resource URI: optional `scheme://authority`, the path and its query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceUri {
    /// `scheme://authority`, without trailing slash.
    pub origin: Option<String>,
    pub path: ResourcePath,
    pub params: QueryParams,
}

impl ResourceUri {
    pub fn new(path: ResourcePath, params: QueryParams) -> Self {
        ResourceUri {
            origin: None,
            path,
            params,
        }
    }

    /// Parse `scheme://authority/path?query`, `/path?query` or a bare path.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let (before_query, query) = match raw.split_once('?') {
            Some((p, q)) => (p, q),
            None => (raw, ""),
        };
        let (origin, path) = match before_query.split_once("://") {
            Some((scheme, rest)) => {
                let (authority, path) = match rest.find('/') {
                    Some(i) => (&rest[..i], &rest[i..]),
                    None => (rest, ""),
                };
                (Some(format!("{}://{}", scheme, authority)), path)
            }
            None => (None, before_query),
        };
        Ok(ResourceUri {
            origin,
            path: ResourcePath::parse(path)?,
            params: QueryParams::parse(query),
        })
    }

    /// Same origin, different path, no query string.
    pub fn with_path(&self, path: ResourcePath) -> ResourceUri {
        ResourceUri {
            origin: self.origin.clone(),
            path,
            params: QueryParams::default(),
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(origin) = &self.origin {
            f.write_str(origin)?;
        }
        write!(f, "{}", self.path)?;
        if !self.params.is_empty() {
            write!(f, "?{}", self.params)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ResourcePath {
        ResourceUri::parse(s).unwrap().path
    }

    #[test]
    fn item_within_collection() {
        let p = path("content://test.com/item/1");
        assert!(p.is_numbered_entry_within_collection());
        assert_eq!(p.item_dir_id(), Some("item"));
        assert!(!path("content://test.com/item").is_numbered_entry_within_collection());
    }

    #[test]
    fn numbered_entry_after_unnumbered_table() {
        let p = path("/a/b/1");
        assert_eq!(p.len(), 3);
        assert!(p.is_numbered_entry_within_collection());
        assert_eq!(p.item_id(), Some("1"));
        assert_eq!(p.item_dir_id(), Some("b"));
        assert!(!path("/a/1/b").is_numbered_entry_within_collection());
        assert!(path("/a/1/b/2").is_numbered_entry_within_collection());
    }

    #[test]
    fn changing_root_of_query() {
        let p = path("content://test.com/root/item/1");
        assert!(p.is_item_under("root"));
        assert_eq!(p.item_dir_id_under("root"), Some("item"));

        let p = path("content://test.com/root/root2/item/1");
        assert!(p.is_item_under("root/root2"));
        assert_eq!(p.item_dir_id_under("root/root2"), Some("item"));
        assert!(!p.is_item_under("other"));
        assert_eq!(p.strip_root("root/root2").map(|r| r.to_string()).as_deref(), Some("/item/1"));
        assert_eq!(p.strip_root("other"), None);
    }

    #[test]
    fn map_ids_only_keeps_bound_ancestors() {
        assert!(path("content://test.com").map_ids().is_empty());
        assert!(path("content://test.com/parent").map_ids().is_empty());
        assert!(path("content://test.com/parent/1").map_ids().is_empty());

        let ids = path("content://test.com/parent/1/child").map_ids();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids.get("parent").map(String::as_str), Some("1"));

        let ids = path("content://test.com/parent/1/child/6");
        assert_eq!(ids.map_ids().len(), 1);
        assert_eq!(ids.bindings(), vec![("parent", "1"), ("child", "6")]);

        let ids = path("content://test.com/parent/0/child/6/subchild").map_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.get("parent").map(String::as_str), Some("0"));
        assert_eq!(ids.get("child").map(String::as_str), Some("6"));
    }

    #[test]
    fn parent_details() {
        let p = path("content://test.com");
        assert_eq!(p.parent_column_name(), "");
        assert_eq!(p.parent_id(), "");
        assert!(!p.has_parent());

        for (uri, col, id) in [
            ("content://test.com/parent/1/child", "parent", "1"),
            ("content://test.com/parent/1/child/6", "parent", "1"),
            ("content://test.com/parent/1/child/6/subchild", "child", "6"),
            ("content://test.com/parent/1/child/6/subchild/3", "child", "6"),
        ] {
            let p = path(uri);
            assert_eq!(p.parent_column_name(), col, "{}", uri);
            assert_eq!(p.parent_id(), id, "{}", uri);
            assert!(p.has_parent(), "{}", uri);
        }

        assert!(!path("/parent/1").has_parent());
        assert!(!path("/parent/child").has_parent());
    }

    #[test]
    fn ids_keep_original_form() {
        let p = path("/parent/007/child");
        assert_eq!(p.parent_id(), "007");
        assert_eq!(path("/t/0").item_id(), Some("0"));
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(matches!(ResourcePath::parse("/1/child"), Err(AppError::MalformedPath(_))));
        assert!(matches!(ResourcePath::parse("/parent/1/2"), Err(AppError::MalformedPath(_))));
    }

    #[test]
    fn uri_round_trips_origin_and_query() {
        let uri = ResourceUri::parse("content://test.com/table?limit=100&distinct=true").unwrap();
        assert_eq!(uri.origin.as_deref(), Some("content://test.com"));
        assert_eq!(uri.params.get("limit"), Some("100"));
        assert_eq!(uri.to_string(), "content://test.com/table?limit=100&distinct=true");

        let item = uri.with_path(uri.path.with_appended_id(2));
        assert_eq!(item.to_string(), "content://test.com/table/2");
    }
}
