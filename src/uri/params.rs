//! Query-string modifiers: `groupBy`, `having`, `limit`, `distinct`, `expand`, `allowYield`.

use std::fmt;

pub const GROUP_BY: &str = "groupBy";
pub const HAVING: &str = "having";
pub const LIMIT: &str = "limit";
pub const DISTINCT: &str = "distinct";
pub const EXPAND: &str = "expand";
pub const ALLOW_YIELD: &str = "allowYield";

/// Ordered query pairs. Repeated keys are kept (`expand=a&expand=b`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Split `a=1&b=2`. Values are taken as written; callers pass already-decoded pairs via [`from_pairs`](Self::from_pairs).
    pub fn parse(query: &str) -> Self {
        let pairs = query
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|p| match p.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (p.to_string(), String::new()),
            })
            .collect();
        QueryParams { pairs }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        QueryParams {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn group_by(&self) -> Option<&str> {
        self.get(GROUP_BY)
    }

    pub fn having(&self) -> Option<&str> {
        self.get(HAVING)
    }

    pub fn limit(&self) -> Option<&str> {
        self.get(LIMIT)
    }

    /// Only the literal `"true"` enables DISTINCT.
    pub fn distinct(&self) -> bool {
        self.get(DISTINCT) == Some("true")
    }

    pub fn expand(&self) -> Vec<&str> {
        self.get_all(EXPAND)
            .into_iter()
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Yielding stays on unless explicitly `"false"`.
    pub fn allow_yield(&self) -> bool {
        self.get(ALLOW_YIELD) != Some("false")
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}
