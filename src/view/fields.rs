//! Map logical fields ("plant", "document", ...) to header columns.
//!
//! Export headers drift between runs: accents come and go, labels get
//! abbreviated or parenthesized. Each field therefore carries a list of tolerant
//! matchers and is bound to the first header label any of them accepts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::parse::Row;

pub const PLANT: &str = "plant";
pub const DOCUMENT: &str = "document";
pub const DESCRIPTION: &str = "description";

/// A case-insensitive test against a trimmed header label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Matcher {
    Prefix(String),
    Contains(String),
}

impl Matcher {
    fn is_match(&self, label: &str, fold: bool) -> bool {
        let (needle, label) = match self {
            Matcher::Prefix(n) | Matcher::Contains(n) => {
                if fold {
                    (fold_accents(n), fold_accents(label))
                } else {
                    (n.to_lowercase(), label.to_lowercase())
                }
            }
        };
        match self {
            Matcher::Prefix(_) => label.starts_with(&needle),
            Matcher::Contains(_) => label.contains(&needle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Written as `- prefix: planta` / `- contains: documento` in config files.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub matchers: Vec<Matcher>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, matchers: Vec<Matcher>) -> Self {
        Self {
            name: name.into(),
            matchers,
        }
    }
}

/// Fields of the service-order status export.
pub fn status_order_fields() -> Vec<FieldSpec> {
    use Matcher::*;
    vec![
        FieldSpec::new(PLANT, vec![Prefix("planta".into()), Contains("planta".into())]),
        FieldSpec::new(
            DOCUMENT,
            vec![Contains("documento".into()), Contains("n° doc".into())],
        ),
        FieldSpec::new(
            DESCRIPTION,
            vec![
                Contains("descripción o/s".into()),
                Prefix("descripción".into()),
                Prefix("description".into()),
            ],
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    Column(usize),
    /// No header label matched. Every lookup yields no data.
    Unresolved,
}

impl Binding {
    pub fn index(self) -> Option<usize> {
        match self {
            Binding::Column(i) => Some(i),
            Binding::Unresolved => None,
        }
    }
}

/// Logical field → column, derived once from a header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldBinding {
    fields: BTreeMap<String, Binding>,
}

impl FieldBinding {
    /// Bind each spec to a header column.
    ///
    /// Precedence is by pass, then by position: the whole header is first
    /// scanned with plain case-insensitive matching, and only when no label
    /// matches is it scanned again with accents folded. So an exact match late
    /// in the header beats an accent-folded match earlier in it. Within a pass
    /// the leftmost matching label wins.
    pub fn resolve(header: &[String], specs: &[FieldSpec]) -> Self {
        let labels: Vec<&str> = header.iter().map(|h| h.trim()).collect();
        let fields = specs
            .iter()
            .map(|spec| {
                let binding = find_column(&labels, spec, false)
                    .or_else(|| find_column(&labels, spec, true))
                    .map_or(Binding::Unresolved, Binding::Column);
                debug!(field = %spec.name, ?binding, "resolved field");
                (spec.name.clone(), binding)
            })
            .collect();
        Self { fields }
    }

    /// Binding for `name`; fields that were never specified are unresolved too.
    pub fn binding(&self, name: &str) -> Binding {
        self.fields.get(name).copied().unwrap_or(Binding::Unresolved)
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.binding(name).index()
    }

    pub fn value<'r>(&self, name: &str, row: &'r Row) -> Option<&'r str> {
        self.index(name).and_then(|i| row.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Binding)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Shorthand for [`FieldBinding::resolve`].
pub fn resolve(header: &[String], specs: &[FieldSpec]) -> FieldBinding {
    FieldBinding::resolve(header, specs)
}

fn find_column(labels: &[&str], spec: &FieldSpec, fold: bool) -> Option<usize> {
    labels
        .iter()
        .position(|label| spec.matchers.iter().any(|m| m.is_match(label, fold)))
}

/// Lower-case and drop combining marks after canonical decomposition.
fn fold_accents(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
