//! # Typology Catalogue
//!
//! Read-only vocabulary shared by the engine and its providers:
//!
//! - **Origin**: which typological database (namespace) owns a property
//! - **ValueId**: opaque value identifier, unique within one namespace
//! - **Property**: a grammatical parameter with its admissible values
//! - **Language** / **ReferencePopulation**: the set of languages statistics are
//!   drawn from, optionally filtered genealogically or with held-out exclusions

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Typological database a property (and its value ids) belongs to.
///
/// The two namespaces never share identifiers, so every property resolves to
/// exactly one origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Origin {
    /// World Atlas of Language Structures features (numeric value ids).
    Wals,
    /// Grambank features (composite value ids such as `GB020-1`).
    Grambank,
}

impl Origin {
    /// All namespaces, in resolution order.
    pub const ALL: [Origin; 2] = [Origin::Wals, Origin::Grambank];

    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Wals => "wals",
            Origin::Grambank => "grambank",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of one admissible value of a property.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(Arc<str>);

impl ValueId {
    pub fn new(id: impl AsRef<str>) -> Self {
        ValueId(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ValueId {
    fn from(id: &str) -> Self {
        ValueId::new(id)
    }
}

impl From<String> for ValueId {
    fn from(id: String) -> Self {
        ValueId(Arc::from(id))
    }
}

impl std::borrow::Borrow<str> for ValueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ValueId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ValueId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ValueId::from(s))
    }
}

/// A grammatical property resolved from the catalogue.
///
/// Immutable once resolved. Cloning is cheap: name and value set are shared.
/// The order of `values` is the canonical index order used by belief vectors
/// and potential matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: Arc<str>,
    origin: Origin,
    values: Arc<[ValueId]>,
}

impl Property {
    pub fn new(name: impl AsRef<str>, origin: Origin, values: Vec<ValueId>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            origin,
            values: Arc::from(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn values(&self) -> &[ValueId] {
        &self.values
    }

    pub(crate) fn shared_values(&self) -> Arc<[ValueId]> {
        Arc::clone(&self.values)
    }

    /// Number of admissible values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of `value` in the canonical value order.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v.as_str() == value)
    }
}

/// Genealogical and areal metadata for one language of the reference corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Language {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub family: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub subfamily: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub genus: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub macroarea: Option<String>,
}

impl Language {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Genealogical/areal restriction of the reference population.
///
/// Every `Some` field must match; `None` fields are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LanguageFilter {
    pub family: Option<String>,
    pub subfamily: Option<String>,
    pub genus: Option<String>,
    pub macroarea: Option<String>,
}

impl LanguageFilter {
    pub fn matches(&self, language: &Language) -> bool {
        fn field_matches(want: &Option<String>, have: &Option<String>) -> bool {
            match want {
                None => true,
                Some(w) => have.as_deref() == Some(w.as_str()),
            }
        }
        field_matches(&self.family, &language.family)
            && field_matches(&self.subfamily, &language.subfamily)
            && field_matches(&self.genus, &language.genus)
            && field_matches(&self.macroarea, &language.macroarea)
    }
}

/// The languages whose statistics feed priors and potentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReferencePopulation {
    /// Every known language.
    #[default]
    All,
    /// Languages matching a genealogical/areal filter.
    Filtered(LanguageFilter),
    /// Every known language except the listed ids (held-out evaluation).
    Excluding(BTreeSet<String>),
}

impl ReferencePopulation {
    /// Full population minus a single held-out language.
    pub fn excluding(language_id: impl Into<String>) -> Self {
        ReferencePopulation::Excluding(BTreeSet::from([language_id.into()]))
    }

    pub fn includes(&self, language: &Language) -> bool {
        match self {
            ReferencePopulation::All => true,
            ReferencePopulation::Filtered(filter) => filter.matches(language),
            ReferencePopulation::Excluding(ids) => !ids.contains(&language.id),
        }
    }
}
