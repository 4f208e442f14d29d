//! JSON dataset loading.
//!
//! The on-disk layout is the flattened output of the external ingestion
//! pipeline:
//!
//! ```json
//! {
//!   "languages": [{ "id": "tgl", "family": "Austronesian", "macroarea": "Papunesia" }],
//!   "wals": {
//!     "parameters": [{ "name": "81A", "values": ["1", "2", "3"] }],
//!     "values": { "tgl": { "81A": "3" } }
//!   },
//!   "grambank": { "parameters": [], "values": {} },
//!   "potential_tables": [
//!     { "source": "wals", "target": "grambank",
//!       "entries": [{ "source": "1", "target": "GB020-1", "probability": 0.8 }] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::engine::errors::InferenceError;
use crate::typology::catalogue::{Language, Origin};
use crate::typology::corpus::{PotentialTable, TypologyCorpus, TypologyDataset};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusFile {
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub wals: Option<DatasetFile>,
    #[serde(default)]
    pub grambank: Option<DatasetFile>,
    #[serde(default)]
    pub potential_tables: Vec<PotentialTableFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetFile {
    pub parameters: Vec<ParameterFile>,
    /// language id → parameter name → value id
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterFile {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialTableFile {
    pub source: Origin,
    pub target: Origin,
    pub entries: Vec<TableEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    pub source: String,
    pub target: String,
    pub probability: f64,
}

impl DatasetFile {
    fn into_dataset(self, origin: Origin) -> Result<TypologyDataset, InferenceError> {
        let mut dataset = TypologyDataset::new(origin);
        for parameter in self.parameters {
            dataset.add_property(&parameter.name, parameter.values)?;
        }
        for (language, values) in self.values {
            for (parameter, value) in values {
                dataset.assign(&language, &parameter, &value).map_err(|err| {
                    InferenceError::Dataset(format!("{} language '{}': {}", origin, language, err))
                })?;
            }
        }
        Ok(dataset)
    }
}

impl CorpusFile {
    pub fn into_corpus(self) -> Result<TypologyCorpus, InferenceError> {
        let mut corpus = TypologyCorpus::new();
        for language in self.languages {
            corpus.add_language(language);
        }
        for (origin, file) in [(Origin::Wals, self.wals), (Origin::Grambank, self.grambank)] {
            if let Some(file) = file {
                corpus.add_dataset(file.into_dataset(origin)?)?;
            }
        }
        for table_file in self.potential_tables {
            let mut table = PotentialTable::new();
            for entry in table_file.entries {
                table.insert(entry.source, entry.target, entry.probability)?;
            }
            corpus.set_potential_table(table_file.source, table_file.target, table);
        }
        Ok(corpus)
    }
}

impl TypologyCorpus {
    pub fn from_json_str(source: &str) -> Result<Self, InferenceError> {
        let file: CorpusFile =
            serde_json::from_str(source).map_err(|e| InferenceError::Dataset(e.to_string()))?;
        file.into_corpus()
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, InferenceError> {
        let file: CorpusFile =
            serde_json::from_reader(reader).map_err(|e| InferenceError::Dataset(e.to_string()))?;
        file.into_corpus()
    }
}
