mod normalizer;
mod parser;

use crate::pathways::domain::NewEncounter;
use chrono::NaiveDateTime;
use std::io::Read;
use std::path::Path;

use parser::RowProblem;

/// One parsed export row; `discharged_at` is `None` while the patient is still admitted.
#[derive(Debug, Clone)]
pub struct ImportedEncounter {
    pub line: u64,
    pub admission: NewEncounter,
    pub discharged_at: Option<NaiveDateTime>,
}

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read encounter export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid encounter CSV data: {}", err),
            ImportError::InvalidRow { line, reason } => {
                write!(f, "encounter export line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<RowProblem> for ImportError {
    fn from(problem: RowProblem) -> Self {
        match problem {
            RowProblem::Csv(err) => Self::Csv(err),
            RowProblem::Invalid { line, reason } => Self::InvalidRow { line, reason },
        }
    }
}

/// Reads encounter exports (`No RM, Nama Pasien, Jenis Clinical Pathway, ...`).
pub struct EncounterImporter;

impl EncounterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ImportedEncounter>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ImportedEncounter>, ImportError> {
        Ok(parser::parse_records(reader)?)
    }
}
