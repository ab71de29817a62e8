use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::template::ChecklistCategory;

/// Clinical pathway (diagnosis) an encounter is treated under.
///
/// Labels outside the modeled set are carried as `Unrecognized` so that
/// upstream data never fails classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PathwayType {
    SectioCaesaria,
    Pneumonia,
    StrokeHemoragik,
    StrokeNonHemoragik,
    DengueFever,
    Unrecognized(String),
}

impl PathwayType {
    pub fn ordered() -> [Self; 5] {
        [
            Self::SectioCaesaria,
            Self::Pneumonia,
            Self::StrokeHemoragik,
            Self::StrokeNonHemoragik,
            Self::DengueFever,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            Self::SectioCaesaria => "Sectio Caesaria",
            Self::Pneumonia => "Pneumonia",
            Self::StrokeHemoragik => "Stroke Hemoragik",
            Self::StrokeNonHemoragik => "Stroke Non Hemoragik",
            Self::DengueFever => "Dengue Fever",
            Self::Unrecognized(label) => label,
        }
    }

    /// Case-sensitive lookup against the modeled labels.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Sectio Caesaria" => Self::SectioCaesaria,
            "Pneumonia" => Self::Pneumonia,
            "Stroke Hemoragik" => Self::StrokeHemoragik,
            "Stroke Non Hemoragik" => Self::StrokeNonHemoragik,
            "Dengue Fever" => Self::DengueFever,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for PathwayType {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<PathwayType> for String {
    fn from(value: PathwayType) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for PathwayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncounterId(pub String);

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Admission details captured when a patient enters a pathway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEncounter {
    pub patient_name: String,
    pub record_number: String,
    pub pathway: PathwayType,
    pub admitted_at: NaiveDateTime,
    #[serde(default)]
    pub attending_physician: Option<String>,
    #[serde(default)]
    pub verifier: Option<String>,
}

/// One hospital admission under a single clinical pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub patient_name: String,
    pub record_number: String,
    pub pathway: PathwayType,
    pub admitted_at: NaiveDateTime,
    pub discharged_at: Option<NaiveDateTime>,
    pub length_of_stay: Option<u32>,
    pub attending_physician: Option<String>,
    pub verifier: Option<String>,
    #[serde(default)]
    pub finalized: bool,
}

impl Encounter {
    pub fn admit(id: EncounterId, admission: NewEncounter) -> Result<Self, EncounterError> {
        if admission.patient_name.trim().is_empty() {
            return Err(EncounterError::MissingField("patient_name"));
        }
        if admission.record_number.trim().is_empty() {
            return Err(EncounterError::MissingField("record_number"));
        }

        Ok(Self {
            id,
            patient_name: admission.patient_name,
            record_number: admission.record_number,
            pathway: admission.pathway,
            admitted_at: admission.admitted_at,
            discharged_at: None,
            length_of_stay: None,
            attending_physician: admission.attending_physician,
            verifier: admission.verifier,
            finalized: false,
        })
    }

    pub fn admission_date(&self) -> NaiveDate {
        self.admitted_at.date()
    }

    pub fn discharge(&mut self, discharged_at: NaiveDateTime) -> Result<(), EncounterError> {
        self.ensure_mutable()?;
        let los = length_of_stay_days(self.admitted_at, discharged_at).ok_or(
            EncounterError::DischargeBeforeAdmission {
                admitted_at: self.admitted_at,
                discharged_at,
            },
        )?;

        self.discharged_at = Some(discharged_at);
        self.length_of_stay = Some(los);
        Ok(())
    }

    pub fn ensure_mutable(&self) -> Result<(), EncounterError> {
        if self.finalized {
            Err(EncounterError::Finalized(self.id.clone()))
        } else {
            Ok(())
        }
    }
}

/// Whole days between admission and discharge, rounded up.
///
/// Returns `None` when the discharge precedes the admission.
pub fn length_of_stay_days(admitted_at: NaiveDateTime, discharged_at: NaiveDateTime) -> Option<u32> {
    const SECONDS_PER_DAY: i64 = 86_400;

    let seconds = (discharged_at - admitted_at).num_seconds();
    if seconds < 0 {
        return None;
    }

    let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(days).ok()
}

/// One protocol step of an encounter's checklist with a flag per day of stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub index: usize,
    pub name: String,
    #[serde(default)]
    pub category: Option<ChecklistCategory>,
    pub days: Vec<bool>,
}

impl ChecklistItem {
    /// A step counts once it was performed on at least one day.
    pub fn is_completed(&self) -> bool {
        self.days.iter().any(|done| *done)
    }
}

/// Operator submission for a single checklist row; indices are assigned on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub name: String,
    #[serde(default)]
    pub category: Option<ChecklistCategory>,
    #[serde(default)]
    pub days: Vec<bool>,
}

/// Calendar month used to group encounters by admission date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "WindowParts", into = "WindowParts")]
pub struct ReportingWindow {
    year: i32,
    month: u32,
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WindowParts {
    month: u32,
    year: i32,
}

impl ReportingWindow {
    pub fn new(month: u32, year: i32) -> Result<Self, WindowError> {
        let start =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(WindowError::Invalid { month, year })?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .ok_or(WindowError::Invalid { month, year })?;

        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    pub fn containing(date: NaiveDate) -> Result<Self, WindowError> {
        Self::new(date.month(), date.year())
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// First day of the month.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day of the following month (exclusive bound).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl TryFrom<WindowParts> for ReportingWindow {
    type Error = WindowError;

    fn try_from(value: WindowParts) -> Result<Self, Self::Error> {
        Self::new(value.month, value.year)
    }
}

impl From<ReportingWindow> for WindowParts {
    fn from(value: ReportingWindow) -> Self {
        Self {
            month: value.month,
            year: value.year,
        }
    }
}

impl fmt::Display for ReportingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Diagnosis restriction applied to dashboards and rollups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum DiagnosisFilter {
    #[default]
    All,
    Only(PathwayType),
}

impl DiagnosisFilter {
    pub const ALL_LABEL: &'static str = "all";

    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some(Self::ALL_LABEL) => Self::All,
            Some(label) => Self::Only(PathwayType::from_label(label)),
        }
    }

    pub fn matches(&self, pathway: &PathwayType) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected.label() == pathway.label(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => Self::ALL_LABEL,
            Self::Only(pathway) => pathway.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncounterError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("discharge {discharged_at} precedes admission {admitted_at}")]
    DischargeBeforeAdmission {
        admitted_at: NaiveDateTime,
        discharged_at: NaiveDateTime,
    },
    #[error("encounter {0} is finalized and can no longer be edited")]
    Finalized(EncounterId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("month {month} of year {year} is not a valid reporting window")]
    Invalid { month: u32, year: i32 },
}
