use super::normalizer::{normalize_label, optional_text};
use super::ImportedEncounter;
use crate::pathways::domain::{NewEncounter, PathwayType};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) enum RowProblem {
    Csv(csv::Error),
    Invalid { line: u64, reason: String },
}

impl From<csv::Error> for RowProblem {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<ImportedEncounter>, RowProblem> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (offset, record) in csv_reader.deserialize::<EncounterRow>().enumerate() {
        let row = record?;
        // header is line 1
        let line = offset as u64 + 2;
        records.push(row.into_record(line)?);
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct EncounterRow {
    #[serde(rename = "No RM")]
    record_number: String,
    #[serde(rename = "Nama Pasien")]
    patient_name: String,
    #[serde(rename = "Jenis Clinical Pathway")]
    pathway: String,
    #[serde(rename = "Tanggal Masuk")]
    admitted_on: String,
    #[serde(rename = "Jam Masuk", default, deserialize_with = "empty_string_as_none")]
    admitted_time: Option<String>,
    #[serde(
        rename = "Tanggal Keluar",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    discharged_on: Option<String>,
    #[serde(rename = "Jam Keluar", default, deserialize_with = "empty_string_as_none")]
    discharged_time: Option<String>,
    #[serde(rename = "DPJP", default)]
    attending_physician: Option<String>,
    #[serde(rename = "Verifikator", default)]
    verifier: Option<String>,
}

impl EncounterRow {
    fn into_record(self, line: u64) -> Result<ImportedEncounter, RowProblem> {
        let admitted_at = combine(&self.admitted_on, self.admitted_time.as_deref()).ok_or_else(
            || RowProblem::Invalid {
                line,
                reason: format!(
                    "admission '{} {}' is not a valid date/time",
                    self.admitted_on,
                    self.admitted_time.as_deref().unwrap_or("")
                ),
            },
        )?;

        let discharged_at = match self.discharged_on.as_deref() {
            Some(date) => Some(combine(date, self.discharged_time.as_deref()).ok_or_else(
                || RowProblem::Invalid {
                    line,
                    reason: format!("discharge '{date}' is not a valid date/time"),
                },
            )?),
            None => None,
        };

        Ok(ImportedEncounter {
            line,
            admission: NewEncounter {
                patient_name: normalize_label(&self.patient_name),
                record_number: normalize_label(&self.record_number),
                pathway: PathwayType::from_label(&normalize_label(&self.pathway)),
                admitted_at,
                attending_physician: optional_text(self.attending_physician),
                verifier: optional_text(self.verifier),
            },
            discharged_at,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn combine(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = parse_date(date)?;
    let time = match time {
        Some(raw) => parse_time(raw)?,
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    ["%H:%M", "%H:%M:%S", "%H.%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
}

#[cfg(test)]
pub(crate) fn combine_for_tests(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    combine(date, time)
}
