use serde::{Deserialize, Serialize};

use super::domain::{Encounter, EncounterId};

/// Substituted for optional fields that were left empty.
pub const NOT_FILLED: &str = "Belum diisi";

pub const DEFAULT_TEMPLATE: &str = "Pasien clinical pathway telah difinalisasi.\n\
Nama: {nama_pasien}\n\
No. RM: {no_rm}\n\
Clinical Pathway: {jenis_clinical_pathway}\n\
Tanggal Masuk: {tanggal_masuk} {jam_masuk}\n\
DPJP: {dpjp}\n\
Verifikator/Pelaksana: {verifikator_pelaksana}";

fn or_not_filled(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => NOT_FILLED,
    }
}

/// Replace every known placeholder in `template` with the encounter's values.
pub fn render_notification(template: &str, encounter: &Encounter) -> String {
    let admitted_date = encounter.admitted_at.format("%Y-%m-%d").to_string();
    let admitted_time = encounter.admitted_at.format("%H:%M").to_string();

    let substitutions = [
        ("{nama_pasien}", encounter.patient_name.as_str()),
        ("{no_rm}", encounter.record_number.as_str()),
        ("{jenis_clinical_pathway}", encounter.pathway.label()),
        ("{tanggal_masuk}", admitted_date.as_str()),
        ("{jam_masuk}", admitted_time.as_str()),
        ("{dpjp}", or_not_filled(encounter.attending_physician.as_deref())),
        (
            "{verifikator_pelaksana}",
            or_not_filled(encounter.verifier.as_deref()),
        ),
    ];

    substitutions
        .iter()
        .fold(template.to_string(), |message, (placeholder, value)| {
            message.replace(placeholder, value)
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterNotification {
    pub encounter_id: EncounterId,
    pub record_number: String,
    pub message: String,
}

/// Outbound hook handed finalized encounters (messaging gateway adapters, etc.).
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: EncounterNotification) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
