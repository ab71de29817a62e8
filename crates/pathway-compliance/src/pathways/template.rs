use serde::{Deserialize, Serialize};

use super::domain::{ChecklistEntry, PathwayType};
use super::policy::checklist_day_slots;
use self::ChecklistCategory::{Assessment, DischargePlanning, Education, Support, Therapy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistCategory {
    Assessment,
    Therapy,
    Support,
    Education,
    DischargePlanning,
}

impl ChecklistCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assessment => "Asesmen",
            Self::Therapy => "Terapi",
            Self::Support => "Penunjang",
            Self::Education => "Edukasi",
            Self::DischargePlanning => "Rencana Pulang",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TemplateItem {
    pub name: &'static str,
    pub category: ChecklistCategory,
}

const fn item(name: &'static str, category: ChecklistCategory) -> TemplateItem {
    TemplateItem { name, category }
}

const SECTIO_CAESARIA: &[TemplateItem] = &[
    item("Asesmen awal obstetri", Assessment),
    item("Pemeriksaan darah lengkap", Support),
    item("USG obstetri", Support),
    item("Antibiotik profilaksis", Therapy),
    item("Analgetik pasca operasi", Therapy),
    item("Mobilisasi dini", Therapy),
    item("Edukasi perawatan luka dan laktasi", Education),
    item("Rencana pulang", DischargePlanning),
];

const PNEUMONIA: &[TemplateItem] = &[
    item("Asesmen awal medis", Assessment),
    item("Pemeriksaan darah lengkap", Support),
    item("Foto thorax", Support),
    item("Kultur sputum", Support),
    item("Antibiotik empiris", Therapy),
    item("Terapi oksigen", Therapy),
    item("Nebulisasi", Therapy),
    item("Edukasi pasien dan keluarga", Education),
    item("Rencana pulang", DischargePlanning),
];

const STROKE_HEMORAGIK: &[TemplateItem] = &[
    item("Asesmen neurologis", Assessment),
    item("CT scan kepala", Support),
    item("Pemeriksaan koagulasi", Support),
    item("Kontrol tekanan darah", Therapy),
    item("Neuroprotektan", Therapy),
    item("Fisioterapi", Therapy),
    item("Edukasi pencegahan stroke berulang", Education),
    item("Rencana pulang", DischargePlanning),
];

const STROKE_NON_HEMORAGIK: &[TemplateItem] = &[
    item("Asesmen neurologis", Assessment),
    item("CT scan kepala", Support),
    item("Profil lipid", Support),
    item("Antiplatelet", Therapy),
    item("Neuroprotektan", Therapy),
    item("Fisioterapi", Therapy),
    item("Edukasi pencegahan stroke berulang", Education),
    item("Rencana pulang", DischargePlanning),
];

const DENGUE_FEVER: &[TemplateItem] = &[
    item("Asesmen awal medis", Assessment),
    item("Pemeriksaan trombosit serial", Support),
    item("NS1 / serologi dengue", Support),
    item("Terapi cairan", Therapy),
    item("Antipiretik", Therapy),
    item("Edukasi tanda bahaya", Education),
    item("Rencana pulang", DischargePlanning),
];

const GENERIC: &[TemplateItem] = &[
    item("Asesmen awal medis", Assessment),
    item("Pemeriksaan penunjang", Support),
    item("Terapi sesuai DPJP", Therapy),
    item("Edukasi pasien dan keluarga", Education),
    item("Rencana pulang", DischargePlanning),
];

/// Default protocol steps for a pathway's checklist form.
pub fn checklist_template(pathway: &PathwayType) -> &'static [TemplateItem] {
    match pathway {
        PathwayType::SectioCaesaria => SECTIO_CAESARIA,
        PathwayType::Pneumonia => PNEUMONIA,
        PathwayType::StrokeHemoragik => STROKE_HEMORAGIK,
        PathwayType::StrokeNonHemoragik => STROKE_NON_HEMORAGIK,
        PathwayType::DengueFever => DENGUE_FEVER,
        PathwayType::Unrecognized(_) => GENERIC,
    }
}

/// Blank checklist rows sized to the pathway's day slots.
pub fn blank_checklist(pathway: &PathwayType) -> Vec<ChecklistEntry> {
    let slots = checklist_day_slots(pathway);
    checklist_template(pathway)
        .iter()
        .map(|template| ChecklistEntry {
            name: template.name.to_string(),
            category: Some(template.category),
            days: vec![false; slots],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_covers_therapy_and_support_steps() {
        for pathway in PathwayType::ordered() {
            let template = checklist_template(&pathway);
            assert!(template.iter().any(|item| item.category == Therapy));
            assert!(template.iter().any(|item| item.category == Support));
        }
    }

    #[test]
    fn blank_checklist_matches_day_slots() {
        let rows = blank_checklist(&PathwayType::SectioCaesaria);
        assert_eq!(rows.len(), SECTIO_CAESARIA.len());
        assert!(rows.iter().all(|row| row.days.len() == 4));
        assert!(rows.iter().all(|row| row.days.iter().all(|day| !day)));
    }
}
