use super::domain::PathwayType;

/// Target applied to any pathway outside the modeled table.
pub const DEFAULT_TARGET_LOS_DAYS: u32 = 2;

const DEFAULT_CHECKLIST_DAY_SLOTS: usize = 6;

/// Length-of-stay target, in days, for the given pathway.
pub fn target_los(pathway: &PathwayType) -> u32 {
    match pathway {
        PathwayType::SectioCaesaria => 2,
        PathwayType::Pneumonia => 6,
        PathwayType::StrokeHemoragik => 5,
        PathwayType::StrokeNonHemoragik => 5,
        PathwayType::DengueFever => 3,
        PathwayType::Unrecognized(_) => DEFAULT_TARGET_LOS_DAYS,
    }
}

/// [`target_los`] for a free-text diagnosis label.
pub fn target_los_for_label(label: &str) -> u32 {
    target_los(&PathwayType::from_label(label))
}

/// Number of day-of-stay columns on the pathway's checklist form.
pub fn checklist_day_slots(pathway: &PathwayType) -> usize {
    match pathway {
        PathwayType::SectioCaesaria => 4,
        PathwayType::DengueFever => 5,
        PathwayType::Pneumonia | PathwayType::StrokeHemoragik | PathwayType::StrokeNonHemoragik => 6,
        PathwayType::Unrecognized(_) => DEFAULT_CHECKLIST_DAY_SLOTS,
    }
}
