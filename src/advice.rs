use crate::disease::{Disease, Outcome};
use std::collections::BTreeMap;

/// Advice shown for each outcome of one disease.
#[derive(Debug, Clone, Copy)]
struct Advice {
    low: &'static [&'static str],
    elevated: &'static [&'static str],
}

/// Static advice keyed by disease and predicted outcome.
///
/// Built once at startup and shared read-only through the application state.
#[derive(Debug, Clone)]
pub struct AdvisoryTable {
    entries: BTreeMap<Disease, Advice>,
}

impl AdvisoryTable {
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            Disease::Diabetes,
            Advice {
                elevated: &[
                    "Consult your doctor for a personalized plan.",
                    "Monitor your blood sugar regularly.",
                    "Adopt a balanced, low-sugar diet.",
                    "Increase physical activity.",
                ],
                low: &[
                    "Maintain your healthy lifestyle.",
                    "Continue regular checkups.",
                    "Stay active and eat a balanced diet.",
                ],
            },
        );
        entries.insert(
            Disease::Cardiovascular,
            Advice {
                elevated: &[
                    "Consult your cardiologist for tailored advice.",
                    "Monitor your blood pressure regularly.",
                    "Reduce salt and saturated fat intake.",
                    "Exercise regularly, as advised by your doctor.",
                    "Quit smoking and limit alcohol consumption.",
                ],
                low: &[
                    "Maintain a heart-healthy diet.",
                    "Continue regular physical activity.",
                    "Monitor your blood pressure and cholesterol.",
                ],
            },
        );
        entries.insert(
            Disease::Copd,
            Advice {
                elevated: &[
                    "Consult your pulmonologist for a treatment plan.",
                    "Avoid exposure to smoke and air pollutants.",
                    "Follow prescribed inhaler or medication routines.",
                    "Practice breathing exercises.",
                    "Get vaccinated against flu and pneumonia.",
                ],
                low: &[
                    "Continue avoiding tobacco smoke.",
                    "Stay active with regular, gentle exercise.",
                    "Monitor your respiratory health.",
                ],
            },
        );
        entries.insert(
            Disease::Depression,
            Advice {
                elevated: &[
                    "Reach out to a mental health professional.",
                    "Talk to trusted friends or family.",
                    "Maintain a daily routine and self-care.",
                    "Engage in regular physical activity.",
                    "Avoid isolation; seek support groups.",
                ],
                low: &[
                    "Continue healthy coping strategies.",
                    "Maintain supportive social connections.",
                    "Monitor your mood and well-being.",
                ],
            },
        );
        entries.insert(
            Disease::Kidney,
            Advice {
                elevated: &[
                    "Consult your nephrologist for a treatment plan.",
                    "Monitor your blood pressure and blood sugar.",
                    "Limit salt and protein intake as advised.",
                    "Stay hydrated (but follow your doctor's advice).",
                    "Avoid over-the-counter painkillers unless prescribed.",
                ],
                low: &[
                    "Maintain a kidney-friendly diet.",
                    "Monitor your blood pressure.",
                    "Stay hydrated and active.",
                ],
            },
        );
        Self { entries }
    }

    /// Tips for a known disease and outcome.
    pub fn tips(&self, disease: Disease, outcome: Outcome) -> &[&'static str] {
        match (self.entries.get(&disease), outcome) {
            (Some(advice), Outcome::Low) => advice.low,
            (Some(advice), Outcome::Elevated) => advice.elevated,
            (None, _) => &[],
        }
    }

    /// String-keyed lookup. Unknown diseases and outcomes other than 0/1
    /// yield an empty list.
    pub fn get_tips(&self, disease: &str, outcome: i64) -> Vec<String> {
        match (disease.parse::<Disease>(), Outcome::from_code(outcome)) {
            (Ok(disease), Some(outcome)) => to_owned(self.tips(disease, outcome)),
            _ => Vec::new(),
        }
    }

    /// General suggestions for a disease when no prediction is available:
    /// its preventive (low-risk) advice.
    pub fn general_tips(&self, disease: &str) -> Vec<String> {
        disease
            .parse::<Disease>()
            .map(|d| to_owned(self.tips(d, Outcome::Low)))
            .unwrap_or_default()
    }
}

impl Default for AdvisoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn to_owned(tips: &[&'static str]) -> Vec<String> {
    tips.iter().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_disease_has_both_outcomes() {
        let table = AdvisoryTable::builtin();
        for disease in Disease::ALL {
            assert!(!table.tips(disease, Outcome::Low).is_empty());
            assert!(!table.tips(disease, Outcome::Elevated).is_empty());
        }
    }

    #[test]
    fn test_every_list_in_display_order() {
        let expected: [(&str, i64, &[&str]); 10] = [
            ("diabetes", 1, &[
                "Consult your doctor for a personalized plan.",
                "Monitor your blood sugar regularly.",
                "Adopt a balanced, low-sugar diet.",
                "Increase physical activity.",
            ]),
            ("diabetes", 0, &[
                "Maintain your healthy lifestyle.",
                "Continue regular checkups.",
                "Stay active and eat a balanced diet.",
            ]),
            ("cardiovascular", 1, &[
                "Consult your cardiologist for tailored advice.",
                "Monitor your blood pressure regularly.",
                "Reduce salt and saturated fat intake.",
                "Exercise regularly, as advised by your doctor.",
                "Quit smoking and limit alcohol consumption.",
            ]),
            ("cardiovascular", 0, &[
                "Maintain a heart-healthy diet.",
                "Continue regular physical activity.",
                "Monitor your blood pressure and cholesterol.",
            ]),
            ("copd", 1, &[
                "Consult your pulmonologist for a treatment plan.",
                "Avoid exposure to smoke and air pollutants.",
                "Follow prescribed inhaler or medication routines.",
                "Practice breathing exercises.",
                "Get vaccinated against flu and pneumonia.",
            ]),
            ("copd", 0, &[
                "Continue avoiding tobacco smoke.",
                "Stay active with regular, gentle exercise.",
                "Monitor your respiratory health.",
            ]),
            ("depression", 1, &[
                "Reach out to a mental health professional.",
                "Talk to trusted friends or family.",
                "Maintain a daily routine and self-care.",
                "Engage in regular physical activity.",
                "Avoid isolation; seek support groups.",
            ]),
            ("depression", 0, &[
                "Continue healthy coping strategies.",
                "Maintain supportive social connections.",
                "Monitor your mood and well-being.",
            ]),
            ("kidney", 1, &[
                "Consult your nephrologist for a treatment plan.",
                "Monitor your blood pressure and blood sugar.",
                "Limit salt and protein intake as advised.",
                "Stay hydrated (but follow your doctor's advice).",
                "Avoid over-the-counter painkillers unless prescribed.",
            ]),
            ("kidney", 0, &[
                "Maintain a kidney-friendly diet.",
                "Monitor your blood pressure.",
                "Stay hydrated and active.",
            ]),
        ];

        let table = AdvisoryTable::builtin();
        for (disease, outcome, tips) in expected {
            assert_eq!(table.get_tips(disease, outcome), tips, "{} / {}", disease, outcome);
        }
    }

    #[test]
    fn test_diabetes_elevated_order() {
        let tips = AdvisoryTable::builtin().get_tips("diabetes", 1);
        assert_eq!(tips[0], "Consult your doctor for a personalized plan.");
        assert_eq!(tips.len(), 4);
    }

    #[test]
    fn test_unknown_lookups_are_empty() {
        let table = AdvisoryTable::builtin();
        assert!(table.get_tips("unknown-disease", 1).is_empty());
        assert!(table.get_tips("kidney", 2).is_empty());
        assert!(table.get_tips("kidney", -1).is_empty());
        assert!(table.general_tips("general").is_empty());
    }

    #[test]
    fn test_general_tips_are_preventive() {
        let table = AdvisoryTable::builtin();
        assert_eq!(
            table.general_tips("COPD"),
            table.get_tips("copd", 0),
        );
    }
}
