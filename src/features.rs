//! Per-disease feature assembly.
//!
//! Each assembler turns an [`InputRecord`] into the exact column order its
//! model was trained on. Permuting a schema corrupts predictions without any
//! error, so the column lists below are the single source of truth and every
//! assembler is tested against them.

use crate::disease::Disease;
use crate::input::{Coercer, FieldIssue, InputRecord, Ordinal};

pub const CARDIOVASCULAR_FEATURES: [&str; 8] = [
    "age_years",
    "ap_hi",
    "ap_lo",
    "cholesterol",
    "gluc",
    "active",
    "smoke",
    "alco",
];

pub const DIABETES_FEATURES: [&str; 12] = [
    "age",
    "sex",
    "bmi",
    "highBP",
    "highChol",
    "smoker",
    "exercise",
    "fruits",
    "veggies",
    "genHealth",
    "education",
    "income",
];

pub const COPD_FEATURES: [&str; 19] = [
    "age",
    "gender",
    "bmi",
    "height",
    "heartFailure",
    "workingPlace",
    "mMRC",
    "smokingStatus",
    "packHistory",
    "vaccination",
    "depression",
    "dependent",
    "temperature",
    "respiratoryRate",
    "heartRate",
    "bloodPressure",
    "oxygenSaturation",
    "sputum",
    "fev1",
];

pub const DEPRESSION_FEATURES: [&str; 15] = [
    "age",
    "gender",
    "self_employed",
    "family_history",
    "work_interfere",
    "remote_work",
    "benefits",
    "care_options",
    "wellness_program",
    "seek_help",
    "anonymity",
    "leave",
    "mental_health_consequence",
    "supervisor",
    "mental_vs_physical",
];

pub const KIDNEY_FEATURES: [&str; 10] = [
    "hemo", "sg", "al", "htn", "sc", "sod", "bgr", "pcv", "bu", "age",
];

// ============ Categorical codings ============

pub static GENERAL_HEALTH: Ordinal = Ordinal {
    levels: &[
        ("excellent", 5),
        ("very good", 4),
        ("good", 3),
        ("fair", 2),
        ("poor", 1),
    ],
    default: 3,
};

pub static EDUCATION: Ordinal = Ordinal {
    levels: &[
        ("less than high school", 1),
        ("high school", 2),
        ("some college", 3),
        ("college grad", 4),
        ("post-grad", 5),
    ],
    default: 3,
};

pub static INCOME: Ordinal = Ordinal {
    levels: &[("low", 1), ("medium", 2), ("high", 3)],
    default: 2,
};

pub static WORK_INTERFERE: Ordinal = Ordinal {
    levels: &[("never", 0), ("rarely", 1), ("sometimes", 2), ("often", 3)],
    default: 0,
};

/// Yes / no / don't know, shared by several workplace questions.
pub static YES_NO_DONT_KNOW: Ordinal = Ordinal {
    levels: &[("yes", 1), ("no", 0), ("don't know", 2)],
    default: 2,
};

pub static CARE_OPTIONS: Ordinal = Ordinal {
    levels: &[("yes", 1), ("no", 0), ("not sure", 2)],
    default: 2,
};

pub static LEAVE: Ordinal = Ordinal {
    levels: &[
        ("very easy", 4),
        ("somewhat easy", 3),
        ("don't know", 2),
        ("somewhat difficult", 1),
        ("very difficult", 0),
    ],
    default: 2,
};

pub static CONSEQUENCE: Ordinal = Ordinal {
    levels: &[("yes", 1), ("no", 0), ("maybe", 2)],
    default: 2,
};

pub static SUPERVISOR: Ordinal = Ordinal {
    levels: &[("yes", 1), ("no", 0), ("some of them", 2)],
    default: 2,
};

/// Fixed-order model input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        // Tree ensembles evaluate in single precision.
        Self(values.into_iter().map(|v| v as f32).collect())
    }
}

/// Result of assembling one request.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub vector: FeatureVector,
    /// Present fields that were unusable and replaced by defaults.
    pub issues: Vec<FieldIssue>,
}

/// Column names, in model order, for a disease.
pub fn feature_names(disease: Disease) -> &'static [&'static str] {
    match disease {
        Disease::Cardiovascular => &CARDIOVASCULAR_FEATURES,
        Disease::Diabetes => &DIABETES_FEATURES,
        Disease::Copd => &COPD_FEATURES,
        Disease::Depression => &DEPRESSION_FEATURES,
        Disease::Kidney => &KIDNEY_FEATURES,
    }
}

/// Builds the feature vector for `disease` from a loosely-typed record.
///
/// Never fails: unusable values fall back to their defaults and are reported
/// in [`Assembled::issues`].
pub fn assemble(disease: Disease, record: &InputRecord) -> Assembled {
    let mut c = Coercer::new(record);
    let values = match disease {
        Disease::Cardiovascular => cardiovascular(&mut c),
        Disease::Diabetes => diabetes(&mut c),
        Disease::Copd => copd(&mut c),
        Disease::Depression => depression(&mut c),
        Disease::Kidney => kidney(&mut c),
    };
    debug_assert_eq!(values.len(), feature_names(disease).len());

    Assembled {
        vector: FeatureVector::from(values),
        issues: c.finish(),
    }
}

/// Body-mass index from height and weight.
///
/// Heights above 10 are taken as centimetres. A non-positive height yields 0.
pub fn body_mass_index(height: f64, weight_kg: f64) -> f64 {
    let height_m = if height > 10.0 { height / 100.0 } else { height };
    if height_m > 0.0 {
        weight_kg / (height_m * height_m)
    } else {
        0.0
    }
}

/// Body-mass index with height used exactly as sent, as the COPD model was
/// trained. A non-positive height yields 0.
pub fn raw_body_mass_index(height: f64, weight: f64) -> f64 {
    if height > 0.0 {
        weight / (height * height)
    } else {
        0.0
    }
}

fn cardiovascular(c: &mut Coercer) -> Vec<f64> {
    vec![
        c.float("age_years"),
        c.float("ap_hi"),
        c.float("ap_lo"),
        c.integer("cholesterol"),
        c.integer("gluc"),
        c.integer("active"),
        c.integer("smoke"),
        c.integer("alco"),
    ]
}

fn diabetes(c: &mut Coercer) -> Vec<f64> {
    let age = c.float("age");
    let sex = c.flag("sex", "male");
    let bmi = body_mass_index(c.float("height"), c.float("weight"));

    vec![
        age,
        sex,
        bmi,
        c.flag("highBP", "yes"),
        c.flag("highChol", "yes"),
        c.flag("smoker", "yes"),
        c.flag("exercise", "yes"),
        c.flag("fruits", "yes"),
        c.flag("veggies", "yes"),
        c.ordinal("genHealth", &GENERAL_HEALTH),
        c.ordinal("education", &EDUCATION),
        c.ordinal("income", &INCOME),
    ]
}

fn copd(c: &mut Coercer) -> Vec<f64> {
    let age = c.float("age");
    let gender = c.integer("gender");
    let height = c.float("height");
    let bmi = raw_body_mass_index(height, c.float("weight"));

    vec![
        age,
        gender,
        bmi,
        height,
        c.integer("heartFailure"),
        c.integer("workingPlace"),
        c.integer("mMRC"),
        c.integer("smokingStatus"),
        c.float("packHistory"),
        c.integer("vaccination"),
        c.integer("depression"),
        c.integer("dependent"),
        c.integer("temperature"),
        c.float("respiratoryRate"),
        c.integer("heartRate"),
        c.integer("bloodPressure"),
        c.float("oxygenSaturation"),
        c.integer("sputum"),
        c.integer("fev1"),
    ]
}

fn depression(c: &mut Coercer) -> Vec<f64> {
    vec![
        c.float("age"),
        c.flag("gender", "male"),
        c.flag("self_employed", "yes"),
        c.flag("family_history", "yes"),
        c.ordinal("work_interfere", &WORK_INTERFERE),
        c.flag("remote_work", "yes"),
        c.ordinal("benefits", &YES_NO_DONT_KNOW),
        c.ordinal("care_options", &CARE_OPTIONS),
        c.ordinal("wellness_program", &YES_NO_DONT_KNOW),
        c.ordinal("seek_help", &YES_NO_DONT_KNOW),
        c.ordinal("anonymity", &YES_NO_DONT_KNOW),
        c.ordinal("leave", &LEAVE),
        c.ordinal("mental_health_consequence", &CONSEQUENCE),
        c.ordinal("supervisor", &SUPERVISOR),
        c.ordinal("mental_vs_physical", &YES_NO_DONT_KNOW),
    ]
}

fn kidney(c: &mut Coercer) -> Vec<f64> {
    vec![
        c.float("hemo"),
        c.float("sg"),
        c.float("al"),
        c.flag("htn", "yes"),
        c.float("sc"),
        c.float("sod"),
        c.float("bgr"),
        c.float("pcv"),
        c.float("bu"),
        c.float("age"),
    ]
}
