use normalize::{FeatureValue, RawRecord};
use serde::{Deserialize, Serialize};

/// Field names of a serving request, in form order.
pub const SURVEY_FIELDS: [&str; 13] = [
    "number_of_peak",
    "Age",
    "Length_of_cycle",
    "Estimated_day_of_ovulution",
    "Length_of_Leutal_Phase",
    "Length_of_menses",
    "Unusual_Bleeding",
    "Height",
    "Weight",
    "Income",
    "BMI",
    "Mean_of_length_of_cycle",
    "Menses_score",
];

/// One survey submission as posted to the prediction endpoint.
///
/// Field names follow the training CSV headers exactly, misspellings
/// included. `Unusual_Bleeding` arrives pre-encoded as 0 or 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurveyRecord {
    pub number_of_peak: f64,
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Length_of_cycle")]
    pub length_of_cycle: f64,
    #[serde(rename = "Estimated_day_of_ovulution")]
    pub estimated_day_of_ovulation: f64,
    #[serde(rename = "Length_of_Leutal_Phase")]
    pub length_of_luteal_phase: f64,
    #[serde(rename = "Length_of_menses")]
    pub length_of_menses: f64,
    #[serde(rename = "Unusual_Bleeding")]
    pub unusual_bleeding: f64,
    #[serde(rename = "Height")]
    pub height: f64,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "Income")]
    pub income: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "Mean_of_length_of_cycle")]
    pub mean_of_length_of_cycle: f64,
    #[serde(rename = "Menses_score")]
    pub menses_score: f64,
}

impl SurveyRecord {
    /// Values paired with [`SURVEY_FIELDS`].
    pub fn values(&self) -> [f64; 13] {
        [
            self.number_of_peak,
            self.age,
            self.length_of_cycle,
            self.estimated_day_of_ovulation,
            self.length_of_luteal_phase,
            self.length_of_menses,
            self.unusual_bleeding,
            self.height,
            self.weight,
            self.income,
            self.bmi,
            self.mean_of_length_of_cycle,
            self.menses_score,
        ]
    }
}

impl From<&SurveyRecord> for RawRecord {
    fn from(record: &SurveyRecord) -> Self {
        SURVEY_FIELDS
            .iter()
            .zip(record.values())
            .map(|(name, value)| (*name, FeatureValue::Number(value)))
            .collect()
    }
}
