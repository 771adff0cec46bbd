use serde::{Deserialize, Serialize};

/// Qualifications are stored either as one line of text or as a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Qualifications {
    Text(String),
    List(Vec<String>),
}

impl Qualifications {
    pub fn items(&self) -> Vec<&str> {
        match self {
            Qualifications::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect(),
            Qualifications::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// A doctor's profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default, alias = "specialization")]
    pub speciality: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub qualifications: Option<Qualifications>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub consultation_fee: Option<f64>,
    #[serde(default)]
    pub hospital: Option<String>,
    #[serde(default)]
    pub availability: Vec<String>,
}

/// The part of a doctor kept in the recently-viewed list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_fee: Option<f64>,
}

impl DoctorSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            speciality: None,
            rating: None,
            experience: None,
            hospital: None,
            consultation_fee: None,
        }
    }
}

impl From<&Doctor> for DoctorSummary {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id.clone(),
            name: doctor.name.clone(),
            speciality: doctor.speciality.clone(),
            rating: doctor.rating,
            experience: doctor.experience.clone(),
            hospital: doctor.hospital.clone(),
            consultation_fee: doctor.consultation_fee,
        }
    }
}
