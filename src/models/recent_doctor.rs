use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::doctor::DoctorSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentDoctor {
    #[serde(flatten)]
    pub doctor: DoctorSummary,
    pub viewed_at: DateTime<Utc>,
}

impl RecentDoctor {
    pub fn id(&self) -> &str {
        &self.doctor.id
    }
}
