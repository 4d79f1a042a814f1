use serde::{Deserialize, Serialize};

/// A bookable service as issued by the backend catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub duration_minutes: i64,
}

impl Service {
    /// Duration used for calendar math; the backend occasionally ships
    /// services without a usable duration.
    pub fn effective_duration_minutes(&self) -> i64 {
        if self.duration_minutes > 0 {
            self.duration_minutes
        } else {
            60
        }
    }
}
