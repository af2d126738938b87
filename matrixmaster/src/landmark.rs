use landmarks::BoundingBox;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Persisted landmark record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub landmark_id: Uuid,
    pub hit_id: String,
    pub position: String,
    pub rect: Option<BoundingBox>,
    pub visual_saliency_score: Option<f64>,
    /// Heading of the landmark relative to the camera, in degrees.
    pub relative_bearing: Option<f64>,
}

impl Landmark {
    pub fn new(hit_id: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            landmark_id: Uuid::new_v4(),
            hit_id: hit_id.into(),
            position: position.into(),
            rect: None,
            visual_saliency_score: None,
            relative_bearing: None,
        }
    }

    pub fn with_rect(mut self, rect: BoundingBox) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.visual_saliency_score = Some(score);
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.relative_bearing = Some(bearing);
        self
    }
}

/// Identifiers of one task: execution point and hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[serde(deserialize_with = "number_or_string")]
    pub ep_id: String,
    #[serde(deserialize_with = "number_or_string")]
    pub hit_id: String,
}

impl TaskInput {
    pub fn new(ep_id: impl Into<String>, hit_id: impl Into<String>) -> Self {
        Self {
            ep_id: ep_id.into(),
            hit_id: hit_id.into(),
        }
    }
}

/// Ids arrive as JSON numbers from some producers and strings from others.
fn number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
