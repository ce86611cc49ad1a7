use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Layout variant requested by the user. `Bullet` is a content style, not a
/// layout of its own: it renders on the narrow card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Vertical,
    Horizontal,
    Bullet,
}

impl SummaryStyle {
    pub fn orientation(self) -> Orientation {
        match self {
            SummaryStyle::Horizontal => Orientation::Horizontal,
            SummaryStyle::Vertical | SummaryStyle::Bullet => Orientation::Vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
        }
    }

    pub fn parse(value: &str) -> Orientation {
        match value {
            "horizontal" => Orientation::Horizontal,
            _ => Orientation::Vertical,
        }
    }
}

/// History row for a persisted card. Storage keys are kept alongside the
/// public URLs so the download endpoints can serve raw bytes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CardRecord {
    pub id: Uuid,
    pub user_id: String,
    pub image_url: String,
    pub html_file_url: String,
    pub image_key: String,
    pub html_key: String,
    pub prompt_excerpt: String,
    pub orientation: String,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CardHistoryEntry {
    pub id: Uuid,
    pub image_url: String,
    pub html_file_url: String,
    pub prompt_excerpt: String,
    pub orientation: Orientation,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
}

impl From<CardRecord> for CardHistoryEntry {
    fn from(record: CardRecord) -> Self {
        Self {
            id: record.id,
            image_url: record.image_url,
            html_file_url: record.html_file_url,
            prompt_excerpt: record.prompt_excerpt,
            orientation: Orientation::parse(&record.orientation),
            width: record.width,
            height: record.height,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateCardRequest {
    pub article_text: String,
    #[serde(default)]
    pub style: SummaryStyle,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateCardResponse {
    pub remaining_points: i64,
    pub orientation: Orientation,
    pub saved: bool,
    pub summary_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    /// Base64 PNG, populated only when persistence failed and the artifact
    /// could not be given a URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
