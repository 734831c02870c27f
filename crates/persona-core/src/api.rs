//! People-search capability: wire types and the backend-agnostic trait
//!
//! The remote service answers every method with the same envelope, either
//! `{"error": {...}}` or `{"response": {"count": .., "items": [..]}}`.
//! `PeopleSearch` abstracts the three calls the pipeline needs so the
//! refinement and acquisition logic can run against the reqwest client or the
//! in-memory fake in [`crate::fakes`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::PersonaError;
use crate::identity::{Gender, Locale};
use crate::Result;

/// Body chunks of a photo download
pub type PhotoStream = BoxStream<'static, Result<Vec<u8>>>;

/// Error body of the response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: i64,
    pub error_msg: String,
}

/// Paginated item list of the response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemList<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Response envelope shared by every API method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub response: Option<ItemList<T>>,
    pub error: Option<ApiErrorBody>,
}

impl<T> ApiEnvelope<T> {
    /// Collapse the envelope: an error body wins over any data.
    pub fn into_items(self) -> Result<Vec<T>> {
        if let Some(error) = self.error {
            return Err(PersonaError::ApiError {
                code: error.error_code,
                message: error.error_msg,
            });
        }
        self.response.map(|data| data.items).ok_or_else(|| {
            PersonaError::Http("response envelope carries neither data nor error".to_string())
        })
    }
}

fn closed_by_default() -> bool {
    true
}

/// One profile returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: i64,
    #[serde(default)]
    pub photo_id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Profiles without the flag (deleted or banned) count as closed
    #[serde(default = "closed_by_default")]
    pub is_closed: bool,
}

/// One size variant of a profile photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// One profile photo with its size variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    #[serde(default)]
    pub sizes: Vec<PhotoSize>,
}

impl PhotoRecord {
    /// URL of the largest variant. The service lists sizes smallest first, so
    /// ties (including missing dimensions) resolve to the last entry.
    pub fn best_url(&self) -> Option<&str> {
        self.sizes
            .iter()
            .filter(|size| !size.url.is_empty())
            .max_by_key(|size| u64::from(size.width) * u64::from(size.height))
            .map(|size| size.url.as_str())
    }
}

/// Parameters of one `users.search` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    /// 0 = by popularity, 1 = by registration date
    pub sort: u8,
    pub count: u32,
    pub birth_day: u32,
    pub birth_month: u32,
    pub fields: String,
    pub age_from: u32,
    pub age_to: u32,
    pub gender: Gender,
    pub has_photo: bool,
    pub locale: Locale,
}

impl SearchQuery {
    /// Query parameters in wire form
    pub fn to_params(&self) -> Vec<(String, String)> {
        vec![
            ("sort".to_string(), self.sort.to_string()),
            ("count".to_string(), self.count.to_string()),
            ("birth_day".to_string(), self.birth_day.to_string()),
            ("birth_month".to_string(), self.birth_month.to_string()),
            ("fields".to_string(), self.fields.clone()),
            ("age_from".to_string(), self.age_from.to_string()),
            ("age_to".to_string(), self.age_to.to_string()),
            ("sex".to_string(), self.gender.as_param().to_string()),
            ("has_photo".to_string(), u8::from(self.has_photo).to_string()),
            ("lang".to_string(), self.locale.code().to_string()),
        ]
    }
}

/// Remote people-search capability
///
/// Implementations return API error envelopes as `PersonaError::ApiError`
/// and transport failures as `Http`/`Timeout`.
#[async_trait]
pub trait PeopleSearch: Send + Sync {
    /// Run one search and return the raw candidate list.
    async fn search_users(&self, query: &SearchQuery) -> Result<Vec<CandidateRecord>>;

    /// List the profile photos of `owner_id`.
    async fn profile_photos(&self, owner_id: i64) -> Result<Vec<PhotoRecord>>;

    /// Open a byte stream for one photo URL.
    async fn fetch_photo(&self, url: &str) -> Result<PhotoStream>;
}
