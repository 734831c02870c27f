//! In-memory fake of the people-search capability (testing and offline runs)
//!
//! `ScriptedPeopleSearch` replays queued search replies in order, serves
//! photo listings and photo bodies from maps, and records every query it
//! receives so tests can assert on attempt counts and perturbed parameters.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;

use crate::api::{CandidateRecord, PeopleSearch, PhotoRecord, PhotoSize, PhotoStream, SearchQuery};
use crate::error::PersonaError;
use crate::Result;

/// A scripted reply for one API call
#[derive(Debug, Clone)]
pub enum ScriptedReply<T> {
    Items(Vec<T>),
    ApiError { code: i64, message: String },
}

impl<T: Clone> ScriptedReply<T> {
    fn to_result(&self) -> Result<Vec<T>> {
        match self {
            ScriptedReply::Items(items) => Ok(items.clone()),
            ScriptedReply::ApiError { code, message } => Err(PersonaError::ApiError {
                code: *code,
                message: message.clone(),
            }),
        }
    }
}

/// Scripted body of one photo URL
#[derive(Debug, Clone)]
pub enum PhotoBody {
    /// Served as the given chunks
    Chunks(Vec<Vec<u8>>),
    /// The request itself fails
    RequestFails,
    /// The given chunks are served, then the stream errors
    BreaksAfter(Vec<Vec<u8>>),
}

/// In-memory people-search backend
#[derive(Debug, Default)]
pub struct ScriptedPeopleSearch {
    search_replies: Mutex<VecDeque<ScriptedReply<CandidateRecord>>>,
    search_fallback: Mutex<Option<ScriptedReply<CandidateRecord>>>,
    photo_listings: Mutex<HashMap<i64, ScriptedReply<PhotoRecord>>>,
    photo_bodies: Mutex<HashMap<String, PhotoBody>>,
    queries: Mutex<Vec<SearchQuery>>,
    fetched_urls: Mutex<Vec<String>>,
}

impl ScriptedPeopleSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one search reply; replies are consumed in order.
    pub fn push_search(&self, reply: ScriptedReply<CandidateRecord>) -> &Self {
        self.search_replies.lock().unwrap().push_back(reply);
        self
    }

    /// Reply served once the queue is drained (defaults to an empty list).
    pub fn set_search_fallback(&self, reply: ScriptedReply<CandidateRecord>) -> &Self {
        *self.search_fallback.lock().unwrap() = Some(reply);
        self
    }

    pub fn set_photos(&self, owner_id: i64, reply: ScriptedReply<PhotoRecord>) -> &Self {
        self.photo_listings.lock().unwrap().insert(owner_id, reply);
        self
    }

    pub fn set_photo_body(&self, url: &str, body: PhotoBody) -> &Self {
        self.photo_bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body);
        self
    }

    /// Every search query received so far
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Every photo URL requested so far
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched_urls.lock().unwrap().clone()
    }
}

/// Photo record with a single full-size variant at `url`
pub fn photo_at(url: &str) -> PhotoRecord {
    PhotoRecord {
        sizes: vec![
            PhotoSize {
                kind: "s".to_string(),
                url: format!("{url}?size=s"),
                width: 75,
                height: 75,
            },
            PhotoSize {
                kind: "w".to_string(),
                url: url.to_string(),
                width: 1280,
                height: 960,
            },
        ],
    }
}

/// Open profile with a photo
pub fn open_candidate(id: i64, first_name: &str, last_name: &str) -> CandidateRecord {
    CandidateRecord {
        id,
        photo_id: Some(format!("{id}_1")),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        is_closed: false,
    }
}

#[async_trait]
impl PeopleSearch for ScriptedPeopleSearch {
    async fn search_users(&self, query: &SearchQuery) -> Result<Vec<CandidateRecord>> {
        self.queries.lock().unwrap().push(query.clone());
        let next = self.search_replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply.to_result(),
            None => match self.search_fallback.lock().unwrap().as_ref() {
                Some(reply) => reply.to_result(),
                None => Ok(Vec::new()),
            },
        }
    }

    async fn profile_photos(&self, owner_id: i64) -> Result<Vec<PhotoRecord>> {
        match self.photo_listings.lock().unwrap().get(&owner_id) {
            Some(reply) => reply.to_result(),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_photo(&self, url: &str) -> Result<PhotoStream> {
        self.fetched_urls.lock().unwrap().push(url.to_string());
        let body = self.photo_bodies.lock().unwrap().get(url).cloned();
        match body {
            Some(PhotoBody::Chunks(chunks)) => {
                let chunks = chunks.into_iter().map(Ok::<Vec<u8>, PersonaError>);
                Ok(stream::iter(chunks).boxed())
            }
            Some(PhotoBody::BreaksAfter(chunks)) => {
                let reset = PersonaError::Http(format!("connection reset while reading {url}"));
                let broken = std::iter::once(Err(reset));
                let chunks = chunks.into_iter().map(Ok).chain(broken);
                Ok(stream::iter(chunks).boxed())
            }
            Some(PhotoBody::RequestFails) => {
                Err(PersonaError::Http(format!("photo download failed: {url}")))
            }
            None => Err(PersonaError::Http(format!(
                "photo download returned HTTP 404: {url}"
            ))),
        }
    }
}
