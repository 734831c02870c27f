//! Identity orchestration
//!
//! One `IdentityOrchestrator` drives one pipeline: skeleton, refinement,
//! identifier, photos, usernames, password. It owns its search backend and
//! random source, so separate identities never share mutable state.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::PeopleSearch;
use crate::client::ApiClient;
use crate::config::{
    PersonaConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_PHOTO_SAMPLE_SIZE, DEFAULT_SEARCH_COUNT,
};
use crate::credentials::{generate_password, generate_usernames, random_password_length};
use crate::error::PersonaError;
use crate::identity::{Gender, Identity, Locale};
use crate::photos::{PhotoAcquisitionService, PhotoReport};
use crate::refine::{Refinement, SearchRefinementEngine};
use crate::Result;

/// Youngest age drawn when the caller gives none
pub const MIN_DEFAULT_AGE: u32 = 18;

/// Oldest age drawn when the caller gives none
pub const MAX_DEFAULT_AGE: u32 = 45;

/// Caller overrides for one generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub locale: Option<Locale>,
    pub identifier: Option<String>,
}

impl GenerationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

/// A finished generation run
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub identity: Identity,
    /// Saved photos, absent when acquisition failed softly
    pub photos: Option<PhotoReport>,
    /// Why photos are absent
    pub photo_error: Option<String>,
    /// Search attempts used by refinement
    pub attempts: u32,
}

/// Top-level pipeline coordinator
pub struct IdentityOrchestrator<S: PeopleSearch, R: Rng> {
    search: S,
    rng: R,
    photo_root: PathBuf,
    max_attempts: u32,
    search_count: u32,
    photo_sample_size: usize,
    today: NaiveDate,
}

impl IdentityOrchestrator<ApiClient, StdRng> {
    /// Orchestrator backed by the HTTP client, seeded from OS entropy.
    pub fn from_config(config: &PersonaConfig) -> Result<Self> {
        let client = ApiClient::new(config)?;
        Ok(Self::new(client, StdRng::from_entropy()).with_config(config))
    }
}

impl<S: PeopleSearch, R: Rng> IdentityOrchestrator<S, R> {
    pub fn new(search: S, rng: R) -> Self {
        IdentityOrchestrator {
            search,
            rng,
            photo_root: PathBuf::from("photos"),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            search_count: DEFAULT_SEARCH_COUNT,
            photo_sample_size: DEFAULT_PHOTO_SAMPLE_SIZE,
            today: Utc::now().date_naive(),
        }
    }

    /// Take pipeline limits and the photo root from config.
    pub fn with_config(mut self, config: &PersonaConfig) -> Self {
        self.photo_root = config.photo_root.clone();
        self.max_attempts = config.max_attempts;
        self.search_count = config.search_count;
        self.photo_sample_size = config.photo_sample_size;
        self
    }

    pub fn with_photo_root(mut self, photo_root: impl Into<PathBuf>) -> Self {
        self.photo_root = photo_root.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Reference date for ages and birth years
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    /// Birth date, gender, locale and (if supplied) identifier.
    pub fn build_skeleton(&mut self, request: &GenerationRequest) -> Result<Identity> {
        let age = match request.age {
            Some(age) => age,
            None => self.rng.gen_range(MIN_DEFAULT_AGE..=MAX_DEFAULT_AGE),
        };
        let year = i32::try_from(age)
            .ok()
            .map(|age| self.today.year() - age)
            .ok_or_else(|| PersonaError::Config(format!("age {age} is out of range")))?;

        let month = self.rng.gen_range(1..=12);
        let day = self.rng.gen_range(1..=31);
        let birth_date = match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => date,
            None => NaiveDate::from_ymd_opt(year, month, self.rng.gen_range(1..=28))
                .ok_or_else(|| PersonaError::Config(format!("age {age} is out of range")))?,
        };

        let gender = match request.gender {
            Some(gender) => gender,
            None => Gender::random(&mut self.rng),
        };
        let locale = match request.locale {
            Some(locale) => locale,
            None => Locale::random(&mut self.rng),
        };

        let mut identity = Identity::new(birth_date, gender, locale);
        if let Some(identifier) = &request.identifier {
            identity.assign_identifier(identifier.clone())?;
        }
        Ok(identity)
    }

    /// Run the whole pipeline for one identity.
    ///
    /// Refinement failures end the run. Soft photo failures are reported on
    /// the returned [`Generation`] and the run carries on to credentials.
    pub async fn generate(&mut self, request: GenerationRequest) -> Result<Generation> {
        let skeleton = self.build_skeleton(&request)?;
        info!(
            gender = ?skeleton.gender(),
            locale = %skeleton.locale(),
            birth_date = %skeleton.birth_date(),
            "Generating identity"
        );

        let engine = SearchRefinementEngine::new(&self.search)
            .with_max_attempts(self.max_attempts)
            .with_search_count(self.search_count)
            .with_today(self.today);
        let Refinement {
            mut identity,
            eligible,
            attempts,
        } = engine.refine(skeleton, &mut self.rng).await?;

        if identity.identifier().is_none() {
            let derived = identity.derived_identifier()?;
            identity.assign_identifier(derived)?;
        }

        let (photos, photo_error) = match eligible.choose(&mut self.rng) {
            Some(candidate) => {
                let service = PhotoAcquisitionService::new(&self.search, self.photo_root.clone())
                    .with_sample_size(self.photo_sample_size);
                match service.acquire(candidate, &identity, &mut self.rng).await {
                    Ok(report) => (Some(report), None),
                    Err(e) if e.is_soft() => {
                        warn!(error = %e, "Continuing without photos");
                        (None, Some(e.to_string()))
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {
                let reason = "no eligible candidate to take photos from";
                (None, Some(reason.to_string()))
            }
        };

        let usernames = match identity.names() {
            Some((first, last)) => generate_usernames(first, last, identity.locale())?,
            None => {
                return Err(PersonaError::InvariantViolation(
                    "refinement returned without names".to_string(),
                ))
            }
        };
        identity.assign_usernames(usernames)?;

        let length = random_password_length(&mut self.rng);
        identity.assign_password(generate_password(length))?;

        info!(
            identifier = identity.identifier().unwrap_or_default(),
            attempts,
            usernames = identity.usernames().len(),
            "Identity generated"
        );

        Ok(Generation {
            identity,
            photos,
            photo_error,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedPeopleSearch;

    fn orchestrator(seed: u64) -> IdentityOrchestrator<ScriptedPeopleSearch, StdRng> {
        IdentityOrchestrator::new(ScriptedPeopleSearch::new(), StdRng::seed_from_u64(seed))
            .with_today(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn test_skeleton_honours_overrides() {
        let mut orchestrator = orchestrator(1);
        let request = GenerationRequest::new()
            .age(35)
            .gender(Gender::Female)
            .locale(Locale::Ru)
            .identifier("12534466");

        let identity = orchestrator.build_skeleton(&request).unwrap();
        assert_eq!(identity.birth_date().year(), 1989);
        assert_eq!(identity.gender(), Gender::Female);
        assert_eq!(identity.locale(), Locale::Ru);
        assert_eq!(identity.identifier(), Some("12534466"));
        assert!(identity.names().is_none());
    }

    #[test]
    fn test_skeleton_default_age_range() {
        let mut orchestrator = orchestrator(2);
        let request = GenerationRequest::new();
        for _ in 0..100 {
            let identity = orchestrator.build_skeleton(&request).unwrap();
            let age = identity.age_on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
            assert!((MIN_DEFAULT_AGE..=MAX_DEFAULT_AGE).contains(&age));
            assert!(identity.identifier().is_none());
        }
    }

    #[test]
    fn test_skeleton_is_reproducible_with_seed() {
        let request = GenerationRequest::new();
        let a = orchestrator(42).build_skeleton(&request).unwrap();
        let b = orchestrator(42).build_skeleton(&request).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_skeleton_rejects_absurd_age() {
        let mut orchestrator = orchestrator(3);
        let err = orchestrator
            .build_skeleton(&GenerationRequest::new().age(u32::MAX))
            .unwrap_err();
        assert!(matches!(err, PersonaError::Config(_)));
    }
}
