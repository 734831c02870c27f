//! Persona Core: synthetic identity generation
//!
//! Mines a people-search service for profiles matching a birth date, gender
//! and locale, infers a common first/last name pair from the results,
//! downloads a sample of one matching profile's photos and manufactures
//! credentials for the resulting identity.
//!
//! ## Pipeline
//!
//! [`IdentityOrchestrator`] builds the skeleton, runs the
//! [`SearchRefinementEngine`] until a name pair is found, assigns the
//! identifier, hands a candidate to the [`PhotoAcquisitionService`] and
//! finishes with [`credentials`].

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fakes;
pub mod filter;
pub mod identity;
pub mod orchestrator;
pub mod photos;
pub mod refine;
pub mod telemetry;
pub mod translit;

pub use api::{CandidateRecord, PeopleSearch, PhotoRecord, PhotoSize, SearchQuery};
pub use client::ApiClient;
pub use config::PersonaConfig;
pub use credentials::{generate_password, generate_usernames};
pub use error::{PersonaError, Result};
pub use identity::{derive_identifier, Gender, Identity, Locale};
pub use orchestrator::{Generation, GenerationRequest, IdentityOrchestrator};
pub use photos::{PhotoAcquisitionService, PhotoReport};
pub use refine::{Refinement, SearchRefinementEngine};
pub use telemetry::init_tracing;

/// persona-core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
