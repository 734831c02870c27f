//! The synthesized identity record
//!
//! `Identity` is exclusively owned by one generation run. Its write-once
//! fields (`identifier`, `password`, `usernames`) and the fixed birth year are
//! guarded by the setters below rather than by convention.

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PersonaError;
use crate::Result;

/// Gender as understood by the search service (`sex` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Wire value sent as the `sex` query parameter
    pub fn as_param(&self) -> u8 {
        match self {
            Gender::Female => 1,
            Gender::Male => 2,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Gender::Female
        } else {
            Gender::Male
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "female" | "f" | "1" => Ok(Gender::Female),
            "male" | "m" | "2" => Ok(Gender::Male),
            other => Err(PersonaError::Config(format!("unknown gender: {other}"))),
        }
    }
}

/// Locale of the searched profiles; RU names need transliteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Ru,
}

impl Locale {
    /// Wire value sent as the `lang` query parameter
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }

    pub fn requires_transliteration(&self) -> bool {
        matches!(self, Locale::Ru)
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Locale::En
        } else {
            Locale::Ru
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ru" => Ok(Locale::Ru),
            other => Err(PersonaError::Config(format!("unknown locale: {other}"))),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A synthesized person
///
/// Only serializable: every instance goes through [`Identity::new`] and the
/// guarded setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    identifier: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Gender,
    locale: Locale,
    birth_date: NaiveDate,
    password: Option<String>,
    usernames: Option<Vec<String>>,
}

impl Identity {
    /// Create the skeleton of an identity. The birth year is fixed from here on.
    pub fn new(birth_date: NaiveDate, gender: Gender, locale: Locale) -> Self {
        Identity {
            identifier: None,
            first_name: None,
            last_name: None,
            gender,
            locale,
            birth_date,
            password: None,
            usernames: None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn usernames(&self) -> &[String] {
        self.usernames.as_deref().unwrap_or_default()
    }

    /// Whole years between the birth year and `reference`'s year
    pub fn age_on(&self, reference: NaiveDate) -> u32 {
        (reference.year() - self.birth_date.year()).max(0) as u32
    }

    /// Both names, once refinement has resolved them
    pub fn names(&self) -> Option<(&str, &str)> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        }
    }

    /// Assign the identifier. Fails if one is already present.
    pub fn assign_identifier(&mut self, identifier: impl Into<String>) -> Result<()> {
        if self.identifier.is_some() {
            return Err(PersonaError::InvariantViolation(
                "identifier is already assigned".to_string(),
            ));
        }
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(PersonaError::InvariantViolation(
                "identifier must not be empty".to_string(),
            ));
        }
        self.identifier = Some(identifier);
        Ok(())
    }

    /// Move the birth date to another day/month of the same year.
    pub fn perturb_birth_date(&mut self, day: u32, month: u32) -> Result<()> {
        let year = self.birth_date.year();
        self.birth_date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            PersonaError::InvariantViolation(format!("invalid birth date {year}-{month}-{day}"))
        })?;
        Ok(())
    }

    /// Record the inferred name pair.
    pub fn resolve_names(
        &mut self,
        first: impl Into<String>,
        last: impl Into<String>,
    ) -> Result<()> {
        if self.names().is_some() {
            return Err(PersonaError::InvariantViolation(
                "names are already resolved".to_string(),
            ));
        }
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        Ok(())
    }

    pub fn assign_password(&mut self, password: String) -> Result<()> {
        self.require_names("password")?;
        if self.password.is_some() {
            return Err(PersonaError::InvariantViolation(
                "password is already assigned".to_string(),
            ));
        }
        self.password = Some(password);
        Ok(())
    }

    pub fn assign_usernames(&mut self, usernames: Vec<String>) -> Result<()> {
        self.require_names("usernames")?;
        if self.usernames.is_some() {
            return Err(PersonaError::InvariantViolation(
                "usernames are already assigned".to_string(),
            ));
        }
        self.usernames = Some(usernames);
        Ok(())
    }

    fn require_names(&self, field: &str) -> Result<()> {
        if self.names().is_none() {
            return Err(PersonaError::InvariantViolation(format!(
                "{field} requires resolved names"
            )));
        }
        Ok(())
    }

    /// Content-derived identifier for this identity's resolved names.
    pub fn derived_identifier(&self) -> Result<String> {
        let (first, last) = self.names().ok_or_else(|| {
            PersonaError::InvariantViolation("identifier derivation requires resolved names".into())
        })?;
        Ok(derive_identifier(last, first, self.birth_date))
    }
}

/// Stable storage key: SHA-256 over `last + first + YYYY-MM-DD`, hex encoded.
pub fn derive_identifier(last_name: &str, first_name: &str, birth_date: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    let key = format!("{last_name}{first_name}{birth_date}");
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
