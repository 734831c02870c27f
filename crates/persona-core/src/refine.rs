//! Search refinement: converge on a name pair by perturbing the birth date
//!
//! Each attempt searches for profiles sharing the identity's gender, age,
//! locale and birth day/month, then infers name pools from the eligible
//! results. When a pool comes back empty the birth day/month is redrawn
//! (same year) and the next attempt runs. The loop is bounded by
//! `max_attempts`; running out is terminal for the generation run.

use chrono::{Datelike, NaiveDate, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::api::{CandidateRecord, PeopleSearch, SearchQuery};
use crate::config::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SEARCH_COUNT};
use crate::error::PersonaError;
use crate::filter::{self, NamePools};
use crate::identity::Identity;
use crate::Result;

/// Perturbed days stop at 28 so every month is valid
pub const MAX_PERTURBED_DAY: u32 = 28;

/// Outcome of a successful refinement
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Identity with names resolved
    pub identity: Identity,
    /// Eligible candidates of the attempt that resolved the names
    pub eligible: Vec<CandidateRecord>,
    /// Number of searches issued, including the successful one
    pub attempts: u32,
}

/// Bounded search-and-refine loop over a [`PeopleSearch`] backend
pub struct SearchRefinementEngine<'a, S: PeopleSearch + ?Sized> {
    search: &'a S,
    max_attempts: u32,
    search_count: u32,
    today: NaiveDate,
}

impl<'a, S: PeopleSearch + ?Sized> SearchRefinementEngine<'a, S> {
    pub fn new(search: &'a S) -> Self {
        SearchRefinementEngine {
            search,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            search_count: DEFAULT_SEARCH_COUNT,
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_search_count(mut self, search_count: u32) -> Self {
        self.search_count = search_count;
        self
    }

    /// Reference date for age computation
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Build the query for the identity's current state.
    pub fn build_query<R: Rng + ?Sized>(&self, identity: &Identity, rng: &mut R) -> SearchQuery {
        let age = identity.age_on(self.today);
        let birth_date = identity.birth_date();
        SearchQuery {
            sort: rng.gen_range(0..=1),
            count: self.search_count,
            birth_day: birth_date.day(),
            birth_month: birth_date.month(),
            fields: "photo_id".to_string(),
            age_from: age,
            age_to: age,
            gender: identity.gender(),
            has_photo: true,
            locale: identity.locale(),
        }
    }

    /// Run attempts until a name pair is resolved or the budget runs out.
    ///
    /// An API error ends refinement immediately with that error.
    pub async fn refine<R: Rng + ?Sized>(
        &self,
        mut identity: Identity,
        rng: &mut R,
    ) -> Result<Refinement> {
        for attempt in 1..=self.max_attempts {
            let query = self.build_query(&identity, rng);
            info!(
                attempt,
                day = query.birth_day,
                month = query.birth_month,
                age = query.age_from,
                "Searching candidates"
            );

            let candidates = self.search.search_users(&query).await.inspect_err(|e| {
                warn!(attempt, error = %e, "Candidate search failed");
            })?;
            let total = candidates.len();
            let eligible = filter::eligible(candidates);
            debug!(attempt, total, eligible = eligible.len(), "Filtered candidates");

            match filter::name_pools(&eligible) {
                NamePools::Ready {
                    first_names,
                    last_names,
                } => {
                    let first = &first_names[rng.gen_range(0..first_names.len())];
                    let last = &last_names[rng.gen_range(0..last_names.len())];
                    identity.resolve_names(first.as_str(), last.as_str())?;
                    info!(attempt, first_name = %first, last_name = %last, "Resolved name pair");
                    return Ok(Refinement {
                        identity,
                        eligible,
                        attempts: attempt,
                    });
                }
                NamePools::NoLastName => {
                    debug!(attempt, "No last name passes the frequency threshold");
                }
                NamePools::NoFirstName { last_names } => {
                    debug!(
                        attempt,
                        last_names = last_names.len(),
                        "No first name passes the frequency threshold"
                    );
                }
            }

            if attempt < self.max_attempts {
                identity.perturb_birth_date(
                    rng.gen_range(1..=MAX_PERTURBED_DAY),
                    rng.gen_range(1..=12),
                )?;
            }
        }

        warn!(attempts = self.max_attempts, "Refinement exhausted");
        Err(PersonaError::RefinementExhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{open_candidate, ScriptedPeopleSearch, ScriptedReply};
    use crate::identity::{Gender, Locale};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn skeleton() -> Identity {
        Identity::new(
            NaiveDate::from_ymd_opt(1994, 3, 30).unwrap(),
            Gender::Female,
            Locale::En,
        )
    }

    fn qualifying_set() -> Vec<CandidateRecord> {
        let mut set: Vec<CandidateRecord> = (0..6)
            .map(|i| open_candidate(i, "Olga", "Smirnova"))
            .collect();
        set.extend((10..13).map(|i| open_candidate(i, "Irina", "Volkova")));
        set
    }

    #[test]
    fn test_build_query_uses_identity_state() {
        let search = ScriptedPeopleSearch::new();
        let engine = SearchRefinementEngine::new(&search).with_today(today());
        let query = engine.build_query(&skeleton(), &mut StdRng::seed_from_u64(1));
        assert_eq!(query.age_from, 30);
        assert_eq!(query.age_to, 30);
        assert_eq!(query.birth_day, 30);
        assert_eq!(query.birth_month, 3);
        assert_eq!(query.count, 1000);
        assert!(query.has_photo);
        assert!(query.sort <= 1);
    }

    #[tokio::test]
    async fn test_resolves_in_one_attempt() {
        let search = ScriptedPeopleSearch::new();
        search.push_search(ScriptedReply::Items(qualifying_set()));
        let engine = SearchRefinementEngine::new(&search).with_today(today());

        let refinement = engine
            .refine(skeleton(), &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();

        assert_eq!(refinement.attempts, 1);
        assert_eq!(search.queries().len(), 1);
        assert_eq!(refinement.identity.first_name(), Some("Olga"));
        let last = refinement.identity.last_name().unwrap();
        assert!(last == "Smirnova" || last == "Volkova");
        assert_eq!(refinement.eligible.len(), 9);
    }

    #[tokio::test]
    async fn test_perturbs_after_failed_attempt() {
        let search = ScriptedPeopleSearch::new();
        let lone = open_candidate(1, "Olga", "Smirnova");
        search.push_search(ScriptedReply::Items(vec![lone]));
        search.push_search(ScriptedReply::Items(qualifying_set()));
        let engine = SearchRefinementEngine::new(&search).with_today(today());

        let refinement = engine
            .refine(skeleton(), &mut StdRng::seed_from_u64(5))
            .await
            .unwrap();

        assert_eq!(refinement.attempts, 2);
        let queries = search.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[1].birth_day <= MAX_PERTURBED_DAY);
        assert_eq!(queries[1].age_from, queries[0].age_from);
        assert_eq!(refinement.identity.birth_date().year(), 1994);
    }

    #[tokio::test]
    async fn test_missing_first_names_also_perturbs() {
        let search = ScriptedPeopleSearch::new();
        // Smirnova qualifies as a last name, but no first name appears six times
        let sparse: Vec<CandidateRecord> = (0..3)
            .map(|i| open_candidate(i, "Olga", "Smirnova"))
            .collect();
        search.push_search(ScriptedReply::Items(sparse));
        search.push_search(ScriptedReply::Items(qualifying_set()));
        let engine = SearchRefinementEngine::new(&search).with_today(today());

        let refinement = engine
            .refine(skeleton(), &mut StdRng::seed_from_u64(9))
            .await
            .unwrap();
        assert_eq!(refinement.attempts, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_after_budget() {
        let search = ScriptedPeopleSearch::new();
        let engine = SearchRefinementEngine::new(&search)
            .with_today(today())
            .with_max_attempts(4);

        let err = engine
            .refine(skeleton(), &mut StdRng::seed_from_u64(11))
            .await
            .unwrap_err();

        assert!(matches!(err, PersonaError::RefinementExhausted { attempts: 4 }));
        assert_eq!(search.queries().len(), 4);
    }

    #[tokio::test]
    async fn test_api_error_stops_refinement() {
        let search = ScriptedPeopleSearch::new();
        search.push_search(ScriptedReply::ApiError {
            code: 6,
            message: "Too many requests per second".to_string(),
        });
        search.push_search(ScriptedReply::Items(qualifying_set()));
        let engine = SearchRefinementEngine::new(&search).with_today(today());

        let err = engine
            .refine(skeleton(), &mut StdRng::seed_from_u64(13))
            .await
            .unwrap_err();

        assert!(matches!(err, PersonaError::ApiError { code: 6, .. }));
        assert_eq!(search.queries().len(), 1);
    }
}
