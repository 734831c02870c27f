//! Photo acquisition against the scripted backend.
//!
//! Covers directory reset, skipped transfers, sampling bounds and the
//! soft failures of the listing call.

use chrono::NaiveDate;
use persona_core::fakes::{open_candidate, photo_at, PhotoBody, ScriptedPeopleSearch, ScriptedReply};
use persona_core::{Gender, Identity, Locale, PersonaError, PhotoAcquisitionService};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn identity_with_id(identifier: &str) -> Identity {
    let mut identity = Identity::new(
        NaiveDate::from_ymd_opt(1994, 5, 17).unwrap(),
        Gender::Male,
        Locale::En,
    );
    identity.resolve_names("Pavel", "Morozov").unwrap();
    identity.assign_identifier(identifier).unwrap();
    identity
}

fn serve_photos(search: &ScriptedPeopleSearch, owner_id: i64, count: usize) -> Vec<String> {
    let urls: Vec<String> = (1..=count)
        .map(|n| format!("https://cdn.test/{owner_id}/{n}.jpg"))
        .collect();
    search.set_photos(
        owner_id,
        ScriptedReply::Items(urls.iter().map(|u| photo_at(u)).collect()),
    );
    for url in &urls {
        let chunks = vec![url.as_bytes().to_vec(), b"-tail".to_vec()];
        search.set_photo_body(url, PhotoBody::Chunks(chunks));
    }
    urls
}

fn dir_entries(path: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn stale_files_do_not_survive_reacquisition() {
    let root = tempfile::tempdir().unwrap();
    let search = ScriptedPeopleSearch::new();
    serve_photos(&search, 7, 2);

    let stale_dir = root.path().join("abc123");
    std::fs::create_dir_all(&stale_dir).unwrap();
    for stale in ["stale.jpeg", "9.jpeg"] {
        std::fs::write(stale_dir.join(stale), b"previous run").unwrap();
    }

    let service = PhotoAcquisitionService::new(&search, root.path());
    let report = service
        .acquire(
            &open_candidate(7, "Pavel", "Morozov"),
            &identity_with_id("abc123"),
            &mut StdRng::seed_from_u64(1),
        )
        .await
        .unwrap();

    assert_eq!(report.directory, stale_dir);
    assert_eq!(report.files.len(), 2);
    assert_eq!(dir_entries(&stale_dir), vec!["1.jpeg", "2.jpeg"]);
}

#[tokio::test]
async fn sample_is_bounded_and_streams_whole_body() {
    let root = tempfile::tempdir().unwrap();
    let search = ScriptedPeopleSearch::new();
    let urls = serve_photos(&search, 3, 9);

    let service = PhotoAcquisitionService::new(&search, root.path());
    let report = service
        .acquire(
            &open_candidate(3, "Pavel", "Morozov"),
            &identity_with_id("id-3"),
            &mut StdRng::seed_from_u64(2),
        )
        .await
        .unwrap();

    assert_eq!(report.files.len(), 4);
    assert_eq!(report.skipped, 0);

    let fetched = search.fetched_urls();
    assert_eq!(fetched.len(), 4);
    for (file, url) in report.files.iter().zip(&fetched) {
        assert!(urls.contains(url));
        let body = std::fs::read(file).unwrap();
        assert_eq!(body, format!("{url}-tail").into_bytes());
    }
}

#[tokio::test]
async fn duplicate_urls_are_fetched_once() {
    let root = tempfile::tempdir().unwrap();
    let search = ScriptedPeopleSearch::new();
    let url = "https://cdn.test/5/same.jpg";
    search.set_photos(
        5,
        ScriptedReply::Items(vec![photo_at(url), photo_at(url), photo_at(url)]),
    );
    search.set_photo_body(url, PhotoBody::Chunks(vec![b"jpeg".to_vec()]));

    let service = PhotoAcquisitionService::new(&search, root.path());
    let report = service
        .acquire(
            &open_candidate(5, "Pavel", "Morozov"),
            &identity_with_id("dup"),
            &mut StdRng::seed_from_u64(3),
        )
        .await
        .unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(search.fetched_urls(), vec![url.to_string()]);
}

#[tokio::test]
async fn failed_transfers_are_skipped_and_numbering_stays_contiguous() {
    let root = tempfile::tempdir().unwrap();
    let search = ScriptedPeopleSearch::new();
    let good = "https://cdn.test/8/good.jpg";
    let refused = "https://cdn.test/8/refused.jpg";
    let broken = "https://cdn.test/8/broken.jpg";
    search.set_photos(
        8,
        ScriptedReply::Items(vec![photo_at(good), photo_at(refused), photo_at(broken)]),
    );
    search.set_photo_body(good, PhotoBody::Chunks(vec![b"good".to_vec()]));
    search.set_photo_body(refused, PhotoBody::RequestFails);
    search.set_photo_body(broken, PhotoBody::BreaksAfter(vec![b"half".to_vec()]));

    let service = PhotoAcquisitionService::new(&search, root.path());
    let report = service
        .acquire(
            &open_candidate(8, "Pavel", "Morozov"),
            &identity_with_id("partial"),
            &mut StdRng::seed_from_u64(4),
        )
        .await
        .unwrap();

    assert_eq!(report.skipped, 2);
    let saved = root.path().join("partial").join("1.jpeg");
    assert_eq!(report.files, vec![saved]);
    assert_eq!(dir_entries(&report.directory), vec!["1.jpeg"]);
    assert_eq!(std::fs::read(&report.files[0]).unwrap(), b"good");
}

#[tokio::test]
async fn empty_listing_is_soft_failure_and_leaves_disk_alone() {
    let root = tempfile::tempdir().unwrap();
    let search = ScriptedPeopleSearch::new();
    search.set_photos(4, ScriptedReply::Items(vec![]));

    let existing = root.path().join("keep");
    std::fs::create_dir_all(&existing).unwrap();
    std::fs::write(existing.join("1.jpeg"), b"earlier").unwrap();

    let service = PhotoAcquisitionService::new(&search, root.path());
    let err = service
        .acquire(
            &open_candidate(4, "Pavel", "Morozov"),
            &identity_with_id("keep"),
            &mut StdRng::seed_from_u64(5),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PersonaError::EmptyCandidateSet { owner_id: 4 }));
    assert!(err.is_soft());
    assert_eq!(dir_entries(&existing), vec!["1.jpeg"]);
}

#[tokio::test]
async fn listing_api_error_is_soft_failure() {
    let root = tempfile::tempdir().unwrap();
    let search = ScriptedPeopleSearch::new();
    search.set_photos(
        6,
        ScriptedReply::ApiError {
            code: 30,
            message: "This profile is private".to_string(),
        },
    );

    let service = PhotoAcquisitionService::new(&search, root.path());
    let err = service
        .acquire(
            &open_candidate(6, "Pavel", "Morozov"),
            &identity_with_id("private"),
            &mut StdRng::seed_from_u64(6),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PersonaError::ApiError { code: 30, .. }));
    assert!(err.is_soft());
    assert!(!root.path().join("private").exists());
}

#[tokio::test]
async fn acquisition_requires_identifier() {
    let root = tempfile::tempdir().unwrap();
    let search = ScriptedPeopleSearch::new();
    serve_photos(&search, 2, 1);
    let identity = Identity::new(
        NaiveDate::from_ymd_opt(1994, 5, 17).unwrap(),
        Gender::Male,
        Locale::En,
    );

    let service = PhotoAcquisitionService::new(&search, root.path());
    let err = service
        .acquire(
            &open_candidate(2, "Pavel", "Morozov"),
            &identity,
            &mut StdRng::seed_from_u64(7),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PersonaError::InvariantViolation(_)));
}

#[tokio::test]
async fn every_transfer_failing_is_soft_and_leaves_no_directory() {
    let root = tempfile::tempdir().unwrap();
    let search = ScriptedPeopleSearch::new();
    let refused = "https://cdn.test/9/refused.jpg";
    let broken = "https://cdn.test/9/broken.jpg";
    search.set_photos(
        9,
        ScriptedReply::Items(vec![photo_at(refused), photo_at(broken)]),
    );
    search.set_photo_body(refused, PhotoBody::RequestFails);
    search.set_photo_body(broken, PhotoBody::BreaksAfter(vec![b"half".to_vec()]));

    let service = PhotoAcquisitionService::new(&search, root.path());
    let err = service
        .acquire(
            &open_candidate(9, "Pavel", "Morozov"),
            &identity_with_id("nothing"),
            &mut StdRng::seed_from_u64(8),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PersonaError::PhotoTransferFailed {
            owner_id: 9,
            attempted: 2
        }
    ));
    assert!(err.is_soft());
    assert!(!root.path().join("nothing").exists());
}
