//! Project session lifecycle: create, reopen, cache warm-up and refresh

mod common;

use art_picker::project::{self, PROJECT_FILE};
use art_picker::{
    CardIdentity, MissingSelectionPolicy, PickerError, PrintingId, ProjectSession, SelectOutcome,
    SelectionPhase, Settings,
};
use common::{printing, standard_catalog, FakeCatalog};
use mtg_common::CatalogError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

fn id(name: &str) -> CardIdentity {
    CardIdentity::from_name(name)
}

#[tokio::test]
async fn test_create_reports_warnings_and_saves() {
    let temp_dir = TempDir::new().unwrap();
    let (session, warnings) = ProjectSession::create(
        temp_dir.path(),
        "2x Lightning Bolt\n7x\nSol Ring\n1 lightning bolt",
        standard_catalog(),
        Settings::default(),
    )
    .unwrap();

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].line_number, 2);
    assert_eq!(session.state().cards.len(), 2);
    assert_eq!(session.state().cards[0].requested_quantity, 3);
    assert!(temp_dir.path().join(PROJECT_FILE).is_file());
    assert_eq!(session.store().catalog().lookup_count(), 0);
}

#[tokio::test]
async fn test_create_refuses_existing_project() {
    let temp_dir = TempDir::new().unwrap();
    ProjectSession::create(temp_dir.path(), "Sol Ring", standard_catalog(), Settings::default())
        .unwrap();

    let err = ProjectSession::create(
        temp_dir.path(),
        "Counterspell",
        standard_catalog(),
        Settings::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, PickerError::Io(ref e) if e.kind() == std::io::ErrorKind::AlreadyExists));
}

#[tokio::test]
async fn test_reopen_restores_state_without_network() {
    let temp_dir = TempDir::new().unwrap();
    let bolt = id("Lightning Bolt");
    {
        let (mut session, _) = ProjectSession::create(
            temp_dir.path(),
            "Lightning Bolt\nSol Ring",
            standard_catalog(),
            Settings::default(),
        )
        .unwrap();
        session.warm_cache().await.unwrap();
        session.move_cursor(&bolt, 1).unwrap();
        session.select_current(&bolt).unwrap();
        session.toggle_all_prints(&id("Sol Ring")).unwrap();
    }

    // A catalog that knows nothing: everything must come from disk
    let session =
        ProjectSession::open(temp_dir.path(), FakeCatalog::new(), Settings::default()).unwrap();
    assert_eq!(
        session.selector().selection(&bolt).phase(),
        SelectionPhase::Selected(PrintingId::new("LEA", "161"))
    );
    assert!(session.selector().selection(&id("Sol Ring")).all_prints_override);
    assert_eq!(session.state().active_card_index, 1);
    assert_eq!(session.selector().candidates(&bolt).len(), 2);
    assert_eq!(session.store().catalog().lookup_count(), 0);
    assert_eq!(session.progress().selected, 1);

    // Undo history does not survive a restart
    let mut session = session;
    assert_eq!(
        session.undo().unwrap(),
        art_picker::UndoOutcome::NothingToUndo
    );
}

#[tokio::test]
async fn test_open_corrupt_project_fails() {
    let temp_dir = TempDir::new().unwrap();
    ProjectSession::create(temp_dir.path(), "Sol Ring", standard_catalog(), Settings::default())
        .unwrap();
    std::fs::write(temp_dir.path().join(PROJECT_FILE), "{\"version\": 1, \"state\": {").unwrap();

    let err = ProjectSession::open(temp_dir.path(), standard_catalog(), Settings::default())
        .err()
        .unwrap();
    assert!(err.is_project_fatal());
}

#[tokio::test]
async fn test_lost_cache_is_refetched() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut session, _) = ProjectSession::create(
            temp_dir.path(),
            "Lightning Bolt",
            standard_catalog(),
            Settings::default(),
        )
        .unwrap();
        session.warm_cache().await.unwrap();
        session.select_current(&id("Lightning Bolt")).unwrap();
    }
    std::fs::remove_dir_all(project::cache_dir(temp_dir.path())).unwrap();

    let mut session =
        ProjectSession::open(temp_dir.path(), standard_catalog(), Settings::default()).unwrap();
    assert!(!session.selector().has_printings(&id("Lightning Bolt")));
    assert!(session.selector().selection(&id("Lightning Bolt")).is_selected());

    let items = session.warm_cache().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].result.as_ref().unwrap(), &2);
    assert_eq!(session.store().catalog().lookup_count(), 1);
}

#[tokio::test]
async fn test_warm_cache_reports_per_card_failures() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _) = ProjectSession::create(
        temp_dir.path(),
        "Lightning Bolt\nTotally Made Up Card\nSol Ring",
        standard_catalog(),
        Settings::default(),
    )
    .unwrap();

    let items = session.warm_cache().await.unwrap();
    assert_eq!(items.len(), 3);
    let failed: Vec<&str> = items
        .iter()
        .filter(|i| i.result.is_err())
        .map(|i| i.card_name.as_str())
        .collect();
    assert_eq!(failed, vec!["Totally Made Up Card"]);
    assert!(matches!(
        items[1].result,
        Err(PickerError::FetchFailure(CatalogError::NotFound(_)))
    ));
    assert!(session.selector().has_printings(&id("Sol Ring")));

    // Cards already loaded are skipped next time
    let again = session.warm_cache().await.unwrap();
    assert_eq!(again.len(), 1);
}

#[tokio::test]
async fn test_failed_refresh_keeps_printings() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _) = ProjectSession::create(
        temp_dir.path(),
        "Lightning Bolt",
        standard_catalog(),
        Settings::default(),
    )
    .unwrap();
    let bolt = id("Lightning Bolt");
    session.load_card(&bolt).await.unwrap();

    session.store().catalog().offline.store(true, Ordering::SeqCst);
    let err = session.refresh(&bolt).await.unwrap_err();
    assert!(matches!(err, PickerError::FetchFailure(ref e) if e.is_transient()));
    assert_eq!(session.selector().candidates(&bolt).len(), 2);

    // And the disk copy survives a reopen
    drop(session);
    let session =
        ProjectSession::open(temp_dir.path(), FakeCatalog::new(), Settings::default()).unwrap();
    assert_eq!(session.selector().candidates(&bolt).len(), 2);
}

#[tokio::test]
async fn test_refresh_picks_up_new_printings() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _) = ProjectSession::create(
        temp_dir.path(),
        "Counterspell",
        standard_catalog(),
        Settings::default(),
    )
    .unwrap();
    let counterspell = id("Counterspell");
    session.load_card(&counterspell).await.unwrap();
    assert_eq!(
        session.select_current(&counterspell).unwrap(),
        SelectOutcome::Selected(PrintingId::new("LEA", "54"))
    );
    drop(session);

    let newer = FakeCatalog::new().with_card(
        "Counterspell",
        vec![
            printing("lea", "54", "1993-08-05"),
            printing("cmm", "81", "2023-08-04"),
        ],
    );
    let mut session = ProjectSession::open(temp_dir.path(), newer, Settings::default()).unwrap();
    assert_eq!(session.refresh(&counterspell).await.unwrap(), 2);
    assert_eq!(
        session.selector().candidates(&counterspell).printings[0].id(),
        PrintingId::new("CMM", "81")
    );
    // Selection is independent of the refreshed list order
    assert_eq!(
        session.selector().selection(&counterspell).selected_printing,
        Some(PrintingId::new("LEA", "54"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_materialize_through_session_store() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _) = ProjectSession::create(
        temp_dir.path(),
        "Lightning Bolt",
        standard_catalog(),
        Settings::default(),
    )
    .unwrap();
    let bolt = id("Lightning Bolt");
    session.load_card(&bolt).await.unwrap();
    let card = session.state().cards[0].clone();

    let store = Arc::clone(session.store());
    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let card = card.clone();
        handles.push(tokio::spawn(async move {
            store
                .materialize_image(&card, &PrintingId::new("LEA", "161"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(store.catalog().image_count(), 1);
}

#[tokio::test]
async fn test_export_options_follow_settings() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings {
        export_workers: 7,
        ..Settings::default()
    };
    let (session, _) =
        ProjectSession::create(temp_dir.path(), "Sol Ring", standard_catalog(), settings).unwrap();

    let out = temp_dir.path().join("out");
    let options = session.export_options(&out);
    assert_eq!(options.workers, 7);
    assert_eq!(options.target_dir, out);
    assert_eq!(options.missing, MissingSelectionPolicy::Skip);
    assert!(!options.one_file_per_copy);
}
