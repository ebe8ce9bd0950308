//! Interactive console: one open session across many commands

mod common;

use art_picker::console::run_console;
use art_picker::{CardIdentity, PrintingId, ProjectSession, SelectionPhase, Settings};
use common::{standard_catalog, FakeCatalog};
use tempfile::TempDir;

fn id(name: &str) -> CardIdentity {
    CardIdentity::from_name(name)
}

async fn run(session: &mut ProjectSession<FakeCatalog>, input: &str) -> String {
    let mut out = Vec::new();
    run_console(session, input.as_bytes(), &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_select_then_undo_in_one_session() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _) = ProjectSession::create(
        temp_dir.path(),
        "Lightning Bolt\nSol Ring",
        standard_catalog(),
        Settings::default(),
    )
    .unwrap();
    let bolt = id("Lightning Bolt");

    let output = run(&mut session, "s\nu\nu\nq\ns\n").await;

    assert!(output.contains("Selected M10 146 for Lightning Bolt"), "{}", output);
    assert!(output.contains("Undid last change to Lightning Bolt"), "{}", output);
    assert!(output.contains("Nothing to undo"), "{}", output);
    assert_eq!(
        session.selector().selection(&bolt).phase(),
        SelectionPhase::Unselected
    );
    assert_eq!(session.state().active_card_index, 0);

    // The undo was saved, and nothing after `q` ran
    drop(session);
    let session =
        ProjectSession::open(temp_dir.path(), FakeCatalog::new(), Settings::default()).unwrap();
    assert!(!session.selector().selection(&bolt).is_selected());
    assert_eq!(session.progress().selected, 0);
}

#[tokio::test]
async fn test_navigation_and_cursor_moves() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _) = ProjectSession::create(
        temp_dir.path(),
        "Lightning Bolt\nSol Ring",
        standard_catalog(),
        Settings::default(),
    )
    .unwrap();

    let output = run(&mut session, "n\nj\ns\np\nt\n").await;

    assert_eq!(
        session.selector().selection(&id("Sol Ring")).selected_printing,
        Some(PrintingId::new("C21", "263"))
    );
    assert_eq!(session.state().active_card_index, 0);
    assert!(output.contains("Card 2/2: Sol Ring"), "{}", output);
    assert!(output.contains("1/2 cards selected"), "{}", output);
}

#[tokio::test]
async fn test_bad_input_is_reported_and_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _) = ProjectSession::create(
        temp_dir.path(),
        "Lightning Bolt",
        standard_catalog(),
        Settings::default(),
    )
    .unwrap();

    let output = run(&mut session, "zz\ng 9\n\ns\n").await;

    assert!(output.contains("Unknown command \"zz\""), "{}", output);
    assert!(output.contains("Card 9 out of range (project has 1 cards)"), "{}", output);
    assert_eq!(
        session.selector().selection(&id("Lightning Bolt")).phase(),
        SelectionPhase::Selected(PrintingId::new("M10", "146"))
    );
}

#[tokio::test]
async fn test_fetch_failure_does_not_end_the_session() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _) = ProjectSession::create(
        temp_dir.path(),
        "Lightning Bolt",
        FakeCatalog::new(),
        Settings::default(),
    )
    .unwrap();

    let output = run(&mut session, "s\nc\nq\n").await;

    assert!(
        output.contains("Could not fetch printings for Lightning Bolt"),
        "{}",
        output
    );
    assert!(output.contains("Lightning Bolt has no selection"), "{}", output);
}
