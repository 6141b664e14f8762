mod common;

use common::{Item, names, notes_zip, photos_zip, write_zip};
use tempfile::TempDir;
use zipnav::{Activation, BASE_DEPTH, BackOutcome, Layout, NavError, Navigator};

#[tokio::test]
async fn single_folder_archive_starts_inside_folder() {
    let tmp = TempDir::new().unwrap();
    let mut nav = Navigator::open(&notes_zip(tmp.path())).await.unwrap();

    assert_eq!(
        nav.index().layout(),
        &Layout::SingleFolder("notes".to_string())
    );
    assert!(nav.state().is_single_folder_archive());
    assert_eq!(names(nav.visible()), ["sub/", "a.txt"]);
    assert_eq!(nav.state().depth_bound(), BASE_DEPTH);

    let sub = nav.position_of("sub").unwrap();
    assert_eq!(nav.enter(sub).unwrap(), Activation::Entered);
    assert_eq!(names(nav.visible()), ["b.txt"]);
    assert_eq!(nav.state().depth_bound(), BASE_DEPTH + 1);

    assert_eq!(nav.back(), BackOutcome::Ascended);
    assert_eq!(names(nav.visible()), ["sub/", "a.txt"]);
    assert_eq!(nav.state().current().to_string(), "notes");

    assert_eq!(nav.back(), BackOutcome::Exited);
    assert_eq!(names(nav.visible()), ["sub/", "a.txt"]);
}

#[tokio::test]
async fn folder_without_directory_records_is_still_browsable() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.zip");
    write_zip(
        &path,
        &[
            Item::File("notes/a.txt", b"note a"),
            Item::File("notes/sub/b.txt", b"note b"),
        ],
    );

    let mut nav = Navigator::open(&path).await.unwrap();
    assert_eq!(names(nav.visible()), ["sub/", "a.txt"]);
    nav.enter(0).unwrap();
    assert_eq!(names(nav.visible()), ["b.txt"]);
}

#[tokio::test]
async fn loose_archive_lists_top_level() {
    let tmp = TempDir::new().unwrap();
    let mut nav = Navigator::open(&photos_zip(tmp.path())).await.unwrap();

    assert_eq!(nav.index().layout(), &Layout::Loose);
    assert_eq!(names(nav.visible()), ["img1.jpg", "img2.jpg"]);
    assert!(nav.state().current().is_root());
    assert_eq!(nav.back(), BackOutcome::Exited);
}

#[tokio::test]
async fn enter_then_back_restores_listing() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("tree.zip");
    write_zip(
        &path,
        &[
            Item::File("readme.md", b"top"),
            Item::File("src/main.rs", b"fn main() {}"),
            Item::File("src/util/mod.rs", b""),
            Item::File("src/util/deep/leaf.txt", b"leaf"),
            Item::File("docs/guide.pdf", b"%PDF"),
        ],
    );
    let mut nav = Navigator::open(&path).await.unwrap();

    assert_eq!(round_trips(&mut nav), 4);
    assert!(nav.state().current().is_root());
}

/// Enter and leave every directory below the current one, depth-first,
/// checking that each return restores the listing. Returns how many
/// directories were visited.
fn round_trips(nav: &mut Navigator) -> usize {
    let before = nav.visible().to_vec();
    let depth = nav.state().depth_bound();
    let mut visited = 0;

    for (position, entry) in before.iter().enumerate() {
        if !entry.is_directory() {
            continue;
        }
        assert_eq!(nav.enter(position).unwrap(), Activation::Entered);
        assert_eq!(nav.state().depth_bound(), depth + 1);
        assert!(nav
            .visible()
            .iter()
            .all(|e| e.segments().parent().as_ref() == Some(entry.segments())));

        visited += 1 + round_trips(nav);

        assert_eq!(nav.back(), BackOutcome::Ascended);
        assert_eq!(nav.visible(), before.as_slice());
        assert_eq!(nav.state().depth_bound(), depth);
    }
    visited
}

#[tokio::test]
async fn directories_first_then_case_insensitive() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("mixed.zip");
    write_zip(
        &path,
        &[
            Item::Dir("B/"),
            Item::File("a.txt", b"a"),
            Item::Dir("A/"),
            Item::File("C.txt", b"c"),
        ],
    );
    let nav = Navigator::open(&path).await.unwrap();
    let paths: Vec<&str> = nav.visible().iter().map(|e| e.path()).collect();
    assert_eq!(paths, ["A/", "B/", "a.txt", "C.txt"]);
}

#[tokio::test]
async fn bad_name_becomes_placeholder() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("odd.zip");
    write_zip(
        &path,
        &[
            Item::File("good.txt", b"fine"),
            Item::File("bad//name.txt", b"lost"),
        ],
    );

    let nav = Navigator::open(&path).await.unwrap();
    assert_eq!(names(nav.visible()), ["good.txt", "unknown"]);
    assert!(nav.visible()[1].is_malformed());

    match nav.read_entry(1).await {
        Err(NavError::MalformedEntry { name }) => assert_eq!(name, "bad//name.txt"),
        other => panic!("expected malformed entry error, got {:?}", other.map(|d| d.len())),
    }
    assert_eq!(nav.read_entry(0).await.unwrap(), b"fine");
}

#[tokio::test]
async fn files_are_reported_not_entered() {
    let tmp = TempDir::new().unwrap();
    let mut nav = Navigator::open(&photos_zip(tmp.path())).await.unwrap();

    match nav.enter(0).unwrap() {
        Activation::File(entry) => assert_eq!(entry.path(), "img1.jpg"),
        Activation::Entered => panic!("a file must not be entered"),
    }
    assert!(nav.state().current().is_root());
    assert!(matches!(
        nav.enter(7),
        Err(NavError::NoSuchEntry { position: 7 })
    ));
}

#[tokio::test]
async fn unreadable_archives_fail_to_open() {
    let tmp = TempDir::new().unwrap();

    let text = tmp.path().join("not-a.zip");
    std::fs::write(&text, b"this is plain text and not an archive at all").unwrap();
    assert!(matches!(
        Navigator::open(&text).await,
        Err(NavError::ArchiveUnreadable { .. })
    ));

    let missing = tmp.path().join("missing.zip");
    assert!(matches!(
        Navigator::open(&missing).await,
        Err(NavError::ArchiveUnreadable { .. })
    ));
}

#[tokio::test]
async fn pipe_reads_without_touching_disk() {
    let tmp = TempDir::new().unwrap();
    let nav = Navigator::open(&photos_zip(tmp.path())).await.unwrap();

    assert_eq!(nav.read_entry(1).await.unwrap(), b"second image bytes");
    assert!(!tmp.path().join("photos").exists());
}
