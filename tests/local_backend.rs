use std::fs;
use std::path::Path;

use tempfile::TempDir;

use contents_store::{ContentStore, ContentsError, LocalFs, SaveModel, StoreConfig};

fn store(dir: &TempDir) -> ContentStore<LocalFs> {
    store_at(dir.path())
}

fn store_at(base: &Path) -> ContentStore<LocalFs> {
    let config = StoreConfig::from_toml_str(
        r#"
        [roots]
        root_dir = "/home/alice/notebooks"
        shared_dir = "/srv/notebooks"
        "#,
    )
    .unwrap();
    let store = ContentStore::from_config(LocalFs::new(base), &config);
    store.ensure_root_directories().unwrap();
    store
}

#[test]
fn test_files_land_under_base_dir() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    store.save(&SaveModel::directory(), "proj").unwrap();
    store.save(&SaveModel::text("hi"), "proj/x.txt").unwrap();

    let on_disk = dir.path().join("home/alice/notebooks/proj/x.txt");
    assert_eq!(fs::read_to_string(on_disk).unwrap(), "hi");
    assert!(dir.path().join("home/alice/notebooks/shared").is_dir());
}

#[test]
fn test_checkpoint_dir_from_config() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    store.save(&SaveModel::directory(), "d").unwrap();
    fs::create_dir(dir.path().join("home/alice/notebooks/d/.ipynb_checkpoints")).unwrap();
    store.delete("d").unwrap();
    assert!(!dir.path().join("home/alice/notebooks/d").exists());
}

#[test]
fn test_rename_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    store.save(&SaveModel::text("a"), "a.txt").unwrap();
    store.save(&SaveModel::text("b"), "b.txt").unwrap();
    assert!(matches!(
        store.rename("a.txt", "b.txt"),
        Err(ContentsError::AlreadyExists(_))
    ));

    store.rename("a.txt", "c.txt").unwrap();
    let root = dir.path().join("home/alice/notebooks");
    assert!(!root.join("a.txt").exists());
    assert_eq!(fs::read_to_string(root.join("c.txt")).unwrap(), "a");
}

#[test]
fn test_relative_segments_cannot_touch_host_files() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    fs::create_dir(&base).unwrap();
    let victim = dir.path().join("victim.txt");
    fs::write(&victim, "keep").unwrap();
    let store = store_at(&base);
    store.save(&SaveModel::text("a"), "a.txt").unwrap();

    assert!(matches!(
        store.delete("../../../../victim.txt"),
        Err(ContentsError::OutsideRoot(_))
    ));
    assert!(matches!(
        store.save(&SaveModel::text("gone"), "../../../../victim.txt"),
        Err(ContentsError::OutsideRoot(_))
    ));
    assert!(matches!(
        store.rename("a.txt", "../../../../moved.txt"),
        Err(ContentsError::OutsideRoot(_))
    ));

    assert_eq!(fs::read_to_string(&victim).unwrap(), "keep");
    assert!(!dir.path().join("moved.txt").exists());
    assert!(base.join("home/alice/notebooks/a.txt").exists());
}
