use super::*;

fn scratch() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(FILE_NAME);
    (dir, path)
}

#[test]
fn open_missing_file_is_empty() {
    let (_dir, path) = scratch();
    let storage = LocalStorage::open_at(&path).unwrap();
    assert!(storage.token().is_none());
    assert!(!path.exists());
}

#[test]
fn set_writes_through_and_reopens() {
    let (_dir, path) = scratch();
    let mut storage = LocalStorage::open_at(&path).unwrap();
    storage.set(SIDEBAR_COLLAPSED_KEY, &true).unwrap();
    storage.set_token(Some("tok-1")).unwrap();

    let reopened = LocalStorage::open_at(&path).unwrap();
    assert_eq!(reopened.get::<bool>(SIDEBAR_COLLAPSED_KEY), Some(true));
    assert_eq!(reopened.token().as_deref(), Some("tok-1"));
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn set_token_none_removes_key() {
    let (_dir, path) = scratch();
    let mut storage = LocalStorage::open_at(&path).unwrap();
    storage.set_token(Some("tok-1")).unwrap();
    storage.set_token(None).unwrap();
    assert!(LocalStorage::open_at(&path).unwrap().token().is_none());
}

#[test]
fn wrong_shape_reads_as_absent() {
    let (_dir, path) = scratch();
    let mut storage = LocalStorage::open_at(&path).unwrap();
    storage.set(SIDEBAR_COLLAPSED_KEY, &"yes").unwrap();
    assert_eq!(storage.get::<bool>(SIDEBAR_COLLAPSED_KEY), None);
}

#[test]
fn empty_file_is_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(FILE_NAME);
    fs::write(&path, "  \n").unwrap();
    assert!(LocalStorage::open_at(&path).unwrap().get::<bool>("x").is_none());
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(FILE_NAME);
    fs::write(&path, "[1, 2").unwrap();
    assert!(matches!(LocalStorage::open_at(&path), Err(StorageError::Json(_))));
}

#[test]
fn open_uses_configured_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..ClientConfig::default()
    };
    let storage = LocalStorage::open(&config).unwrap();
    assert_eq!(storage.path(), dir.path().join(FILE_NAME));
}
