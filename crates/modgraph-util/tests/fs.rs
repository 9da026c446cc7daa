use modgraph_util::errors::ModgraphError;
use modgraph_util::fs::{ensure_dir, find_ancestor_with, write_atomic};
use tempfile::TempDir;

#[test]
fn test_find_ancestor_with_nested() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("Modgraph.toml"), "").unwrap();
    let nested = tmp.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();
    let result = find_ancestor_with(&nested, "Modgraph.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_not_found() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(find_ancestor_with(tmp.path(), "NonExistent.file"), None);
}

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_write_atomic_creates_file() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("out").join("doc.module");
    write_atomic(&target, |w| {
        w.write_all(b"{}\n")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}\n");
}

#[test]
fn test_write_atomic_failure_leaves_no_file() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("doc.module");
    let result = write_atomic(&target, |w| {
        w.write_all(b"{ partial")?;
        Err(ModgraphError::Generic {
            message: "boom".to_string(),
        })
    });
    assert!(result.is_err());
    assert!(!target.exists());
    let leftovers: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "temp file was not cleaned up");
}

#[test]
fn test_write_atomic_failure_keeps_previous_content() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("doc.module");
    std::fs::write(&target, "old").unwrap();
    let _ = write_atomic(&target, |_| {
        Err(ModgraphError::Generic {
            message: "boom".to_string(),
        })
    });
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
}
