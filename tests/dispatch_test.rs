mod common;

use common::{sandbox, Sandbox};
use pretty_assertions::assert_eq;
use rfs::dispatch;
use rfs::{ErrorKind, GenericPath};
use rstest::*;

#[rstest]
#[tokio::test]
async fn test_expand_paths_resolves_remote_wildcards_only(mut sandbox: Sandbox) {
    sandbox.remote_file("/data/a.csv", b"a");
    sandbox.remote_file("/data/b.csv", b"b");
    sandbox.remote_file("/data/c.txt", b"c");

    let raw = vec!["r:/data/*.csv".to_string(), "local*.csv".to_string()];
    let mut expanded = dispatch::expand_paths(&mut sandbox.conn, &raw, "", true).await.unwrap();
    expanded[..2].sort_by(|x, y| x.path.cmp(&y.path));

    assert_eq!(
        expanded,
        vec![
            GenericPath::remote("/data/a.csv"),
            GenericPath::remote("/data/b.csv"),
            GenericPath::local("local*.csv"),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn test_expand_paths_applies_remote_prefix(mut sandbox: Sandbox) {
    sandbox.remote_file("/share/x", b"x");

    let raw = vec!["r:x".to_string()];
    let expanded = dispatch::expand_paths(&mut sandbox.conn, &raw, "/share/", true).await.unwrap();
    assert_eq!(expanded, vec![GenericPath::remote("/share/x")]);
}

#[rstest]
#[tokio::test]
async fn test_generic_cp_mixed_sources_into_remote_directory(mut sandbox: Sandbox) {
    sandbox.remote_file("/r.txt", b"remote");
    sandbox.remote_dir("/dst");
    let local = sandbox.local_file("l.txt", b"local");

    let sources = vec![GenericPath::remote("/r.txt"), GenericPath::local(&local)];
    dispatch::generic_cp(&mut sandbox.conn, &sources, &GenericPath::remote("/dst"), false)
        .await
        .unwrap();

    assert_eq!(sandbox.read_remote("/dst/r.txt"), b"remote");
    assert_eq!(sandbox.read_remote("/dst/l.txt"), b"local");
}

#[rstest]
#[tokio::test]
async fn test_generic_cp_pulls_tree_to_local(mut sandbox: Sandbox) {
    sandbox.remote_file("/tree/sub/f", b"f");
    let target = sandbox.local("copy");

    let sources = vec![GenericPath::remote("/tree")];
    dispatch::generic_cp(&mut sandbox.conn, &sources, &GenericPath::local(&target), true)
        .await
        .unwrap();

    assert_eq!(std::fs::read(format!("{}/sub/f", target)).unwrap(), b"f");
}

#[rstest]
#[tokio::test]
async fn test_generic_cp_counts_sources_across_sides(mut sandbox: Sandbox) {
    sandbox.remote_file("/r.txt", b"r");
    let local = sandbox.local_file("l.txt", b"l");

    let sources = vec![GenericPath::remote("/r.txt"), GenericPath::local(&local)];
    let err = dispatch::generic_cp(&mut sandbox.conn, &sources, &GenericPath::remote("/single"), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!sandbox.remote_exists("/single"));
}

#[rstest]
#[tokio::test]
async fn test_generic_mv_removes_transferred_source(mut sandbox: Sandbox) {
    sandbox.remote_dir("/inbox");
    let local = sandbox.local_file("report.txt", b"report");

    let sources = vec![GenericPath::local(&local)];
    dispatch::generic_mv(&mut sandbox.conn, &sources, &GenericPath::remote("/inbox"))
        .await
        .unwrap();

    assert_eq!(sandbox.read_remote("/inbox/report.txt"), b"report");
    assert!(!std::path::Path::new(&local).exists());
}

#[rstest]
#[tokio::test]
async fn test_generic_mv_downloads_and_deletes_remote(mut sandbox: Sandbox) {
    sandbox.remote_file("/out/a", b"a");
    let target = sandbox.local("out");

    let sources = vec![GenericPath::remote("/out")];
    dispatch::generic_mv(&mut sandbox.conn, &sources, &GenericPath::local(&target))
        .await
        .unwrap();

    assert_eq!(std::fs::read(format!("{}/a", target)).unwrap(), b"a");
    assert!(!sandbox.remote_exists("/out"));
}

#[rstest]
#[tokio::test]
async fn test_generic_rm_ls_and_mkdir(mut sandbox: Sandbox) {
    let local_dir = sandbox.local("made/deep");
    let paths = vec![GenericPath::remote("/x/y"), GenericPath::local(&local_dir)];

    dispatch::generic_mkdir(&mut sandbox.conn, &paths, true).await.unwrap();
    assert!(sandbox.remote_exists("/x/y"));
    assert!(std::path::Path::new(&local_dir).is_dir());

    let listings = dispatch::generic_ls(&mut sandbox.conn, &[GenericPath::remote("/x")])
        .await
        .unwrap();
    assert_eq!(listings, vec![(GenericPath::remote("/x"), vec!["y".to_string()])]);

    dispatch::generic_rm(&mut sandbox.conn, &[GenericPath::remote("/x")], true)
        .await
        .unwrap();
    assert!(!sandbox.remote_exists("/x"));
}

#[rstest]
#[tokio::test]
async fn test_generic_mv_mixed_batch_into_remote_directory(mut sandbox: Sandbox) {
    sandbox.remote_dir("/dst");
    sandbox.remote_file("/r.bin", b"remote bytes");
    let local = sandbox.local_file("l.bin", b"local bytes");

    let sources = vec![GenericPath::remote("/r.bin"), GenericPath::local(&local)];
    dispatch::generic_mv(&mut sandbox.conn, &sources, &GenericPath::remote("/dst"))
        .await
        .unwrap();

    assert_eq!(sandbox.read_remote("/dst/r.bin"), b"remote bytes");
    assert_eq!(sandbox.read_remote("/dst/l.bin"), b"local bytes");
    assert!(!sandbox.remote_exists("/r.bin"));
    assert!(!std::path::Path::new(&local).exists());
}

#[rstest]
#[tokio::test]
async fn test_generic_mv_remote_file_to_local_name(mut sandbox: Sandbox) {
    sandbox.remote_file("/report.txt", b"quarterly");
    let target = sandbox.local("renamed.txt");

    dispatch::generic_mv(
        &mut sandbox.conn,
        &[GenericPath::remote("/report.txt")],
        &GenericPath::local(&target),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"quarterly");
    assert!(!sandbox.remote_exists("/report.txt"));
}

#[rstest]
#[tokio::test]
async fn test_generic_ls_and_rm_on_both_sides(mut sandbox: Sandbox) {
    sandbox.remote_file("/r/one", b"1");
    let local_dir = sandbox.local("l");
    std::fs::create_dir(&local_dir).unwrap();
    std::fs::write(format!("{}/two", local_dir), b"2").unwrap();

    let targets = vec![GenericPath::remote("/r"), GenericPath::local(&local_dir)];
    let listings = dispatch::generic_ls(&mut sandbox.conn, &targets).await.unwrap();
    assert_eq!(
        listings,
        vec![
            (GenericPath::remote("/r"), vec!["one".to_string()]),
            (GenericPath::local(&local_dir), vec!["two".to_string()]),
        ]
    );

    let err = dispatch::generic_rm(&mut sandbox.conn, &targets, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongType);

    dispatch::generic_rm(&mut sandbox.conn, &targets, true).await.unwrap();
    assert!(!sandbox.remote_exists("/r"));
    assert!(!std::path::Path::new(&local_dir).exists());
}

#[rstest]
#[tokio::test]
async fn test_generic_mkdir_without_parents_needs_them(mut sandbox: Sandbox) {
    let paths = vec![GenericPath::remote("/p/q")];

    let err = dispatch::generic_mkdir(&mut sandbox.conn, &paths, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    dispatch::generic_mkdir(&mut sandbox.conn, &paths, true).await.unwrap();
    dispatch::generic_mkdir(&mut sandbox.conn, &paths, true).await.unwrap();
    assert!(sandbox.conn.is_dir("/p/q").await.unwrap());
}
