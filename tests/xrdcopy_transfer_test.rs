//! Staged transfer tests against a fake xrdcopy binary.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncReadExt as _;

use eosns::{ClientError, ClientOptions, CommandRunner, UnixIdentity, XrdcopyTransport};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn transport(xrdcopy: &Path, cache: &Path) -> XrdcopyTransport {
    let opts = Arc::new(ClientOptions {
        xrdcopy_binary: xrdcopy.to_string_lossy().into_owned(),
        cache_directory: cache.to_path_buf(),
        mgm_url: "root://mgm.test".to_string(),
        ..Default::default()
    });
    let runner = CommandRunner::new(opts.clone());
    XrdcopyTransport::new(opts, runner)
}

fn identity() -> UnixIdentity {
    UnixIdentity { uid: 1001, gid: 1001 }
}

fn cache_entries(cache: &Path) -> Vec<String> {
    std::fs::read_dir(cache)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("eosread-") || n.starts_with("eoswrite-"))
        .collect()
}

#[tokio::test]
async fn test_read_stages_file_and_cleans_up_on_drop() {
    let bin = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let args_log = bin.path().join("args.txt");

    // the fake copies "remote" content into the local target (5th argument)
    let script = write_script(
        bin.path(),
        "xrdcopy",
        &format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" > {}\nprintf 'hello from the mgm' > \"$5\"\n",
            args_log.display()
        ),
    );
    let transport = transport(&script, cache.path());

    let mut handle = transport.read(identity(), "/eos/user/j/jdoe/f.txt").await.unwrap();
    assert!(handle.path().exists());

    let mut content = String::new();
    handle.read_to_string(&mut content).await.unwrap();
    assert_eq!(content, "hello from the mgm");

    let args = std::fs::read_to_string(&args_log).unwrap();
    assert!(args.starts_with("--nopbar --silent -f root://mgm.test///eos/user/j/jdoe/f.txt"));
    assert!(args.trim_end().ends_with("-OSeos.ruid=1001&eos.rgid=1001"));

    drop(handle);
    assert!(cache_entries(cache.path()).is_empty());
}

#[tokio::test]
async fn test_read_maps_exit_code_2_to_not_found() {
    let bin = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let script = write_script(
        bin.path(),
        "xrdcopy",
        "#!/bin/sh\necho 'no such file on the mgm' >&2\nexit 2\n",
    );
    let transport = transport(&script, cache.path());

    let err = transport.read(identity(), "/eos/missing").await.unwrap_err();
    match err {
        ClientError::NotFound(msg) => assert!(msg.contains("no such file")),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(cache_entries(cache.path()).is_empty());
}

#[tokio::test]
async fn test_read_maps_exit_code_22_to_permission_denied() {
    let bin = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let script = write_script(bin.path(), "xrdcopy", "#!/bin/sh\nexit 22\n");
    let transport = transport(&script, cache.path());

    let err = transport.read(identity(), "/eos/forbidden").await.unwrap_err();
    assert!(matches!(err, ClientError::PermissionDenied(_)));
    assert!(cache_entries(cache.path()).is_empty());
}

#[tokio::test]
async fn test_write_stages_stream_and_pushes() {
    let bin = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let uploaded = bin.path().join("uploaded.bin");
    let args_log = bin.path().join("args.txt");

    // the fake records the staged file content (4th argument is the source)
    let script = write_script(
        bin.path(),
        "xrdcopy",
        &format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" > {}\ncp \"$4\" {}\n",
            args_log.display(),
            uploaded.display()
        ),
    );
    let transport = transport(&script, cache.path());

    transport
        .write(identity(), "/eos/user/j/jdoe/up.bin", &b"payload bytes"[..])
        .await
        .unwrap();

    assert_eq!(std::fs::read(&uploaded).unwrap(), b"payload bytes");
    let args = std::fs::read_to_string(&args_log).unwrap();
    assert!(args.contains("root://mgm.test///eos/user/j/jdoe/up.bin"));
    assert!(args.trim_end().ends_with("-ODeos.ruid=1001&eos.rgid=1001"));
    // the eoswrite staging file is gone
    assert!(cache_entries(cache.path()).is_empty());
}

#[tokio::test]
async fn test_write_cleans_staging_on_failure() {
    let bin = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let script = write_script(bin.path(), "xrdcopy", "#!/bin/sh\nexit 1\n");
    let transport = transport(&script, cache.path());

    let err = transport
        .write(identity(), "/eos/user/j/jdoe/up.bin", &b"payload"[..])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Internal(_)));
    assert!(cache_entries(cache.path()).is_empty());
}
