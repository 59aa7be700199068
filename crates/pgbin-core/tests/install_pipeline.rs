//! Integration test: full install against a local release host.
//!
//! Serves a `.sha256` file and a tar.gz shaped like an upstream release,
//! then runs the pipeline with the real curl transport.

mod common;

use common::release_server::{self, Route};
use pgbin_core::checksum::{ChecksumEngine, NativeSha256};
use pgbin_core::config::Settings;
use pgbin_core::http::CurlTransport;
use pgbin_core::install::{
    BootstrapOutcome, InitOutput, Initializer, InstallContext, InstallPipeline, ProcessInitializer,
    ReleaseArtifact,
};
use pgbin_core::target::{Arch, LibcProbe, OsFamily};
use pgbin_core::ErrorKind;
use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use tempfile::tempdir;

const VERSION: &str = "17.2.0";
const TARGET: &str = "x86_64-unknown-linux-musl";

/// Reports an Alpine system.
struct AlpineProbe;

impl LibcProbe for AlpineProbe {
    fn ldd_version_output(&self) -> Option<String> {
        None
    }
    fn path_exists(&self, path: &Path) -> bool {
        path == Path::new("/etc/alpine-release")
    }
    fn list_dir(&self, _: &Path) -> Vec<String> {
        Vec::new()
    }
}

/// Creates the data directory and counts invocations.
#[derive(Default)]
struct CountingInit {
    calls: Cell<usize>,
}

impl Initializer for CountingInit {
    fn run(&self, _program: &Path, args: &[String]) -> std::io::Result<InitOutput> {
        self.calls.set(self.calls.get() + 1);
        std::fs::create_dir_all(&args[1])?;
        Ok(InitOutput {
            success: true,
            status: "exit status: 0".to_string(),
            output: "Success.".to_string(),
        })
    }
}

fn release_archive() -> Vec<u8> {
    let root = format!("postgresql-{}-{}", VERSION, TARGET);
    let initdb = format!("{}/bin/initdb", root);
    let psql = format!("{}/bin/psql", root);
    let libpq = format!("{}/lib/libpq.so.5", root);
    let script: &[u8] = b"#!/bin/sh\nmkdir -p \"$2\"\necho \"Success. You can now start the database server\"\n";
    common::build_tar_gz(&[
        (initdb.as_str(), script, 0o755),
        (psql.as_str(), &b"psql"[..], 0o755),
        (libpq.as_str(), &b"lib"[..], 0o644),
    ])
}

struct Fixture {
    server: release_server::ReleaseServer,
    settings: Settings,
    artifact: ReleaseArtifact,
}

fn serve(archive: Vec<u8>, sha_body: String) -> Fixture {
    let placeholder = ReleaseArtifact::new("/download", VERSION, TARGET);
    let mut routes = HashMap::new();
    routes.insert(placeholder.download_url.clone(), Route::ok(archive));
    routes.insert(placeholder.checksum_url.clone(), Route::ok(sha_body));
    let server = release_server::start(routes);
    let settings = Settings {
        download_base_url: format!("{}/download", server.base),
        ..Settings::default()
    };
    let artifact = ReleaseArtifact::new(&settings.download_base_url, VERSION, TARGET);
    Fixture {
        server,
        settings,
        artifact,
    }
}

fn engine() -> ChecksumEngine {
    ChecksumEngine::with_methods(vec![Box::new(NativeSha256)], false)
}

#[test]
fn installs_and_bootstraps_once() {
    let archive = release_archive();
    let sha = format!("{}  postgresql-{}-{}.tar.gz\n", common::sha256_hex(&archive), VERSION, TARGET);
    let fx = serve(archive, sha);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("postgres").join(VERSION);
    let transport = CurlTransport::new();
    let init = CountingInit::default();
    let engine = engine();
    let pipeline = InstallPipeline::new(&fx.settings, &transport, &AlpineProbe, &engine, &init);
    let ctx = InstallContext::new("postgresql", VERSION, &dest);

    let report = pipeline.run(&ctx, &OsFamily::Linux, &Arch::Amd64).unwrap();
    assert_eq!(report.target.target, TARGET);
    assert!(dest.join("bin/initdb").is_file());
    assert!(dest.join("lib/libpq.so.5").is_file());
    assert!(dest.join("data").is_dir());
    assert!(!dest.join(&fx.artifact.extracted_dir).exists());
    assert!(!dest.join(fx.artifact.partial_filename()).exists());
    assert_eq!(init.calls.get(), 1);

    // Second run downloads again but leaves the cluster alone.
    let report = pipeline.run(&ctx, &OsFamily::Linux, &Arch::Amd64).unwrap();
    assert!(matches!(report.bootstrap, BootstrapOutcome::AlreadyInitialized(_)));
    assert_eq!(init.calls.get(), 1);
    assert!(dest.join("bin/psql").is_file());
}

#[test]
fn mismatched_digest_leaves_no_archive() {
    let archive = release_archive();
    let fx = serve(archive, format!("{}\n", "0".repeat(64)));
    let dir = tempdir().unwrap();
    let dest = dir.path().join("pg");
    let transport = CurlTransport::new();
    let init = CountingInit::default();
    let engine = engine();

    let err = InstallPipeline::new(&fx.settings, &transport, &AlpineProbe, &engine, &init)
        .run(
            &InstallContext::new("postgres", VERSION, &dest),
            &OsFamily::Linux,
            &Arch::Amd64,
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ChecksumMismatch);
    assert!(!dest.join(fx.artifact.partial_filename()).exists());
    assert!(!dest.join("bin").exists());
    assert_eq!(init.calls.get(), 0);
    assert_eq!(fx.server.hits(&format!("/download/{}/{}", VERSION, fx.artifact.archive_filename)), 1);
}

#[test]
fn missing_release_is_checksum_fetch_failure() {
    let fx = serve(Vec::new(), String::new());
    let dir = tempdir().unwrap();
    let transport = CurlTransport::new();
    let init = CountingInit::default();
    let engine = engine();

    let err = InstallPipeline::new(&fx.settings, &transport, &AlpineProbe, &engine, &init)
        .run(
            &InstallContext::new("pg", "99.0.0", dir.path().join("pg")),
            &OsFamily::Linux,
            &Arch::Amd64,
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ChecksumFetchFailed);
    assert_eq!(err.get("status"), Some("404"));
}

#[cfg(unix)]
#[test]
fn runs_the_shipped_initdb() {
    let archive = release_archive();
    let sha = common::sha256_hex(&archive);
    let fx = serve(archive, sha);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("pg");
    let transport = CurlTransport::new();
    let engine = engine();

    let report = InstallPipeline::new(&fx.settings, &transport, &AlpineProbe, &engine, &ProcessInitializer)
        .run(
            &InstallContext::new("postgres", VERSION, &dest),
            &OsFamily::Linux,
            &Arch::Amd64,
        )
        .unwrap();
    assert_eq!(report.bootstrap, BootstrapOutcome::Initialized(dest.join("data")));
    assert!(dest.join("data").is_dir());
}
