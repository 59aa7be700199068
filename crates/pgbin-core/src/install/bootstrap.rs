//! One-time `initdb` of the data directory.

use crate::error::{ErrorKind, PgBinError, Result};
use crate::target::OsFamily;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Subdirectory of the destination holding the cluster.
pub const DATA_DIR: &str = "data";

const FAILURE_MARKERS: [&str; 3] = ["error", "failure", "fatal"];

/// Captured result of running the initializer.
#[derive(Debug, Clone)]
pub struct InitOutput {
    pub success: bool,
    /// Exit status as text (`exit status: 1`, `signal: 9`, ...).
    pub status: String,
    /// stdout followed by stderr.
    pub output: String,
}

/// Runs the cluster initialization binary.
pub trait Initializer {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<InitOutput>;
}

/// Spawns the real process and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessInitializer;

impl Initializer for ProcessInitializer {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<InitOutput> {
        let out = Command::new(program).args(args).output()?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(InitOutput {
            success: out.status.success(),
            status: out.status.to_string(),
            output,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// `data` already existed; nothing ran.
    AlreadyInitialized(PathBuf),
    Initialized(PathBuf),
}

impl BootstrapOutcome {
    pub fn data_dir(&self) -> &Path {
        match self {
            BootstrapOutcome::AlreadyInitialized(p) | BootstrapOutcome::Initialized(p) => p,
        }
    }
}

pub fn initdb_args(data_dir: &Path) -> Vec<String> {
    vec![
        "--pgdata".to_string(),
        data_dir.display().to_string(),
        "--username=postgres".to_string(),
        "--auth=trust".to_string(),
        "--encoding=UTF8".to_string(),
        "--locale=C".to_string(),
    ]
}

/// True if `output` mentions an error, failure or fatal condition (any case).
pub fn has_failure_marker(output: &str) -> bool {
    let lower = output.to_ascii_lowercase();
    FAILURE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Initialize `<dest>/data` unless it already exists.
pub fn bootstrap_data_dir(
    dest: &Path,
    os: &OsFamily,
    init: &dyn Initializer,
) -> Result<BootstrapOutcome> {
    let data_dir = dest.join(DATA_DIR);
    if data_dir.exists() {
        tracing::info!(data_dir = %data_dir.display(), "data directory exists; skipping initdb");
        return Ok(BootstrapOutcome::AlreadyInitialized(data_dir));
    }

    let program = dest
        .join("bin")
        .join(format!("initdb{}", os.executable_extension()));
    let args = initdb_args(&data_dir);
    let command = format!("{} {}", program.display(), args.join(" "));
    tracing::debug!(%command, "running initdb");

    let out = init.run(&program, &args).map_err(|e| {
        PgBinError::new(ErrorKind::InitializationFailed, "could not start initdb")
            .field("command", command.clone())
            .field("data_dir", data_dir.display().to_string())
            .with_source(e)
    })?;

    if !out.success || has_failure_marker(&out.output) {
        return Err(
            PgBinError::new(ErrorKind::InitializationFailed, "initdb reported a failure")
                .field("command", command)
                .field("status", out.status)
                .field("data_dir", data_dir.display().to_string())
                .output("output", &out.output),
        );
    }

    if !data_dir.is_dir() {
        return Err(PgBinError::new(
            ErrorKind::InitializationIncomplete,
            "initdb finished but the data directory does not exist",
        )
        .field("command", command)
        .field("data_dir", data_dir.display().to_string())
        .output("output", &out.output));
    }

    tracing::info!(data_dir = %data_dir.display(), "data directory initialized");
    Ok(BootstrapOutcome::Initialized(data_dir))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records calls; optionally creates the data dir like a real initdb.
    pub(crate) struct FakeInit {
        pub calls: RefCell<Vec<(PathBuf, Vec<String>)>>,
        pub create: bool,
        pub success: bool,
        pub output: String,
    }

    impl FakeInit {
        pub(crate) fn ok() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                create: true,
                success: true,
                output: "Success. You can now start the database server".to_string(),
            }
        }
    }

    impl Initializer for FakeInit {
        fn run(&self, program: &Path, args: &[String]) -> std::io::Result<InitOutput> {
            self.calls
                .borrow_mut()
                .push((program.to_path_buf(), args.to_vec()));
            if self.create {
                std::fs::create_dir_all(&args[1])?;
            }
            Ok(InitOutput {
                success: self.success,
                status: if self.success { "exit status: 0" } else { "exit status: 1" }.to_string(),
                output: self.output.clone(),
            })
        }
    }

    #[test]
    fn existing_data_dir_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        let init = FakeInit::ok();
        let out = bootstrap_data_dir(dir.path(), &OsFamily::Linux, &init).unwrap();
        assert!(matches!(out, BootstrapOutcome::AlreadyInitialized(_)));
        assert!(init.calls.borrow().is_empty());
    }

    #[test]
    fn runs_initdb_with_fixed_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let init = FakeInit::ok();
        let out = bootstrap_data_dir(dir.path(), &OsFamily::Windows, &init).unwrap();
        assert_eq!(out, BootstrapOutcome::Initialized(dir.path().join("data")));
        let calls = init.calls.borrow();
        assert_eq!(calls[0].0, dir.path().join("bin").join("initdb.exe"));
        assert!(calls[0].1.contains(&"--encoding=UTF8".to_string()));
        assert!(calls[0].1.contains(&"--locale=C".to_string()));
    }

    #[test]
    fn failure_marker_in_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let init = FakeInit {
            output: "initdb: FATAL: could not create directory".to_string(),
            ..FakeInit::ok()
        };
        let err = bootstrap_data_dir(dir.path(), &OsFamily::Linux, &init).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InitializationFailed);
        assert!(err.get("output").unwrap().contains("FATAL"));
        assert!(err.get("command").unwrap().contains("initdb"));
    }

    #[test]
    fn nonzero_exit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let init = FakeInit {
            success: false,
            output: String::new(),
            ..FakeInit::ok()
        };
        let err = bootstrap_data_dir(dir.path(), &OsFamily::Linux, &init).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InitializationFailed);
    }

    #[test]
    fn missing_data_dir_after_success_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let init = FakeInit {
            create: false,
            ..FakeInit::ok()
        };
        let err = bootstrap_data_dir(dir.path(), &OsFamily::Linux, &init).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InitializationIncomplete);
    }

    #[test]
    fn marker_scan_is_case_insensitive() {
        assert!(has_failure_marker("Some Error happened"));
        assert!(has_failure_marker("FAILURE"));
        assert!(!has_failure_marker("Success. You can now start the database server"));
    }
}
