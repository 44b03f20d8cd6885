//! Locating and running external command-line backends.
//!
//! Arguments are passed as an argv vector, never through a shell, so
//! passwords and paths need no quoting. The password is masked wherever the
//! command line is logged.

use crate::error::RenderError;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Resolve a binary: explicit path, then `env_var`, then each of `names` on
/// `PATH`.
pub(crate) fn locate(
    backend: &'static str,
    explicit: Option<&Path>,
    env_var: &str,
    names: &[&str],
) -> Result<PathBuf, RenderError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(env_var).filter(|v| !v.is_empty()).map(PathBuf::from));

    if let Some(path) = configured {
        return if path.is_file() {
            Ok(path)
        } else {
            Err(RenderError::unavailable(
                backend,
                format!("configured path '{}' does not exist", path.display()),
            ))
        };
    }

    names
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| {
            RenderError::unavailable(backend, format!("none of {names:?} found on PATH"))
        })
}

/// Spawn `program` and wait for it. Only spawn failures are errors here.
pub(crate) fn execute(
    backend: &'static str,
    program: &Path,
    args: &[OsString],
    secret: &str,
) -> Result<Output, RenderError> {
    debug!(
        "Running {} {}",
        program.display(),
        redacted_command_line(args, secret)
    );

    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| RenderError::unavailable(backend, format!("{}: {}", program.display(), e)))
}

/// Like [`execute`], but a non-zero exit status is `BackendFailed`.
pub(crate) fn run(
    backend: &'static str,
    program: &Path,
    args: &[OsString],
    secret: &str,
) -> Result<Output, RenderError> {
    let output = execute(backend, program, args, secret)?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(RenderError::failed(backend, failure_detail(&output, secret)))
    }
}

/// Exit status plus the last stderr line, with the password masked.
pub(crate) fn failure_detail(output: &Output, secret: &str) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let last_line = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("no diagnostic output");
    format!("{}: {}", output.status, mask(last_line, secret))
}

/// Build an argv vector from mixed string and path pieces.
pub(crate) fn args<I, S>(parts: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    parts.into_iter().map(|p| p.as_ref().to_os_string()).collect()
}

fn redacted_command_line(args: &[OsString], secret: &str) -> String {
    args.iter()
        .map(|a| mask(&a.to_string_lossy(), secret))
        .collect::<Vec<_>>()
        .join(" ")
}

fn mask(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_reports_missing_tool_as_unavailable() {
        let err = locate(
            "nothing",
            None,
            "AADHAAR_QR_TEST_UNSET_VAR",
            &["definitely-not-a-real-binary-7f3a"],
        )
        .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn locate_rejects_missing_explicit_path() {
        let err = locate(
            "gs",
            Some(Path::new("/nonexistent/bin/gs")),
            "AADHAAR_QR_TEST_UNSET_VAR",
            &["sh"],
        )
        .unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("/nonexistent/bin/gs"));
    }

    #[test]
    fn locate_accepts_explicit_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let found = locate("tool", Some(file.path()), "AADHAAR_QR_TEST_UNSET_VAR", &[]).unwrap();
        assert_eq!(found, file.path());
    }

    #[test]
    fn spawn_failure_is_unavailable() {
        let err = execute(
            "ghost",
            Path::new("/nonexistent/bin/ghost"),
            &args(["-v"]),
            "",
        )
        .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_failed_and_masks_secret() {
        let sh = which::which("sh").unwrap();
        let err = run(
            "sh",
            &sh,
            &args(["-c", "echo 'bad password KASH2005' >&2; exit 3"]),
            "KASH2005",
        )
        .unwrap_err();
        assert!(!err.is_unavailable());
        let msg = err.to_string();
        assert!(msg.contains("bad password ****"), "got: {msg}");
        assert!(!msg.contains("KASH2005"));
    }

    #[test]
    fn mask_is_noop_for_empty_secret() {
        assert_eq!(mask("-sPDFPassword=", ""), "-sPDFPassword=");
        assert_eq!(
            redacted_command_line(&args(["-upw", "s3cret", "in.pdf"]), "s3cret"),
            "-upw **** in.pdf"
        );
    }
}
