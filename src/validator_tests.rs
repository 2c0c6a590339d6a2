// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the configuration validator.

#[cfg(test)]
mod tests {
    use crate::errors::ValidatorError;
    use crate::validator::{CommandOutput, FnRunner, ValidationResult, Validator};
    use std::io;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    fn output(exit_code: Option<i32>, text: &str, timed_out: bool) -> CommandOutput {
        CommandOutput {
            exit_code,
            output: text.to_string(),
            timed_out,
        }
    }

    fn validator_returning(result: CommandOutput) -> Validator {
        Validator::with_runner(
            "named-checkconf",
            Duration::from_secs(5),
            Arc::new(FnRunner::new(move |_, _| Ok(result.clone()))),
        )
    }

    // =====================================================
    // Verdict interpretation
    // =====================================================

    #[tokio::test]
    async fn test_zero_exit_is_valid() {
        let result = validator_returning(output(Some(0), "", false))
            .validate("options { };")
            .await
            .unwrap();

        assert_eq!(
            result,
            ValidationResult {
                valid: true,
                error: String::new(),
                output: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_invalid_with_trimmed_error() {
        let text = "  /tmp/x.conf:3: unknown option 'bogus'\n";
        let result = validator_returning(output(Some(1), text, false))
            .validate("bogus yes;")
            .await
            .unwrap();

        assert!(!result.valid);
        assert_eq!(result.error, "/tmp/x.conf:3: unknown option 'bogus'");
        assert_eq!(result.output, text);
    }

    #[tokio::test]
    async fn test_killed_by_signal_is_invalid() {
        let result = validator_returning(output(None, "killed", false))
            .validate("x;")
            .await
            .unwrap();
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_timeout_is_invalid_with_fixed_message() {
        let result = validator_returning(output(None, "partial", true))
            .validate("x;")
            .await
            .unwrap();

        assert!(!result.valid);
        assert_eq!(result.error, "validation timed out");
        assert_eq!(result.output, "partial");
    }

    #[tokio::test]
    async fn test_launch_failure_is_an_error() {
        let validator = Validator::with_runner(
            "named-checkconf",
            Duration::from_secs(5),
            Arc::new(FnRunner::new(|_, _| {
                Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
            })),
        );

        let err = validator.validate("x;").await.unwrap_err();
        assert!(matches!(err, ValidatorError::Launch { .. }));
        assert_eq!(err.kind(), "ExecLaunchError");
    }

    // =====================================================
    // Temporary file handling
    // =====================================================

    #[tokio::test]
    async fn test_candidate_file_written_then_removed() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_runner = Arc::clone(&seen);

        let validator = Validator::with_runner(
            "/usr/sbin/named-checkconf",
            Duration::from_secs(5),
            Arc::new(FnRunner::new(move |program, args| {
                assert_eq!(program, "/usr/sbin/named-checkconf");
                assert_eq!(args.len(), 1);
                let path = Path::new(&args[0]);
                assert!(path.extension().is_some_and(|e| e == "conf"));

                let content = std::fs::read_to_string(path)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let mode = std::fs::metadata(path)?.permissions().mode();
                    assert_eq!(mode & 0o777, 0o644);
                }
                *seen_in_runner.lock().unwrap() = Some((args[0].clone(), content));
                Ok(CommandOutput {
                    exit_code: Some(0),
                    ..CommandOutput::default()
                })
            })),
        );

        validator.validate("recursion no;\n").await.unwrap();

        let (path, content) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(content, "recursion no;\n");
        assert!(!Path::new(&path).exists());
    }

    #[tokio::test]
    async fn test_candidate_removed_after_launch_failure() {
        let seen = Arc::new(Mutex::new(String::new()));
        let seen_in_runner = Arc::clone(&seen);

        let validator = Validator::with_runner(
            "missing-checker",
            Duration::from_secs(5),
            Arc::new(FnRunner::new(move |_, args| {
                seen_in_runner.lock().unwrap().clone_from(&args[0]);
                Err(io::Error::other("cannot exec"))
            })),
        );

        assert!(validator.validate("x;").await.is_err());
        let path = seen.lock().unwrap().clone();
        assert!(!path.is_empty());
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let validator = Validator::new("named-checkconf", Duration::ZERO);
        assert_eq!(validator.timeout(), Duration::from_secs(5));
        assert_eq!(validator.checker(), "named-checkconf");
    }

    // =====================================================
    // Real processes. `/bin/sh` is used as the checker so the candidate
    // file itself is the script being run.
    // =====================================================

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_checker_accepts() {
        let validator = Validator::new("/bin/sh", Duration::from_secs(5));
        let result = validator.validate("echo looks fine").await.unwrap();

        assert!(result.valid);
        assert_eq!(result.output, "looks fine\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_checker_rejects_with_combined_output() {
        let validator = Validator::new("/bin/sh", Duration::from_secs(5));
        let result = validator
            .validate("echo first\necho 'line 3: syntax error' >&2\nexit 2")
            .await
            .unwrap();

        assert!(!result.valid);
        assert_eq!(result.output, "first\nline 3: syntax error\n");
        assert_eq!(result.error, "first\nline 3: syntax error");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_checker_timeout_kills_and_cleans_up() {
        let validator = Validator::new("/bin/sh", Duration::from_millis(500));
        let start = Instant::now();
        let result = validator
            .validate("echo \"$0\"\nsleep 30\necho never")
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(!result.valid);
        assert_eq!(result.error, "validation timed out");

        let candidate = result.output.trim();
        assert!(candidate.ends_with(".conf"), "output was {:?}", result.output);
        assert!(!Path::new(candidate).exists());
        assert!(!result.output.contains("never"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_checker_missing_executable() {
        let validator = Validator::new("/nonexistent/named-checkconf", Duration::from_secs(5));
        let err = validator.validate("x;").await.unwrap_err();
        assert_eq!(err.kind(), "ExecLaunchError");
    }
}
