// ABOUTME: Decides whether an execution succeeded from its structured error and program streams
// ABOUTME: The substring heuristic is a lossy fallback; installer output is never classified

use genly_sandbox::{ExecutionOutput, RuntimeError};

/// Printed by generated programs when an HTTP fetch fails
pub const FAILED_RETRIEVAL_MARKER: &str = "Failed to retrieve";
/// Printed by generated programs when they report a non-2xx response
pub const STATUS_CODE_MARKER: &str = "Status code:";
pub const TRACEBACK_MARKER: &str = "Traceback";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureSignal {
    /// The backend reported a structured error
    Runtime(RuntimeError),
    /// Anything written to the program's stderr
    Stderr,
    FailedRetrieval,
    StatusCode,
    Traceback,
}

impl FailureSignal {
    pub fn describe(&self) -> String {
        match self {
            FailureSignal::Runtime(err) => err.summary(),
            FailureSignal::Stderr => "program wrote to stderr".to_string(),
            FailureSignal::FailedRetrieval => {
                format!("output contains \"{}\"", FAILED_RETRIEVAL_MARKER)
            }
            FailureSignal::StatusCode => format!("output contains \"{}\"", STATUS_CODE_MARKER),
            FailureSignal::Traceback => format!("output contains \"{}\"", TRACEBACK_MARKER),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure(FailureSignal),
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }
}

/// Classify an execution result
pub fn classify(output: &ExecutionOutput) -> Verdict {
    if let Some(err) = &output.error {
        return Verdict::Failure(FailureSignal::Runtime(err.clone()));
    }

    match heuristic_signal(&output.stdout, &output.stderr) {
        Some(signal) => Verdict::Failure(signal),
        None => Verdict::Success,
    }
}

/// Substring heuristic kept for programs that report failure by printing.
/// Normal output that happens to contain a marker is misread as a failure,
/// and failures that print none of them are misread as success.
pub fn heuristic_signal(stdout: &str, stderr: &str) -> Option<FailureSignal> {
    if !stderr.trim().is_empty() {
        return Some(FailureSignal::Stderr);
    }
    if stdout.contains(FAILED_RETRIEVAL_MARKER) {
        return Some(FailureSignal::FailedRetrieval);
    }
    if stdout.contains(STATUS_CODE_MARKER) {
        return Some(FailureSignal::StatusCode);
    }
    if stdout.contains(TRACEBACK_MARKER) {
        return Some(FailureSignal::Traceback);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn output(stdout: &str, stderr: &str) -> ExecutionOutput {
        ExecutionOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("42", "", None)]
    #[case("0 1 1 2 3", "", None)]
    #[case("Status code: 404", "", Some(FailureSignal::StatusCode))]
    #[case("Failed to retrieve data", "", Some(FailureSignal::FailedRetrieval))]
    #[case(
        "Traceback (most recent call last):\n  File \"temp.py\"",
        "",
        Some(FailureSignal::Traceback)
    )]
    #[case("42", "ValueError: bad", Some(FailureSignal::Stderr))]
    #[case(
        "",
        "ERROR:root:Download could not be completed: connection refused\n",
        Some(FailureSignal::Stderr)
    )]
    #[case("42", "task not completed", Some(FailureSignal::Stderr))]
    #[case("42", "  \n", None)]
    fn test_heuristic(
        #[case] stdout: &str,
        #[case] stderr: &str,
        #[case] expected: Option<FailureSignal>,
    ) {
        assert_eq!(heuristic_signal(stdout, stderr), expected);
    }

    #[test]
    fn test_plain_output_is_success() {
        assert_eq!(classify(&output("42", "")), Verdict::Success);
    }

    #[test]
    fn test_status_code_output_is_failure() {
        assert_eq!(
            classify(&output("Status code: 404", "")),
            Verdict::Failure(FailureSignal::StatusCode)
        );
    }

    #[test]
    fn test_structured_error_takes_precedence() {
        let mut out = output("Status code: 200", "");
        out.error = Some(RuntimeError {
            name: "KeyError".to_string(),
            value: "'items'".to_string(),
            traceback: String::new(),
        });

        match classify(&out) {
            Verdict::Failure(FailureSignal::Runtime(err)) => assert_eq!(err.name, "KeyError"),
            other => panic!("expected runtime failure, got {:?}", other),
        }
    }

    #[test]
    fn test_install_log_is_not_classified() {
        let mut out = output("42", "");
        out.install_log = "Successfully installed requests\nInstallation completed\nWARNING: pip is outdated\n".to_string();

        assert!(classify(&out).is_success());
    }

    #[test]
    fn test_incomplete_download_on_stderr_is_failure() {
        let out = output(
            "",
            "ERROR:root:Download could not be completed: connection refused\n",
        );
        assert_eq!(classify(&out), Verdict::Failure(FailureSignal::Stderr));
    }

    #[test]
    fn test_heuristic_false_positive_is_preserved() {
        // A successful report that mentions a status code is still read as a failure
        let verdict = classify(&output("Status code: 200 OK, 12 rows saved", ""));
        assert_eq!(verdict, Verdict::Failure(FailureSignal::StatusCode));
    }

    #[test]
    fn test_heuristic_false_negative_is_preserved() {
        // A failure that prints none of the markers slips through
        let verdict = classify(&output("Error: could not connect", ""));
        assert!(verdict.is_success());
    }
}
