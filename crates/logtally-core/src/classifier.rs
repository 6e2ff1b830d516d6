//! Line classification.
//!
//! Every line gets exactly one [`Verdict`]. Rules are evaluated in a fixed
//! order and the first match wins:
//!
//! 1. error keywords and codes (case-sensitive unless noted)
//! 2. success keywords (case-insensitive), unless the line narrates a
//!    failure (`ERROR:` together with `failed,`)
//! 3. HTTP status of an access-log line (`"GET /x HTTP/1.1" 200 512`)
//! 4. a non-zero JSON `"returnCode"`
//!
//! Anything else is [`Verdict::Neither`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Outcome of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    /// The line reports a failure; carries the reason tag of the matching rule.
    Error(String),
    /// The line reports a success; carries the reason tag of the matching rule.
    Success(String),
    Neither,
}

impl Verdict {
    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success(_))
    }

    /// The reason tag, if the line was classified at all.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Error(tag) | Verdict::Success(tag) => Some(tag),
            Verdict::Neither => None,
        }
    }
}

/// A single pattern rule. Evaluates to the reason tag when it matches.
enum Rule {
    /// Matches anywhere in the line and reports a fixed tag.
    Fixed { tag: &'static str, pattern: Regex },
    /// Reports `HTTP_<code>` using the first capture group as the code.
    Status { pattern: Regex },
}

impl Rule {
    fn fixed(tag: &'static str, pattern: &str) -> Self {
        Rule::Fixed {
            tag,
            pattern: Regex::new(pattern).expect("built-in classifier pattern must compile"),
        }
    }

    fn status(pattern: &str) -> Self {
        Rule::Status {
            pattern: Regex::new(pattern).expect("built-in classifier pattern must compile"),
        }
    }

    fn evaluate(&self, text: &str) -> Option<String> {
        match self {
            Rule::Fixed { tag, pattern } => pattern.is_match(text).then(|| tag.to_string()),
            Rule::Status { pattern } => pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|code| format!("HTTP_{}", code.as_str())),
        }
    }
}

lazy_static! {
    /// Explicit failure signals. Checked first; order is precedence.
    static ref ERROR_RULES: Vec<Rule> = vec![
        Rule::fixed("HTTP_400", r#""\s+4\d{2}\s+"#),
        Rule::status(r#""\s+(5\d{2})\s+"#),
        Rule::fixed("returncode=1", r#"(?i)returncode\s*[=:]\s*["']?1\b"#),
        Rule::fixed("ERROR_999", r"999\s+[Ee]rror|error\s+999"),
        Rule::fixed("duplicate_key", r"duplicate key value violates unique constraint"),
        Rule::fixed("failed", r"\bfailed\b"),
        Rule::fixed("ERROR", r"\bERROR\b"),
    ];

    /// Success keywords, all case-insensitive.
    static ref SUCCESS_RULES: Vec<Rule> = vec![
        Rule::fixed("SUCCESS", r"(?i)\bSUCCESS\b"),
        Rule::fixed("returnCode=0", r#"(?i)"returnCode"\s*:\s*"0""#),
        Rule::fixed("returncode=0", r#"(?i)returncode\s*[=:]\s*["']?0\b"#),
        Rule::fixed("Response =>", r#"(?i)Response => '\{"returnCode":"0""#),
        Rule::fixed("Finalized Successfully", r"(?i)Finalized Successfully"),
        Rule::fixed("passed", r"(?i)\bpassed\b"),
    ];

    /// Status code of an access-log line: quote, whitespace, 3 digits, whitespace.
    static ref HTTP_STATUS: Regex =
        Regex::new(r#""\s+(\d{3})\s+"#).expect("built-in classifier pattern must compile");

    static ref RETURN_CODE: Regex = Regex::new(r#""returnCode"\s*:\s*"(\d+)""#)
        .expect("built-in classifier pattern must compile");
}

/// Tag reported for any 2xx status found by the HTTP fallback.
pub const HTTP_SUCCESS_TAG: &str = "HTTP_SUCCESS";

/// Classify a raw log line.
pub fn classify(text: &str) -> Verdict {
    if let Some(tag) = first_match(&ERROR_RULES, text) {
        return Verdict::Error(tag);
    }

    if let Some(tag) = first_match(&SUCCESS_RULES, text) {
        if !narrates_failure(text) {
            return Verdict::Success(tag);
        }
        trace!(tag = %tag, "Discarding success match on failure narrative");
    }

    if let Some(verdict) = http_status(text) {
        return verdict;
    }

    if let Some(verdict) = nonzero_return_code(text) {
        return verdict;
    }

    Verdict::Neither
}

fn first_match(rules: &[Rule], text: &str) -> Option<String> {
    rules.iter().find_map(|rule| rule.evaluate(text))
}

/// A line that says `ERROR:` and `failed,` is describing a failure even if a
/// success keyword appears somewhere in it.
fn narrates_failure(text: &str) -> bool {
    text.contains("ERROR:") && text.contains("failed,")
}

/// Only the first status-shaped number on the line is considered.
fn http_status(text: &str) -> Option<Verdict> {
    let code = HTTP_STATUS.captures(text)?.get(1)?.as_str();
    match code.as_bytes().first()? {
        b'4' | b'5' => Some(Verdict::Error(format!("HTTP_{}", code))),
        b'2' => Some(Verdict::Success(HTTP_SUCCESS_TAG.to_string())),
        _ => None,
    }
}

fn nonzero_return_code(text: &str) -> Option<Verdict> {
    RETURN_CODE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|value| value.as_str())
        .find(|value| *value != "0")
        .map(|value| Verdict::Error(format!("returnCode={}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(tag: &str) -> Verdict {
        Verdict::Error(tag.to_string())
    }

    fn success(tag: &str) -> Verdict {
        Verdict::Success(tag.to_string())
    }

    #[test]
    fn test_json_return_code_zero_is_success() {
        let line = r#"2025-01-01 10:15:00,123 INFO [com.fin.mta.pro.ServiceOperations] (executor-thread-12) Result => {"returnCode":"0","message":"ok"}"#;
        assert_eq!(classify(line), success("returnCode=0"));
    }

    #[test]
    fn test_duplicate_key() {
        let line = r#"2025-01-01 10:59:59,999 WARN [com.fin.mta.db] (executor-thread-40) duplicate key value violates unique constraint "txn_ref_uk""#;
        assert_eq!(classify(line), error("duplicate_key"));
    }

    #[test]
    fn test_duplicate_key_outranks_error_keyword() {
        let line = r#"2025-01-01 10:59:59,999 ERROR [db] duplicate key value violates unique constraint "x""#;
        assert_eq!(classify(line), error("duplicate_key"));
    }

    #[test]
    fn test_client_error_status_uses_family_tag() {
        let line = r#"10.0.0.1 - - "POST /txn HTTP/1.1" 404 12"#;
        assert_eq!(classify(line), error("HTTP_400"));
    }

    #[test]
    fn test_server_error_status_keeps_code() {
        let line = r#"10.0.0.1 - - "POST /txn HTTP/1.1" 504 0"#;
        assert_eq!(classify(line), error("HTTP_504"));
        let line = r#"10.0.0.1 - - "POST /txn HTTP/1.1" 500 0 SUCCESS"#;
        assert_eq!(classify(line), error("HTTP_500"));
    }

    #[test]
    fn test_returncode_one_is_case_insensitive() {
        assert_eq!(classify("posting done ReturnCode=1"), error("returncode=1"));
        assert_eq!(classify("posting done returncode: '1'"), error("returncode=1"));
        assert_eq!(classify("posting done returnCode=1, retrying"), error("returncode=1"));
    }

    #[test]
    fn test_returncode_must_equal_the_digit() {
        assert_eq!(classify("done returnCode=10"), Verdict::Neither);
        assert_eq!(classify("done returnCode=100"), Verdict::Neither);
        assert_eq!(classify("done returncode=05"), Verdict::Neither);
        assert_eq!(classify("done returncode='0'"), success("returncode=0"));
    }

    #[test]
    fn test_error_999() {
        assert_eq!(classify("upstream replied 999 Error"), error("ERROR_999"));
        assert_eq!(classify("upstream replied error 999"), error("ERROR_999"));
    }

    #[test]
    fn test_failed_is_case_sensitive_whole_word() {
        assert_eq!(classify("validation failed for txn"), error("failed"));
        assert_eq!(classify("validation FAILED for txn"), Verdict::Neither);
        assert_eq!(classify("unfailedness is not a word"), Verdict::Neither);
    }

    #[test]
    fn test_error_is_case_sensitive_whole_word() {
        assert_eq!(classify("2025-01-01 10:00:00,000 ERROR boom"), error("ERROR"));
        assert_eq!(classify("an error occurred"), Verdict::Neither);
        assert_eq!(classify("ERRORS everywhere"), Verdict::Neither);
    }

    #[test]
    fn test_error_outranks_success() {
        let line = "ERROR: posting failed, SUCCESS flag not set";
        assert_eq!(classify(line), error("failed"));
        assert_eq!(classify("SUCCESS but ERROR later"), error("ERROR"));
    }

    #[test]
    fn test_success_keywords_in_order() {
        assert_eq!(classify("status success"), success("SUCCESS"));
        assert_eq!(classify("returnCode = 0 after posting"), success("returncode=0"));
        assert_eq!(
            classify(r#"Response => '{"returnCode" : "0"}'"#),
            success("returnCode=0")
        );
        assert_eq!(
            classify("Transaction Finalized Successfully"),
            success("Finalized Successfully")
        );
        assert_eq!(classify("all checks Passed"), success("passed"));
    }

    #[test]
    fn test_response_arrow_rule() {
        // Shadowed by the JSON field rule, which is checked earlier.
        let line = r#"Response => '{"returnCode":"0","data":{}}'"#;
        assert_eq!(classify(line), success("returnCode=0"));
    }

    #[test]
    fn test_failure_narrative_discards_success() {
        // The error pass already catches these; the guard must never let them
        // through as success.
        let line = "ERROR: leg 2 failed, reverting; previous status SUCCESS";
        assert!(classify(line).is_error());
        assert!(narrates_failure(line));
        assert!(!narrates_failure("ERROR: only half"));
        assert!(!narrates_failure("leg failed, only half"));
    }

    #[test]
    fn test_http_fallback_success() {
        let line = r#"10.0.0.1 - - "GET /health HTTP/1.1" 200 2"#;
        assert_eq!(classify(line), success(HTTP_SUCCESS_TAG));
    }

    #[test]
    fn test_http_fallback_redirect_falls_through() {
        let line = r#"10.0.0.1 - - "GET /old HTTP/1.1" 301 0"#;
        assert_eq!(classify(line), Verdict::Neither);
    }

    #[test]
    fn test_nonzero_return_code() {
        let line = r#"Result => {"returnCode":"17","message":"limit"}"#;
        assert_eq!(classify(line), error("returnCode=17"));
    }

    #[test]
    fn test_nonzero_return_code_skips_zero_occurrence() {
        assert_eq!(
            nonzero_return_code(r#"{"returnCode":"0"} then {"returnCode":"42"}"#),
            Some(error("returnCode=42"))
        );
        assert_eq!(nonzero_return_code(r#"{"returnCode":"0"}"#), None);
    }

    #[test]
    fn test_plain_info_line_is_neither() {
        let line = "2025-01-01 10:00:00,000 INFO [svc] (executor-thread-11) Checking duplicate transaction";
        assert_eq!(classify(line), Verdict::Neither);
    }

    #[test]
    fn test_verdict_accessors() {
        assert_eq!(error("x").reason(), Some("x"));
        assert_eq!(success("y").reason(), Some("y"));
        assert_eq!(Verdict::Neither.reason(), None);
        assert!(error("x").is_error() && !error("x").is_success());
    }

    #[test]
    fn test_exactly_one_verdict_for_mixed_signals() {
        let lines = [
            "SUCCESS ERROR",
            "passed failed",
            r#""returnCode":"0" returncode=1"#,
            r#""GET /" 200 ok"#,
            r#"Finalized Successfully "returnCode":"9""#,
        ];
        for line in lines {
            let verdict = classify(line);
            assert!(
                !(verdict.is_error() && verdict.is_success()),
                "line {:?} produced {:?}",
                line,
                verdict
            );
        }
        assert_eq!(classify(lines[0]), error("ERROR"));
        assert_eq!(classify(lines[1]), error("failed"));
        assert_eq!(classify(lines[2]), error("returncode=1"));
        assert_eq!(classify(lines[3]), Verdict::Success(HTTP_SUCCESS_TAG.to_string()));
        assert_eq!(classify(lines[4]), success("Finalized Successfully"));
    }
}
