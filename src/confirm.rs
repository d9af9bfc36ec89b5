use regex::bytes::Regex;

use crate::types::ConfirmMode;

/// Verdict of the confirmation evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Delivered,
    Rejected,
}

/// Classify a response according to the subscriber's confirmation rule.
///
/// - `StatusCode`: the decimal status must equal `pattern` exactly.
/// - `RegexBody`: `pattern` must match somewhere in `body`.
/// - `None`: always delivered.
///
/// Only a pattern that fails to compile is an error; a rejected response
/// is a normal verdict.
pub fn evaluate(
    mode: ConfirmMode,
    pattern: &str,
    status: u16,
    body: &[u8],
) -> Result<Verdict, regex::Error> {
    let confirmed = match mode {
        ConfirmMode::StatusCode => status.to_string() == pattern,
        ConfirmMode::RegexBody => Regex::new(pattern)?.is_match(body),
        ConfirmMode::None => true,
    };

    Ok(if confirmed { Verdict::Delivered } else { Verdict::Rejected })
}
