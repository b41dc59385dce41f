//! Fuzzy matching of extracted banking fields against the active
//! destination account.
//!
//! Matching is a pure function over text snapshots: no I/O, no global
//! state. Thresholds live in `MatchPolicy` because they materially
//! change acceptance rates and need to be tunable per deployment.
//!
//! Key invariant: a masked-suffix match never overrides a full-length
//! account number that is present in the extracted text and disagrees.

use serde::{Deserialize, Serialize};

use crate::types::{ActiveAccount, ExtractedFields};

/// Characters receipts use to mask account digits.
const MASK_CHARS: &[char] = &['*', 'x', 'X', '•', '#'];

/// Connective words ignored when scoring beneficiary-name overlap.
const CONNECTIVES: &[&str] = &[
    "Y", "DE", "SA", "CV", "RL", "LA", "EL", "LOS", "LAS", "DEL", "CON", "POR", "PARA",
];

/// Tunable matching thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPolicy {
    /// Full length of a destination account number.
    pub account_length: usize,
    /// Maximum length for a bare-suffix match.
    pub short_suffix_max_len: usize,
    /// Trailing-digit run accepted after mask characters.
    pub masked_suffix_min_len: usize,
    pub masked_suffix_max_len: usize,
    /// Minimum length for a beneficiary word to count as significant.
    pub significant_word_min_len: usize,
    /// Fraction of significant words that must appear in the text.
    pub word_overlap_threshold: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy {
            account_length: 18,
            short_suffix_max_len: 6,
            masked_suffix_min_len: 3,
            masked_suffix_max_len: 4,
            significant_word_min_len: 4,
            word_overlap_threshold: 0.70,
        }
    }
}

/// How the account identifier matched, for precise reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountMatchMethod {
    /// Full account number present and equal.
    Full,
    /// Short bare suffix equal to the account's tail.
    Suffix,
    /// Masked digits with a matching trailing run.
    MaskedSuffix,
    NotFound,
}

/// Result of matching one receipt's extracted fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Overall verdict: both account and beneficiary matched.
    pub matched: bool,
    pub account_matched: bool,
    pub account_method: AccountMatchMethod,
    pub beneficiary_matched: bool,
    /// Human-readable reason distinguishing account mismatch from
    /// beneficiary mismatch, for precise remediation messages.
    pub reason: String,
}

/// Match extracted fields against the active account. Both the account
/// identifier and the beneficiary must independently match.
pub fn matches(
    extracted: &ExtractedFields,
    account: &ActiveAccount,
    policy: &MatchPolicy,
) -> MatchOutcome {
    let account_method = extracted
        .account_id
        .as_deref()
        .map(|id| account_match_method(id, &account.account_number, policy))
        .unwrap_or(AccountMatchMethod::NotFound);
    let account_matched = account_method != AccountMatchMethod::NotFound;

    let beneficiary_matched = extracted
        .beneficiary_text
        .as_deref()
        .map(|text| beneficiary_matches(text, &account.beneficiary, policy))
        .unwrap_or(false);

    let matched = account_matched && beneficiary_matched;
    let reason = match (account_matched, beneficiary_matched) {
        (true, true) => match account_method {
            AccountMatchMethod::Full => {
                "destination account and beneficiary match the active account".to_string()
            }
            AccountMatchMethod::Suffix => format!(
                "account suffix matches the active account ending in {} and beneficiary matches",
                tail(&account.account_number, 4)
            ),
            AccountMatchMethod::MaskedSuffix => format!(
                "masked account suffix matches the active account ending in {} and beneficiary matches",
                tail(&account.account_number, 4)
            ),
            AccountMatchMethod::NotFound => unreachable!("matched implies a method"),
        },
        (true, false) => format!(
            "destination account matches but beneficiary does not correspond to {}",
            account.beneficiary
        ),
        (false, true) => format!(
            "beneficiary matches but destination account does not correspond to {}",
            account.account_number
        ),
        (false, false) => format!(
            "receipt does not correspond to the active account (bank: {}, account: {}, beneficiary: {})",
            account.bank, account.account_number, account.beneficiary
        ),
    };

    MatchOutcome {
        matched,
        account_matched,
        account_method,
        beneficiary_matched,
        reason,
    }
}

/// Decide how (if at all) an extracted account identifier matches the
/// active account number.
pub fn account_match_method(
    extracted_id: &str,
    account_number: &str,
    policy: &MatchPolicy,
) -> AccountMatchMethod {
    let stripped = strip_separators(extracted_id);

    // Full-length candidates: runs of consecutive digits at least as
    // long as a whole account number. Mask characters break a run.
    let full_candidates: Vec<&str> = digit_runs(&stripped)
        .into_iter()
        .filter(|run| run.len() >= policy.account_length)
        .collect();

    if !full_candidates.is_empty() {
        // A full number is present; it is the only admissible evidence.
        for candidate in &full_candidates {
            if candidate.contains(account_number) || account_number.contains(*candidate) {
                return AccountMatchMethod::Full;
            }
        }
        return AccountMatchMethod::NotFound;
    }

    // Bare short suffix: the whole extracted value is a few digits that
    // equal the account's tail.
    let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();
    if stripped.chars().all(|c| c.is_ascii_digit())
        && !digits.is_empty()
        && digits.len() <= policy.short_suffix_max_len
        && account_number.ends_with(digits.as_str())
    {
        return AccountMatchMethod::Suffix;
    }

    // Masked suffix: mask characters followed by a short trailing digit
    // run that equals the account's own trailing digits.
    if stripped.chars().any(|c| MASK_CHARS.contains(&c)) {
        let trailing: String = stripped
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if trailing.len() >= policy.masked_suffix_min_len
            && trailing.len() <= policy.masked_suffix_max_len
            && account_number.ends_with(trailing.as_str())
        {
            return AccountMatchMethod::MaskedSuffix;
        }
    }

    AccountMatchMethod::NotFound
}

/// Whether the active beneficiary's name appears in the extracted text,
/// tolerating truncation, reordering, and diacritic loss.
pub fn beneficiary_matches(text: &str, beneficiary: &str, policy: &MatchPolicy) -> bool {
    let text_norm = normalize_name(text);
    let beneficiary_norm = normalize_name(beneficiary);
    if beneficiary_norm.is_empty() {
        return false;
    }

    // Whole-name containment either way.
    if text_norm.contains(&beneficiary_norm) || beneficiary_norm.contains(&text_norm) {
        return !text_norm.is_empty();
    }

    // Scored overlap of significant words.
    let significant: Vec<&str> = beneficiary_norm
        .split_whitespace()
        .filter(|w| w.len() >= policy.significant_word_min_len && !CONNECTIVES.contains(w))
        .collect();
    if significant.is_empty() {
        return false;
    }
    let found = significant
        .iter()
        .filter(|w| text_norm.contains(*w))
        .count();
    (found as f64 / significant.len() as f64) >= policy.word_overlap_threshold
}

/// Uppercase, fold diacritics to ASCII, turn punctuation into spaces,
/// collapse corporate-suffix spelling variants, squeeze whitespace.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let folded = fold_char(c);
        if folded.is_alphanumeric() {
            out.push(folded.to_ascii_uppercase());
        } else {
            out.push(' ');
        }
    }
    let squeezed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    // Issuing apps spell the corporate suffix a dozen ways.
    squeezed
        .replace("S A DE C V", "SA DE CV")
        .replace("SADE CV", "SA DE CV")
        .replace("SA DECV", "SA DE CV")
        .replace("SADECV", "SA DE CV")
        .replace("S DE RL DE CV", "SA DE CV")
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' | 'Ñ' => 'N',
        _ => c,
    }
}

/// Drop separator characters that banks insert inside account numbers.
fn strip_separators(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '/' | ',' | '\n' | '\r' | '\t'))
        .collect()
}

/// Maximal runs of consecutive ASCII digits.
fn digit_runs(s: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let bytes = s.as_bytes();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            start.get_or_insert(i);
        } else if let Some(st) = start.take() {
            runs.push(&s[st..i]);
        }
    }
    if let Some(st) = start {
        runs.push(&s[st..]);
    }
    runs
}

fn tail(s: &str, n: usize) -> &str {
    &s[s.len().saturating_sub(n)..]
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "646180139409487228";

    fn account() -> ActiveAccount {
        ActiveAccount {
            account_number: ACCOUNT.to_string(),
            beneficiary: "Jardineria y Comercio Thabyetha SA de CV".to_string(),
            bank: "STP".to_string(),
        }
    }

    fn policy() -> MatchPolicy {
        MatchPolicy::default()
    }

    #[test]
    fn full_account_number_matches() {
        assert_eq!(
            account_match_method("646180139409487228", ACCOUNT, &policy()),
            AccountMatchMethod::Full
        );
    }

    #[test]
    fn full_account_with_separators_matches() {
        assert_eq!(
            account_match_method("6461 8013 9409 4872 28", ACCOUNT, &policy()),
            AccountMatchMethod::Full
        );
    }

    #[test]
    fn short_suffix_matches_account_tail() {
        assert_eq!(
            account_match_method("487228", ACCOUNT, &policy()),
            AccountMatchMethod::Suffix
        );
    }

    #[test]
    fn masked_suffix_matches_trailing_digits() {
        assert_eq!(
            account_match_method("****7228", ACCOUNT, &policy()),
            AccountMatchMethod::MaskedSuffix
        );
        assert_eq!(
            account_match_method("64**228", ACCOUNT, &policy()),
            AccountMatchMethod::MaskedSuffix
        );
    }

    #[test]
    fn masked_suffix_mismatch_is_rejected() {
        assert_eq!(
            account_match_method("****9999", ACCOUNT, &policy()),
            AccountMatchMethod::NotFound
        );
    }

    #[test]
    fn full_number_disagreement_beats_masked_suffix() {
        // A full-length number is present and wrong; the masked suffix
        // happens to agree but must not rescue the receipt.
        let id = "646180139409480000 ****7228";
        assert_eq!(
            account_match_method(id, ACCOUNT, &policy()),
            AccountMatchMethod::NotFound
        );
    }

    #[test]
    fn beneficiary_full_containment() {
        assert!(beneficiary_matches(
            "Beneficiario: JARDINERIA Y COMERCIO THABYETHA SA DE CV\nBanco: STP",
            "Jardineria y Comercio Thabyetha SA de CV",
            &policy()
        ));
    }

    #[test]
    fn beneficiary_word_overlap_at_threshold() {
        // Two of the three significant words present: 66% < 70%.
        assert!(!beneficiary_matches(
            "JARDINERIA COMERCIO",
            "Jardineria y Comercio Thabyetha SA de CV",
            &policy()
        ));
        // All three present, reordered across lines.
        assert!(beneficiary_matches(
            "THABYETHA\nCOMERCIO Y JARDINERIA",
            "Jardineria y Comercio Thabyetha SA de CV",
            &policy()
        ));
    }

    #[test]
    fn beneficiary_accents_fold_away() {
        assert!(beneficiary_matches(
            "destinatario JOSÉ RAMÓN GUTIÉRREZ NÚÑEZ",
            "Jose Ramon Gutierrez Nuñez",
            &policy()
        ));
    }

    #[test]
    fn reasons_distinguish_account_from_beneficiary() {
        let acct = account();
        let pol = policy();

        let account_only = matches(
            &ExtractedFields {
                account_id: Some("****7228".to_string()),
                beneficiary_text: Some("OTRA EMPRESA SA DE CV".to_string()),
                ..ExtractedFields::default()
            },
            &acct,
            &pol,
        );
        assert!(!account_only.matched);
        assert!(account_only.account_matched);
        assert!(account_only.reason.contains("beneficiary does not correspond"));

        let beneficiary_only = matches(
            &ExtractedFields {
                account_id: Some("****9999".to_string()),
                beneficiary_text: Some(
                    "JARDINERIA Y COMERCIO THABYETHA SA DE CV".to_string(),
                ),
                ..ExtractedFields::default()
            },
            &acct,
            &pol,
        );
        assert!(!beneficiary_only.matched);
        assert!(beneficiary_only.beneficiary_matched);
        assert!(beneficiary_only
            .reason
            .contains("destination account does not correspond"));
        assert_ne!(account_only.reason, beneficiary_only.reason);
    }

    #[test]
    fn both_must_match_for_a_valid_receipt() {
        let outcome = matches(
            &ExtractedFields {
                account_id: Some("****7228".to_string()),
                beneficiary_text: Some(
                    "JARDINERIA Y COMERCIO THABYETHA SA DE CV".to_string(),
                ),
                ..ExtractedFields::default()
            },
            &account(),
            &policy(),
        );
        assert!(outcome.matched);
        assert_eq!(outcome.account_method, AccountMatchMethod::MaskedSuffix);
    }
}
