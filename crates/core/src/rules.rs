//! The five hard rules.
//!
//! Each rule is evaluated independently -- no rule short-circuits
//! another, so the report always carries a reason for every entry.
//! A request is ready for downstream processing iff all five named
//! entries are valid; there is no secondary signal count.

use serde::{Deserialize, Serialize};

use crate::types::{FieldCheck, Receipt, ReportedFields, ValidationReport};

/// Required word count for a beneficiary name (first name plus two
/// family names).
pub const BENEFICIARY_MIN_WORDS: usize = 3;

/// Exact digit count for a personal identifier.
pub const PERSONAL_ID_DIGITS: usize = 10;

/// Directory status of the owning client, as reported by the client
/// directory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Inactive,
}

/// Evaluate all five hard rules against a request snapshot.
///
/// `client_status` is `None` when the directory has no record of the
/// client at all.
pub fn validate(
    client_status: Option<&ClientStatus>,
    fields: &ReportedFields,
    receipts: &[Receipt],
) -> ValidationReport {
    ValidationReport {
        client: check_client(client_status),
        beneficiary: check_beneficiary(fields.beneficiary.as_deref()),
        personal_id: check_personal_id(fields.personal_id.as_deref()),
        unit_count: check_unit_count(fields.unit_count),
        receipt: check_receipts(receipts),
    }
}

fn check_client(status: Option<&ClientStatus>) -> FieldCheck {
    match status {
        None => FieldCheck::invalid("client not found in directory"),
        Some(ClientStatus::Inactive) => FieldCheck::invalid("client is not active"),
        Some(ClientStatus::Active) => FieldCheck::pass("client active"),
    }
}

fn check_beneficiary(beneficiary: Option<&str>) -> FieldCheck {
    let raw = match beneficiary {
        Some(b) if !b.trim().is_empty() => b,
        _ => return FieldCheck::missing("beneficiary not provided"),
    };

    if raw.chars().any(|c| c.is_ascii_digit()) {
        return FieldCheck::invalid("beneficiary must not contain digits");
    }

    // Word tokens are maximal alphabetic runs; punctuation and digits
    // never form part of a name token.
    let words = raw
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .count();
    if words < BENEFICIARY_MIN_WORDS {
        return FieldCheck::invalid(format!(
            "beneficiary needs at least {} words (first name + two family names), found {}",
            BENEFICIARY_MIN_WORDS, words
        ));
    }

    FieldCheck::pass(format!("beneficiary valid ({} words)", words))
}

fn check_personal_id(personal_id: Option<&str>) -> FieldCheck {
    let raw = match personal_id {
        Some(p) if !p.trim().is_empty() => p.trim(),
        _ => return FieldCheck::missing("personal identifier not provided"),
    };

    if raw.len() != PERSONAL_ID_DIGITS || !raw.chars().all(|c| c.is_ascii_digit()) {
        let got = if raw.chars().all(|c| c.is_ascii_digit()) {
            format!("{} digits", raw.len())
        } else {
            "non-numeric input".to_string()
        };
        return FieldCheck::invalid(format!(
            "personal identifier must be exactly {} digits, got {}",
            PERSONAL_ID_DIGITS, got
        ));
    }

    FieldCheck::pass(format!("personal identifier valid ({} digits)", PERSONAL_ID_DIGITS))
}

fn check_unit_count(count: Option<i64>) -> FieldCheck {
    match count {
        None => FieldCheck::missing("unit count not provided"),
        Some(n) if n <= 0 => {
            FieldCheck::invalid(format!("unit count must be greater than zero, got {}", n))
        }
        Some(n) => FieldCheck::pass(format!("unit count valid: {}", n)),
    }
}

fn check_receipts(receipts: &[Receipt]) -> FieldCheck {
    if receipts.is_empty() {
        return FieldCheck::missing("no receipts attached");
    }

    let countable = receipts.iter().filter(|r| r.is_countable()).count();
    if countable == 0 {
        let reasons = receipts
            .iter()
            .map(|r| r.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return FieldCheck::invalid(format!("no valid receipt; reasons: {}", reasons));
    }

    FieldCheck::pass(format!("{} valid receipt(s)", countable))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DuplicateKind, ExtractedFields};
    use rust_decimal::Decimal;

    fn valid_receipt() -> Receipt {
        Receipt {
            fingerprint: "sha256:aaaa".to_string(),
            display_name: "deposit.pdf".to_string(),
            extracted: Some(ExtractedFields {
                amount: Some(Decimal::new(250_000_00, 2)),
                ..ExtractedFields::default()
            }),
            valid: true,
            reason: "receipt matches the active account".to_string(),
            duplicate: DuplicateKind::None,
            discard_reason: None,
        }
    }

    fn good_fields() -> ReportedFields {
        ReportedFields {
            beneficiary: Some("Juan Pérez García".to_string()),
            personal_id: Some("1234567890".to_string()),
            unit_count: Some(3),
            deposited_amount: None,
        }
    }

    #[test]
    fn all_five_rules_pass_on_a_complete_request() {
        let report = validate(
            Some(&ClientStatus::Active),
            &good_fields(),
            &[valid_receipt()],
        );
        assert!(report.all_valid(), "{}", report.failure_reasons());
        for (_, check) in report.entries() {
            assert!(check.is_valid());
        }
    }

    #[test]
    fn two_word_beneficiary_reports_required_word_count() {
        let mut fields = good_fields();
        fields.beneficiary = Some("Juan Pérez".to_string());
        let report = validate(Some(&ClientStatus::Active), &fields, &[valid_receipt()]);
        assert!(!report.beneficiary.is_valid());
        assert!(
            report.beneficiary.reason.contains("at least 3 words"),
            "reason should name the required count: {}",
            report.beneficiary.reason
        );
    }

    #[test]
    fn beneficiary_with_digits_is_rejected() {
        let mut fields = good_fields();
        fields.beneficiary = Some("Juan Pérez García 3".to_string());
        let report = validate(Some(&ClientStatus::Active), &fields, &[valid_receipt()]);
        assert!(!report.beneficiary.is_valid());
        assert!(report.beneficiary.reason.contains("digits"));
    }

    #[test]
    fn accented_names_count_as_words() {
        let mut fields = good_fields();
        fields.beneficiary = Some("José Ramón Núñez".to_string());
        let report = validate(Some(&ClientStatus::Active), &fields, &[valid_receipt()]);
        assert!(report.beneficiary.is_valid());
    }

    #[test]
    fn personal_id_must_be_exactly_ten_digits() {
        for bad in ["123456789", "12345678901", "12345678A0", " "] {
            let mut fields = good_fields();
            fields.personal_id = Some(bad.to_string());
            let report = validate(Some(&ClientStatus::Active), &fields, &[valid_receipt()]);
            assert!(!report.personal_id.is_valid(), "should reject {:?}", bad);
        }
        let mut fields = good_fields();
        fields.personal_id = Some("  1234567890  ".to_string());
        let report = validate(Some(&ClientStatus::Active), &fields, &[valid_receipt()]);
        assert!(report.personal_id.is_valid(), "surrounding whitespace is trimmed");
    }

    #[test]
    fn unit_count_must_be_positive() {
        let mut fields = good_fields();
        fields.unit_count = Some(0);
        let report = validate(Some(&ClientStatus::Active), &fields, &[valid_receipt()]);
        assert!(!report.unit_count.is_valid());
        fields.unit_count = Some(-2);
        let report = validate(Some(&ClientStatus::Active), &fields, &[valid_receipt()]);
        assert!(!report.unit_count.is_valid());
    }

    #[test]
    fn duplicate_receipts_never_satisfy_the_receipt_rule() {
        let mut dup = valid_receipt();
        dup.duplicate = DuplicateKind::Global {
            origin_request_id: "req-0".to_string(),
        };
        let report = validate(Some(&ClientStatus::Active), &good_fields(), &[dup]);
        assert!(!report.receipt.is_valid());
    }

    #[test]
    fn unknown_and_inactive_clients_fail_with_distinct_reasons() {
        let missing = validate(None, &good_fields(), &[valid_receipt()]);
        let inactive = validate(
            Some(&ClientStatus::Inactive),
            &good_fields(),
            &[valid_receipt()],
        );
        assert!(!missing.client.is_valid());
        assert!(!inactive.client.is_valid());
        assert_ne!(missing.client.reason, inactive.client.reason);
    }

    #[test]
    fn absent_inputs_are_missing_and_bad_inputs_are_invalid() {
        use crate::types::CheckStatus;

        let absent = validate(Some(&ClientStatus::Active), &ReportedFields::default(), &[]);
        assert_eq!(absent.beneficiary.status, CheckStatus::Missing);
        assert_eq!(absent.personal_id.status, CheckStatus::Missing);
        assert_eq!(absent.unit_count.status, CheckStatus::Missing);
        assert_eq!(absent.receipt.status, CheckStatus::Missing);

        let mut fields = good_fields();
        fields.beneficiary = Some("Juan Pérez".to_string());
        fields.personal_id = Some("123".to_string());
        fields.unit_count = Some(0);
        let bad = validate(Some(&ClientStatus::Active), &fields, &[valid_receipt()]);
        assert_eq!(bad.beneficiary.status, CheckStatus::Invalid);
        assert_eq!(bad.personal_id.status, CheckStatus::Invalid);
        assert_eq!(bad.unit_count.status, CheckStatus::Invalid);
    }
}
