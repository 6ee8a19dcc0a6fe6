use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

/// Accepted due-date layout (`dd/MM/yyyy`).
pub const DUE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Daily rate and the civil-time offset used to decide what "today" is.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LateFeePolicy {
    pub daily_rate: Decimal,
    pub utc_offset_hours: i32,
}

impl Default for LateFeePolicy {
    fn default() -> Self {
        Self {
            daily_rate: Decimal::new(25, 3),
            utc_offset_hours: -3,
        }
    }
}

impl LateFeePolicy {
    pub fn new(daily_rate: Decimal, utc_offset_hours: i32) -> DomainResult<Self> {
        if daily_rate.is_sign_negative() && !daily_rate.is_zero() {
            return Err(DomainError::validation("daily rate must not be negative"));
        }
        if !(-23..=23).contains(&utc_offset_hours) {
            return Err(DomainError::validation(format!(
                "utc offset out of range: {utc_offset_hours}h"
            )));
        }
        Ok(Self {
            daily_rate,
            utc_offset_hours,
        })
    }

    /// Calendar date at this policy's offset for the given instant.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        (now + Duration::hours(i64::from(self.utc_offset_hours))).date_naive()
    }

    /// Quote the interest owed on `amount` for a bill due on `due`, as seen at `now`.
    pub fn quote(&self, due: NaiveDate, amount: Decimal, now: DateTime<Utc>) -> DomainResult<LateFeeQuote> {
        quote_late_fee(due, amount, self.local_date(now), self.daily_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateFeeQuote {
    #[serde(with = "rust_decimal::serde::float")]
    pub original_amount: Decimal,
    pub days_late: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub interest: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_with_interest: Decimal,
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a `dd/MM/yyyy` due date. Surrounding whitespace is ignored.
pub fn parse_due_date(raw: &str) -> DomainResult<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("due date is required"));
    }
    NaiveDate::parse_from_str(trimmed, DUE_DATE_FORMAT).map_err(|_| {
        DomainError::validation(format!("invalid due date '{trimmed}', expected dd/MM/yyyy"))
    })
}

/// Simple daily interest: `amount * daily_rate * days_late`.
///
/// Bills due today or in the future accrue nothing.
pub fn quote_late_fee(
    due: NaiveDate,
    amount: Decimal,
    today: NaiveDate,
    daily_rate: Decimal,
) -> DomainResult<LateFeeQuote> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation("amount must be greater than 0"));
    }

    let days_late = (today - due).num_days().max(0);
    let too_large = || DomainError::validation("amount too large");
    let interest = amount
        .checked_mul(daily_rate)
        .and_then(|per_day| per_day.checked_mul(Decimal::from(days_late)))
        .map(round_cents)
        .ok_or_else(too_large)?;
    let total = amount.checked_add(interest).ok_or_else(too_large)?;

    Ok(LateFeeQuote {
        original_amount: amount,
        days_late,
        interest,
        total_with_interest: round_cents(total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_brazilian_date_layout() {
        assert_eq!(parse_due_date(" 05/03/2025 ").unwrap(), date(2025, 3, 5));
        assert!(parse_due_date("2025-03-05").is_err());
        assert!(parse_due_date("31/02/2025").is_err());
        assert!(parse_due_date("").is_err());
    }

    #[test]
    fn ten_days_late_accrues_simple_interest() {
        let q = quote_late_fee(date(2025, 1, 1), dec("1000"), date(2025, 1, 11), dec("0.025")).unwrap();
        assert_eq!(q.days_late, 10);
        assert_eq!(q.interest, dec("250"));
        assert_eq!(q.total_with_interest, dec("1250"));
        assert_eq!(q.original_amount, dec("1000"));
    }

    #[test]
    fn due_today_or_later_accrues_nothing() {
        for due in [date(2025, 1, 11), date(2025, 1, 16)] {
            let q = quote_late_fee(due, dec("500"), date(2025, 1, 11), dec("0.025")).unwrap();
            assert_eq!(q.days_late, 0);
            assert_eq!(q.interest, Decimal::ZERO);
            assert_eq!(q.total_with_interest, dec("500"));
        }
    }

    #[test]
    fn interest_rounds_to_cents() {
        // 10.01 * 0.025 * 1 = 0.25025
        let q = quote_late_fee(date(2025, 1, 1), dec("10.01"), date(2025, 1, 2), dec("0.025")).unwrap();
        assert_eq!(q.interest, dec("0.25"));
        assert_eq!(q.total_with_interest, dec("10.26"));
    }

    #[test]
    fn rejects_non_positive_amount() {
        for amount in ["0", "-5"] {
            let err = quote_late_fee(date(2025, 1, 1), dec(amount), date(2025, 1, 2), dec("0.025")).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn oversized_amount_is_rejected_instead_of_overflowing() {
        let err = quote_late_fee(date(2000, 1, 1), Decimal::MAX, date(2025, 1, 1), dec("0.025")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref msg) if msg.contains("too large")));

        // Nothing owed, so nothing to overflow.
        let q = quote_late_fee(date(2025, 1, 1), Decimal::MAX, date(2025, 1, 1), dec("0.025")).unwrap();
        assert_eq!(q.total_with_interest, Decimal::MAX);
    }

    #[test]
    fn today_follows_the_policy_offset() {
        let policy = LateFeePolicy::default();
        // 02:00 UTC on the 11th is still the 10th at UTC-3.
        let now = Utc.with_ymd_and_hms(2025, 1, 11, 2, 0, 0).unwrap();
        assert_eq!(policy.local_date(now), date(2025, 1, 10));

        let q = policy.quote(date(2025, 1, 1), dec("1000"), now).unwrap();
        assert_eq!(q.days_late, 9);
    }

    #[test]
    fn policy_rejects_out_of_range_offset() {
        assert!(LateFeePolicy::new(dec("0.025"), 30).is_err());
        assert!(LateFeePolicy::new(dec("0.025"), -3).is_ok());
    }

    #[test]
    fn quote_serializes_with_camel_case_numbers() {
        let q = quote_late_fee(date(2025, 1, 1), dec("1000"), date(2025, 1, 11), dec("0.025")).unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["daysLate"], 10);
        assert_eq!(json["totalWithInterest"].as_f64(), Some(1250.0));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                .. ProptestConfig::default()
            })]

            /// Property: days late is never negative and the total never drops below the amount.
            #[test]
            fn total_never_below_amount(
                cents in 1i64..100_000_000,
                offset_days in -400i64..400,
            ) {
                let today = date(2025, 6, 15);
                let due = today - Duration::days(offset_days);
                let amount = Decimal::new(cents, 2);
                let q = quote_late_fee(due, amount, today, Decimal::new(25, 3)).unwrap();

                prop_assert!(q.days_late >= 0);
                prop_assert_eq!(q.days_late, offset_days.max(0));
                prop_assert!(q.total_with_interest >= amount);
            }
        }
    }
}
