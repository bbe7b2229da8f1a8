use crate::error::AppError;

/// Non-empty, per spec.md §6's "non-empty username" rule.
pub fn username(raw: &str) -> Result<String, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::InvalidInput("username must not be empty".into()));
    }
    Ok(raw.to_string())
}

/// Stock symbols are 1-3 characters (spec.md §6).
pub fn symbol(raw: &str) -> Result<String, AppError> {
    if raw.is_empty() || raw.len() > 3 {
        return Err(AppError::InvalidInput(
            "symbol must be 1-3 characters".into(),
        ));
    }
    Ok(raw.to_uppercase())
}

/// Parses a decimal amount/money/triggerPrice string into positive integer
/// hundredths. Rejects non-positive values and more than two fractional
/// digits (same policy as the quote-feed price parser, spec.md §4.2).
pub fn positive_hundredths(raw: &str) -> Result<i64, AppError> {
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };

    if frac.len() > 2 {
        return Err(AppError::InvalidInput(format!(
            "value has more than two fractional digits: {raw}"
        )));
    }

    let whole: i64 = whole
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("not a number: {raw}")))?;
    let frac_padded = format!("{:0<2}", frac);
    let frac: i64 = frac_padded
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("not a number: {raw}")))?;

    let value = whole * 100 + frac;

    if value <= 0 {
        return Err(AppError::InvalidInput(format!(
            "value must be positive: {raw}"
        )));
    }

    Ok(value)
}

/// Parses a whole share count (spec.md §6 validates "shares" as its own
/// positive numeric quantity, distinct from amount/money/triggerPrice).
/// Used by `SET_SELL_AMOUNT`, whose `{amount}` segment is a share count the
/// gateway debits directly from the holding (spec.md §4.4) rather than a
/// currency amount.
pub fn positive_shares(raw: &str) -> Result<i64, AppError> {
    let shares: i64 = raw
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("not a whole share count: {raw}")))?;

    if shares <= 0 {
        return Err(AppError::InvalidInput(format!(
            "shares must be positive: {raw}"
        )));
    }

    Ok(shares)
}

/// `trans` segments are opaque correlation ids; any non-empty string is
/// accepted.
pub fn trans(raw: &str) -> Result<String, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::InvalidInput("trans must not be empty".into()));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_username() {
        assert!(username("").is_err());
    }

    #[test]
    fn rejects_oversized_symbol() {
        assert!(symbol("ABCD").is_err());
    }

    #[test]
    fn accepts_short_symbol_uppercased() {
        assert_eq!(symbol("abc").unwrap(), "ABC");
    }

    #[test]
    fn parses_positive_hundredths() {
        assert_eq!(positive_hundredths("100.00").unwrap(), 10000);
        assert_eq!(positive_hundredths("0.01").unwrap(), 1);
    }

    #[test]
    fn rejects_non_positive_amount() {
        assert!(positive_hundredths("0").is_err());
        assert!(positive_hundredths("-5").is_err());
    }

    #[test]
    fn rejects_excess_precision() {
        assert!(positive_hundredths("1.234").is_err());
    }

    #[test]
    fn parses_positive_shares() {
        assert_eq!(positive_shares("5").unwrap(), 5);
    }

    #[test]
    fn rejects_non_positive_shares() {
        assert!(positive_shares("0").is_err());
        assert!(positive_shares("-1").is_err());
    }

    #[test]
    fn rejects_fractional_shares() {
        assert!(positive_shares("5.5").is_err());
    }
}
