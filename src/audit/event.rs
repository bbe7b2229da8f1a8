use serde::Serialize;

/// One audit record per command, transaction, quote lookup, and error
/// (spec.md §6.3). Serialized as a single XML element per line.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditEvent {
    #[serde(rename = "userCommand")]
    UserCommand {
        timestamp: u64,
        server: String,
        transaction_num: String,
        command: String,
        username: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stock_symbol: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        funds: Option<String>,
    },
    #[serde(rename = "accountTransaction")]
    AccountTransaction {
        timestamp: u64,
        server: String,
        transaction_num: String,
        action: AccountAction,
        username: String,
        funds: String,
    },
    #[serde(rename = "quoteServer")]
    QuoteServer {
        timestamp: u64,
        server: String,
        transaction_num: String,
        price: String,
        stock_symbol: String,
        username: String,
        quote_server_time: u64,
        cryptokey: String,
    },
    #[serde(rename = "errorEvent")]
    ErrorEvent {
        timestamp: u64,
        server: String,
        transaction_num: String,
        command: String,
        username: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stock_symbol: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        funds: Option<String>,
        error_message: String,
    },
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountAction {
    Add,
    Remove,
}

/// Renders integer hundredths as a two-fractional-digit decimal string, the
/// boundary conversion spec.md §6.3 requires for the `funds`/`price` fields.
pub fn render_hundredths(v: i64) -> String {
    let negative = v < 0;
    let abs = v.unsigned_abs();
    let whole = abs / 100;
    let frac = abs % 100;
    format!("{}{}.{:02}", if negative { "-" } else { "" }, whole, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_two_fractional_digits() {
        assert_eq!(render_hundredths(123456), "1234.56");
        assert_eq!(render_hundredths(5), "0.05");
        assert_eq!(render_hundredths(0), "0.00");
    }

    #[test]
    fn renders_negative_values() {
        assert_eq!(render_hundredths(-150), "-1.50");
    }
}
