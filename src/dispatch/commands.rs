/// The sixteen user-facing commands (spec.md §4.6), each paired with its
/// embedded parameters. HTTP parameter validation (`http::validate`)
/// produces one of these before the dispatcher ever sees the request.
#[derive(Clone, Debug)]
pub enum Command {
    Add {
        username: String,
        money_hundredths: i64,
    },
    Quote {
        username: String,
        symbol: String,
    },
    Buy {
        username: String,
        symbol: String,
        amount_hundredths: i64,
    },
    CommitBuy {
        username: String,
    },
    CancelBuy {
        username: String,
    },
    Sell {
        username: String,
        symbol: String,
        amount_hundredths: i64,
    },
    CommitSell {
        username: String,
    },
    CancelSell {
        username: String,
    },
    SetBuyAmount {
        username: String,
        symbol: String,
        amount_hundredths: i64,
    },
    SetBuyTrigger {
        username: String,
        symbol: String,
        trigger_price_hundredths: i64,
    },
    CancelSetBuy {
        username: String,
        symbol: String,
    },
    SetSellAmount {
        username: String,
        symbol: String,
        amount_hundredths: i64,
    },
    SetSellTrigger {
        username: String,
        symbol: String,
        trigger_price_hundredths: i64,
    },
    CancelSetSell {
        username: String,
        symbol: String,
    },
    DumpLog {
        filename: String,
        username: Option<String>,
    },
    DisplaySummary {
        username: String,
    },
}

impl Command {
    /// Name stamped on the `UserCommand`/`ErrorEvent` audit fields.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Add { .. } => "ADD",
            Command::Quote { .. } => "QUOTE",
            Command::Buy { .. } => "BUY",
            Command::CommitBuy { .. } => "COMMIT_BUY",
            Command::CancelBuy { .. } => "CANCEL_BUY",
            Command::Sell { .. } => "SELL",
            Command::CommitSell { .. } => "COMMIT_SELL",
            Command::CancelSell { .. } => "CANCEL_SELL",
            Command::SetBuyAmount { .. } => "SET_BUY_AMOUNT",
            Command::SetBuyTrigger { .. } => "SET_BUY_TRIGGER",
            Command::CancelSetBuy { .. } => "CANCEL_SET_BUY",
            Command::SetSellAmount { .. } => "SET_SELL_AMOUNT",
            Command::SetSellTrigger { .. } => "SET_SELL_TRIGGER",
            Command::CancelSetSell { .. } => "CANCEL_SET_SELL",
            Command::DumpLog { .. } => "DUMPLOG",
            Command::DisplaySummary { .. } => "DISPLAY_SUMMARY",
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Command::Add { username, .. }
            | Command::Quote { username, .. }
            | Command::Buy { username, .. }
            | Command::CommitBuy { username }
            | Command::CancelBuy { username }
            | Command::Sell { username, .. }
            | Command::CommitSell { username }
            | Command::CancelSell { username }
            | Command::SetBuyAmount { username, .. }
            | Command::SetBuyTrigger { username, .. }
            | Command::CancelSetBuy { username, .. }
            | Command::SetSellAmount { username, .. }
            | Command::SetSellTrigger { username, .. }
            | Command::CancelSetSell { username, .. }
            | Command::DisplaySummary { username } => username,
            Command::DumpLog { username, .. } => username.as_deref().unwrap_or(""),
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Command::Quote { symbol, .. }
            | Command::Buy { symbol, .. }
            | Command::Sell { symbol, .. }
            | Command::SetBuyAmount { symbol, .. }
            | Command::SetBuyTrigger { symbol, .. }
            | Command::CancelSetBuy { symbol, .. }
            | Command::SetSellAmount { symbol, .. }
            | Command::SetSellTrigger { symbol, .. }
            | Command::CancelSetSell { symbol, .. } => Some(symbol),
            _ => None,
        }
    }
}
