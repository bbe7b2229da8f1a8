use uuid::Uuid;

/// BUY/SELL side shared by reservations and triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct User {
    pub username: String,
    pub money_hundredths: i64,
}

#[derive(Clone, Debug)]
pub struct Holding {
    pub username: String,
    pub symbol: String,
    pub shares: i64,
}

#[derive(Clone, Debug)]
pub struct Reservation {
    pub rid: Uuid,
    pub username: String,
    pub symbol: String,
    pub side: Side,
    pub shares: i64,
    pub amount_hundredths: i64,
    pub created_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Trigger {
    pub tid: Uuid,
    pub username: String,
    pub symbol: String,
    pub side: Side,
    pub amount_hundredths: i64,
    pub trigger_price_hundredths: i64,
    pub executable: bool,
    pub created_ms: u64,
}
