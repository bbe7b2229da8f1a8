use serde::Serialize;

use crate::db::types::{Holding, Reservation, Side, Trigger, User};

fn side_str(side: Side) -> &'static str {
    side.as_str()
}

#[derive(Serialize)]
pub struct UserView {
    pub username: String,
    pub money_hundredths: i64,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            username: u.username,
            money_hundredths: u.money_hundredths,
        }
    }
}

#[derive(Serialize)]
pub struct QuoteView {
    pub symbol: String,
    pub price_hundredths: i64,
}

#[derive(Serialize)]
pub struct ReservationView {
    pub rid: String,
    pub symbol: String,
    pub side: &'static str,
    pub shares: i64,
    pub amount_hundredths: i64,
}

impl From<Reservation> for ReservationView {
    fn from(r: Reservation) -> Self {
        Self {
            rid: r.rid.to_string(),
            symbol: r.symbol,
            side: side_str(r.side),
            shares: r.shares,
            amount_hundredths: r.amount_hundredths,
        }
    }
}

#[derive(Serialize)]
pub struct HoldingView {
    pub symbol: String,
    pub shares: i64,
}

impl From<Holding> for HoldingView {
    fn from(h: Holding) -> Self {
        Self {
            symbol: h.symbol,
            shares: h.shares,
        }
    }
}

#[derive(Serialize)]
pub struct TriggerView {
    pub tid: String,
    pub symbol: String,
    pub side: &'static str,
    pub amount_hundredths: i64,
    pub trigger_price_hundredths: i64,
    pub executable: bool,
}

impl From<Trigger> for TriggerView {
    fn from(t: Trigger) -> Self {
        Self {
            tid: t.tid.to_string(),
            symbol: t.symbol,
            side: side_str(t.side),
            amount_hundredths: t.amount_hundredths,
            trigger_price_hundredths: t.trigger_price_hundredths,
            executable: t.executable,
        }
    }
}

#[derive(Serialize)]
pub struct SummaryView {
    pub username: String,
    pub money_hundredths: i64,
    pub holdings: Vec<HoldingView>,
    pub reservations: Vec<ReservationView>,
    pub triggers: Vec<TriggerView>,
}

#[derive(Serialize)]
pub struct DumpLogView {
    pub filename: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct Ack {
    pub ok: bool,
}
