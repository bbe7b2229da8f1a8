use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::dispatch::Command;
use crate::error::AppError;
use crate::http::state::AppState;
use crate::http::validate;

fn validation_err(e: AppError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": e.code(), "message": e.to_string()})),
    )
        .into_response()
}

fn dispatch_err(e: AppError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.code(), "message": e.to_string()})),
    )
        .into_response()
}

async fn handle(state: &AppState, command: Command, trans: &str) -> Response {
    match state.dispatcher.dispatch(command, trans).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => dispatch_err(e),
    }
}

pub async fn add(
    State(state): State<Arc<AppState>>,
    Path((username, money, trans)): Path<(String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let money_hundredths = match validate::positive_hundredths(&money) {
        Ok(m) => m,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::Add {
            username,
            money_hundredths,
        },
        &trans,
    )
    .await
}

pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, trans)): Path<(String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(&state, Command::Quote { username, symbol }, &trans).await
}

pub async fn buy(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, amount, trans)): Path<(String, String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    let amount_hundredths = match validate::positive_hundredths(&amount) {
        Ok(a) => a,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::Buy {
            username,
            symbol,
            amount_hundredths,
        },
        &trans,
    )
    .await
}

pub async fn commit_buy(
    State(state): State<Arc<AppState>>,
    Path((username, trans)): Path<(String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(&state, Command::CommitBuy { username }, &trans).await
}

pub async fn cancel_buy(
    State(state): State<Arc<AppState>>,
    Path((username, trans)): Path<(String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(&state, Command::CancelBuy { username }, &trans).await
}

pub async fn sell(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, amount, trans)): Path<(String, String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    let amount_hundredths = match validate::positive_hundredths(&amount) {
        Ok(a) => a,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::Sell {
            username,
            symbol,
            amount_hundredths,
        },
        &trans,
    )
    .await
}

pub async fn commit_sell(
    State(state): State<Arc<AppState>>,
    Path((username, trans)): Path<(String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(&state, Command::CommitSell { username }, &trans).await
}

pub async fn cancel_sell(
    State(state): State<Arc<AppState>>,
    Path((username, trans)): Path<(String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(&state, Command::CancelSell { username }, &trans).await
}

pub async fn set_buy_amount(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, amount, trans)): Path<(String, String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    let amount_hundredths = match validate::positive_hundredths(&amount) {
        Ok(a) => a,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::SetBuyAmount {
            username,
            symbol,
            amount_hundredths,
        },
        &trans,
    )
    .await
}

pub async fn set_buy_trigger(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, trigger_price, trans)): Path<(String, String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    let trigger_price_hundredths = match validate::positive_hundredths(&trigger_price) {
        Ok(p) => p,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::SetBuyTrigger {
            username,
            symbol,
            trigger_price_hundredths,
        },
        &trans,
    )
    .await
}

pub async fn cancel_set_buy(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, trans)): Path<(String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(&state, Command::CancelSetBuy { username, symbol }, &trans).await
}

pub async fn set_sell_amount(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, amount, trans)): Path<(String, String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    // SET_SELL_AMOUNT's `{amount}` is a share count, not a currency amount:
    // the gateway debits it straight from the holding (spec.md §4.4).
    let amount_hundredths = match validate::positive_shares(&amount) {
        Ok(a) => a,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::SetSellAmount {
            username,
            symbol,
            amount_hundredths,
        },
        &trans,
    )
    .await
}

pub async fn set_sell_trigger(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, trigger_price, trans)): Path<(String, String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    let trigger_price_hundredths = match validate::positive_hundredths(&trigger_price) {
        Ok(p) => p,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::SetSellTrigger {
            username,
            symbol,
            trigger_price_hundredths,
        },
        &trans,
    )
    .await
}

pub async fn cancel_set_sell(
    State(state): State<Arc<AppState>>,
    Path((username, symbol, trans)): Path<(String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let symbol = match validate::symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(&state, Command::CancelSetSell { username, symbol }, &trans).await
}

pub async fn dumplog(
    State(state): State<Arc<AppState>>,
    Path((filename, trans)): Path<(String, String)>,
) -> Response {
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::DumpLog {
            filename,
            username: None,
        },
        &trans,
    )
    .await
}

pub async fn dumplog_for_user(
    State(state): State<Arc<AppState>>,
    Path((filename, username, trans)): Path<(String, String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(
        &state,
        Command::DumpLog {
            filename,
            username: Some(username),
        },
        &trans,
    )
    .await
}

pub async fn display_summary(
    State(state): State<Arc<AppState>>,
    Path((username, trans)): Path<(String, String)>,
) -> Response {
    let username = match validate::username(&username) {
        Ok(u) => u,
        Err(e) => return validation_err(e),
    };
    let trans = match validate::trans(&trans) {
        Ok(t) => t,
        Err(e) => return validation_err(e),
    };

    handle(&state, Command::DisplaySummary { username }, &trans).await
}
