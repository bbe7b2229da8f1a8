use std::sync::Arc;

use serde_json::{Value, json};
use tracing::instrument;

use crate::audit::{AccountAction, AuditEvent, AuditPublisher, render_hundredths};
use crate::db::gateway::StoreGateway;
use crate::db::types::Side;
use crate::dispatch::commands::Command;
use crate::dispatch::views::{
    Ack, DumpLogView, HoldingView, QuoteView, ReservationView, SummaryView, TriggerView, UserView,
};
use crate::error::AppError;
use crate::audit::sink::AuditSink;
use crate::quote::QuoteOracle;
use crate::reservation::ReservationEngine;
use crate::time::now_ms;
use crate::trigger::TriggerEngine;

/// Composes Gateway/Oracle/Reservation/Trigger calls per command, emitting a
/// `UserCommand` audit event on entry and an `ErrorEvent` on failure
/// (spec.md §4.6). Returns a JSON value the HTTP layer serializes directly.
pub struct Dispatcher {
    gateway: Arc<dyn StoreGateway>,
    oracle: Arc<QuoteOracle>,
    reservations: Arc<ReservationEngine>,
    triggers: Arc<TriggerEngine>,
    audit: AuditPublisher,
    audit_sink: Arc<dyn AuditSink>,
    server_id: String,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn StoreGateway>,
        oracle: Arc<QuoteOracle>,
        reservations: Arc<ReservationEngine>,
        triggers: Arc<TriggerEngine>,
        audit: AuditPublisher,
        audit_sink: Arc<dyn AuditSink>,
        server_id: String,
    ) -> Self {
        Self {
            gateway,
            oracle,
            reservations,
            triggers,
            audit,
            audit_sink,
            server_id,
        }
    }

    #[instrument(skip(self, command), fields(command = command.name(), username = command.username()))]
    pub async fn dispatch(&self, command: Command, txn_id: &str) -> Result<Value, AppError> {
        self.emit_user_command(&command, txn_id);

        let result = self.run(command.clone(), txn_id).await;

        if let Err(e) = &result {
            self.emit_error(&command, txn_id, e);
        }

        result
    }

    async fn run(&self, command: Command, txn_id: &str) -> Result<Value, AppError> {
        match command {
            Command::Add {
                username,
                money_hundredths,
            } => {
                let user = self.gateway.add_funds(&username, money_hundredths).await?;
                self.emit_account_transaction(&username, txn_id, AccountAction::Add, money_hundredths);
                Ok(json!(UserView::from(user)))
            }

            Command::Quote { username, symbol } => {
                let price = self.oracle.quote(&username, &symbol, txn_id).await?;
                Ok(json!(QuoteView {
                    symbol,
                    price_hundredths: price,
                }))
            }

            Command::Buy {
                username,
                symbol,
                amount_hundredths,
            } => {
                let placed = self
                    .reservations
                    .place(&username, &symbol, Side::Buy, amount_hundredths, txn_id)
                    .await?;
                Ok(json!(ReservationView {
                    rid: placed.rid.to_string(),
                    symbol,
                    side: "BUY",
                    shares: placed.shares,
                    amount_hundredths: placed.amount_hundredths,
                }))
            }

            Command::CommitBuy { username } => {
                self.reservations.commit(&username, Side::Buy).await?;
                Ok(json!(Ack { ok: true }))
            }

            Command::CancelBuy { username } => {
                self.reservations.cancel(&username, Side::Buy).await?;
                Ok(json!(Ack { ok: true }))
            }

            Command::Sell {
                username,
                symbol,
                amount_hundredths,
            } => {
                let placed = self
                    .reservations
                    .place(&username, &symbol, Side::Sell, amount_hundredths, txn_id)
                    .await?;
                Ok(json!(ReservationView {
                    rid: placed.rid.to_string(),
                    symbol,
                    side: "SELL",
                    shares: placed.shares,
                    amount_hundredths: placed.amount_hundredths,
                }))
            }

            Command::CommitSell { username } => {
                self.reservations.commit(&username, Side::Sell).await?;
                Ok(json!(Ack { ok: true }))
            }

            Command::CancelSell { username } => {
                self.reservations.cancel(&username, Side::Sell).await?;
                Ok(json!(Ack { ok: true }))
            }

            Command::SetBuyAmount {
                username,
                symbol,
                amount_hundredths,
            } => {
                let trigger = self
                    .triggers
                    .set_amount(&username, &symbol, Side::Buy, amount_hundredths)
                    .await?;
                Ok(json!(TriggerView::from(trigger)))
            }

            Command::SetBuyTrigger {
                username,
                symbol,
                trigger_price_hundredths,
            } => {
                self.triggers
                    .set_price(&username, &symbol, Side::Buy, trigger_price_hundredths)
                    .await?;
                Ok(json!(Ack { ok: true }))
            }

            Command::CancelSetBuy { username, symbol } => {
                self.triggers.cancel(&username, &symbol, Side::Buy).await?;
                Ok(json!(Ack { ok: true }))
            }

            Command::SetSellAmount {
                username,
                symbol,
                amount_hundredths,
            } => {
                let trigger = self
                    .triggers
                    .set_amount(&username, &symbol, Side::Sell, amount_hundredths)
                    .await?;
                Ok(json!(TriggerView::from(trigger)))
            }

            Command::SetSellTrigger {
                username,
                symbol,
                trigger_price_hundredths,
            } => {
                self.triggers
                    .set_price(&username, &symbol, Side::Sell, trigger_price_hundredths)
                    .await?;
                Ok(json!(Ack { ok: true }))
            }

            Command::CancelSetSell { username, symbol } => {
                self.triggers.cancel(&username, &symbol, Side::Sell).await?;
                Ok(json!(Ack { ok: true }))
            }

            Command::DumpLog { filename, username } => {
                let content = self
                    .audit_sink
                    .dump(username.as_deref())
                    .await
                    .map_err(|e| AppError::StoreError(e.to_string()))?;

                Ok(json!(DumpLogView { filename, content }))
            }

            Command::DisplaySummary { username } => {
                let user = self
                    .gateway
                    .get_user(&username)
                    .await?
                    .ok_or_else(|| AppError::UnknownUser(username.clone()))?;

                let holdings: Vec<HoldingView> = self
                    .gateway
                    .list_holdings(&username)
                    .await?
                    .into_iter()
                    .map(HoldingView::from)
                    .collect();

                let reservations: Vec<ReservationView> = self
                    .gateway
                    .list_reservations(&username)
                    .await?
                    .into_iter()
                    .map(ReservationView::from)
                    .collect();

                let triggers: Vec<TriggerView> = self
                    .gateway
                    .list_triggers(&username)
                    .await?
                    .into_iter()
                    .map(TriggerView::from)
                    .collect();

                Ok(json!(SummaryView {
                    username: user.username,
                    money_hundredths: user.money_hundredths,
                    holdings,
                    reservations,
                    triggers,
                }))
            }
        }
    }

    fn emit_user_command(&self, command: &Command, txn_id: &str) {
        self.audit.publish(AuditEvent::UserCommand {
            timestamp: now_ms(),
            server: self.server_id.clone(),
            transaction_num: txn_id.to_string(),
            command: command.name().to_string(),
            username: command.username().to_string(),
            stock_symbol: command.symbol().map(|s| s.to_string()),
            funds: None,
        });
    }

    fn emit_account_transaction(
        &self,
        username: &str,
        txn_id: &str,
        action: AccountAction,
        amount_hundredths: i64,
    ) {
        self.audit.publish(AuditEvent::AccountTransaction {
            timestamp: now_ms(),
            server: self.server_id.clone(),
            transaction_num: txn_id.to_string(),
            action,
            username: username.to_string(),
            funds: render_hundredths(amount_hundredths),
        });
    }

    fn emit_error(&self, command: &Command, txn_id: &str, error: &AppError) {
        self.audit.publish(AuditEvent::ErrorEvent {
            timestamp: now_ms(),
            server: self.server_id.clone(),
            transaction_num: txn_id.to_string(),
            command: command.name().to_string(),
            username: command.username().to_string(),
            stock_symbol: command.symbol().map(|s| s.to_string()),
            funds: None,
            error_message: error.to_string(),
        });
    }
}
