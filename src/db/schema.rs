use sqlx::AnyPool;

/// Idempotent DDL for the four entities in the data model. Runs against
/// either sqlite (dev/tests) or postgres (production) through `AnyPool`.
pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS users (
  username TEXT PRIMARY KEY,
  money_hundredths BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS stocks (
  username TEXT NOT NULL,
  symbol TEXT NOT NULL,
  shares BIGINT NOT NULL,
  PRIMARY KEY (username, symbol)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS reservations (
  rid TEXT PRIMARY KEY,
  username TEXT NOT NULL,
  symbol TEXT NOT NULL,
  side TEXT NOT NULL,
  shares BIGINT NOT NULL,
  amount_hundredths BIGINT NOT NULL,
  created_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS triggers (
  tid TEXT PRIMARY KEY,
  username TEXT NOT NULL,
  symbol TEXT NOT NULL,
  side TEXT NOT NULL,
  amount_hundredths BIGINT NOT NULL,
  trigger_price_hundredths BIGINT NOT NULL,
  executable BOOLEAN NOT NULL,
  created_ms BIGINT NOT NULL,
  UNIQUE (username, symbol, side)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_reservations_lookup ON reservations(username, side, created_ms, rid);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_triggers_executable ON triggers(executable);"#)
        .execute(pool)
        .await?;

    Ok(())
}
