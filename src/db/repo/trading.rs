//! Holdings, purchase lots, and pending price impacts.

use super::{parse_decimal, Repository};
use crate::domain::{Decimal, LotMutation, PendingImpact, PurchaseLot, TimeMs, UserId};
use sqlx::Row;

impl Repository {
    // =========================================================================
    // Share ownership
    // =========================================================================

    /// Current share holding of `holder` in `stock_user`'s stock.
    pub async fn holding(
        &self,
        holder_id: &UserId,
        stock_user_id: &UserId,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "SELECT shares FROM holdings WHERE holder_id = ? AND stock_user_id = ?",
        )
        .bind(holder_id.as_str())
        .bind(stock_user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("shares")).unwrap_or(0))
    }

    /// Apply a signed share delta to a holding, deleting the row when the
    /// result is non-positive. Returns the new holding.
    pub async fn adjust_holding(
        &self,
        holder_id: &UserId,
        stock_user_id: &UserId,
        delta: i64,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT shares FROM holdings WHERE holder_id = ? AND stock_user_id = ?",
        )
        .bind(holder_id.as_str())
        .bind(stock_user_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let current: i64 = row.map(|r| r.get("shares")).unwrap_or(0);
        let updated = current + delta;

        if updated <= 0 {
            sqlx::query("DELETE FROM holdings WHERE holder_id = ? AND stock_user_id = ?")
                .bind(holder_id.as_str())
                .bind(stock_user_id.as_str())
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO holdings (holder_id, stock_user_id, shares)
                VALUES (?, ?, ?)
                ON CONFLICT(holder_id, stock_user_id) DO UPDATE SET shares = excluded.shares
                "#,
            )
            .bind(holder_id.as_str())
            .bind(stock_user_id.as_str())
            .bind(updated)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated.max(0))
    }

    /// Total outstanding shares of a stock across all holders.
    pub async fn total_outstanding_shares(
        &self,
        stock_user_id: &UserId,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(shares), 0) AS total FROM holdings WHERE stock_user_id = ?",
        )
        .bind(stock_user_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }

    // =========================================================================
    // Purchase lots
    // =========================================================================

    /// Append a purchase lot. Lots are never merged.
    pub async fn insert_purchase_lot(
        &self,
        buyer_id: &UserId,
        stock_user_id: &UserId,
        shares: i64,
        price: Decimal,
        time_ms: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO purchase_lots (buyer_id, stock_user_id, shares, price, time_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(buyer_id.as_str())
        .bind(stock_user_id.as_str())
        .bind(shares)
        .bind(price.to_canonical_string())
        .bind(time_ms.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All lots for a (buyer, stock) pair, oldest first.
    pub async fn purchase_lots(
        &self,
        buyer_id: &UserId,
        stock_user_id: &UserId,
    ) -> Result<Vec<PurchaseLot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, buyer_id, stock_user_id, shares, price, time_ms
            FROM purchase_lots
            WHERE buyer_id = ? AND stock_user_id = ?
            ORDER BY time_ms ASC, id ASC
            "#,
        )
        .bind(buyer_id.as_str())
        .bind(stock_user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let lots = rows
            .iter()
            .map(|row| {
                let price: String = row.get("price");
                PurchaseLot {
                    id: row.get("id"),
                    buyer_id: UserId::new(row.get::<String, _>("buyer_id")),
                    stock_user_id: UserId::new(row.get::<String, _>("stock_user_id")),
                    shares: row.get("shares"),
                    price: parse_decimal("price", &price, Decimal::zero()),
                    time_ms: TimeMs::new(row.get("time_ms")),
                }
            })
            .collect();

        Ok(lots)
    }

    /// Apply a FIFO consumption plan's lot edits in a single transaction.
    ///
    /// A partial failure here would break the lot-conservation invariant, so
    /// all reductions and deletions commit together or not at all.
    pub async fn apply_lot_mutations(
        &self,
        mutations: &[LotMutation],
    ) -> Result<(), sqlx::Error> {
        if mutations.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for mutation in mutations {
            match mutation {
                LotMutation::Delete { lot_id } => {
                    sqlx::query("DELETE FROM purchase_lots WHERE id = ?")
                        .bind(lot_id)
                        .execute(&mut *tx)
                        .await?;
                }
                LotMutation::Reduce {
                    lot_id,
                    remaining_shares,
                } => {
                    sqlx::query("UPDATE purchase_lots SET shares = ? WHERE id = ?")
                        .bind(remaining_shares)
                        .bind(lot_id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Pending price impacts
    // =========================================================================

    /// Append a pending impact row. Each trade phases in independently, so
    /// rows are never merged.
    pub async fn insert_pending_impact(
        &self,
        stock_user_id: &UserId,
        shares_delta: i64,
        time_ms: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO pending_impacts (stock_user_id, shares_delta, time_ms, fully_applied)
            VALUES (?, ?, ?, 0)
            "#,
        )
        .bind(stock_user_id.as_str())
        .bind(shares_delta)
        .bind(time_ms.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Impact rows not yet flagged as fully applied, oldest first.
    pub async fn unapplied_impacts(
        &self,
        stock_user_id: &UserId,
    ) -> Result<Vec<PendingImpact>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, stock_user_id, shares_delta, time_ms, fully_applied
            FROM pending_impacts
            WHERE stock_user_id = ? AND fully_applied = 0
            ORDER BY time_ms ASC, id ASC
            "#,
        )
        .bind(stock_user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let impacts = rows
            .iter()
            .map(|row| PendingImpact {
                id: row.get("id"),
                stock_user_id: UserId::new(row.get::<String, _>("stock_user_id")),
                shares_delta: row.get("shares_delta"),
                time_ms: TimeMs::new(row.get("time_ms")),
                fully_applied: row.get::<i64, _>("fully_applied") != 0,
            })
            .collect();

        Ok(impacts)
    }

    /// Flag impact rows whose full delay window has elapsed. A flagged row
    /// contributes the same zero remainder as an unflagged past-the-window
    /// row; this is compaction, not a behavior change.
    pub async fn mark_impacts_applied(&self, ids: &[i64]) -> Result<(), sqlx::Error> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for id in ids {
            sqlx::query("UPDATE pending_impacts SET fully_applied = 1 WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
