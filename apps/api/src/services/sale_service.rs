//! # Sale Engine
//!
//! Records, edits and removes sales while keeping product stock in step.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(scope, input)                                                   │
//! │                                                                         │
//! │  1. validate_sale_input ─────────────► 400 on failure                   │
//! │  2. resolve every line in the catalog ► 404 on unknown item             │
//! │  3. availability pre-check ──────────► 409 (advisory)                   │
//! │  4. price lines, compute totals                                         │
//! │  5. reserve stock line by line ──────► 409, earlier lines re-credited   │
//! │  6. persist sale ────────────────────► on failure, reservation released │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Update is `release(old)` followed by `reserve(new)`; delete is
//! `release(old)` followed by removal. There is no transaction spanning
//! the ledger calls and the sale write. Compensation is best-effort and
//! logged with `warn!` when it fails.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stockbook_core::catalog::{enrich, EnrichedSale};
use stockbook_core::finance::{compute_totals, price_line};
use stockbook_core::validation::validate_sale_input;
use stockbook_core::{
    CatalogItem, CoreError, ItemKind, LineInput, Money, Product, Sale, SaleBody, SaleInput,
    SaleLine, SaleSummary, SaleTotals, Scope, StockReservation,
};
use stockbook_db::{Database, DbError, SaleFilter};

use crate::error::{ApiError, ApiResult};
use crate::services::catalog_for;

// =============================================================================
// Ledger Direction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Take stock out (sale recorded).
    Reserve,
    /// Put stock back (sale edited or removed).
    Release,
}

impl Direction {
    fn delta(self, quantity: i64) -> i64 {
        match self {
            Direction::Reserve => -quantity,
            Direction::Release => quantity,
        }
    }

    fn reverse(self) -> Self {
        match self {
            Direction::Reserve => Direction::Release,
            Direction::Release => Direction::Reserve,
        }
    }
}

/// A request line bound to its catalog item and final unit price.
#[derive(Debug, Clone)]
struct ResolvedLine {
    item: CatalogItem,
    quantity: i64,
    unit_sale_price: Money,
}

// =============================================================================
// Sale Engine
// =============================================================================

#[derive(Debug, Clone)]
pub struct SaleEngine {
    db: Database,
}

impl SaleEngine {
    pub fn new(db: Database) -> Self {
        SaleEngine { db }
    }

    /// Records a sale and reserves its stock.
    pub async fn create(&self, scope: &Scope, input: SaleInput) -> ApiResult<SaleSummary> {
        validate_sale_input(&input)?;
        let resolved = self.resolve(scope, &input.items.to_lines()).await?;
        check_availability(&resolved, &HashMap::new())?;

        let sale = build_sale(scope, &input, &resolved)?;
        let reservations = sale.body.product_reservations();

        self.apply(scope, &reservations, Direction::Reserve).await?;

        if let Err(err) = self.db.sales().insert(&sale).await {
            warn!(sale_id = %sale.id, error = %err, "Saving sale failed, releasing reserved stock");
            let applied: Vec<&StockReservation> = reservations.iter().collect();
            self.undo(scope, &applied, Direction::Reserve).await;
            return Err(err.into());
        }

        info!(
            sale_id = %sale.id,
            lines = sale.body.line_count(),
            total_sales = %sale.totals.map(|t| t.total_sales).unwrap_or_default(),
            total_profit = %sale.total_profit,
            "Sale created"
        );

        Ok(summarize(&sale))
    }

    /// Replaces a sale's lines and metadata, moving stock accordingly.
    ///
    /// A legacy record is rewritten in the line-item shape.
    pub async fn update(
        &self,
        scope: &Scope,
        sale_id: &str,
        input: SaleInput,
    ) -> ApiResult<SaleSummary> {
        let existing = self.load(scope, sale_id).await?;

        validate_sale_input(&input)?;
        let resolved = self.resolve(scope, &input.items.to_lines()).await?;

        let old = existing.body.product_reservations();
        check_availability(&resolved, &held_quantities(&old))?;

        let mut sale = build_sale(scope, &input, &resolved)?;
        sale.id = existing.id.clone();
        sale.business_id = existing.business_id.clone();
        sale.created_at = existing.created_at;
        sale.sale_date = input.sale_date.unwrap_or(existing.sale_date);
        let new = sale.body.product_reservations();

        self.apply(scope, &old, Direction::Release).await?;

        if let Err(err) = self.apply(scope, &new, Direction::Reserve).await {
            warn!(sale_id = %sale_id, error = %err, "Reserving new lines failed, restoring previous reservation");
            let released: Vec<&StockReservation> = old.iter().collect();
            self.undo(scope, &released, Direction::Release).await;
            return Err(err);
        }

        if let Err(err) = self.db.sales().replace(scope, &sale).await {
            warn!(sale_id = %sale_id, error = %err, "Saving updated sale failed, restoring previous reservation");
            let reserved: Vec<&StockReservation> = new.iter().collect();
            self.undo(scope, &reserved, Direction::Reserve).await;
            let released: Vec<&StockReservation> = old.iter().collect();
            self.undo(scope, &released, Direction::Release).await;
            return Err(err.into());
        }

        info!(
            sale_id = %sale.id,
            was_legacy = existing.is_legacy(),
            lines = sale.body.line_count(),
            total_profit = %sale.total_profit,
            "Sale updated"
        );

        Ok(summarize(&sale))
    }

    /// Removes a sale and returns its stock.
    pub async fn delete(&self, scope: &Scope, sale_id: &str) -> ApiResult<()> {
        let existing = self.load(scope, sale_id).await?;
        let held = existing.body.product_reservations();

        self.apply(scope, &held, Direction::Release).await?;

        let outcome = match self.db.sales().delete(scope, sale_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ApiError::not_found("Sale", sale_id)),
            Err(err) => Err(err.into()),
        };

        if outcome.is_err() {
            let released: Vec<&StockReservation> = held.iter().collect();
            self.undo(scope, &released, Direction::Release).await;
        } else {
            info!(sale_id = %sale_id, "Sale deleted");
        }

        outcome
    }

    /// Loads one sale with per-line display attributes.
    pub async fn get(&self, scope: &Scope, sale_id: &str) -> ApiResult<EnrichedSale> {
        let sale = self.load(scope, sale_id).await?;
        let sales = [sale];
        let catalog = catalog_for(&self.db, scope, &sales).await?;
        Ok(enrich(&sales[0], &catalog))
    }

    /// Lists sales, newest first, with per-line display attributes.
    pub async fn list(&self, scope: &Scope, filter: &SaleFilter) -> ApiResult<Vec<EnrichedSale>> {
        let sales = self.db.sales().list(scope, filter).await?;
        let catalog = catalog_for(&self.db, scope, &sales).await?;
        Ok(sales.iter().map(|sale| enrich(sale, &catalog)).collect())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load(&self, scope: &Scope, sale_id: &str) -> ApiResult<Sale> {
        self.db
            .sales()
            .get(scope, sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale", sale_id))
    }

    /// Looks up every line's item within the scope.
    async fn resolve(&self, scope: &Scope, lines: &[LineInput]) -> ApiResult<Vec<ResolvedLine>> {
        let mut cache: HashMap<(ItemKind, String), CatalogItem> = HashMap::new();
        let mut resolved = Vec::with_capacity(lines.len());

        for line in lines {
            let key = (line.item_kind, line.item_id.clone());
            let item = match cache.get(&key) {
                Some(item) => item.clone(),
                None => {
                    let item = self.lookup(scope, line.item_kind, &line.item_id).await?;
                    cache.insert(key, item.clone());
                    item
                }
            };

            let unit_sale_price = line.unit_sale_price.unwrap_or_else(|| item.list_price());
            resolved.push(ResolvedLine {
                item,
                quantity: line.quantity,
                unit_sale_price,
            });
        }

        debug!(lines = resolved.len(), "Resolved sale lines");
        Ok(resolved)
    }

    async fn lookup(&self, scope: &Scope, kind: ItemKind, id: &str) -> ApiResult<CatalogItem> {
        let item = match kind {
            ItemKind::Product => self.db.products().get(scope, id).await?.map(CatalogItem::Product),
            ItemKind::Service => self.db.services().get(scope, id).await?.map(CatalogItem::Service),
        };

        item.ok_or_else(|| CoreError::not_found(kind.as_str(), id).into())
    }

    /// Applies every reservation in order. On the first failure the ones
    /// already applied are reversed and the error returned.
    ///
    /// Releasing stock of a product that no longer exists is skipped.
    async fn apply(
        &self,
        scope: &Scope,
        reservations: &[StockReservation],
        direction: Direction,
    ) -> ApiResult<()> {
        let ledger = self.db.stock();
        let mut applied: Vec<&StockReservation> = Vec::with_capacity(reservations.len());

        for reservation in reservations {
            let delta = direction.delta(reservation.quantity);
            match ledger.adjust(scope, &reservation.product_id, delta).await {
                Ok(stock) => {
                    debug!(product_id = %reservation.product_id, delta, stock, "Stock adjusted");
                    applied.push(reservation);
                }
                Err(DbError::NotFound { .. }) if direction == Direction::Release => {
                    warn!(
                        product_id = %reservation.product_id,
                        quantity = reservation.quantity,
                        "Product no longer exists, skipping stock release"
                    );
                }
                Err(err) => {
                    if let DbError::Timeout { .. } = err {
                        warn!(
                            product_id = %reservation.product_id,
                            delta,
                            "Stock adjustment timed out, outcome unknown and left uncompensated"
                        );
                    }
                    self.undo(scope, &applied, direction).await;
                    return Err(match err {
                        DbError::InsufficientStock {
                            available,
                            requested,
                            ..
                        } => CoreError::InsufficientStock {
                            item: reservation.name.clone(),
                            available,
                            requested,
                        }
                        .into(),
                        other => other.into(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Best-effort reversal of adjustments made in `direction`, newest first.
    async fn undo(&self, scope: &Scope, applied: &[&StockReservation], direction: Direction) {
        let ledger = self.db.stock();
        let reverse = direction.reverse();

        for reservation in applied.iter().rev() {
            let delta = reverse.delta(reservation.quantity);
            if let Err(err) = ledger.adjust(scope, &reservation.product_id, delta).await {
                warn!(
                    product_id = %reservation.product_id,
                    delta,
                    error = %err,
                    "Stock compensation failed"
                );
            }
        }
    }
}

// =============================================================================
// Pure Helpers
// =============================================================================

/// Quantity currently held per product by a stored sale.
fn held_quantities(reservations: &[StockReservation]) -> HashMap<String, i64> {
    let mut held = HashMap::new();
    for r in reservations {
        *held.entry(r.product_id.clone()).or_insert(0) += r.quantity;
    }
    held
}

/// Advisory check of summed demand per product against known stock plus
/// whatever the sale being replaced already holds.
fn check_availability(resolved: &[ResolvedLine], held: &HashMap<String, i64>) -> ApiResult<()> {
    let mut demand: Vec<(&Product, i64)> = Vec::new();

    for line in resolved {
        if let CatalogItem::Product(product) = &line.item {
            match demand.iter_mut().find(|(p, _)| p.id == product.id) {
                Some((_, quantity)) => *quantity += line.quantity,
                None => demand.push((product, line.quantity)),
            }
        }
    }

    for (product, requested) in demand {
        let credit = held.get(&product.id).copied().unwrap_or(0);
        if !product.can_sell(requested - credit) {
            return Err(CoreError::InsufficientStock {
                item: product.name.clone(),
                available: product.current_stock + credit,
                requested,
            }
            .into());
        }
    }

    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Builds a fresh line-item sale (new id, timestamps now).
///
/// Fails with a validation error when the priced amounts overflow.
fn build_sale(scope: &Scope, input: &SaleInput, resolved: &[ResolvedLine]) -> ApiResult<Sale> {
    let lines = resolved
        .iter()
        .map(|l| price_line(&l.item, l.quantity, l.unit_sale_price))
        .collect::<Result<Vec<SaleLine>, _>>()?;

    let sale_expenses = input.resolved_sale_expenses();
    let totals = compute_totals(&lines, sale_expenses)?;
    let now = Utc::now();

    Ok(Sale {
        id: Uuid::new_v4().to_string(),
        user_id: scope.user_id.clone(),
        business_id: Some(scope.business_id.clone()),
        customer_name: non_blank(&input.customer_name),
        sale_date: input.sale_date.unwrap_or(now),
        notes: non_blank(&input.notes),
        body: SaleBody::Lines(lines),
        totals: Some(SaleTotals {
            total_sales: totals.total_sales,
            total_cogs: totals.total_cogs,
        }),
        total_profit: totals.total_profit,
        sale_expenses,
        sale_expense_details: input.sale_expense_details.clone(),
        created_at: now,
        updated_at: now,
    })
}

fn summarize(sale: &Sale) -> SaleSummary {
    let totals = sale.totals.unwrap_or(SaleTotals {
        total_sales: Money::zero(),
        total_cogs: Money::zero(),
    });

    SaleSummary {
        sale_id: sale.id.clone(),
        total_sales: totals.total_sales,
        total_cogs: totals.total_cogs,
        total_profit: sale.total_profit,
        item_count: sale.body.line_count(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::fixtures::{self, stock_of};
    use stockbook_core::catalog::AttributeSource;
    use stockbook_core::{LegacyLine, SaleExpenseDetail, SaleItems};
    use stockbook_db::DbConfig;

    fn line(item_id: &str, kind: ItemKind, quantity: i64, price: Option<i64>) -> LineInput {
        LineInput {
            item_id: item_id.to_string(),
            item_kind: kind,
            quantity,
            unit_sale_price: price.map(Money::from_cents),
        }
    }

    fn product_sale(item_id: &str, quantity: i64) -> SaleInput {
        SaleInput::from_lines(vec![line(item_id, ItemKind::Product, quantity, None)])
    }

    #[tokio::test]
    async fn test_create_update_delete_round_trip() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create(&scope, product_sale(&mug.id, 3)).await.unwrap();
        assert_eq!(stock_of(&db, &scope, &mug).await, 7);
        assert_eq!(created.total_sales, Money::from_cents(3000));
        assert_eq!(created.total_cogs, Money::from_cents(1200));
        assert_eq!(created.total_profit, Money::from_cents(1800));
        assert_eq!(created.item_count, 1);

        let updated = engine
            .update(&scope, &created.sale_id, product_sale(&mug.id, 5))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &scope, &mug).await, 5);
        assert_eq!(updated.sale_id, created.sale_id);
        assert_eq!(updated.total_sales, Money::from_cents(5000));
        assert_eq!(updated.total_cogs, Money::from_cents(2000));
        assert_eq!(updated.total_profit, Money::from_cents(3000));

        engine.delete(&scope, &created.sale_id).await.unwrap();
        assert_eq!(stock_of(&db, &scope, &mug).await, 10);

        let err = engine.get(&scope, &created.sale_id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_everything_untouched() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let err = engine.create(&scope, product_sale(&mug.id, 11)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(stock_of(&db, &scope, &mug).await, 10);
        assert!(engine.list(&scope, &SaleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_lines_are_summed_before_checking() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 5, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let input = SaleInput::from_lines(vec![
            line(&mug.id, ItemKind::Product, 3, None),
            line(&mug.id, ItemKind::Product, 3, None),
        ]);
        let err = engine.create(&scope, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(stock_of(&db, &scope, &mug).await, 5);
    }

    #[tokio::test]
    async fn test_multi_line_totals() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let a = fixtures::product(&db, &scope, "A", "Kitchen", 10, 400, 1000).await;
        let b = fixtures::product(&db, &scope, "B", "Garden", 10, 200, 500).await;
        let engine = SaleEngine::new(db.clone());

        let input = SaleInput::from_lines(vec![
            line(&a.id, ItemKind::Product, 2, Some(1000)),
            line(&b.id, ItemKind::Product, 1, Some(500)),
        ]);
        let summary = engine.create(&scope, input).await.unwrap();

        assert_eq!(summary.total_sales, Money::from_cents(2500));
        assert_eq!(summary.total_cogs, Money::from_cents(1000));
        assert_eq!(summary.total_profit, Money::from_cents(1500));
        assert_eq!(summary.item_count, 2);
        assert_eq!(stock_of(&db, &scope, &a).await, 8);
        assert_eq!(stock_of(&db, &scope, &b).await, 9);

        let sale = engine.get(&scope, &summary.sale_id).await.unwrap();
        assert_eq!(sale.display_name, "Multi-product sale (2 items)");
        assert_eq!(sale.items[1].category, "Garden");
        assert_eq!(sale.items[0].attributes_source, AttributeSource::Snapshot);
    }

    #[tokio::test]
    async fn test_profit_invariant_with_sale_expenses() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let mut input = product_sale(&mug.id, 2);
        input.sale_expense_details = vec![
            SaleExpenseDetail {
                category: "Shipping".to_string(),
                amount: Money::from_cents(300),
                description: None,
            },
            SaleExpenseDetail {
                category: "Packaging".to_string(),
                amount: Money::from_cents(200),
                description: Some("Gift box".to_string()),
            },
        ];
        let summary = engine.create(&scope, input).await.unwrap();

        let stored = db.sales().get(&scope, &summary.sale_id).await.unwrap().unwrap();
        let totals = stored.totals.unwrap();
        assert_eq!(stored.sale_expenses, Money::from_cents(500));
        assert_eq!(
            stored.total_profit,
            totals.total_sales - totals.total_cogs - stored.sale_expenses
        );
        assert_eq!(stored.total_profit, Money::from_cents(700));
    }

    #[tokio::test]
    async fn test_mismatched_sale_expenses_rejected() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let mut input = product_sale(&mug.id, 1);
        input.sale_expenses = Some(Money::from_cents(100));
        input.sale_expense_details = vec![SaleExpenseDetail {
            category: "Shipping".to_string(),
            amount: Money::from_cents(300),
            description: None,
        }];

        let err = engine.create(&scope, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(stock_of(&db, &scope, &mug).await, 10);
    }

    #[tokio::test]
    async fn test_service_line_has_no_cost_and_no_stock() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let wrap = fixtures::service(&db, &scope, "Gift wrap", 1500).await;
        let engine = SaleEngine::new(db.clone());

        let input = SaleInput::from_lines(vec![
            line(&wrap.id, ItemKind::Service, 2, None),
            line(&mug.id, ItemKind::Product, 1, None),
        ]);
        let summary = engine.create(&scope, input).await.unwrap();

        assert_eq!(summary.total_sales, Money::from_cents(4000));
        assert_eq!(summary.total_cogs, Money::from_cents(400));
        assert_eq!(stock_of(&db, &scope, &mug).await, 9);

        let sale = engine.get(&scope, &summary.sale_id).await.unwrap();
        let service_line = &sale.items[0];
        assert_eq!(service_line.item_kind, ItemKind::Service);
        assert!(service_line.unit_cost_price.is_zero());
        assert_eq!(service_line.line_profit, service_line.line_total);
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found_before_any_mutation() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let input = SaleInput::from_lines(vec![
            line(&mug.id, ItemKind::Product, 2, None),
            line(&Uuid::new_v4().to_string(), ItemKind::Product, 1, None),
        ]);
        let err = engine.create(&scope, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(stock_of(&db, &scope, &mug).await, 10);

        // A product id sent as a service does not resolve either.
        let input = SaleInput::from_lines(vec![line(&mug.id, ItemKind::Service, 1, None)]);
        let err = engine.create(&scope, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_failed_reservation_recredits_earlier_lines() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let a = fixtures::product(&db, &scope, "A", "Kitchen", 5, 400, 1000).await;
        let b = fixtures::product(&db, &scope, "B", "Kitchen", 1, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let reservations = vec![
            StockReservation {
                product_id: a.id.clone(),
                name: a.name.clone(),
                quantity: 2,
            },
            StockReservation {
                product_id: b.id.clone(),
                name: b.name.clone(),
                quantity: 3,
            },
        ];

        let err = engine
            .apply(&scope, &reservations, Direction::Reserve)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("B"));
        assert_eq!(stock_of(&db, &scope, &a).await, 5);
        assert_eq!(stock_of(&db, &scope, &b).await, 1);
    }

    #[tokio::test]
    async fn test_update_credits_stock_already_held() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 5, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create(&scope, product_sale(&mug.id, 5)).await.unwrap();
        assert_eq!(stock_of(&db, &scope, &mug).await, 0);

        engine
            .update(&scope, &created.sale_id, product_sale(&mug.id, 4))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &scope, &mug).await, 1);

        let err = engine
            .update(&scope, &created.sale_id, product_sale(&mug.id, 6))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(stock_of(&db, &scope, &mug).await, 1);
    }

    #[tokio::test]
    async fn test_update_switching_products() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let lamp = fixtures::product(&db, &scope, "Lamp", "Lighting", 2, 1500, 3000).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create(&scope, product_sale(&mug.id, 4)).await.unwrap();
        engine
            .update(&scope, &created.sale_id, product_sale(&lamp.id, 2))
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &scope, &mug).await, 10);
        assert_eq!(stock_of(&db, &scope, &lamp).await, 0);
    }

    #[tokio::test]
    async fn test_update_preserves_identity_and_date() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let mut input = product_sale(&mug.id, 1);
        input.customer_name = Some("Ada".to_string());
        let created = engine.create(&scope, input).await.unwrap();
        let before = db.sales().get(&scope, &created.sale_id).await.unwrap().unwrap();

        engine
            .update(&scope, &created.sale_id, product_sale(&mug.id, 2))
            .await
            .unwrap();
        let after = db.sales().get(&scope, &created.sale_id).await.unwrap().unwrap();

        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.sale_date, before.sale_date);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.customer_name, None);
    }

    #[tokio::test]
    async fn test_legacy_sale_update_and_delete() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 7, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let now = Utc::now();
        let legacy = Sale {
            id: Uuid::new_v4().to_string(),
            user_id: scope.user_id.clone(),
            business_id: None,
            customer_name: None,
            sale_date: now,
            notes: None,
            body: SaleBody::Legacy(LegacyLine {
                product_id: mug.id.clone(),
                product_name: mug.name.clone(),
                quantity: 3,
                unit_sale_price: Money::from_cents(1000),
                unit_cost_price: Money::from_cents(400),
            }),
            totals: None,
            total_profit: Money::from_cents(1800),
            sale_expenses: Money::zero(),
            sale_expense_details: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        db.sales().insert(&legacy).await.unwrap();

        let enriched = engine.get(&scope, &legacy.id).await.unwrap();
        assert_eq!(enriched.schema, "legacy");
        assert_eq!(enriched.items[0].category, "Kitchen");
        assert_eq!(enriched.total_sales, Money::from_cents(3000));

        engine
            .update(&scope, &legacy.id, product_sale(&mug.id, 5))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &scope, &mug).await, 5);

        let stored = db.sales().get(&scope, &legacy.id).await.unwrap().unwrap();
        assert!(!stored.is_legacy());
        assert_eq!(stored.business_id, None);

        engine.delete(&scope, &legacy.id).await.unwrap();
        assert_eq!(stock_of(&db, &scope, &mug).await, 10);
    }

    #[tokio::test]
    async fn test_legacy_input_shape() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let mut input = product_sale(&mug.id, 1);
        input.items = SaleItems::Legacy {
            item_id: mug.id.clone(),
            quantity: 2,
            unit_sale_price: Some(Money::from_cents(1200)),
        };

        let summary = engine.create(&scope, input).await.unwrap();
        assert_eq!(summary.total_sales, Money::from_cents(2400));
        assert_eq!(stock_of(&db, &scope, &mug).await, 8);

        let stored = db.sales().get(&scope, &summary.sale_id).await.unwrap().unwrap();
        assert!(!stored.is_legacy());
    }

    #[tokio::test]
    async fn test_validation_rejects_before_lookup() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let engine = SaleEngine::new(db);

        let err = engine
            .create(&scope, SaleInput::from_lines(Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = engine
            .create(&scope, product_sale(&Uuid::new_v4().to_string(), 0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_scope_isolation() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create(&scope, product_sale(&mug.id, 1)).await.unwrap();

        let stranger = Scope::new("user-2", None);
        let other_shop = Scope::new("user-1", Some("shop-2"));

        for other in [&stranger, &other_shop] {
            assert!(engine.list(other, &SaleFilter::default()).await.unwrap().is_empty());
            let err = engine.get(other, &created.sale_id).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::NotFound);
            let err = engine.delete(other, &created.sale_id).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::NotFound);
            let err = engine.create(other, product_sale(&mug.id, 1)).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::NotFound);
        }

        assert_eq!(stock_of(&db, &scope, &mug).await, 9);
        assert_eq!(engine.list(&scope, &SaleFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_item() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let lamp = fixtures::product(&db, &scope, "Lamp", "Lighting", 10, 1500, 3000).await;
        let engine = SaleEngine::new(db.clone());

        engine.create(&scope, product_sale(&mug.id, 1)).await.unwrap();
        engine.create(&scope, product_sale(&lamp.id, 1)).await.unwrap();

        let filter = SaleFilter {
            item_id: Some(lamp.id.clone()),
            ..SaleFilter::default()
        };
        let sales = engine.list(&scope, &filter).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].items[0].name, "Lamp");
    }

    #[tokio::test]
    async fn test_oversized_unit_price_rejected_before_reservation() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let input = SaleInput::from_lines(vec![line(
            &mug.id,
            ItemKind::Product,
            3,
            Some(i64::MAX / 2),
        )]);
        let err = engine.create(&scope, input).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(stock_of(&db, &scope, &mug).await, 10);
        assert!(engine.list(&scope, &SaleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_price_overflow_rejected_before_reservation() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let vault = fixtures::product(&db, &scope, "Vault", "Safes", 10, 400, i64::MAX / 2).await;
        let engine = SaleEngine::new(db.clone());

        let err = engine.create(&scope, product_sale(&vault.id, 3)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("lineTotal"));
        assert_eq!(stock_of(&db, &scope, &vault).await, 10);
    }

    async fn execute(db: &Database, sql: &str) {
        sqlx::query(sql).execute(db.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_releases_stock_when_saving_fails() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        execute(
            &db,
            "CREATE TRIGGER reject_sale_insert BEFORE INSERT ON sales \
             BEGIN SELECT RAISE(ABORT, 'write rejected'); END",
        )
        .await;

        let err = engine.create(&scope, product_sale(&mug.id, 3)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(stock_of(&db, &scope, &mug).await, 10);
        assert!(engine.list(&scope, &SaleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_restores_stock_when_saving_fails() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let lamp = fixtures::product(&db, &scope, "Lamp", "Lighting", 5, 1500, 3000).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create(&scope, product_sale(&mug.id, 3)).await.unwrap();
        assert_eq!(stock_of(&db, &scope, &mug).await, 7);

        execute(
            &db,
            "CREATE TRIGGER reject_sale_update BEFORE UPDATE ON sales \
             BEGIN SELECT RAISE(ABORT, 'write rejected'); END",
        )
        .await;

        let input = SaleInput::from_lines(vec![
            line(&mug.id, ItemKind::Product, 5, None),
            line(&lamp.id, ItemKind::Product, 2, None),
        ]);
        let err = engine
            .update(&scope, &created.sale_id, input)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(stock_of(&db, &scope, &mug).await, 7);
        assert_eq!(stock_of(&db, &scope, &lamp).await, 5);

        let stored = engine.get(&scope, &created.sale_id).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_update_restores_previous_reservation_when_reserving_fails() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 10, 400, 1000).await;
        let lamp = fixtures::product(&db, &scope, "Lamp", "Lighting", 5, 1500, 3000).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create(&scope, product_sale(&mug.id, 3)).await.unwrap();

        // The availability check passes; the lamp's ledger write then fails
        // after the mug line has been released and re-reserved.
        execute(
            &db,
            &format!(
                "CREATE TRIGGER freeze_lamp BEFORE UPDATE OF current_stock ON products \
                 WHEN OLD.id = '{}' BEGIN SELECT RAISE(ABORT, 'stock frozen'); END",
                lamp.id
            ),
        )
        .await;

        let input = SaleInput::from_lines(vec![
            line(&mug.id, ItemKind::Product, 4, None),
            line(&lamp.id, ItemKind::Product, 1, None),
        ]);
        let err = engine
            .update(&scope, &created.sale_id, input)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(stock_of(&db, &scope, &mug).await, 7);
        assert_eq!(stock_of(&db, &scope, &lamp).await, 5);
        assert_eq!(
            engine.get(&scope, &created.sale_id).await.unwrap().items[0].quantity,
            3
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("engine.db")).max_connections(4))
            .await
            .unwrap();
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Last Mugs", "Kitchen", 3, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let scope = scope.clone();
            let input = product_sale(&mug.id, 1);
            handles.push(tokio::spawn(async move { engine.create(&scope, input).await }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(err) => assert_eq!(err.code, ErrorCode::InsufficientStock),
            }
        }

        assert_eq!(ok, 3);
        assert_eq!(stock_of(&db, &scope, &mug).await, 0);
        assert_eq!(engine.list(&scope, &SaleFilter::default()).await.unwrap().len(), 3);
    }
}
