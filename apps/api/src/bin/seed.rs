//! # Demo Data Seeder
//!
//! Fills a database with a small catalog, a few months of sales (both
//! record generations) and business expenses.
//!
//! ```bash
//! STOCKBOOK_DATABASE_PATH=./demo.db cargo run -p stockbook-api --bin seed
//! ```

use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use stockbook_api::services::SaleEngine;
use stockbook_api::ApiConfig;
use stockbook_core::{
    Expense, ItemKind, LegacyLine, LineInput, Money, Product, Sale, SaleBody, SaleExpenseDetail,
    SaleInput, Scope, Service,
};
use stockbook_db::Database;

const SEED_USER: &str = "demo-user";

fn product(scope: &Scope, name: &str, category: &str, cost: i64, price: i64, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        user_id: scope.user_id.clone(),
        business_id: Some(scope.business_id.clone()),
        name: name.to_string(),
        category: Some(category.to_string()),
        sku: Some(name.to_uppercase().replace(' ', "-")),
        product_type: None,
        size: None,
        color: None,
        cost_price: Money::from_cents(cost),
        sale_price: Money::from_cents(price),
        current_stock: stock,
        custom_fields: BTreeMap::new(),
        created_at: now,
        updated_at: now,
    }
}

fn service(scope: &Scope, name: &str, price: i64) -> Service {
    let now = Utc::now();
    Service {
        id: Uuid::new_v4().to_string(),
        user_id: scope.user_id.clone(),
        business_id: Some(scope.business_id.clone()),
        name: name.to_string(),
        price: Money::from_cents(price),
        category: Some("Services".to_string()),
        created_at: now,
        updated_at: now,
    }
}

fn line(item_id: &str, kind: ItemKind, quantity: i64) -> LineInput {
    LineInput {
        item_id: item_id.to_string(),
        item_kind: kind,
        quantity,
        unit_sale_price: None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ApiConfig::load().context("invalid configuration")?;
    let db = Database::new(config.db_config())
        .await
        .context("failed to open database")?;
    let scope = Scope::new(SEED_USER, None);

    let mug = product(&scope, "Stoneware Mug", "Kitchen", 400, 1000, 60);
    let bowl = product(&scope, "Serving Bowl", "Kitchen", 1200, 2800, 25);
    let lamp = product(&scope, "Desk Lamp", "Lighting", 1500, 3500, 15);
    let planter = product(&scope, "Clay Planter", "Garden", 600, 1600, 40);
    for p in [&mug, &bowl, &lamp, &planter] {
        db.products().insert(p).await?;
    }

    let wrap = service(&scope, "Gift Wrapping", 300);
    let delivery = service(&scope, "Local Delivery", 800);
    for s in [&wrap, &delivery] {
        db.services().insert(s).await?;
    }
    info!(products = 4, services = 2, "Catalog seeded");

    // A record written before line items existed. Its stock was taken
    // from the opening balance above.
    let legacy_date = Utc::now() - Duration::days(95);
    let legacy = Sale {
        id: Uuid::new_v4().to_string(),
        user_id: scope.user_id.clone(),
        business_id: None,
        customer_name: Some("Walk-in".to_string()),
        sale_date: legacy_date,
        notes: None,
        body: SaleBody::Legacy(LegacyLine {
            product_id: mug.id.clone(),
            product_name: mug.name.clone(),
            quantity: 4,
            unit_sale_price: Money::from_cents(1000),
            unit_cost_price: Money::from_cents(400),
        }),
        totals: None,
        total_profit: Money::from_cents(2400),
        sale_expenses: Money::zero(),
        sale_expense_details: Vec::new(),
        created_at: legacy_date,
        updated_at: legacy_date,
    };
    db.sales().insert(&legacy).await?;

    let engine = SaleEngine::new(db.clone());
    let baskets: Vec<(i64, Vec<LineInput>, Option<i64>)> = vec![
        (70, vec![line(&mug.id, ItemKind::Product, 3)], None),
        (
            52,
            vec![
                line(&bowl.id, ItemKind::Product, 1),
                line(&wrap.id, ItemKind::Service, 1),
            ],
            None,
        ),
        (
            33,
            vec![
                line(&lamp.id, ItemKind::Product, 2),
                line(&delivery.id, ItemKind::Service, 1),
            ],
            Some(450),
        ),
        (12, vec![line(&planter.id, ItemKind::Product, 5)], None),
        (
            2,
            vec![
                line(&mug.id, ItemKind::Product, 6),
                line(&planter.id, ItemKind::Product, 2),
            ],
            Some(200),
        ),
    ];

    for (days_ago, lines, shipping) in baskets {
        let mut input = SaleInput::from_lines(lines);
        input.sale_date = Some(Utc::now() - Duration::days(days_ago));
        if let Some(amount) = shipping {
            input.sale_expense_details = vec![SaleExpenseDetail {
                category: "Shipping".to_string(),
                amount: Money::from_cents(amount),
                description: None,
            }];
        }

        let summary = engine.create(&scope, input).await?;
        info!(sale_id = %summary.sale_id, total_sales = %summary.total_sales, "Sale seeded");
    }

    for (days_ago, category, amount) in [(80, "Rent", 90000), (50, "Rent", 90000), (20, "Utilities", 12500)] {
        let date = Utc::now() - Duration::days(days_ago);
        db.expenses()
            .insert(&Expense {
                id: Uuid::new_v4().to_string(),
                user_id: scope.user_id.clone(),
                business_id: Some(scope.business_id.clone()),
                category: category.to_string(),
                amount: Money::from_cents(amount),
                description: None,
                expense_date: date,
                created_at: date,
            })
            .await?;
    }

    info!(
        user = SEED_USER,
        path = %config.database_path.display(),
        "Seeding complete"
    );
    db.close().await;
    Ok(())
}
