//! Postgres functions for the `currency_packages` and `digital_goods` tables.

use super::ledger::apply_delta;
use super::models::{
    AccountId, CurrencyPackage, DigitalGood, GoodStatus, Media, NewGood, NewPackage, PackageKind,
    Payload,
};
use crate::error::{BotError, BotResult};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::instrument;

#[derive(sqlx::FromRow, Debug)]
struct PackageRow {
    package_id: i64,
    kind: String,
    title: String,
    quantity: i64,
    price: Decimal,
    alt_price: Decimal,
}

impl TryFrom<PackageRow> for CurrencyPackage {
    type Error = BotError;
    fn try_from(r: PackageRow) -> Result<Self, Self::Error> {
        let kind = PackageKind::from_str(&r.kind)
            .map_err(|_| BotError::Persistence(format!("unknown package kind '{}'", r.kind)))?;
        Ok(CurrencyPackage {
            id: r.package_id,
            kind,
            title: r.title,
            quantity: r.quantity,
            price: r.price,
            alt_price: r.alt_price,
        })
    }
}

#[derive(sqlx::FromRow, Debug)]
struct GoodRow {
    good_id: i64,
    name: String,
    description: String,
    preview_kind: Option<String>,
    preview_ref: Option<String>,
    price: Decimal,
    payload_kind: String,
    payload_ref: String,
    status: String,
}

impl TryFrom<GoodRow> for DigitalGood {
    type Error = BotError;
    fn try_from(r: GoodRow) -> Result<Self, Self::Error> {
        let preview = match (r.preview_kind, r.preview_ref) {
            (Some(kind), Some(reference)) => Media::from_parts(&kind, reference),
            _ => None,
        };
        let payload = Payload::from_parts(&r.payload_kind, r.payload_ref).ok_or_else(|| {
            BotError::Persistence(format!("unknown payload kind '{}'", r.payload_kind))
        })?;
        let status = GoodStatus::parse(&r.status)
            .ok_or_else(|| BotError::Persistence(format!("unknown good status '{}'", r.status)))?;
        Ok(DigitalGood {
            id: r.good_id,
            name: r.name,
            description: r.description,
            preview,
            price: r.price,
            payload,
            status,
        })
    }
}

const PACKAGE_COLUMNS: &str = "package_id, kind, title, quantity, price, alt_price";
const GOOD_COLUMNS: &str =
    "good_id, name, description, preview_kind, preview_ref, price, payload_kind, payload_ref, status";

pub async fn list_packages(
    pool: &PgPool,
    kind: Option<PackageKind>,
) -> BotResult<Vec<CurrencyPackage>> {
    let rows = sqlx::query_as::<_, PackageRow>(&format!(
        "SELECT {PACKAGE_COLUMNS} FROM currency_packages WHERE ($1::TEXT IS NULL OR kind = $1) ORDER BY kind, price, package_id"
    ))
    .bind(kind.map(|k| k.as_str()))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(CurrencyPackage::try_from).collect()
}

pub async fn get_package(pool: &PgPool, id: i64) -> BotResult<Option<CurrencyPackage>> {
    sqlx::query_as::<_, PackageRow>(&format!(
        "SELECT {PACKAGE_COLUMNS} FROM currency_packages WHERE package_id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(CurrencyPackage::try_from)
    .transpose()
}

#[instrument(level = "debug", skip(pool))]
pub async fn create_package(pool: &PgPool, new: NewPackage) -> BotResult<CurrencyPackage> {
    sqlx::query_as::<_, PackageRow>(&format!(
        "INSERT INTO currency_packages (kind, title, quantity, price, alt_price) VALUES ($1, $2, $3, $4, $5) RETURNING {PACKAGE_COLUMNS}"
    ))
    .bind(new.kind.as_str())
    .bind(&new.title)
    .bind(new.quantity)
    .bind(new.price)
    .bind(new.alt_price)
    .fetch_one(pool)
    .await?
    .try_into()
}

#[instrument(level = "debug", skip(pool))]
pub async fn update_package_price(
    pool: &PgPool,
    id: i64,
    price: Decimal,
    alt_price: Decimal,
) -> BotResult<CurrencyPackage> {
    sqlx::query_as::<_, PackageRow>(&format!(
        "UPDATE currency_packages SET price = $2, alt_price = $3 WHERE package_id = $1 RETURNING {PACKAGE_COLUMNS}"
    ))
    .bind(id)
    .bind(price)
    .bind(alt_price)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| BotError::not_found(format!("Package #{id}")))?
    .try_into()
}

pub async fn delete_package(pool: &PgPool, id: i64) -> BotResult<()> {
    let res = sqlx::query("DELETE FROM currency_packages WHERE package_id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(BotError::not_found(format!("Package #{id}")));
    }
    Ok(())
}

pub async fn list_active_goods(pool: &PgPool) -> BotResult<Vec<DigitalGood>> {
    let rows = sqlx::query_as::<_, GoodRow>(&format!(
        "SELECT {GOOD_COLUMNS} FROM digital_goods WHERE status = 'active' ORDER BY good_id"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(DigitalGood::try_from).collect()
}

pub async fn get_good(pool: &PgPool, id: i64) -> BotResult<Option<DigitalGood>> {
    sqlx::query_as::<_, GoodRow>(&format!(
        "SELECT {GOOD_COLUMNS} FROM digital_goods WHERE good_id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(DigitalGood::try_from)
    .transpose()
}

#[instrument(level = "debug", skip(pool, new), fields(name = %new.name))]
pub async fn create_good(pool: &PgPool, new: NewGood) -> BotResult<DigitalGood> {
    sqlx::query_as::<_, GoodRow>(&format!(
        "INSERT INTO digital_goods (name, description, preview_kind, preview_ref, price, payload_kind, payload_ref) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {GOOD_COLUMNS}"
    ))
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.preview.as_ref().map(|m| m.kind()))
    .bind(new.preview.as_ref().map(|m| m.reference().to_string()))
    .bind(new.price)
    .bind(new.payload.kind())
    .bind(new.payload.reference())
    .fetch_one(pool)
    .await?
    .try_into()
}

pub async fn delete_good(pool: &PgPool, id: i64) -> BotResult<()> {
    let res = sqlx::query("DELETE FROM digital_goods WHERE good_id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(BotError::not_found(format!("Good #{id}")));
    }
    Ok(())
}

/// Locks the good, debits the buyer and marks the good sold in one transaction.
#[instrument(level = "debug", skip(pool))]
pub async fn purchase_good(
    pool: &PgPool,
    buyer: AccountId,
    good_id: i64,
    price: Decimal,
) -> BotResult<DigitalGood> {
    let mut tx = pool.begin().await?;
    let good: DigitalGood = sqlx::query_as::<_, GoodRow>(&format!(
        "SELECT {GOOD_COLUMNS} FROM digital_goods WHERE good_id = $1 FOR UPDATE"
    ))
    .bind(good_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| BotError::not_found(format!("Good #{good_id}")))?
    .try_into()?;
    if good.status != GoodStatus::Active {
        return Err(BotError::not_found(format!("Good #{good_id}")));
    }
    // A zero price still goes through the ledger so free items leave an audit entry.
    apply_delta(&mut tx, buyer, -price, &format!("Purchase: {}", good.name)).await?;
    sqlx::query("UPDATE digital_goods SET status = 'sold' WHERE good_id = $1")
        .bind(good_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(DigitalGood {
        status: GoodStatus::Sold,
        ..good
    })
}
