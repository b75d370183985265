use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use csv::StringRecord;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::error::PipelineError;
use crate::models::{EmailContact, Product, SaleRecord, Store};

pub const BOARD_STORE_ID: &str = "BOARD";

/// Reference and fact tables for one run, already typed.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub stores: Vec<Store>,
    pub products: Vec<Product>,
    pub sales: Vec<SaleRecord>,
    pub directory: Vec<EmailContact>,
}

impl Tables {
    pub fn board_contact(&self) -> Option<&EmailContact> {
        self.directory
            .iter()
            .find(|contact| contact.store_id == BOARD_STORE_ID)
    }

    pub fn manager_contacts(&self) -> impl Iterator<Item = &EmailContact> {
        self.directory
            .iter()
            .filter(|contact| contact.store_id != BOARD_STORE_ID)
    }
}

#[derive(Debug, Deserialize)]
struct StoreRow {
    store_id: String,
    store_name: String,
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    product_id: String,
    product_name: String,
    unit_price: f64,
}

#[derive(Debug, Deserialize)]
struct SaleRow {
    sales_code: String,
    date: NaiveDate,
    store_id: String,
    product_id: String,
    quantity: u32,
    #[serde(default)]
    line_revenue: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EmailRow {
    store_id: String,
    manager: String,
    email: String,
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Reads a CSV table whose headers may use spaces and mixed case.
pub fn read_table<T: DeserializeOwned, R: Read>(reader: R) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers: StringRecord = reader.headers()?.iter().map(normalize_header).collect();
    reader.set_headers(headers);

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<T>().enumerate() {
        rows.push(result.with_context(|| format!("invalid row {}", index + 1))?);
    }
    Ok(rows)
}

fn read_file<T: DeserializeOwned>(dir: &Path, file: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(file);
    let handle = std::fs::File::open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_table(handle).with_context(|| format!("failed to read {}", path.display()))
}

/// Turns raw sale rows into typed records. Line revenue is derived from the
/// catalog price unless the row carries one; a carried value is kept as-is
/// and reconciled by the engine.
fn build_sales(
    rows: Vec<SaleRow>,
    products: &[Product],
) -> Result<Vec<SaleRecord>, PipelineError> {
    let prices: HashMap<&str, f64> = products
        .iter()
        .map(|product| (product.product_id.as_str(), product.unit_price))
        .collect();

    rows.into_iter()
        .map(|row| -> Result<SaleRecord, PipelineError> {
            let line_revenue = match row.line_revenue {
                Some(value) => value,
                None => {
                    let unit_price = prices.get(row.product_id.as_str()).ok_or_else(|| {
                        PipelineError::integrity(format!(
                            "sale `{}` references unknown product `{}`",
                            row.sales_code, row.product_id
                        ))
                    })?;
                    f64::from(row.quantity) * unit_price
                }
            };
            Ok(SaleRecord {
                sale_code: row.sales_code,
                store_id: row.store_id,
                product_id: row.product_id,
                date: row.date,
                quantity: row.quantity,
                line_revenue,
            })
        })
        .collect()
}

pub fn load_tables(dir: &Path) -> anyhow::Result<Tables> {
    let stores: Vec<Store> = read_file::<StoreRow>(dir, "stores.csv")?
        .into_iter()
        .map(|row| Store {
            store_id: row.store_id,
            name: row.store_name,
        })
        .collect();

    let products: Vec<Product> = read_file::<ProductRow>(dir, "products.csv")?
        .into_iter()
        .map(|row| Product {
            product_id: row.product_id,
            name: row.product_name,
            unit_price: row.unit_price,
        })
        .collect();

    let sales = build_sales(read_file::<SaleRow>(dir, "sales.csv")?, &products)?;

    let directory: Vec<EmailContact> = read_file::<EmailRow>(dir, "emails.csv")?
        .into_iter()
        .map(|row| EmailContact {
            store_id: row.store_id,
            manager_name: row.manager,
            email: row.email,
        })
        .collect();

    info!(
        data_dir = %dir.display(),
        stores = stores.len(),
        products = products.len(),
        sales = sales.len(),
        contacts = directory.len(),
        "tables loaded"
    );

    Ok(Tables {
        stores,
        products,
        sales,
        directory,
    })
}
