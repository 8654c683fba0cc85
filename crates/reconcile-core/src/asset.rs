use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Invoice line items of this type become tracked assets.
pub const ASSET_ITEM_TYPE: &str = "asset";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub workspace_id: i64,
    pub number: String,
    pub issued_on: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub item_type: String,
    pub description: String,
    pub unit_price: f64,
    pub sort_order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<i64>,
}

impl InvoiceItem {
    pub fn is_asset(&self) -> bool {
        self.item_type.eq_ignore_ascii_case(ASSET_ITEM_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub workspace_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<i64>,
    pub name: String,
    pub purchased_on: NaiveDate,
    pub purchase_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub workspace_id: i64,
    pub invoice_id: Option<i64>,
    pub name: String,
    pub purchased_on: NaiveDate,
    pub purchase_cost: f64,
    pub created_by: Option<i64>,
}

impl NewAsset {
    /// Asset record for a single invoice line.
    pub fn from_invoice_item(invoice: &Invoice, item: &InvoiceItem, created_by: Option<i64>) -> Self {
        Self {
            workspace_id: invoice.workspace_id,
            invoice_id: Some(invoice.id),
            name: item.description.clone(),
            purchased_on: invoice.issued_on,
            purchase_cost: item.unit_price,
            created_by,
        }
    }
}
