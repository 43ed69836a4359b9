//! Domain payloads exchanged with the finance API.
//!
//! DESIGN
//! ======
//! These records are owned by the API; the client treats them as opaque data
//! and only types them for convenience. Field names on the wire are the API's
//! Spanish camelCase names, mapped onto English Rust names with serde renames.
//! Enumerations accept both the upper-case and the capitalized spelling the
//! API has used over time and always send the upper-case one.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

// =============================================================================
// AUTH
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Sign-up payload. New accounts always register with the `USER` role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

impl RegisterRequest {
    #[must_use]
    pub fn user(first_name: &str, last_name: &str, email: &str, password: &str) -> Self {
        Self {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            role: "USER".to_owned(),
        }
    }
}

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Direction of money for categories and transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "INGRESO", alias = "Ingreso", alias = "ingreso")]
    Income,
    #[serde(rename = "GASTO", alias = "Gasto", alias = "gasto")]
    Expense,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetPeriod {
    #[serde(rename = "SEMANAL", alias = "Semanal")]
    Weekly,
    #[serde(rename = "MENSUAL", alias = "Mensual")]
    Monthly,
    #[serde(rename = "ANUAL", alias = "Anual")]
    Yearly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    #[serde(rename = "FINANCIERO", alias = "Financiero")]
    Financial,
    #[serde(rename = "GASTOS", alias = "Gastos")]
    Expenses,
    #[serde(rename = "INGRESOS", alias = "Ingresos")]
    Income,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    #[serde(rename = "JSON", alias = "Json")]
    Json,
    #[serde(rename = "PDF", alias = "Pdf")]
    Pdf,
    #[serde(rename = "CSV", alias = "Csv")]
    Csv,
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "saldo")]
    pub balance: f64,
    /// Free-form account type, e.g. `AHORRO`.
    #[serde(rename = "tipoCuenta")]
    pub account_type: String,
    /// ISO currency code, e.g. `USD`.
    #[serde(rename = "moneda")]
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountInput {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "saldo")]
    pub balance: f64,
    #[serde(rename = "tipoCuenta")]
    pub account_type: String,
    #[serde(rename = "moneda")]
    pub currency: String,
}

// =============================================================================
// CATEGORIES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "tipo")]
    pub kind: EntryKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "categoriaId")]
    pub category_id: i64,
    /// Filled in by the server on reads.
    #[serde(rename = "categoriaNombre", default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

// =============================================================================
// BUDGETS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "montoTotal")]
    pub total_amount: f64,
    #[serde(rename = "alerta", default)]
    pub alert: String,
    #[serde(rename = "gastoActual", default)]
    pub current_spend: f64,
    #[serde(rename = "periodo")]
    pub period: BudgetPeriod,
    #[serde(rename = "categoriaId")]
    pub category_id: i64,
    #[serde(rename = "categoriaNombre", default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

// =============================================================================
// TRANSACTIONS & ITEMS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "monto")]
    pub amount: f64,
    #[serde(rename = "destinatario", default)]
    pub recipient: String,
    /// Date as sent by the API (`YYYY-MM-DD`).
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "tipo")]
    pub kind: EntryKind,
    #[serde(rename = "cuentaId")]
    pub account_id: i64,
    #[serde(rename = "categoriaId")]
    pub category_id: i64,
}

/// One page of `/transacciones/mistransacciones`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    #[serde(rename = "totalItems")]
    pub total_items: u64,
    #[serde(rename = "transacciones")]
    pub transactions: Vec<Transaction>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(rename = "currentPage")]
    pub current_page: u32,
}

impl TransactionPage {
    /// Whether another page follows this one. Pages are zero-based.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current_page.saturating_add(1) < self.total_pages
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub price: f64,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "transaccionId")]
    pub transaction_id: i64,
}

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "fechaGeneracion", default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(rename = "tipoReporte")]
    pub kind: ReportKind,
    #[serde(rename = "fechaInicio")]
    pub start_date: String,
    #[serde(rename = "fechaFin")]
    pub end_date: String,
    #[serde(rename = "formato")]
    pub format: ReportFormat,
}
