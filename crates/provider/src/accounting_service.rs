//! Accounting operations over GraphQL, plus the OAuth2 entry points.

use crate::accounting::AccountingClientProvider;
use crate::models::{Account, AccountingUser, Business, Customer, Invoice, Product};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use longboard_auth::AccountingFlow;
use longboard_types::{
    ClientProvider, Credential, DataPage, LongboardError, Pagination, RequestCredential, Result,
    require_text,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 99;

const USER_QUERY: &str = "query { user { id defaultEmail firstName lastName } }";

const BUSINESSES_QUERY: &str = "query($page: Int!, $pageSize: Int!) { \
    businesses(page: $page, pageSize: $pageSize) { \
    pageInfo { currentPage totalPages totalCount } \
    edges { node { id name isPersonal currency { code } } } } }";

const BUSINESS_QUERY: &str =
    "query($id: ID!) { business(id: $id) { id name isPersonal currency { code } } }";

const INVOICES_QUERY: &str = "query($businessId: ID!, $page: Int!, $pageSize: Int!) { \
    business(id: $businessId) { id invoices(page: $page, pageSize: $pageSize) { \
    pageInfo { currentPage totalPages totalCount } \
    edges { node { id invoiceNumber invoiceDate dueDate status title \
    amountDue { value } total { value } customer { id name } } } } } }";

const INVOICE_QUERY: &str = "query($businessId: ID!, $invoiceId: ID!) { \
    business(id: $businessId) { id invoice(id: $invoiceId) { \
    id invoiceNumber invoiceDate dueDate status title \
    amountDue { value } total { value } customer { id name } } } }";

const CUSTOMERS_QUERY: &str = "query($businessId: ID!, $page: Int!, $pageSize: Int!) { \
    business(id: $businessId) { id customers(page: $page, pageSize: $pageSize, sort: [NAME_ASC]) { \
    pageInfo { currentPage totalPages totalCount } \
    edges { node { id name email currency { code } } } } } }";

const PRODUCT_QUERY: &str = "query($businessId: ID!, $productId: ID!) { \
    business(id: $businessId) { id product(id: $productId) { \
    id name description unitPrice isSold isBought isArchived } } }";

const PRODUCTS_QUERY: &str = "query($businessId: ID!, $page: Int!, $pageSize: Int!) { \
    business(id: $businessId) { id products(page: $page, pageSize: $pageSize) { \
    pageInfo { currentPage totalPages totalCount } \
    edges { node { id name description unitPrice isSold isBought isArchived } } } } }";

const ACCOUNTS_QUERY: &str = "query($businessId: ID!, $page: Int!, $pageSize: Int!) { \
    business(id: $businessId) { id accounts(page: $page, pageSize: $pageSize) { \
    pageInfo { currentPage totalPages totalCount } \
    edges { node { id name description displayId type { value } subtype { value } \
    normalBalanceType isArchived } } } } }";

/// Object types that appear in the platform's opaque identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Business,
    Product,
    Account,
    Invoice,
    Customer,
    Transaction,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Business => "Business",
            Self::Product => "Product",
            Self::Account => "Account",
            Self::Invoice => "Invoice",
            Self::Customer => "Customer",
            Self::Transaction => "Transaction",
        };
        f.write_str(name)
    }
}

impl IdKind {
    /// The GraphQL field name for a single object of this kind.
    fn field(self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Product => "product",
            Self::Account => "account",
            Self::Invoice => "invoice",
            Self::Customer => "customer",
            Self::Transaction => "transaction",
        }
    }
}

/// Decode an identifier such as `base64("Invoice:42;Business:7")` into its
/// `type -> id` pairs. A trailing unpaired segment is dropped.
///
/// # Errors
///
/// Returns [`LongboardError::Validation`] if `encoded` is not base64 text.
pub fn decode_id(encoded: &str) -> Result<BTreeMap<String, String>> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| LongboardError::Validation(format!("invalid identifier: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| LongboardError::Validation(format!("invalid identifier: {e}")))?;
    let parts: Vec<&str> = text.split([';', ':']).filter(|p| !p.is_empty()).collect();
    Ok(parts
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect())
}

/// Encode `kind:id`, scoped to `business` when given.
#[must_use]
pub fn encode_id(kind: IdKind, id: &str, business: Option<&str>) -> String {
    let mut raw = format!("{kind}:{id}");
    if let Some(business) = business.filter(|b| !b.trim().is_empty()) {
        raw.push_str(&format!(";{}:{}", IdKind::Business, business.trim()));
    }
    STANDARD.encode(raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PageInfo {
    current_page: u32,
    total_pages: u32,
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default)]
    page_info: PageInfo,
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

impl<T> Connection<T> {
    fn into_page(self, page_size: u32) -> DataPage<T> {
        DataPage::new(
            Pagination {
                page_size,
                current_page: self.page_info.current_page,
                total_pages: self.page_info.total_pages,
                total_count: self.page_info.total_count,
            },
            self.edges.into_iter().map(|e| e.node).collect(),
        )
    }
}

/// Pull `data.<path...>` out as `T`. A `null` along the way yields `None`.
fn extract<T: DeserializeOwned>(mut data: Value, path: &[&str]) -> Result<Option<T>> {
    for key in path {
        data = match data {
            Value::Object(mut map) => map.remove(*key).unwrap_or(Value::Null),
            Value::Null => return Ok(None),
            _ => {
                return Err(LongboardError::Mapping(format!(
                    "expected an object at `{key}`"
                )));
            }
        };
    }
    if data.is_null() {
        return Ok(None);
    }
    serde_json::from_value(data)
        .map(Some)
        .map_err(|e| LongboardError::Mapping(format!("unexpected `{}`: {e}", path.join("."))))
}

fn paging(page: Option<u32>, page_size: Option<u32>) -> (u32, u32) {
    (
        page.unwrap_or(DEFAULT_PAGE).max(1),
        page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    )
}

#[derive(Clone)]
pub struct AccountingService {
    clients: Arc<AccountingClientProvider>,
    flow: AccountingFlow,
}

impl AccountingService {
    #[must_use]
    pub fn new(clients: Arc<AccountingClientProvider>, flow: AccountingFlow) -> Self {
        Self { clients, flow }
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `state`.
    pub fn login_url(&self, state: &str) -> Result<RequestCredential> {
        self.flow.login_url(state)
    }

    /// # Errors
    ///
    /// See [`AccountingFlow::exchange`].
    pub async fn exchange(&self, code: &str) -> Result<Credential> {
        self.flow.exchange(code).await
    }

    /// Renew `token` with its refresh token, dropping the stale client.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] if `token` has no refresh token,
    /// otherwise see [`AccountingFlow::refresh`].
    pub async fn refresh(&self, token: &Credential) -> Result<Credential> {
        let refresh_token = require_text("refresh token", token.secret())?;
        let renewed = self.flow.refresh(refresh_token).await?;
        self.clients.cache().evict(token);
        Ok(renewed)
    }

    /// The user `token` belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Accounting`] for GraphQL errors and
    /// [`LongboardError::Mapping`] when no user comes back.
    pub async fn user(&self, token: &Credential) -> Result<AccountingUser> {
        let data = self.run(token, USER_QUERY, json!({})).await?;
        extract(data, &["user"])?
            .ok_or_else(|| LongboardError::Mapping("response has no user".into()))
    }

    /// # Errors
    ///
    /// As for [`user`](Self::user).
    pub async fn businesses(
        &self,
        token: &Credential,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<DataPage<Business>> {
        let (page, page_size) = paging(page, page_size);
        let data = self
            .run(
                token,
                BUSINESSES_QUERY,
                json!({ "page": page, "pageSize": page_size }),
            )
            .await?;
        let connection: Option<Connection<Business>> = extract(data, &["businesses"])?;
        Ok(connection.map_or_else(
            || DataPage::new(Pagination::request(page, page_size), Vec::new()),
            |c| c.into_page(page_size),
        ))
    }

    /// The business `id`, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `id`.
    pub async fn business(&self, token: &Credential, id: &str) -> Result<Option<Business>> {
        let id = require_text("business id", Some(id))?;
        let data = self.run(token, BUSINESS_QUERY, json!({ "id": id })).await?;
        extract(data, &["business"])
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `business_id`.
    pub async fn invoices(
        &self,
        token: &Credential,
        business_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<DataPage<Invoice>> {
        self.business_listing(token, INVOICES_QUERY, "invoices", business_id, page, page_size)
            .await
    }

    /// The invoice `invoice_id` of `business_id`, or `None` when either is missing.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank identifier.
    pub async fn invoice(
        &self,
        token: &Credential,
        business_id: &str,
        invoice_id: &str,
    ) -> Result<Option<Invoice>> {
        self.business_item(token, INVOICE_QUERY, IdKind::Invoice, business_id, invoice_id)
            .await
    }

    /// Customers of `business_id`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `business_id`.
    pub async fn customers(
        &self,
        token: &Credential,
        business_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<DataPage<Customer>> {
        self.business_listing(token, CUSTOMERS_QUERY, "customers", business_id, page, page_size)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank identifier.
    pub async fn product(
        &self,
        token: &Credential,
        business_id: &str,
        product_id: &str,
    ) -> Result<Option<Product>> {
        self.business_item(token, PRODUCT_QUERY, IdKind::Product, business_id, product_id)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `business_id`.
    pub async fn products(
        &self,
        token: &Credential,
        business_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<DataPage<Product>> {
        self.business_listing(token, PRODUCTS_QUERY, "products", business_id, page, page_size)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `business_id`.
    pub async fn accounts(
        &self,
        token: &Credential,
        business_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<DataPage<Account>> {
        self.business_listing(token, ACCOUNTS_QUERY, "accounts", business_id, page, page_size)
            .await
    }

    async fn business_listing<T: DeserializeOwned>(
        &self,
        token: &Credential,
        query: &str,
        field: &str,
        business_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<DataPage<T>> {
        let business_id = require_text("business id", Some(business_id))?;
        let (page, page_size) = paging(page, page_size);
        let data = self
            .run(
                token,
                query,
                json!({ "businessId": business_id, "page": page, "pageSize": page_size }),
            )
            .await?;
        let connection: Option<Connection<T>> = extract(data, &["business", field])?;
        Ok(connection.map_or_else(
            || DataPage::new(Pagination::request(page, page_size), Vec::new()),
            |c| c.into_page(page_size),
        ))
    }

    async fn business_item<T: DeserializeOwned>(
        &self,
        token: &Credential,
        query: &str,
        kind: IdKind,
        business_id: &str,
        item_id: &str,
    ) -> Result<Option<T>> {
        let business_id = require_text("business id", Some(business_id))?;
        let item_id = require_text(&format!("{} id", kind.field()), Some(item_id))?;
        let variable = format!("{}Id", kind.field());
        let data = self
            .run(
                token,
                query,
                json!({ "businessId": business_id, variable: item_id }),
            )
            .await?;
        extract(data, &["business", kind.field()])
    }

    async fn run(&self, token: &Credential, query: &str, variables: Value) -> Result<Value> {
        self.clients.client_for(token).execute(query, variables).await
    }
}
