//! Marketplace operations: users, teams, companies, engagements and the
//! financial and time reports.
//!
//! Reports are fetched from the `gds` entry point with a `tq` query selecting
//! every column the endpoint allows and filtering on the inclusive date range,
//! then flattened into [`Record`]s.

use crate::marketplace::{EntryPoint, MarketplaceClientProvider};
use crate::models::{
    Company, DiaryRecord, Engagement, Profile, Team, User, blank_strings_to_null,
};
use chrono::NaiveDate;
use longboard_auth::oauth1::percent_encode;
use longboard_report::{
    FINANCE_REPORT_FIELDS, QueryBuilder, Record, TIME_REPORT_FIELDS, normalize, without,
};
use longboard_types::{
    ClientProvider, Credential, DataPage, LongboardError, Pagination, Result, has_text,
    require_text,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Columns the per-user financial reports refuse.
const USER_FINANCE_EXCLUDED: &[&str] = &["comment", "po_number"];

fn finance_fields(excluded: &[&str]) -> Vec<&'static str> {
    without(FINANCE_REPORT_FIELDS, excluded)
}

fn time_fields(excluded: &[&str]) -> Vec<&'static str> {
    without(TIME_REPORT_FIELDS, excluded)
}

/// Take `name` out of `json`, blank strings nulled, and deserialize it.
fn take<T: DeserializeOwned>(json: &mut Value, name: &str) -> Result<T> {
    let mut value = json
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| LongboardError::Mapping(format!("response has no `{name}`")))?;
    blank_strings_to_null(&mut value);
    serde_json::from_value(value)
        .map_err(|e| LongboardError::Mapping(format!("unexpected `{name}` in response: {e}")))
}

/// A count that may arrive as a number or a numeric string.
fn lenient_count(value: Option<&Value>) -> u64 {
    value
        .and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_f64().map(|f| f.max(0.0) as u64))
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct MarketplaceService {
    clients: Arc<MarketplaceClientProvider>,
}

impl MarketplaceService {
    #[must_use]
    pub fn new(clients: Arc<MarketplaceClientProvider>) -> Self {
        Self { clients }
    }

    async fn get(
        &self,
        token: &Credential,
        entry: EntryPoint,
        resource: &str,
        params: &[(String, String)],
    ) -> Result<Value> {
        self.clients
            .client_for(token)
            .get(entry, resource, params)
            .await
    }

    /// The user `reference`, or the owner of `token` when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Marketplace`] for API failures and
    /// [`LongboardError::Mapping`] when the response has no `user`.
    pub async fn user(&self, token: &Credential, reference: Option<&str>) -> Result<User> {
        let resource = match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => format!("/hr/v2/users/{}", percent_encode(r)),
            None => "/hr/v2/users/me".to_string(),
        };
        let mut json = self.get(token, EntryPoint::Api, &resource, &[]).await?;
        take(&mut json, "user")
    }

    /// # Errors
    ///
    /// As for [`user`](Self::user); a blank `team_ref` is a validation error.
    pub async fn users_in_team(&self, token: &Credential, team_ref: &str) -> Result<Vec<User>> {
        let team_ref = require_text("A valid team reference", Some(team_ref))?;
        let resource = format!("/hr/v2/teams/{}/users", percent_encode(team_ref));
        let mut json = self.get(token, EntryPoint::Api, &resource, &[]).await?;
        take(&mut json, "users")
    }

    /// # Errors
    ///
    /// As for [`user`](Self::user).
    pub async fn teams(&self, token: &Credential) -> Result<Vec<Team>> {
        let mut json = self
            .get(token, EntryPoint::Api, "/hr/v2/teams", &[])
            .await?;
        take(&mut json, "teams")
    }

    /// Every company visible to `token`, or just `reference` when given.
    ///
    /// # Errors
    ///
    /// As for [`user`](Self::user).
    pub async fn companies(
        &self,
        token: &Credential,
        reference: Option<&str>,
    ) -> Result<Vec<Company>> {
        match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => {
                let resource = format!("/hr/v2/companies/{}", percent_encode(r));
                let mut json = self.get(token, EntryPoint::Api, &resource, &[]).await?;
                Ok(vec![take(&mut json, "company")?])
            }
            None => {
                let mut json = self
                    .get(token, EntryPoint::Api, "/hr/v2/companies", &[])
                    .await?;
                take(&mut json, "companies")
            }
        }
    }

    /// # Errors
    ///
    /// As for [`user`](Self::user); a blank `company_ref` is a validation error.
    pub async fn company_teams(&self, token: &Credential, company_ref: &str) -> Result<Vec<Team>> {
        let company_ref = require_text("A valid company reference", Some(company_ref))?;
        let resource = format!("/hr/v2/companies/{}/teams", percent_encode(company_ref));
        let mut json = self.get(token, EntryPoint::Api, &resource, &[]).await?;
        take(&mut json, "teams")
    }

    /// Profiles for every non-blank key in `keys`, fetched in one call.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] when no key has text.
    pub async fn profile(&self, token: &Credential, keys: &[&str]) -> Result<Vec<Profile>> {
        let joined = keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(percent_encode)
            .collect::<Vec<_>>()
            .join(",");
        if joined.is_empty() {
            return Err(LongboardError::Validation(
                "At least one (1) valid profile key is required".into(),
            ));
        }
        let resource = format!("/profiles/v1/providers/{joined}");
        let mut json = self.get(token, EntryPoint::Api, &resource, &[]).await?;
        take(&mut json, "profiles")
    }

    /// Work diary snapshots of a company or team on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `company_id` and
    /// [`LongboardError::Mapping`] when the response has no `data`.
    pub async fn company_workdiary(
        &self,
        token: &Credential,
        date: NaiveDate,
        company_id: &str,
    ) -> Result<Vec<DiaryRecord>> {
        let company_id = require_text("A valid freelancer/company ID", Some(company_id))?;
        let resource = format!(
            "/team/v3/workdiaries/companies/{}/{}",
            percent_encode(company_id),
            date.format("%Y%m%d")
        );
        let mut json = self.get(token, EntryPoint::Api, &resource, &[]).await?;
        let mut data: Value = take(&mut json, "data")?;
        if data.get("snapshots").is_none_or(Value::is_null) {
            return Ok(Vec::new());
        }
        take(&mut data, "snapshots")
    }

    // ── Financial reports ───────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] when no reference is given and
    /// none can be read from the token's user.
    pub async fn earnings_for_user(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        user_ref: Option<&str>,
    ) -> Result<Vec<Record>> {
        let user_ref = self.resolve_user_reference(token, user_ref).await?;
        let resource = format!("/finreports/v2/providers/{}/earnings", percent_encode(&user_ref));
        self.report(token, &resource, &finance_fields(USER_FINANCE_EXCLUDED), "date", from, to)
            .await
    }

    /// # Errors
    ///
    /// As for [`earnings_for_user`](Self::earnings_for_user).
    pub async fn billings_for_user(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        user_ref: Option<&str>,
    ) -> Result<Vec<Record>> {
        let user_ref = self.resolve_user_reference(token, user_ref).await?;
        let resource = format!("/finreports/v2/providers/{}/billings", percent_encode(&user_ref));
        self.report(token, &resource, &finance_fields(USER_FINANCE_EXCLUDED), "date", from, to)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `team_ref`.
    pub async fn earnings_for_freelancer_team(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        team_ref: &str,
    ) -> Result<Vec<Record>> {
        let team_ref = require_text("A valid freelancer/team reference", Some(team_ref))?;
        let resource = format!("/finreports/v2/provider_teams/{}/earnings", percent_encode(team_ref));
        self.report(token, &resource, FINANCE_REPORT_FIELDS, "date", from, to)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `team_ref`.
    pub async fn earnings_for_buyers_team(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        team_ref: &str,
    ) -> Result<Vec<Record>> {
        let team_ref = require_text("A valid buyers/team reference", Some(team_ref))?;
        let resource = format!("/finreports/v2/buyer_teams/{}/earnings", percent_encode(team_ref));
        self.report(token, &resource, FINANCE_REPORT_FIELDS, "date", from, to)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `team_ref`.
    pub async fn billings_for_buyers_team(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        team_ref: &str,
    ) -> Result<Vec<Record>> {
        let team_ref = require_text("A valid buyers/team reference", Some(team_ref))?;
        let resource = format!("/finreports/v2/buyer_teams/{}/billings", percent_encode(team_ref));
        self.report(token, &resource, FINANCE_REPORT_FIELDS, "date", from, to)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `company_ref`.
    pub async fn earnings_for_buyers_company(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        company_ref: &str,
    ) -> Result<Vec<Record>> {
        let company_ref = require_text("A valid buyers/company reference", Some(company_ref))?;
        let resource = format!(
            "/finreports/v2/buyer_companies/{}/earnings",
            percent_encode(company_ref)
        );
        self.report(token, &resource, FINANCE_REPORT_FIELDS, "date", from, to)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `company_ref`.
    pub async fn billings_for_buyers_company(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        company_ref: &str,
    ) -> Result<Vec<Record>> {
        let company_ref = require_text("A valid buyers/company reference", Some(company_ref))?;
        let resource = format!(
            "/finreports/v2/buyer_companies/{}/billings",
            percent_encode(company_ref)
        );
        self.report(token, &resource, FINANCE_REPORT_FIELDS, "date", from, to)
            .await
    }

    /// Ledger entries of one accounting entity.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `entity_ref`.
    pub async fn accounts_for_entity(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        entity_ref: &str,
    ) -> Result<Vec<Record>> {
        let entity_ref = require_text("A valid account reference", Some(entity_ref))?;
        let resource = format!(
            "/finreports/v2/financial_accounts/{}",
            percent_encode(entity_ref)
        );
        self.report(token, &resource, FINANCE_REPORT_FIELDS, "date", from, to)
            .await
    }

    /// Ledger entries of the accounts owned by a user.
    ///
    /// # Errors
    ///
    /// As for [`earnings_for_user`](Self::earnings_for_user).
    pub async fn accounts_for_user(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        user_ref: Option<&str>,
    ) -> Result<Vec<Record>> {
        let user_ref = self.resolve_user_reference(token, user_ref).await?;
        let resource = format!(
            "/finreports/v2/financial_account_owner/{}",
            percent_encode(&user_ref)
        );
        self.report(token, &resource, FINANCE_REPORT_FIELDS, "date", from, to)
            .await
    }

    // ── Time reports ────────────────────────────────────────────────────────

    /// Hours worked by the owner of `token`.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] if the token's user has no id.
    pub async fn time_by_user(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Record>> {
        let user = self.user(token, None).await?;
        let id = user
            .id
            .filter(|id| has_text(Some(id.as_str())))
            .ok_or_else(|| LongboardError::Validation("Unable to determine user id".into()))?;
        let resource = format!("/timereports/v1/providers/{}", percent_encode(id.trim()));
        let fields = time_fields(&[
            "provider_id",
            "provider_name",
            "charges",
            "charges_online",
            "charges_offline",
        ]);
        self.report(token, &resource, &fields, "worked_on", from, to)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank `company_id`.
    pub async fn time_by_company(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        company_id: &str,
    ) -> Result<Vec<Record>> {
        let company_id = require_text("A valid buyers/company reference", Some(company_id))?;
        let resource = format!("/timereports/v1/companies/{}", percent_encode(company_id));
        self.report(token, &resource, &time_fields(&["company_id"]), "worked_on", from, to)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank company or agency.
    pub async fn time_by_agency(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        company_id: &str,
        agency_id: &str,
    ) -> Result<Vec<Record>> {
        let company_id = require_text("A valid buyers/company reference", Some(company_id))?;
        let agency_id = require_text("A valid agency reference", Some(agency_id))?;
        let resource = format!(
            "/timereports/v1/companies/{}/agencies/{}",
            percent_encode(company_id),
            percent_encode(agency_id)
        );
        let fields = time_fields(&[
            "agency_id",
            "agency_name",
            "agency_company_id",
            "charges",
            "charges_online",
            "charges_offline",
        ]);
        self.report(token, &resource, &fields, "worked_on", from, to)
            .await
    }

    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank company or team.
    pub async fn time_by_team(
        &self,
        token: &Credential,
        from: NaiveDate,
        to: NaiveDate,
        company_id: &str,
        team_id: &str,
    ) -> Result<Vec<Record>> {
        let company_id = require_text("A valid company id", Some(company_id))?;
        let team_id = require_text("A valid team", Some(team_id))?;
        let resource = format!(
            "/timereports/v1/companies/{}/teams/{}",
            percent_encode(company_id),
            percent_encode(team_id)
        );
        let fields = time_fields(&["team_id", "team_name"]);
        self.report(token, &resource, &fields, "worked_on", from, to)
            .await
    }

    // ── Engagements ─────────────────────────────────────────────────────────

    /// One page of engagements created between `from` and `to`.
    ///
    /// `page` is 1-based and defaults to the first page; `page_size` defaults
    /// to [`DEFAULT_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Mapping`] when the response has no
    /// `engagements` object.
    pub async fn engagements(
        &self,
        token: &Credential,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        page: Option<u32>,
        page_size: Option<u32>,
        status: Option<&str>,
    ) -> Result<DataPage<Engagement>> {
        let mut pagination =
            Pagination::request(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE));
        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(from) = from {
            params.push(("created_time_from".into(), from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = to {
            params.push(("created_time_to".into(), to.format("%Y-%m-%d").to_string()));
        }
        if let Some(status) = status.map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("status".into(), status.to_string()));
        }
        params.push((
            "page".into(),
            format!("{};{}", pagination.offset(), pagination.page_size),
        ));

        let mut json = self
            .get(token, EntryPoint::Api, "/hr/v2/engagements", &params)
            .await?;
        let mut engagements = json
            .get_mut("engagements")
            .map(Value::take)
            .filter(Value::is_object)
            .ok_or_else(|| LongboardError::Mapping("response has no `engagements`".into()))?;

        let total = lenient_count(engagements.pointer("/lister/total_count"));
        let mut list = match engagements.get_mut("engagement").map(Value::take) {
            Some(Value::Array(items)) => Value::Array(items),
            Some(single @ Value::Object(_)) => Value::Array(vec![single]),
            _ => Value::Array(Vec::new()),
        };
        blank_strings_to_null(&mut list);
        let page: Vec<Engagement> = serde_json::from_value(list)
            .map_err(|e| LongboardError::Mapping(format!("unexpected engagement: {e}")))?;

        pagination.total_count = total;
        pagination.total_pages = if pagination.page_size == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(pagination.page_size))).unwrap_or(u32::MAX)
        };
        Ok(DataPage::new(pagination, page))
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    /// `reference` when it has text, else the reference of the token's user.
    async fn resolve_user_reference(
        &self,
        token: &Credential,
        reference: Option<&str>,
    ) -> Result<String> {
        if let Some(r) = reference.map(str::trim).filter(|r| !r.is_empty()) {
            return Ok(r.to_string());
        }
        let user = self.user(token, None).await?;
        user.reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| LongboardError::Validation("Unable to determine user reference".into()))
    }

    async fn report(
        &self,
        token: &Credential,
        resource: &str,
        fields: &[&str],
        date_field: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Record>> {
        let query = QueryBuilder::get(fields)
            .and_where_date(date_field, ">=", from)
            .and_where_date(date_field, "<=", to)
            .build()?;
        tracing::debug!(resource, query = %query, "running marketplace report");
        let json = self
            .get(token, EntryPoint::Gds, resource, &[("tq".to_string(), query)])
            .await?;
        Ok(normalize(&json))
    }
}
