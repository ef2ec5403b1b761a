//! Column catalogues for the marketplace report endpoints.

/// Columns of the time report.
pub const TIME_REPORT_FIELDS: &[&str] = &[
    "provider_id",
    "provider_name",
    "assignment_team_id",
    "assignment_name",
    "assignment_ref",
    "agency_id",
    "agency_name",
    "company_id",
    "agency_company_id",
    "task",
    "memo",
    "hours",
    "charges",
    "hours_online",
    "charges_online",
    "hours_offline",
    "charges_offline",
    "worked_on",
    "week_worked_on",
    "month_worked_on",
    "year_worked_on",
];

/// Columns of the financial (earnings, billings, accounts) reports.
pub const FINANCE_REPORT_FIELDS: &[&str] = &[
    "reference",
    "date",
    "date_due",
    "assignment__reference",
    "assignment_name",
    "accounting_entity__reference",
    "accounting_entity_name",
    "buyer_company__reference",
    "buyer_company__id",
    "buyer_company_name",
    "buyer_team__reference",
    "buyer_team__id",
    "buyer_team_name",
    "provider_company__reference",
    "provider_company__id",
    "provider_company_name",
    "provider_team__reference",
    "provider_team__id",
    "provider_team_name",
    "provider__reference",
    "provider__id",
    "provider_name",
    "type",
    "subtype",
    "description",
    "comment",
    "memo",
    "notes",
    "amount",
    "po_number",
];

/// `fields` minus every entry of `excluded` (case-insensitive), order kept.
#[must_use]
pub fn without<'a>(fields: &[&'a str], excluded: &[&str]) -> Vec<&'a str> {
    fields
        .iter()
        .copied()
        .filter(|f| !excluded.iter().any(|e| e.eq_ignore_ascii_case(f)))
        .collect()
}
