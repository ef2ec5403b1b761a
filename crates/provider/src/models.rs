//! Typed shapes of upstream responses.
//!
//! Every field is optional: both upstreams omit fields freely and the
//! marketplace sends most numbers as strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Replace every blank string in `value` with `null`, recursively.
pub fn blank_strings_to_null(value: &mut Value) {
    if value.as_str().is_some_and(|s| s.trim().is_empty()) {
        *value = Value::Null;
        return;
    }
    match value {
        Value::Array(items) => items.iter_mut().for_each(blank_strings_to_null),
        Value::Object(map) => map.values_mut().for_each(blank_strings_to_null),
        _ => {}
    }
}

/// Accept a string, number or boolean as text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept an integer or a numeric string.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

// ── Marketplace ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: Option<String>,
    pub reference: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub timezone: Option<String>,
    pub timezone_offset: Option<String>,
    pub public_url: Option<String>,
    pub profile_key: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub is_provider: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub has_contract: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub id: Option<String>,
    pub name: Option<String>,
    pub reference: Option<String>,
    #[serde(rename = "company__reference")]
    pub company_reference: Option<String>,
    pub company_name: Option<String>,
    #[serde(rename = "parent_team__id")]
    pub parent_team_id: Option<String>,
    #[serde(rename = "parent_team__name")]
    pub parent_team_name: Option<String>,
    #[serde(rename = "parent_team__reference")]
    pub parent_team_reference: Option<String>,
    pub payment_verification_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    pub reference: Option<String>,
    pub name: Option<String>,
    pub owner_user_id: Option<String>,
    pub payment_verification_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Engagement {
    pub reference: Option<String>,
    pub parent_reference: Option<String>,
    pub status: Option<String>,
    pub engagement_title: Option<String>,
    pub engagement_job_type: Option<String>,
    #[serde(rename = "job__title")]
    pub job_title: Option<String>,
    pub job_ref_ciphertext: Option<String>,
    pub offer_id: Option<String>,
    #[serde(rename = "buyer_team__id")]
    pub buyer_team_id: Option<String>,
    #[serde(rename = "buyer_team__reference")]
    pub buyer_team_reference: Option<String>,
    #[serde(rename = "provider__id")]
    pub provider_id: Option<String>,
    #[serde(rename = "provider__reference")]
    pub provider_reference: Option<String>,
    #[serde(rename = "provider_team__id")]
    pub provider_team_id: Option<String>,
    #[serde(rename = "provider_team__reference")]
    pub provider_team_reference: Option<String>,
    pub category_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub hourly_charge_rate: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub weekly_salary_charge_amount: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub fixed_charge_amount_agreed: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub weekly_hours_limit: Option<String>,
    pub engagement_start_date: Option<String>,
    pub engagement_end_date: Option<String>,
    pub created_time: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub is_paused: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub is_suspended: Option<String>,
}

/// A freelancer profile summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub ciphertext: Option<String>,
    pub dev_short_name: Option<String>,
    pub dev_profile_title: Option<String>,
    pub dev_city: Option<String>,
    pub dev_country: Option<String>,
    pub dev_timezone: Option<String>,
    pub dev_portrait: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dev_adj_score: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dev_total_hours: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dev_billed_assignments: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub dev_tot_feedback: Option<String>,
    pub dev_last_worked: Option<String>,
    pub dev_last_activity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaryTime {
    #[serde(deserialize_with = "lenient_int")]
    pub tracked_time: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub manual_time: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub overtime: Option<i64>,
    pub first_worked: Option<String>,
    pub last_worked: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub first_worked_int: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub last_worked_int: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub last_screenshot: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaryTask {
    pub id: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Screenshot {
    #[serde(deserialize_with = "lenient_int")]
    pub activity: Option<i64>,
    #[serde(deserialize_with = "lenient_text")]
    pub has_screenshot: Option<String>,
    pub screenshot_url: Option<String>,
    pub screenshot_img: Option<String>,
    pub screenshot_img_thmb: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub has_webcam: Option<String>,
    pub webcam_url: Option<String>,
}

/// One work diary snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaryRecord {
    pub contract_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub duration: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub duration_int: Option<i64>,
    pub time: Option<DiaryTime>,
    pub task: Option<DiaryTask>,
    pub screenshots: Option<Vec<Screenshot>>,
}

// ── Accounting ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountingUser {
    pub id: Option<String>,
    pub default_email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Currency {
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Business {
    pub id: Option<String>,
    pub name: Option<String>,
    pub is_personal: Option<bool>,
    pub currency: Option<Currency>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Money {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub currency: Option<Currency>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Invoice {
    pub id: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub title: Option<String>,
    pub amount_due: Option<Money>,
    pub total: Option<Money>,
    pub customer: Option<Customer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Product {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub unit_price: Option<String>,
    pub is_sold: Option<bool>,
    pub is_bought: Option<bool>,
    pub is_archived: Option<bool>,
}

/// An enum-valued GraphQL field such as an account type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tagged {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_id: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<Tagged>,
    pub subtype: Option<Tagged>,
    pub normal_balance_type: Option<String>,
    pub is_archived: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_strings_to_null() {
        let mut v = json!({"a": "", "b": " ", "c": "x", "d": [""], "e": {"f": ""}});
        blank_strings_to_null(&mut v);
        assert_eq!(
            v,
            json!({"a": null, "b": null, "c": "x", "d": [null], "e": {"f": null}})
        );
    }

    #[test]
    fn test_numbers_read_as_text() {
        let e: Engagement = serde_json::from_value(json!({
            "reference": "e1",
            "hourly_charge_rate": 25.5,
            "weekly_hours_limit": "40",
            "is_paused": null
        }))
        .unwrap();
        assert_eq!(e.hourly_charge_rate.as_deref(), Some("25.5"));
        assert_eq!(e.weekly_hours_limit.as_deref(), Some("40"));
        assert!(e.is_paused.is_none());
    }

    #[test]
    fn test_team_double_underscore_fields() {
        let team: Team = serde_json::from_value(json!({
            "id": "t1",
            "company__reference": "c-ref",
            "parent_team__name": "Parent",
            "unknown": 1
        }))
        .unwrap();
        assert_eq!(team.company_reference.as_deref(), Some("c-ref"));
        assert_eq!(team.parent_team_name.as_deref(), Some("Parent"));
        assert!(team.name.is_none());
    }

    #[test]
    fn test_diary_record_nested() {
        let record: DiaryRecord = serde_json::from_value(json!({
            "contract_id": "c1",
            "duration": 600,
            "time": {"tracked_time": "600", "first_worked": "1700000000"},
            "task": {"memo": "build"},
            "screenshots": [{"activity": 7, "has_screenshot": true}]
        }))
        .unwrap();
        assert_eq!(record.duration.as_deref(), Some("600"));
        assert_eq!(record.time.unwrap().tracked_time, Some(600));
        assert_eq!(
            record.screenshots.unwrap()[0].has_screenshot.as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_account_type_rename() {
        let account: Account = serde_json::from_value(json!({
            "id": "QWNjb3VudDox",
            "displayId": "1000",
            "type": {"value": "ASSET"},
            "isArchived": false
        }))
        .unwrap();
        assert_eq!(account.display_id.as_deref(), Some("1000"));
        assert_eq!(account.account_type.unwrap().value.as_deref(), Some("ASSET"));
        assert_eq!(account.is_archived, Some(false));
    }
}
