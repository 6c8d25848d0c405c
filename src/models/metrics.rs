//! Derived quantitative metrics, recomputed on every run and upserted on CRD.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Computed metrics row. Every numeric is nullable: a metric is only written
/// when its inputs were present.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ComputedMetrics {
    pub crd_number: i64,

    // Revenue
    pub estimated_revenue: Option<i64>,
    pub blended_fee_bps: Option<i64>,
    pub revenue_per_client: Option<i64>,
    pub hybrid_revenue: Option<i64>,
    pub average_account_size: Option<i64>,

    // Growth
    pub aum_cagr_1y: Option<f64>,
    pub aum_cagr_3y: Option<f64>,
    pub aum_cagr_5y: Option<f64>,
    pub aum_cagr_all: Option<f64>,
    pub client_cagr_3y: Option<f64>,
    pub employee_cagr_3y: Option<f64>,
    pub client_growth_yoy: Option<f64>,
    pub employee_growth_yoy: Option<f64>,

    // Composite scores
    pub compensation_diversity: Option<i32>,
    pub business_complexity: Option<i32>,
    pub drp_severity: Option<f64>,
    pub concentration_risk: Option<f64>,
    pub key_person_dependency: Option<f64>,
    pub regulatory_risk: Option<f64>,
    pub acquisition_readiness: Option<f64>,

    // Profitability
    pub estimated_expenses: Option<i64>,
    pub expense_ratio: Option<f64>,
    pub operating_margin: Option<f64>,
    pub revenue_per_employee: Option<i64>,
    pub aum_per_advisor: Option<i64>,

    // Filing behavior
    pub amendment_frequency: Option<f64>,
    pub enforcement_count: Option<i32>,
    pub disclosure_count: Option<i32>,

    // Extraction quality
    pub avg_answer_confidence: Option<f64>,
    pub answered_questions: Option<i32>,

    pub computed_at: DateTime<Utc>,
}

impl ComputedMetrics {
    pub fn new(crd_number: i64) -> Self {
        Self {
            crd_number,
            estimated_revenue: None,
            blended_fee_bps: None,
            revenue_per_client: None,
            hybrid_revenue: None,
            average_account_size: None,
            aum_cagr_1y: None,
            aum_cagr_3y: None,
            aum_cagr_5y: None,
            aum_cagr_all: None,
            client_cagr_3y: None,
            employee_cagr_3y: None,
            client_growth_yoy: None,
            employee_growth_yoy: None,
            compensation_diversity: None,
            business_complexity: None,
            drp_severity: None,
            concentration_risk: None,
            key_person_dependency: None,
            regulatory_risk: None,
            acquisition_readiness: None,
            estimated_expenses: None,
            expense_ratio: None,
            operating_margin: None,
            revenue_per_employee: None,
            aum_per_advisor: None,
            amendment_frequency: None,
            enforcement_count: None,
            disclosure_count: None,
            avg_answer_confidence: None,
            answered_questions: None,
            computed_at: Utc::now(),
        }
    }
}
