use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::plans;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntity {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanEntity {
    /// Price of a single day of this plan's billing period.
    pub fn daily_rate(&self) -> f64 {
        self.price / f64::from(self.duration)
    }
}

/// Raw row used for Diesel queries. Timestamps are stored as ISO-8601 text and parsed into UTC.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<PlanRow> for PlanEntity {
    type Error = anyhow::Error;

    fn try_from(value: PlanRow) -> Result<Self> {
        let created_at = parse_timestamp(&value.created_at)
            .with_context(|| format!("plan {} has an invalid created_at", value.id))?;
        let updated_at = parse_timestamp(&value.updated_at)
            .with_context(|| format!("plan {} has an invalid updated_at", value.id))?;

        Ok(Self {
            id: value.id,
            name: value.name,
            description: value.description,
            price: value.price,
            duration: value.duration,
            created_at,
            updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = plans)]
pub struct InsertPlanEntity {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// `None` fields are skipped by the changeset and keep their stored value.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = plans)]
pub struct UpdatePlanEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<i32>,
    pub updated_at: String,
}

/// Formats a timestamp the way it is persisted, e.g. `2024-05-01T12:00:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)?;
    Ok(parsed.with_timezone(&Utc))
}
