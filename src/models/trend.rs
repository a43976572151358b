use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{InsightKind, ParameterStatus, TrendDirection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub status: ParameterStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub parameter: String,
    pub unit: String,
    pub normal_range: String,
    pub points: Vec<TrendPoint>,
    pub trend_direction: TrendDirection,
    pub insights: Vec<Insight>,
}
