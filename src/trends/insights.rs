use crate::models::{HealthParameter, Insight, InsightKind, ParameterStatus, Severity, TrendDirection};
use crate::pipeline::status;

/// Message template builder for trend insights.
/// Calm framing: observations and suggestions, never diagnoses.
pub struct InsightTemplates;

impl InsightTemplates {
    pub fn out_of_range(name: &str, status: ParameterStatus, severity: Severity) -> String {
        format!(
            "{} is {} ({} deviation from normal range)",
            name,
            status.as_str().to_lowercase(),
            severity,
        )
    }

    pub fn in_range(name: &str) -> String {
        format!("{} is within normal range", name)
    }

    pub fn no_range(name: &str) -> String {
        format!(
            "{} could not be compared to a reference range. \
             Your doctor can help interpret this value.",
            name,
        )
    }

    pub fn direction(name: &str, direction: TrendDirection) -> String {
        format!(
            "{} shows a {} trend over the last 6 months",
            name,
            direction.as_str().to_lowercase(),
        )
    }
}

/// Parameter-specific advice keyed by canonical name and status.
const SPECIFIC_RULES: &[(&str, ParameterStatus, InsightKind, &str)] = &[
    (
        "Glucose",
        ParameterStatus::High,
        InsightKind::Warning,
        "Consider monitoring carbohydrate intake and consult with healthcare provider",
    ),
    (
        "Total Cholesterol",
        ParameterStatus::High,
        InsightKind::Info,
        "Diet modifications and regular exercise may help improve cholesterol levels",
    ),
    (
        "LDL Cholesterol",
        ParameterStatus::High,
        InsightKind::Info,
        "Diet modifications and regular exercise may help improve cholesterol levels",
    ),
    (
        "HDL Cholesterol",
        ParameterStatus::Low,
        InsightKind::Info,
        "Regular physical activity is often associated with higher HDL levels",
    ),
    (
        "Vitamin D",
        ParameterStatus::Low,
        InsightKind::Info,
        "Consider increasing sun exposure or vitamin D supplementation",
    ),
    (
        "Hemoglobin",
        ParameterStatus::Low,
        InsightKind::Info,
        "Iron-rich foods may help; ask your healthcare provider whether further tests are needed",
    ),
    (
        "Triglycerides",
        ParameterStatus::High,
        InsightKind::Info,
        "Reducing sugar and alcohol intake may help lower triglyceride levels",
    ),
];

/// Build the ordered insight list: status, then direction, then specific advice.
/// Always returns the status and direction insights.
pub fn generate(
    parameter: &HealthParameter,
    current: f64,
    current_status: ParameterStatus,
    direction: TrendDirection,
) -> Vec<Insight> {
    let name = parameter.name.as_str();
    let mut insights = vec![status_insight(parameter, current, current_status)];

    insights.push(Insight {
        kind: InsightKind::Info,
        message: InsightTemplates::direction(name, direction),
    });

    insights.extend(
        SPECIFIC_RULES
            .iter()
            .filter(|(rule_name, rule_status, _, _)| {
                rule_name.eq_ignore_ascii_case(name) && *rule_status == current_status
            })
            .map(|(_, _, kind, message)| Insight {
                kind: *kind,
                message: (*message).to_string(),
            }),
    );

    insights
}

fn status_insight(parameter: &HealthParameter, current: f64, current_status: ParameterStatus) -> Insight {
    let name = parameter.name.as_str();
    match current_status {
        ParameterStatus::High | ParameterStatus::Low => {
            let severity = status::severity(current, Some(&parameter.normal_range))
                .unwrap_or(Severity::Moderate);
            Insight {
                kind: if current_status == ParameterStatus::High {
                    InsightKind::Warning
                } else {
                    InsightKind::Caution
                },
                message: InsightTemplates::out_of_range(name, current_status, severity),
            }
        }
        ParameterStatus::Normal => Insight {
            kind: InsightKind::Success,
            message: InsightTemplates::in_range(name),
        },
        ParameterStatus::Unknown => Insight {
            kind: InsightKind::Info,
            message: InsightTemplates::no_range(name),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, value: f64, range: &str, status: ParameterStatus) -> HealthParameter {
        HealthParameter {
            name: name.into(),
            value,
            unit: "mg/dL".into(),
            normal_range: range.into(),
            status,
            category: "Lab Result".into(),
        }
    }

    #[test]
    fn high_glucose_gets_warning_and_advice() {
        let p = param("Glucose", 110.0, "70-100", ParameterStatus::High);
        let insights = generate(&p, 110.0, ParameterStatus::High, TrendDirection::Increasing);

        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].kind, InsightKind::Warning);
        assert_eq!(
            insights[0].message,
            "Glucose is high (moderate deviation from normal range)"
        );
        assert_eq!(insights[1].kind, InsightKind::Info);
        assert!(insights[1].message.contains("increasing trend"));
        assert!(insights[2].message.contains("carbohydrate"));
    }

    #[test]
    fn low_value_is_caution() {
        let p = param("Hemoglobin", 10.0, "13.5-17.5", ParameterStatus::Low);
        let insights = generate(&p, 10.0, ParameterStatus::Low, TrendDirection::Stable);

        assert_eq!(insights[0].kind, InsightKind::Caution);
        assert!(insights[0].message.contains("significant"));
        assert!(insights.iter().any(|i| i.message.contains("Iron-rich")));
    }

    #[test]
    fn normal_and_stable_yields_success_and_trend() {
        let p = param("Sodium", 140.0, "135-145", ParameterStatus::Normal);
        let insights = generate(&p, 140.0, ParameterStatus::Normal, TrendDirection::Stable);

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::Success);
        assert_eq!(insights[0].message, "Sodium is within normal range");
        assert_eq!(insights[1].kind, InsightKind::Info);
        assert_eq!(insights[1].message, "Sodium shows a stable trend over the last 6 months");
    }

    #[test]
    fn unknown_status_is_informational() {
        let p = param("Mystery", 3.0, "Unknown", ParameterStatus::Unknown);
        let insights = generate(&p, 3.0, ParameterStatus::Unknown, TrendDirection::Stable);

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::Info);
        assert!(insights[0].message.contains("reference range"));
    }

    #[test]
    fn specific_rule_requires_matching_status() {
        let p = param("Vitamin D", 50.0, "30-100", ParameterStatus::Normal);
        let insights = generate(&p, 50.0, ParameterStatus::Normal, TrendDirection::Stable);
        assert!(!insights.iter().any(|i| i.message.contains("sun exposure")));
    }
}
