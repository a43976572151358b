use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde goes through the same string table so JSON and `as_str` agree.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(ParameterStatus {
    Normal => "Normal",
    High => "High",
    Low => "Low",
    Unknown => "Unknown",
});

str_enum!(TrendDirection {
    Increasing => "Increasing",
    Decreasing => "Decreasing",
    Stable => "Stable",
});

str_enum!(InsightKind {
    Success => "success",
    Info => "info",
    Warning => "warning",
    Caution => "caution",
});

str_enum!(Severity {
    Mild => "mild",
    Moderate => "moderate",
    Significant => "significant",
});

str_enum!(SourceMethod {
    Exact => "exact",
    Fuzzy => "fuzzy",
    Table => "table",
    Context => "context",
    Layout => "layout",
    NumericFallback => "numeric-fallback",
});

impl SourceMethod {
    /// Position in the ranked strategy list. Lower wins ties.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Exact => 0,
            Self::Fuzzy => 1,
            Self::Table => 2,
            Self::Layout => 3,
            Self::Context => 4,
            Self::NumericFallback => 5,
        }
    }

    /// Dictionary-backed strategies outrank the heuristic ones.
    pub fn is_vocabulary_backed(&self) -> bool {
        matches!(self, Self::Exact | Self::Fuzzy)
    }
}

str_enum!(PreprocessingMethod {
    HighContrast => "high-contrast",
    TablePreserving => "table-preserving",
    AdaptiveContrast => "adaptive-contrast",
    Conservative => "conservative",
    Desperation => "desperation",
});

str_enum!(RecognitionProfile {
    General => "general",
    SingleBlock => "single-block",
    Relaxed => "relaxed",
});

impl RecognitionProfile {
    /// Tesseract page segmentation mode for this profile.
    pub fn page_segmentation_mode(&self) -> &'static str {
        match self {
            Self::General | Self::Relaxed => "3",
            Self::SingleBlock => "6",
        }
    }

    /// Character whitelist, `None` when recognition is unrestricted.
    pub fn char_whitelist(&self) -> Option<&'static str> {
        match self {
            Self::General | Self::SingleBlock => Some(
                "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz.,()-/:% <>",
            ),
            Self::Relaxed => None,
        }
    }
}

str_enum!(ProcessingStatus {
    Completed => "completed",
    CompletedWithWarnings => "completed-with-warnings",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parameter_status_round_trip() {
        for s in ["Normal", "High", "Low", "Unknown"] {
            assert_eq!(ParameterStatus::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn source_method_uses_hyphenated_names() {
        assert_eq!(SourceMethod::NumericFallback.as_str(), "numeric-fallback");
        assert_eq!(
            SourceMethod::from_str("numeric-fallback").unwrap(),
            SourceMethod::NumericFallback
        );
    }

    #[test]
    fn invalid_enum_value_errors() {
        let err = ParameterStatus::from_str("normal").unwrap_err();
        assert!(err.to_string().contains("ParameterStatus"));
    }

    #[test]
    fn serde_uses_string_table() {
        let json = serde_json::to_string(&InsightKind::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        let back: InsightKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, InsightKind::Warning);
        assert!(serde_json::from_str::<InsightKind>("\"Warning\"").is_err());
    }

    #[test]
    fn strategy_rank_orders_exact_first() {
        let mut methods = vec![
            SourceMethod::NumericFallback,
            SourceMethod::Context,
            SourceMethod::Exact,
            SourceMethod::Table,
            SourceMethod::Fuzzy,
            SourceMethod::Layout,
        ];
        methods.sort_by_key(|m| m.rank());
        assert_eq!(methods[0], SourceMethod::Exact);
        assert_eq!(methods[1], SourceMethod::Fuzzy);
        assert!(SourceMethod::Fuzzy.is_vocabulary_backed());
        assert!(!SourceMethod::Table.is_vocabulary_backed());
    }

    #[test]
    fn relaxed_profile_has_no_whitelist() {
        assert!(RecognitionProfile::Relaxed.char_whitelist().is_none());
        assert!(RecognitionProfile::General
            .char_whitelist()
            .unwrap()
            .contains('%'));
        assert_eq!(RecognitionProfile::SingleBlock.page_segmentation_mode(), "6");
    }
}
