//! Dashboard cards and their polymorphic elements.

use std::sync::LazyLock;

use serde::{Deserialize, Deserializer, Serialize};
use wirecall_core::{VariantRegistry, VariantSet, deserialize_variant};

/// A dashboard card summarizing findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Section the card belongs to.
    pub section: String,
    /// Card title.
    pub title: String,
    /// Card subtitle.
    pub subtitle: String,
    /// Position of the card in its section, from 1 to 6.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Finding notes reported by this card.
    pub finding_note_names: Vec<String>,
    /// Whether the card needs to be configured before use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_configuration: Option<bool>,
    /// Text of the badge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_text: Option<String>,
    /// URL of the badge image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_image: Option<String>,
    /// The displayed elements.
    pub elements: Vec<CardElement>,
}

/// An element of a [`Card`], selected by its `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CardElement {
    /// `NUMERIC`
    Numeric(NumericCardElement),
    /// `BREAKDOWN`
    Breakdown(BreakdownCardElement),
    /// `TIME_SERIES`
    TimeSeries(TimeSeriesCardElement),
}

impl CardElement {
    /// The displayed text.
    pub fn text(&self) -> &str {
        match self {
            Self::Numeric(element) => &element.text,
            Self::Breakdown(element) => &element.text,
            Self::TimeSeries(element) => &element.text,
        }
    }
}

static CARD_ELEMENTS: LazyLock<VariantRegistry<CardElement>> = LazyLock::new(|| {
    VariantRegistry::builder("kind")
        .alternative(&["NUMERIC"], CardElement::Numeric)
        .alternative(&["BREAKDOWN"], CardElement::Breakdown)
        .alternative(&["TIME_SERIES"], CardElement::TimeSeries)
        .build()
        .expect("card element kinds are disjoint")
});

impl VariantSet for CardElement {
    fn registry() -> &'static VariantRegistry<Self> {
        &CARD_ELEMENTS
    }
}

impl<'de> Deserialize<'de> for CardElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_variant(Self::registry(), deserializer)
    }
}

/// A single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericCardElement {
    /// Always `NUMERIC`.
    pub kind: String,
    /// The displayed text.
    pub text: String,
    /// Default time interval, e.g. `d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_interval: Option<String>,
    /// Source of the value.
    pub value_type: ValueType,
}

/// Values broken down by source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownCardElement {
    /// Always `BREAKDOWN`.
    pub kind: String,
    /// The displayed text.
    pub text: String,
    /// Default time interval, e.g. `d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_interval: Option<String>,
    /// Sources of the values.
    pub value_types: Vec<ValueType>,
}

/// Values over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesCardElement {
    /// Always `TIME_SERIES`.
    pub kind: String,
    /// The displayed text.
    pub text: String,
    /// Default time interval, e.g. `d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_interval: Option<String>,
    /// Default time range, e.g. `4d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_time_range: Option<String>,
    /// Sources of the series.
    pub value_types: Vec<ValueType>,
}

/// The source of a card value, selected by its `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValueType {
    /// `FINDING_COUNT`
    FindingCount(FindingCountValueType),
    /// `KPI`
    Kpi(KpiValueType),
}

static VALUE_TYPES: LazyLock<VariantRegistry<ValueType>> = LazyLock::new(|| {
    VariantRegistry::builder("kind")
        .alternative(&["FINDING_COUNT"], ValueType::FindingCount)
        .alternative(&["KPI"], ValueType::Kpi)
        .build()
        .expect("value type kinds are disjoint")
});

impl VariantSet for ValueType {
    fn registry() -> &'static VariantRegistry<Self> {
        &VALUE_TYPES
    }
}

impl<'de> Deserialize<'de> for ValueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_variant(Self::registry(), deserializer)
    }
}

/// Number of occurrences of the listed finding notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingCountValueType {
    /// Always `FINDING_COUNT`.
    pub kind: String,
    /// The counted finding notes.
    pub finding_note_names: Vec<String>,
    /// The displayed text.
    pub text: String,
}

/// Value of a key performance indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiValueType {
    /// Always `KPI`.
    pub kind: String,
    /// The KPI note.
    pub kpi_note_name: String,
    /// The displayed text.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_decode_value_type_alternatives() {
        let count: ValueType = serde_json::from_value(json!({
            "kind": "FINDING_COUNT",
            "finding_note_names": ["n1"],
            "text": "t"
        }))
        .expect("should decode");
        let kpi: ValueType = serde_json::from_value(json!({
            "kind": "KPI",
            "kpi_note_name": "providers/p1/notes/k1",
            "text": "Score"
        }))
        .expect("should decode");

        assert_eq!(
            count,
            ValueType::FindingCount(FindingCountValueType {
                kind: "FINDING_COUNT".to_string(),
                finding_note_names: vec!["n1".to_string()],
                text: "t".to_string(),
            })
        );
        let ValueType::Kpi(metric) = &kpi else {
            panic!("unexpected value type {kpi:?}");
        };
        assert!(metric.kpi_note_name.ends_with("k1"));
    }

    #[test]
    fn should_reject_unknown_value_type() {
        let input = json!({"kind": "BOGUS"});

        let error = serde_json::from_value::<ValueType>(input).expect_err("should fail");

        insta::assert_snapshot!(
            error,
            @"unknown variant `BOGUS`, expected `FINDING_COUNT` or `KPI`"
        );
    }

    #[test]
    fn should_decode_nested_variants() {
        let element: CardElement = serde_json::from_value(json!({
            "kind": "BREAKDOWN",
            "text": "By severity",
            "value_types": [
                {"kind": "FINDING_COUNT", "finding_note_names": ["n1"], "text": "High"},
                {"kind": "KPI", "kpi_note_name": "k1", "text": "Score"}
            ]
        }))
        .expect("should decode");

        let CardElement::Breakdown(breakdown) = &element else {
            panic!("unexpected element {element:?}");
        };
        assert_eq!(element.text(), "By severity");
        assert!(matches!(
            breakdown.value_types.as_slice(),
            [ValueType::FindingCount(_), ValueType::Kpi(_)]
        ));
    }

    #[test]
    fn should_register_every_kind_once() {
        assert_eq!(
            CardElement::registry().values(),
            ["NUMERIC", "BREAKDOWN", "TIME_SERIES"]
        );
        assert_eq!(ValueType::registry().values(), ["FINDING_COUNT", "KPI"]);
    }

    #[test]
    fn should_serialize_element_as_its_alternative() {
        let input = json!({
            "kind": "NUMERIC",
            "text": "Open findings",
            "default_interval": "d",
            "value_type": {"kind": "FINDING_COUNT", "finding_note_names": ["n1"], "text": "Open"}
        });
        let element: CardElement = serde_json::from_value(input.clone()).expect("should decode");

        let output = serde_json::to_value(&element).expect("should serialize");

        assert_eq!(output, input);
    }
}
