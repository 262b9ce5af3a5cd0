use serde_json::Value;

use super::types::ExternalRecord;
use crate::report::types::{ReportField, ReportRecord};

/// How a canonical value is pulled out of one or more Kissflow keys.
#[derive(Debug, Clone, Copy)]
enum Extract {
    /// Scalar copied as text
    Text,
    /// `Name` of the first entry of a person list
    FirstListedName,
    /// `Name` of a person object, or of the first entry when given a list
    Person,
    /// Person names from several keys, comma-joined
    JoinedPersons,
    /// Every name in a list of person objects or bare strings, comma-joined
    NameList,
}

struct FieldMapping {
    sources: &'static [&'static str],
    target: ReportField,
    extract: Extract,
}

const FIELD_MAP: &[FieldMapping] = &[
    FieldMapping {
        sources: &["Name"],
        target: ReportField::FeatureName,
        extract: Extract::Text,
    },
    FieldMapping {
        sources: &["Team"],
        target: ReportField::TeamName,
        extract: Extract::Text,
    },
    FieldMapping {
        sources: &["Estimated_launch_quarter"],
        target: ReportField::QuarterRelease,
        extract: Extract::Text,
    },
    FieldMapping {
        sources: &["Frontend_PR_link"],
        target: ReportField::FrontendPrLink,
        extract: Extract::Text,
    },
    FieldMapping {
        sources: &["Backend_PR_Link"],
        target: ReportField::BackendPrLink,
        extract: Extract::Text,
    },
    FieldMapping {
        sources: &["TDD_Link_1"],
        target: ReportField::TddLink,
        extract: Extract::Text,
    },
    FieldMapping {
        sources: &["Test_Case_Link"],
        target: ReportField::TestCaseDocLink,
        extract: Extract::Text,
    },
    FieldMapping {
        sources: &["TC_Prepared_by"],
        target: ReportField::PreparedBy,
        extract: Extract::FirstListedName,
    },
    FieldMapping {
        sources: &["AssignedTo"],
        target: ReportField::TestedBy,
        extract: Extract::Person,
    },
    FieldMapping {
        sources: &["Frontend_Developer", "Backend_Developer"],
        target: ReportField::DevelopedBy,
        extract: Extract::JoinedPersons,
    },
    FieldMapping {
        sources: &["TDD_Prepared_by"],
        target: ReportField::DesignedBy,
        extract: Extract::NameList,
    },
];

/// Fields the validation checklist expects before a report can be generated.
/// `RTMDocLink` is optional and not listed.
pub const REQUIRED_FIELDS: [ReportField; 19] = [
    ReportField::FeatureName,
    ReportField::TeamName,
    ReportField::QuarterRelease,
    ReportField::Env,
    ReportField::Url,
    ReportField::FrontendPrLink,
    ReportField::BackendPrLink,
    ReportField::PrNumber,
    ReportField::SpecDocLink,
    ReportField::DesignLink,
    ReportField::TddLink,
    ReportField::TestCaseDocLink,
    ReportField::TestCaseExecutionLink,
    ReportField::EvidenceDocLink,
    ReportField::PreparedBy,
    ReportField::TestedBy,
    ReportField::DevelopedBy,
    ReportField::DesignedBy,
    ReportField::ReviewedBy,
];

/// Name reported when the record has no test builds.
pub const TEST_EXECUTION_DATA: &str = "TestExecutionData";

/// Map a raw Kissflow item into a report record.
///
/// Only keys listed in the mapping table are read. Absent or falsy sources
/// leave the target unset; nothing is defaulted or validated here.
pub fn map(external: &ExternalRecord) -> ReportRecord {
    let mut record = ReportRecord::default();
    for mapping in FIELD_MAP {
        if let Some(value) = extract(external, mapping) {
            record.set(mapping.target, value);
        }
    }
    record
}

/// List the required fields that are still empty, in checklist order,
/// followed by `TestExecutionData` when no builds were entered.
/// Defects are optional and never reported.
pub fn identify_missing_fields(record: &ReportRecord) -> Vec<String> {
    let mut missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| {
            record
                .get(**field)
                .map_or(true, |value| value.trim().is_empty())
        })
        .map(|field| field.as_str().to_string())
        .collect();

    if record.test_builds.is_empty() {
        missing.push(TEST_EXECUTION_DATA.to_string());
    }
    missing
}

fn extract(external: &ExternalRecord, mapping: &FieldMapping) -> Option<String> {
    let source = |key: &'static str| truthy_field(external, key);
    match mapping.extract {
        Extract::Text => source(mapping.sources[0]).and_then(text),
        Extract::FirstListedName => source(mapping.sources[0])
            .and_then(Value::as_array)
            .and_then(|people| people.first())
            .and_then(object_name),
        Extract::Person => source(mapping.sources[0]).and_then(person_name),
        Extract::JoinedPersons => join(
            mapping
                .sources
                .iter()
                .filter_map(|key| source(*key).and_then(person_name)),
        ),
        Extract::NameList => source(mapping.sources[0])
            .and_then(Value::as_array)
            .and_then(|people| {
                join(people.iter().filter_map(|person| {
                    object_name(person)
                        .or_else(|| person.as_str().filter(|s| !s.is_empty()).map(String::from))
                }))
            }),
    }
}

fn truthy_field<'a>(external: &'a ExternalRecord, key: &str) -> Option<&'a Value> {
    external.get(key).filter(|value| is_truthy(value))
}

/// JavaScript-style truthiness: null, false, 0 and "" are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn object_name(value: &Value) -> Option<String> {
    value
        .get("Name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(String::from)
}

fn person_name(value: &Value) -> Option<String> {
    match value {
        Value::Array(entries) => entries.first().and_then(object_name),
        _ => object_name(value),
    }
}

fn join(names: impl Iterator<Item = String>) -> Option<String> {
    let names: Vec<String> = names.collect();
    (!names.is_empty()).then(|| names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mock_payload() -> Value {
        serde_json::from_str(include_str!("../../tests/fixtures/mock_item.json")).unwrap()
    }

    #[test]
    fn test_map_basic_fields() {
        let record = map(&json!({
            "Name": "Foo",
            "Team": "Apps",
            "Estimated_launch_quarter": "Q3 2025"
        }));
        assert_eq!(record.get(ReportField::FeatureName), Some("Foo"));
        assert_eq!(record.get(ReportField::TeamName), Some("Apps"));
        assert_eq!(record.get(ReportField::QuarterRelease), Some("Q3 2025"));

        let set: Vec<ReportField> = ReportField::ALL
            .into_iter()
            .filter(|f| record.get(*f).is_some())
            .collect();
        assert_eq!(set.len(), 3);
        assert!(record.test_builds.is_empty());
    }

    #[test]
    fn test_missing_fields_for_basic_mapping() {
        let record = map(&json!({
            "Name": "Foo",
            "Team": "Apps",
            "Estimated_launch_quarter": "Q3 2025"
        }));
        let missing = identify_missing_fields(&record);
        assert_eq!(missing.len(), 17);
        assert_eq!(missing[0], "env");
        assert_eq!(missing.last().map(String::as_str), Some("TestExecutionData"));
        assert!(!missing.contains(&"FeatureName".to_string()));
        assert!(!missing.contains(&"DefectData".to_string()));
    }

    #[test]
    fn test_missing_fields_with_only_feature_name() {
        let mut record = ReportRecord::default();
        record.set(ReportField::FeatureName, "Flow Lock");
        let missing = identify_missing_fields(&record);

        let mut expected: Vec<String> = REQUIRED_FIELDS[1..]
            .iter()
            .map(|f| f.as_str().to_string())
            .collect();
        expected.push("TestExecutionData".to_string());
        assert_eq!(missing, expected);
        assert!(!missing.contains(&"RTMDocLink".to_string()));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut record = ReportRecord::default();
        record.set(ReportField::ReviewedBy, "   ");
        record.set(ReportField::Env, "");
        let missing = identify_missing_fields(&record);
        assert!(missing.contains(&"ReviewedBy".to_string()));
        assert!(missing.contains(&"env".to_string()));
    }

    #[test]
    fn test_builds_present_clears_test_execution_data() {
        let mut record = ReportRecord::default();
        record.add_test_build();
        assert!(!identify_missing_fields(&record).contains(&"TestExecutionData".to_string()));
    }

    #[test]
    fn test_map_mock_payload_people() {
        let record = map(&mock_payload());
        assert_eq!(record.get(ReportField::PreparedBy), Some("Sankaran Baskaran"));
        assert_eq!(record.get(ReportField::TestedBy), Some("Sankaran Baskaran"));
        assert_eq!(
            record.get(ReportField::DevelopedBy),
            Some("Rashmi Subramani, Roshini R S")
        );
        assert_eq!(
            record.get(ReportField::DesignedBy),
            Some("Roshini R S, Rashmi Subramani")
        );
        assert_eq!(
            record.get(ReportField::BackendPrLink),
            Some("https://github.com/OrangeScape/kissflow-xg/pull/18089")
        );
        assert!(record.get(ReportField::ReviewedBy).is_none());
        assert!(record.get(ReportField::Env).is_none());
    }

    #[test]
    fn test_developed_by_skips_missing_developer() {
        let record = map(&json!({
            "Frontend_Developer": {"Name": ""},
            "Backend_Developer": [{"Name": "Roshini R S"}]
        }));
        assert_eq!(record.get(ReportField::DevelopedBy), Some("Roshini R S"));

        let record = map(&json!({"Frontend_Developer": null}));
        assert!(record.get(ReportField::DevelopedBy).is_none());
    }

    #[test]
    fn test_designed_by_accepts_bare_strings() {
        let record = map(&json!({
            "TDD_Prepared_by": ["Ana", {"Name": "Ben"}, "", {"_id": "x"}]
        }));
        assert_eq!(record.get(ReportField::DesignedBy), Some("Ana, Ben"));

        let record = map(&json!({"TDD_Prepared_by": []}));
        assert!(record.get(ReportField::DesignedBy).is_none());
    }

    #[test]
    fn test_assigned_to_as_list() {
        let record = map(&json!({"AssignedTo": [{"Name": "Sankaran"}, {"Name": "Other"}]}));
        assert_eq!(record.get(ReportField::TestedBy), Some("Sankaran"));
    }

    #[test]
    fn test_prepared_by_requires_list() {
        let record = map(&json!({"TC_Prepared_by": {"Name": "Solo"}}));
        assert!(record.get(ReportField::PreparedBy).is_none());
    }

    #[test]
    fn test_falsy_sources_left_unset() {
        let record = map(&json!({
            "Name": "",
            "Team": false,
            "Estimated_launch_quarter": 0,
            "TDD_Link_1": null
        }));
        assert_eq!(record, ReportRecord::default());
    }

    #[test]
    fn test_numeric_source_copied_as_text() {
        let record = map(&json!({"Team": 42}));
        assert_eq!(record.get(ReportField::TeamName), Some("42"));
    }

    #[test]
    fn test_non_object_payload_maps_to_empty_record() {
        assert_eq!(map(&json!("not an item")), ReportRecord::default());
    }
}
