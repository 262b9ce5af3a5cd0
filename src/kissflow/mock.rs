use tracing::info;

use super::mapper;
use super::types::{ExternalRecord, FetchResponse, ItemId};
use super::FetchError;
use crate::report::types::ReportRecord;

/// Example "Flow Lock" item as Kissflow returns it.
const MOCK_ITEM: &str = include_str!("../../tests/fixtures/mock_item.json");

/// Test builds and defects that go with the example item.
const MOCK_EXECUTION: &str = include_str!("../../tests/fixtures/mock_execution.json");

/// Build the canned response used for `--mock` and as the fallback when the
/// upstream cannot be reached. The payload runs through the same mapper as
/// live data; the item id is only logged.
pub fn mock_response(item_id: &ItemId) -> Result<FetchResponse, FetchError> {
    let payload: ExternalRecord = serde_json::from_str(MOCK_ITEM)?;

    let mut record = mapper::map(&payload);
    let execution: ReportRecord = serde_json::from_str(MOCK_EXECUTION)?;
    record.merge(execution);

    let missing_fields = mapper::identify_missing_fields(&record);
    info!(item = %item_id, missing = missing_fields.len(), "returning mock item");

    Ok(FetchResponse {
        success: true,
        data: record,
        missing_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kissflow::parse_item_id;
    use crate::report::types::{DefectStatus, ReportField};

    #[test]
    fn test_mock_response_contents() {
        let id = parse_item_id("KFF-0111").unwrap();
        let response = mock_response(&id).unwrap();
        assert!(response.success);
        assert_eq!(
            response.data.get(ReportField::FeatureName),
            Some("[ Enhancement ][ App ] :  Flow Lock - Concurrent edit prevention")
        );
        assert_eq!(response.data.test_builds.len(), 3);
        assert_eq!(response.data.defects.len(), 7);
        assert_eq!(response.data.defects[6].status, DefectStatus::Open);
    }

    #[test]
    fn test_mock_builds_are_derived() {
        let id = parse_item_id("KFF-0111").unwrap();
        let builds = mock_response(&id).unwrap().data.test_builds;
        assert_eq!(builds[0].total_failed, 7);
        assert_eq!(builds[0].pass_percentage, 83.0);
        assert_eq!(builds[2].fail_percentage, 4.0);
    }

    #[test]
    fn test_mock_missing_fields_are_manual_entries() {
        let id = parse_item_id("KFF-0200").unwrap();
        let missing = mock_response(&id).unwrap().missing_fields;
        assert_eq!(
            missing,
            vec![
                "env",
                "URL",
                "PRNumber",
                "SpecDocLink",
                "DesignLink",
                "TestCaseExecutionLink",
                "EvidenceDocLink",
                "ReviewedBy",
            ]
        );
    }

    #[test]
    fn test_mock_record_same_for_any_item() {
        let first = mock_response(&parse_item_id("KFF-0111").unwrap()).unwrap();
        let second = mock_response(&parse_item_id("KFF-0999").unwrap()).unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(first.missing_fields, second.missing_fields);
    }
}
