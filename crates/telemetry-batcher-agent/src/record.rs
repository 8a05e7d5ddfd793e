// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

/// One input line: `{"partition_key": "...", "payload": <any JSON>}`
#[derive(Debug, Deserialize, PartialEq)]
pub struct Record {
    pub partition_key: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Failed to parse record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record has an empty partition key")]
    EmptyPartitionKey,
}

/// Parses a line, returning `None` for blank lines.
pub fn parse_record(line: &str) -> Option<Result<Record, RecordError>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let record = match serde_json::from_str::<Record>(trimmed) {
        Ok(record) => record,
        Err(e) => return Some(Err(e.into())),
    };
    if record.partition_key.trim().is_empty() {
        return Some(Err(RecordError::EmptyPartitionKey));
    }
    Some(Ok(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_record() {
        let record = parse_record(r#"{"partition_key":"aws.lambda","payload":{"v":1}}"#)
            .expect("line is not blank")
            .expect("record should parse");
        assert_eq!(
            record,
            Record {
                partition_key: "aws.lambda".to_string(),
                payload: json!({"v": 1}),
            }
        );
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert!(parse_record("   ").is_none());
    }

    #[test]
    fn test_invalid_records() {
        assert!(matches!(
            parse_record("not json"),
            Some(Err(RecordError::Json(_)))
        ));
        assert!(matches!(
            parse_record(r#"{"partition_key":" ","payload":1}"#),
            Some(Err(RecordError::EmptyPartitionKey))
        ));
        assert!(matches!(
            parse_record(r#"{"payload":1}"#),
            Some(Err(RecordError::Json(_)))
        ));
    }
}
