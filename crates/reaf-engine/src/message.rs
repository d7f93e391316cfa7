use serde::{Deserialize, Serialize};

use reaf_types::OperationId;

use crate::progress::BulkOperationProgress;
use crate::request::BulkReaffirmationRequest;

/// Messages from a controller to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Start a batch under the given operation id.
    StartBulkReaffirmation {
        #[serde(rename = "operationId")]
        operation_id: OperationId,
        request: BulkReaffirmationRequest,
    },
    /// Stop the batch with this id. No further messages follow for it.
    Cancel {
        #[serde(rename = "operationId")]
        operation_id: OperationId,
    },
}

/// Messages from the engine to observers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressMessage {
    /// Intermediate state; status is RUNNING.
    ProgressUpdate { data: BulkOperationProgress },
    /// Final state; status is COMPLETED.
    Completion { data: BulkOperationProgress },
    /// Final state; status is FAILED.
    Error { data: BulkOperationProgress },
}

impl ProgressMessage {
    /// The progress snapshot carried by this message.
    pub fn data(&self) -> &BulkOperationProgress {
        match self {
            Self::ProgressUpdate { data } | Self::Completion { data } | Self::Error { data } => {
                data
            }
        }
    }

    pub fn into_data(self) -> BulkOperationProgress {
        match self {
            Self::ProgressUpdate { data } | Self::Completion { data } | Self::Error { data } => {
                data
            }
        }
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.data().operation_id
    }

    /// Returns `true` for `Completion` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ProgressUpdate { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ProgressUpdate { .. } => "PROGRESS_UPDATE",
            Self::Completion { .. } => "COMPLETION",
            Self::Error { .. } => "ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaf_types::CombinationId;

    #[test]
    fn start_message_wire_shape() {
        let json = r#"{
            "type": "START_BULK_REAFFIRMATION",
            "operationId": "op-9",
            "request": {
                "combinationIds": ["c1"],
                "action": "REAFFIRMED_AS_IS",
                "comment": "fine"
            }
        }"#;
        let msg: ControlMessage = serde_json::from_str(json).unwrap();
        match msg {
            ControlMessage::StartBulkReaffirmation {
                operation_id,
                request,
            } => {
                assert_eq!(operation_id.as_str(), "op-9");
                assert_eq!(request.combination_ids, vec![CombinationId::from("c1")]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn progress_message_tags() {
        let data = BulkOperationProgress::start("op".into(), 0);
        let msg = ProgressMessage::ProgressUpdate { data: data.clone() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "PROGRESS_UPDATE");
        assert_eq!(json["data"]["operationId"], "op");
        assert!(!msg.is_terminal());

        let msg = ProgressMessage::Completion { data };
        assert_eq!(serde_json::to_value(&msg).unwrap()["type"], "COMPLETION");
        assert!(msg.is_terminal());
        assert_eq!(msg.type_name(), "COMPLETION");
    }

    #[test]
    fn cancel_round_trips() {
        let msg = ControlMessage::Cancel {
            operation_id: "op".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"CANCEL","operationId":"op"}"#);
        assert_eq!(serde_json::from_str::<ControlMessage>(&json).unwrap(), msg);
    }
}
