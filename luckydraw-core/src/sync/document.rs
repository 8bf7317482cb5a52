use crate::types::{LotteryAggregate, Prize};
use serde_json::Value;
use thiserror::Error;

/// Outcome of checking a stored document against the lottery schema.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentCheck {
    Valid(LotteryAggregate),
    Rejected(RejectReason),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("not valid JSON: {0}")]
    Syntax(String),

    #[error("top level is not an object")]
    NotAnObject,

    #[error("prizes is missing or not an array")]
    PrizesNotArray,

    #[error("{location} is not an object")]
    PrizeNotObject { location: String },

    #[error("{location} has an empty {field}")]
    EmptyField {
        location: String,
        field: &'static str,
    },

    #[error("schema mismatch: {0}")]
    Schema(String),
}

impl DocumentCheck {
    pub fn into_result(self) -> std::result::Result<LotteryAggregate, RejectReason> {
        match self {
            DocumentCheck::Valid(aggregate) => Ok(aggregate),
            DocumentCheck::Rejected(reason) => Err(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DocumentCheck::Valid(_))
    }
}

/// Decode a stored document. The shape is checked first, then the typed
/// decode enforces field types, then ids and names must be non-empty.
pub fn check_document(body: &str) -> DocumentCheck {
    match decode(body) {
        Ok(aggregate) => DocumentCheck::Valid(aggregate),
        Err(reason) => DocumentCheck::Rejected(reason),
    }
}

fn decode(body: &str) -> std::result::Result<LotteryAggregate, RejectReason> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| RejectReason::Syntax(e.to_string()))?;

    let object = value.as_object().ok_or(RejectReason::NotAnObject)?;

    let prizes = object
        .get("prizes")
        .and_then(Value::as_array)
        .ok_or(RejectReason::PrizesNotArray)?;
    for (index, prize) in prizes.iter().enumerate() {
        if !prize.is_object() {
            return Err(RejectReason::PrizeNotObject {
                location: format!("prizes[{}]", index),
            });
        }
    }
    match object.get("currentResult") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(RejectReason::PrizeNotObject {
                location: "currentResult".to_string(),
            })
        }
    }

    let aggregate: LotteryAggregate =
        serde_json::from_value(value).map_err(|e| RejectReason::Schema(e.to_string()))?;

    for (index, prize) in aggregate.prizes.iter().enumerate() {
        check_prize(prize, || format!("prizes[{}]", index))?;
    }
    if let Some(current) = &aggregate.current_result {
        check_prize(current, || "currentResult".to_string())?;
    }

    Ok(aggregate)
}

fn check_prize(
    prize: &Prize,
    location: impl Fn() -> String,
) -> std::result::Result<(), RejectReason> {
    if prize.id.is_empty() {
        return Err(RejectReason::EmptyField {
            location: location(),
            field: "id",
        });
    }
    if prize.name.is_empty() {
        return Err(RejectReason::EmptyField {
            location: location(),
            field: "name",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_document() -> Value {
        json!({
            "prizes": [
                { "id": "prize-1", "name": "一等奖", "totalCount": 1, "remainingCount": 1 },
                { "id": "prize-2", "name": "二等奖", "totalCount": 3, "remainingCount": 2,
                  "description": "保温杯" }
            ],
            "currentResult": { "id": "prize-2", "name": "二等奖", "totalCount": 3, "remainingCount": 2 },
            "isDrawing": false,
            "totalDrawn": 1,
            "history": [
                { "timestamp": 1706000000000i64, "prizeName": "二等奖",
                  "remainingInventory": { "一等奖": 1, "二等奖": 2 } }
            ]
        })
    }

    fn check_value(value: &Value) -> DocumentCheck {
        check_document(&value.to_string())
    }

    #[test]
    fn test_accepts_valid_document() {
        let aggregate = check_value(&valid_document()).into_result().unwrap();
        assert_eq!(aggregate.prizes.len(), 2);
        assert_eq!(aggregate.prizes[1].description.as_deref(), Some("保温杯"));
        assert_eq!(aggregate.current_result.unwrap().id, "prize-2");
        assert_eq!(aggregate.history.len(), 1);
    }

    #[test]
    fn test_missing_history_and_result_default() {
        let mut doc = valid_document();
        doc.as_object_mut().unwrap().remove("history");
        doc["currentResult"] = Value::Null;

        let aggregate = check_value(&doc).into_result().unwrap();
        assert!(aggregate.history.is_empty());
        assert!(aggregate.current_result.is_none());
    }

    #[test]
    fn test_rejects_syntax_and_shape() {
        assert!(matches!(
            check_document("{not json"),
            DocumentCheck::Rejected(RejectReason::Syntax(_))
        ));
        assert_eq!(
            check_document("[]"),
            DocumentCheck::Rejected(RejectReason::NotAnObject)
        );

        let mut doc = valid_document();
        doc["prizes"] = json!("一等奖");
        assert_eq!(
            check_value(&doc),
            DocumentCheck::Rejected(RejectReason::PrizesNotArray)
        );

        let mut doc = valid_document();
        doc["prizes"] = json!([42]);
        assert!(matches!(
            check_value(&doc),
            DocumentCheck::Rejected(RejectReason::PrizeNotObject { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_prize_fields() {
        let mut doc = valid_document();
        doc["prizes"][0].as_object_mut().unwrap().remove("id");
        assert!(matches!(
            check_value(&doc),
            DocumentCheck::Rejected(RejectReason::Schema(_))
        ));

        let mut doc = valid_document();
        doc["prizes"][0]["name"] = json!("");
        assert_eq!(
            check_value(&doc),
            DocumentCheck::Rejected(RejectReason::EmptyField {
                location: "prizes[0]".to_string(),
                field: "name",
            })
        );

        let mut doc = valid_document();
        doc["prizes"][1]["remainingCount"] = json!(-1);
        assert!(!check_value(&doc).is_valid());

        let mut doc = valid_document();
        doc["prizes"][1]["totalCount"] = json!("3");
        assert!(!check_value(&doc).is_valid());

        let mut doc = valid_document();
        doc["prizes"][1]["description"] = json!(5);
        assert!(!check_value(&doc).is_valid());
    }

    #[test]
    fn test_rejects_bad_top_level_fields() {
        let mut doc = valid_document();
        doc["isDrawing"] = json!("no");
        assert!(!check_value(&doc).is_valid());

        let mut doc = valid_document();
        doc["totalDrawn"] = json!("1");
        assert!(!check_value(&doc).is_valid());

        let mut doc = valid_document();
        doc.as_object_mut().unwrap().remove("isDrawing");
        assert!(!check_value(&doc).is_valid());
    }

    #[test]
    fn test_current_result_is_checked_like_a_prize() {
        let mut doc = valid_document();
        doc["currentResult"]["id"] = json!("");
        assert_eq!(
            check_value(&doc),
            DocumentCheck::Rejected(RejectReason::EmptyField {
                location: "currentResult".to_string(),
                field: "id",
            })
        );

        let mut doc = valid_document();
        doc["currentResult"] = json!(7);
        assert!(!check_value(&doc).is_valid());
    }
}
