use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

pub const SUBMITTED: &str = "咨询表单已提交，我们会尽快与您联系！";
pub const EMPTY_FORM: &str = "表单数据不能为空";
pub const SAVE_FAILED: &str = "数据保存失败，请稍后再试";
pub const FETCH_FAILED: &str = "获取数据失败";
pub const SUBMIT_FAILED: &str = "提交失败，请稍后再试";

/// One submitted form as it is persisted.
///
/// The record is a flat JSON object: `id` and `timestamp` assigned on receipt, then every
/// submitted field verbatim and in submission order. A submitted `id` or `timestamp`
/// replaces the assigned value in place.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Consultation(Map<String, Value>);

impl Consultation {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self::received_at(Utc::now(), fields)
    }

    pub fn received_at(at: DateTime<Utc>, fields: Map<String, Value>) -> Self {
        let mut record = Map::with_capacity(fields.len() + 2);
        record.insert("id".to_string(), at.timestamp_millis().to_string().into());
        record.insert(
            "timestamp".to_string(),
            at.to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        record.extend(fields);

        Self(record)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// `id` as text, for log lines.
    pub fn id(&self) -> String {
        match self.field("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => "-".to_string(),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Consultation> for Value {
    fn from(consultation: Consultation) -> Self {
        Value::Object(consultation.0)
    }
}

#[derive(Serialize, Debug)]
pub struct Ack {
    pub success: bool,
    pub message: &'static str,
}

impl Ack {
    pub fn submitted() -> Self {
        Self {
            success: true,
            message: SUBMITTED,
        }
    }

    pub fn failure(message: &'static str) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ConsultationList {
    pub success: bool,
    pub consultations: Vec<Value>,
}

impl From<Vec<Value>> for ConsultationList {
    fn from(consultations: Vec<Value>) -> Self {
        Self {
            success: true,
            consultations,
        }
    }
}
