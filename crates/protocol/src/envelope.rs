use serde::{Deserialize, Serialize};

/// Envelope for all hub communication.
///
/// The `payload` field uses `serde_json::value::RawValue` to defer
/// deserialization until the target channel is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
}

impl Envelope {
    /// Creates a new envelope for the given target and payload.
    pub fn new<T: Serialize>(
        target: impl Into<String>,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match payload {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            target: target.into(),
            payload: raw,
        })
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.payload {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }
}
