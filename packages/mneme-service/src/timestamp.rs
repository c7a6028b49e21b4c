//! RFC 3339 (de)serialization for `OffsetDateTime` fields.

use serde::{Deserialize, Deserializer, Serializer};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
	use serde::{Deserialize, Serialize};
	use time::macros::datetime;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Stamp {
		#[serde(with = "crate::timestamp")]
		at: time::OffsetDateTime,
	}

	#[test]
	fn writes_and_reads_rfc3339() {
		let stamp = Stamp { at: datetime!(2024-05-01 12:30:00.25 UTC) };
		let json = serde_json::to_string(&stamp).expect("serialize");

		assert_eq!(json, r#"{"at":"2024-05-01T12:30:00.25Z"}"#);
		assert_eq!(serde_json::from_str::<Stamp>(&json).expect("deserialize"), stamp);
	}
}
