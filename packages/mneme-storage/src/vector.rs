//! pgvector values travel as text literals (`[1,2,3]`) so no driver extension is needed.

use crate::{Error, Result};

pub fn format_vector_text(vec: &[f32]) -> String {
	let mut out = String::from("[");

	for (idx, value) in vec.iter().enumerate() {
		if idx > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

pub fn parse_vector_text(text: &str) -> Result<Vec<f32>> {
	let inner = text
		.trim()
		.strip_prefix('[')
		.and_then(|rest| rest.strip_suffix(']'))
		.ok_or_else(|| Error::Storage {
			message: "Stored vector text is not bracketed.".to_string(),
			source: None,
		})?;

	if inner.trim().is_empty() {
		return Ok(Vec::new());
	}

	inner
		.split(',')
		.map(|part| {
			part.trim().parse::<f32>().map_err(|_| Error::Storage {
				message: format!("Stored vector contains a non-numeric value {part:?}."),
				source: None,
			})
		})
		.collect()
}
