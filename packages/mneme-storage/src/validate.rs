use crate::{Error, Result};

/// Session ids are opaque keys. Blank ids are rejected; anything else is used verbatim.
pub(crate) fn session_id(session_id: &str) -> Result<&str> {
	if session_id.trim().is_empty() {
		return Err(Error::InvalidArgument("session_id cannot be empty.".to_string()));
	}

	Ok(session_id)
}

/// Resolves a 1-indexed page into `(limit, offset)`.
pub(crate) fn page_window(page_number: u32, page_size: u32) -> Result<(i64, i64)> {
	if page_number == 0 {
		return Err(Error::InvalidArgument("page_number must be 1 or greater.".to_string()));
	}
	if page_size == 0 {
		return Err(Error::InvalidArgument("page_size must be 1 or greater.".to_string()));
	}

	let limit = i64::from(page_size);
	let offset = i64::from(page_number - 1) * limit;

	Ok((limit, offset))
}

pub(crate) fn limit(limit: u32, label: &str) -> Result<i64> {
	if limit == 0 {
		return Err(Error::InvalidArgument(format!("{label} must be 1 or greater.")));
	}

	Ok(i64::from(limit))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_blank_session_ids() {
		assert!(matches!(session_id(""), Err(Error::InvalidArgument(_))));
		assert!(matches!(session_id("  \t"), Err(Error::InvalidArgument(_))));
	}

	#[test]
	fn padded_session_ids_are_kept_verbatim() {
		assert_eq!(session_id(" abc").expect("leading space"), " abc");
		assert_eq!(session_id("abc ").expect("trailing space"), "abc ");
		assert_ne!(session_id(" abc").expect("leading space"), session_id("abc").expect("bare"));
	}

	#[test]
	fn page_window_is_one_indexed() {
		assert_eq!(page_window(1, 5).expect("first page"), (5, 0));
		assert_eq!(page_window(2, 5).expect("second page"), (5, 5));
		assert_eq!(page_window(3, 7).expect("third page"), (7, 14));
	}

	#[test]
	fn page_window_rejects_zero() {
		assert!(matches!(page_window(0, 5), Err(Error::InvalidArgument(_))));
		assert!(matches!(page_window(1, 0), Err(Error::InvalidArgument(_))));
	}

	#[test]
	fn page_window_does_not_overflow() {
		let (limit, offset) = page_window(u32::MAX, u32::MAX).expect("large page");

		assert_eq!(limit, i64::from(u32::MAX));
		assert_eq!(offset, i64::from(u32::MAX - 1) * i64::from(u32::MAX));
	}
}
