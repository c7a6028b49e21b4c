use std::collections::HashSet;

use serde_json::{Map, Value, json};
use uuid::Uuid;

use mneme_storage::{
	Error,
	db::Db,
	messages,
	models::{Message, NewMessage, NewSummary},
	summaries,
};
use mneme_testkit::TestDatabase;

const VECTOR_DIM: u32 = 3;

async fn setup(test_name: &str) -> Option<(TestDatabase, Db)> {
	let Some(base_dsn) = mneme_testkit::env_dsn() else {
		eprintln!("Skipping {test_name}; set MNEME_PG_DSN to run this test.");

		return None;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = test_db.bootstrap(VECTOR_DIM).await.expect("Failed to ensure schema.");

	Some((test_db, db))
}

fn metadata(value: Value) -> Map<String, Value> {
	value.as_object().cloned().expect("Metadata fixture must be an object.")
}

async fn seed_messages(db: &Db, session_id: &str, count: usize) -> Vec<Message> {
	let batch = (0..count)
		.map(|idx| NewMessage {
			role: if idx % 2 == 0 { "user" } else { "assistant" }.to_string(),
			content: format!("Message {idx}"),
			metadata: metadata(json!({ "turn": idx })),
		})
		.collect::<Vec<_>>();

	messages::put_messages(db, session_id, &batch).await.expect("Failed to seed messages.")
}

fn new_summary(content: &str, point: Uuid) -> NewSummary {
	NewSummary {
		content: content.to_string(),
		metadata: metadata(json!({ "key": "value" })),
		summary_point_id: point,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn put_summary_round_trips_content_and_metadata() {
	let Some((test_db, db)) = setup("put_summary_round_trips_content_and_metadata").await else {
		return;
	};
	let msgs = seed_messages(&db, "session-a", 2).await;
	let supplied = NewSummary {
		content: "The user greeted the assistant.".to_string(),
		metadata: metadata(json!({
			"key": "value",
			"nested": { "tokens": 42, "tags": ["greeting", "intro"] },
			"flag": true,
			"none": null
		})),
		summary_point_id: msgs[1].message_id,
	};
	let stored = summaries::put_summary(&db.pool, "session-a", &supplied)
		.await
		.expect("Failed to put summary.");

	assert!(!stored.summary_id.is_nil());
	assert_eq!(stored.content, supplied.content);
	assert_eq!(stored.metadata, supplied.metadata);
	assert_eq!(stored.summary_point_id, msgs[1].message_id);
	assert!(stored.deleted_at.is_none());

	let fetched = summaries::get_summary_by_uuid(&db.pool, "session-a", stored.summary_id)
		.await
		.expect("Failed to get summary by uuid.");

	assert_eq!(fetched, stored);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn put_summary_with_unknown_summary_point_is_a_storage_error() {
	let Some((test_db, db)) = setup("put_summary_with_unknown_summary_point_is_a_storage_error").await
	else {
		return;
	};

	seed_messages(&db, "session-a", 1).await;

	let err = summaries::put_summary(&db.pool, "session-a", &new_summary("orphan", Uuid::new_v4()))
		.await
		.expect_err("Unknown summary point must be rejected.");

	assert!(matches!(err, Error::Storage { .. }), "Unexpected error: {err:?}.");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn put_summary_rejects_a_point_from_another_session() {
	let Some((test_db, db)) = setup("put_summary_rejects_a_point_from_another_session").await
	else {
		return;
	};
	let own = seed_messages(&db, "session-a", 2).await;
	let foreign = seed_messages(&db, "session-b", 3).await;
	let err = summaries::put_summary(
		&db.pool,
		"session-a",
		&new_summary("crossed", foreign[2].message_id),
	)
	.await
	.expect_err("A point from another session must be rejected.");

	assert!(matches!(err, Error::Storage { .. }), "Unexpected error: {err:?}.");
	assert!(
		summaries::get_summary(&db.pool, "session-a").await.expect("lookup").is_none(),
		"Nothing should have been inserted."
	);

	let window =
		messages::get_messages(&db.pool, "session-a", 10).await.expect("Failed to get messages.");

	assert_eq!(window, own);

	let next = messages::get_messages_after(&db, "session-a", None, 10)
		.await
		.expect("Failed to get messages after.");

	assert_eq!(next, own);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn current_summary_is_the_most_recent() {
	let Some((test_db, db)) = setup("current_summary_is_the_most_recent").await else {
		return;
	};
	let msgs = seed_messages(&db, "session-a", 2).await;

	summaries::put_summary(&db.pool, "session-a", &new_summary("first", msgs[0].message_id))
		.await
		.expect("Failed to put first summary.");

	let second =
		summaries::put_summary(&db.pool, "session-a", &new_summary("second", msgs[1].message_id))
			.await
			.expect("Failed to put second summary.");
	let current = summaries::get_summary(&db.pool, "session-a")
		.await
		.expect("Failed to get summary.")
		.expect("A summary should exist.");

	assert_eq!(current.summary_id, second.summary_id);
	assert_eq!(current.content, "second");

	let missing =
		summaries::get_summary(&db.pool, "nonexistent-session").await.expect("Absence is not an error.");

	assert!(missing.is_none());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn concurrent_puts_both_land_and_recency_decides_current() {
	let Some((test_db, db)) = setup("concurrent_puts_both_land_and_recency_decides_current").await
	else {
		return;
	};
	let msgs = seed_messages(&db, "session-a", 2).await;
	let first = new_summary("racer one", msgs[0].message_id);
	let second = new_summary("racer two", msgs[1].message_id);
	let (a, b) = tokio::join!(
		summaries::put_summary(&db.pool, "session-a", &first),
		summaries::put_summary(&db.pool, "session-a", &second),
	);
	let a = a.expect("First racer should succeed.");
	let b = b.expect("Second racer should succeed.");
	let expected = if (a.created_at, a.seq) > (b.created_at, b.seq) { &a } else { &b };
	let current = summaries::get_summary(&db.pool, "session-a")
		.await
		.expect("Failed to get summary.")
		.expect("A summary should exist.");

	assert_eq!(current.summary_id, expected.summary_id);

	let page = summaries::get_summary_list(&db, "session-a", 1, 10)
		.await
		.expect("Failed to list summaries.");

	assert_eq!(page.total_count, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn get_summary_by_uuid_reports_not_found() {
	let Some((test_db, db)) = setup("get_summary_by_uuid_reports_not_found").await else {
		return;
	};
	let msgs = seed_messages(&db, "session-a", 1).await;
	let stored =
		summaries::put_summary(&db.pool, "session-a", &new_summary("only", msgs[0].message_id))
			.await
			.expect("Failed to put summary.");

	for (session_id, summary_id) in [
		("session-a", Uuid::new_v4()),
		("nonexistent-session", Uuid::new_v4()),
		// A real summary looked up under the wrong session.
		("session-b", stored.summary_id),
	] {
		let result = summaries::get_summary_by_uuid(&db.pool, session_id, summary_id).await;

		assert!(matches!(result, Err(Error::NotFound(_))), "Unexpected result: {result:?}.");
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn summary_pages_are_stable_and_complete() {
	let Some((test_db, db)) = setup("summary_pages_are_stable_and_complete").await else {
		return;
	};
	let msgs = seed_messages(&db, "session-a", 9).await;
	let mut inserted = Vec::new();

	for (idx, message) in msgs.iter().enumerate() {
		let summary = summaries::put_summary(
			&db.pool,
			"session-a",
			&new_summary(&format!("summary {idx}"), message.message_id),
		)
		.await
		.expect("Failed to put summary.");

		inserted.push(summary.summary_id);
	}

	let first = summaries::get_summary_list(&db, "session-a", 1, 5)
		.await
		.expect("Failed to get first page.");
	let second = summaries::get_summary_list(&db, "session-a", 2, 5)
		.await
		.expect("Failed to get second page.");

	assert_eq!(first.items.len(), 5);
	assert_eq!(second.items.len(), 4);
	assert_eq!(first.total_count, 9);
	assert_eq!(second.total_count, 9);

	let delivered =
		first.items.iter().chain(second.items.iter()).map(|s| s.summary_id).collect::<Vec<_>>();
	let unique = delivered.iter().copied().collect::<HashSet<_>>();

	assert_eq!(unique.len(), 9, "Pages overlap.");
	assert_eq!(delivered, inserted, "Pages must follow insertion order.");

	// Appending must not disturb pages already delivered.
	summaries::put_summary(&db.pool, "session-a", &new_summary("late", msgs[8].message_id))
		.await
		.expect("Failed to put late summary.");

	let first_again = summaries::get_summary_list(&db, "session-a", 1, 5)
		.await
		.expect("Failed to re-read first page.");

	assert_eq!(
		first_again.items.iter().map(|s| s.summary_id).collect::<Vec<_>>(),
		first.items.iter().map(|s| s.summary_id).collect::<Vec<_>>()
	);
	assert_eq!(first_again.total_count, 10);

	let beyond = summaries::get_summary_list(&db, "session-a", 4, 5)
		.await
		.expect("Pages past the end are empty, not errors.");

	assert!(beyond.items.is_empty());
	assert_eq!(beyond.total_count, 10);

	let missing = summaries::get_summary_list(&db, "nonexistent-session", 1, 10)
		.await
		.expect("Unknown sessions yield an empty page.");

	assert!(missing.items.is_empty());
	assert_eq!(missing.total_count, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn update_metadata_changes_only_metadata() {
	let Some((test_db, db)) = setup("update_metadata_changes_only_metadata").await else {
		return;
	};
	let msgs = seed_messages(&db, "session-a", 2).await;
	let mut stored = summaries::put_summary(
		&db.pool,
		"session-a",
		&NewSummary {
			content: String::new(),
			metadata: metadata(json!({ "key1": "value1", "key2": "value2" })),
			summary_point_id: msgs[0].message_id,
		},
	)
	.await
	.expect("Failed to put summary.");
	let original = stored.clone();
	let new_metadata = metadata(json!({ "key1": "new value1", "key2": "new value2" }));

	stored.metadata = new_metadata.clone();
	// Only metadata is written; edits to other fields are ignored.
	stored.content = "tampered".to_string();
	stored.summary_point_id = msgs[1].message_id;

	let updated = summaries::update_summary_metadata(&db.pool, &stored)
		.await
		.expect("Failed to update summary metadata.");

	assert_eq!(updated.metadata, new_metadata);

	let current = summaries::get_summary(&db.pool, "session-a")
		.await
		.expect("Failed to get summary.")
		.expect("A summary should exist.");

	assert_eq!(current.metadata, new_metadata);
	assert_eq!(current.content, original.content);
	assert_eq!(current.summary_point_id, original.summary_point_id);
	assert_eq!(current.created_at, original.created_at);
	assert_eq!(current.seq, original.seq);

	let mut unknown = original.clone();

	unknown.summary_id = Uuid::new_v4();

	assert!(matches!(
		summaries::update_summary_metadata(&db.pool, &unknown).await,
		Err(Error::NotFound(_))
	));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MNEME_PG_DSN to run."]
async fn soft_deleted_summaries_leave_every_active_view() {
	let Some((test_db, db)) = setup("soft_deleted_summaries_leave_every_active_view").await else {
		return;
	};
	let msgs = seed_messages(&db, "session-a", 2).await;
	let first =
		summaries::put_summary(&db.pool, "session-a", &new_summary("first", msgs[0].message_id))
			.await
			.expect("Failed to put first summary.");
	let second =
		summaries::put_summary(&db.pool, "session-a", &new_summary("second", msgs[1].message_id))
			.await
			.expect("Failed to put second summary.");

	summaries::delete_summary(&db.pool, "session-a", second.summary_id)
		.await
		.expect("Failed to delete summary.");

	let current = summaries::get_summary(&db.pool, "session-a")
		.await
		.expect("Failed to get summary.")
		.expect("The earlier summary becomes current again.");

	assert_eq!(current.summary_id, first.summary_id);
	assert!(matches!(
		summaries::get_summary_by_uuid(&db.pool, "session-a", second.summary_id).await,
		Err(Error::NotFound(_))
	));
	assert!(matches!(
		summaries::update_summary_metadata(&db.pool, &second).await,
		Err(Error::NotFound(_))
	));
	assert!(matches!(
		summaries::delete_summary(&db.pool, "session-a", second.summary_id).await,
		Err(Error::NotFound(_))
	));

	let page = summaries::get_summary_list(&db, "session-a", 1, 10)
		.await
		.expect("Failed to list summaries.");

	assert_eq!(page.total_count, 1);
	assert_eq!(page.items[0].summary_id, first.summary_id);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
