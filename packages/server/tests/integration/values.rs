use bbdata_common::{dates, months::month_key};
use bbdata_server::config::StatsBackend;
use bbdata_server::entity::aggregation;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};

use crate::common::{ApiKey, CACHE_SECRET, TestApp, routes};

/// An object of unit `V` with a fresh token.
async fn sensor(app: &TestApp, admin: &ApiKey) -> (i64, String) {
    let group = app.create_user_group(admin, "lab").await;
    let id = app.create_object(admin, group, "V").await;
    let token = app.create_token(admin, id).await;
    (id, token)
}

fn value(id: i64, token: &str, timestamp: &str, value: Value) -> Value {
    json!({"objectId": id, "token": token, "timestamp": timestamp, "value": value})
}

mod ingestion {
    use super::*;

    #[tokio::test]
    async fn accepted_values_are_augmented_with_object_metadata() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;

        let res = app
            .submit(&json!([value(id, &token, "2020-01-01T10:00:00.000Z", json!(3.5))]))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let stored = &res.body[0];
        assert_eq!(stored["objectId"], id);
        assert_eq!(stored["value"], "3.5");
        assert_eq!(stored["unitSymbol"], "V");
        assert_eq!(stored["unitName"], "volt");
        assert_eq!(stored["type"], "float");
        assert_eq!(stored["timestamp"], "2020-01-01T10:00:00.000Z");
    }

    #[tokio::test]
    async fn a_single_value_object_is_accepted() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;

        let res = app
            .post_without_key(
                routes::MEASURES,
                &value(id, &token, "2020-01-01T10:00:00.000Z", json!("12")),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body.as_array().unwrap().len(), 1);
        assert_eq!(res.body[0]["value"], "12.0");
    }

    #[tokio::test]
    async fn simulated_values_are_not_stored() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;
        let body = json!([value(id, &token, "2020-01-01T10:00:00.000Z", json!(1))]);

        let simulated = app
            .post_without_key(&format!("{}?simulate=true", routes::SUBMIT), &body)
            .await;
        assert_eq!(simulated.status, 200, "{}", simulated.text);

        let stored = app.submit(&body).await;
        assert_eq!(stored.status, 200, "the simulated value must not block a real one");
    }

    #[tokio::test]
    async fn duplicate_timestamps_are_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;
        let ts = "2020-01-01T10:00:00.000Z";

        let in_body = app
            .submit(&json!([
                value(id, &token, ts, json!(1)),
                value(id, &token, ts, json!(2)),
            ]))
            .await;
        assert_eq!(in_body.status, 400);

        let first = app.submit(&json!([value(id, &token, ts, json!(1))])).await;
        assert_eq!(first.status, 200, "{}", first.text);
        let again = app.submit(&json!([value(id, &token, ts, json!(1))])).await;
        assert_eq!(again.status, 400);
        assert!(again.text.contains("already exists"));
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, _) = sensor(&app, &admin).await;

        let res = app
            .submit(&json!([value(id, &"f".repeat(32), "2020-01-01T10:00:00.000Z", json!(1))]))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.exception(), "ItemNotFoundException");
    }

    #[tokio::test]
    async fn disabling_revokes_cached_tokens() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;
        // Warm the metadata cache before disabling.
        let warm = app
            .submit(&json!([value(id, &token, "2020-01-01T10:00:00.000Z", json!(1))]))
            .await;
        assert_eq!(warm.status, 200);

        let disabled = app
            .post_empty_with_key(&routes::object_disable(id), &admin)
            .await;
        assert_eq!(disabled.status, 200);
        let res = app
            .submit(&json!([value(id, &token, "2020-01-01T11:00:00.000Z", json!(1))]))
            .await;

        assert_eq!(res.status, 404, "stale cache entry must be evicted: {}", res.text);
    }

    #[tokio::test]
    async fn values_must_match_the_unit_type() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;

        let res = app
            .submit(&json!([value(id, &token, "2020-01-01T10:00:00.000Z", json!("warm"))]))
            .await;

        assert_eq!(res.status, 400);
        assert!(res.text.contains("does not match the unit"));
    }

    #[tokio::test]
    async fn future_timestamps_are_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;
        let later = dates::format(&(chrono::Utc::now() + chrono::Duration::hours(1)));

        let res = app.submit(&json!([value(id, &token, &later, json!(1))])).await;

        assert_eq!(res.status, 400);
        assert!(res.text.contains("should be in the past"));
    }

    #[tokio::test]
    async fn one_bad_value_rejects_the_whole_request() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;

        let res = app
            .submit(&json!([
                value(id, &token, "2020-01-01T10:00:00.000Z", json!(1)),
                value(id, &token, "2020-01-01T11:00:00.000Z", json!("nope")),
            ]))
            .await;
        assert_eq!(res.status, 400);

        let retry = app
            .submit(&json!([value(id, &token, "2020-01-01T10:00:00.000Z", json!(1))]))
            .await;
        assert_eq!(retry.status, 200, "nothing from the failed request may be stored");
    }

    #[tokio::test]
    async fn objects_with_values_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;
        app.submit(&json!([value(id, &token, "2020-01-01T10:00:00.000Z", json!(1))]))
            .await;

        let res = app.delete_with_key(&routes::object(id), &admin).await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn cache_eviction_requires_the_admin_secret() {
        let app = TestApp::spawn().await;

        let denied = app.get_without_key("/cache-evict?key=guess").await;
        let allowed = app
            .get_without_key(&format!("/cache-evict?key={CACHE_SECRET}"))
            .await;

        assert_eq!(denied.status, 403);
        assert_eq!(allowed.status, 200);
    }
}

mod queries {
    use super::*;

    async fn seeded(app: &TestApp) -> (ApiKey, i64) {
        let admin = app.admin().await;
        let (id, token) = sensor(app, &admin).await;
        let res = app
            .submit(&json!([
                value(id, &token, "2020-01-01T10:00:00.000Z", json!(1)),
                value(id, &token, "2020-01-01T10:01:00.000Z", json!(2)),
                value(id, &token, "2020-02-01T00:00:00.000Z", json!(3)),
            ]))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        (admin, id)
    }

    #[tokio::test]
    async fn range_query_returns_values_in_order() {
        let app = TestApp::spawn().await;
        let (admin, id) = seeded(&app).await;

        let res = app
            .get_with_key(
                &format!(
                    "{}?from=2020-01-01T00:00:00.000Z&to=2020-03-01T00:00:00.000Z",
                    routes::object_values(id)
                ),
                &admin,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let series = &res.body[0];
        assert_eq!(series["objectId"], id);
        assert_eq!(series["unit"]["symbol"], "V");
        let values: Vec<&str> = series["values"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["value"].as_str().unwrap())
            .collect();
        assert_eq!(values, ["1.0", "2.0", "3.0"]);
    }

    #[tokio::test]
    async fn range_bounds_are_inclusive_and_ordered() {
        let app = TestApp::spawn().await;
        let (admin, id) = seeded(&app).await;

        let narrow = app
            .get_with_key(
                &format!(
                    "{}?from=2020-01-01T10:01:00.000Z&to=2020-01-01T10:01:00.000Z",
                    routes::object_values(id)
                ),
                &admin,
            )
            .await;
        assert_eq!(narrow.body[0]["values"].as_array().unwrap().len(), 1);

        let reversed = app
            .get_with_key(
                &format!(
                    "{}?from=2020-02-01T00:00:00.000Z&to=2020-01-01T00:00:00.000Z",
                    routes::object_values(id)
                ),
                &admin,
            )
            .await;
        assert_eq!(reversed.status, 400);
    }

    #[tokio::test]
    async fn csv_is_served_when_text_is_accepted() {
        let app = TestApp::spawn().await;
        let (admin, id) = seeded(&app).await;
        let url = format!(
            "http://{}{}?from=2020-01-01T00:00:00.000Z&to=2020-01-31T00:00:00.000Z",
            app.addr,
            routes::object_values(id)
        );

        let res = app
            .send(
                app.client
                    .get(url)
                    .header("bbuser", admin.user_id.to_string())
                    .header("bbtoken", &admin.secret)
                    .header("Accept", "text/csv"),
            )
            .await;

        assert_eq!(res.status, 200);
        let lines: Vec<&str> = res.text.lines().collect();
        assert_eq!(lines[0], "object_id,timestamp,value,comment");
        assert_eq!(lines[1], format!("{id},2020-01-01T10:00:00.000Z,1.0,"));
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn multi_object_query_reports_inaccessible_ids_inline() {
        let app = TestApp::spawn().await;
        let (admin, id) = seeded(&app).await;

        let res = app
            .get_with_key(
                &format!(
                    "{}?ids={id},999&from=2020-01-01T00:00:00.000Z&to=2020-03-01T00:00:00.000Z",
                    routes::VALUES
                ),
                &admin,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body[0]["values"].as_array().unwrap().len(), 3);
        assert_eq!(res.body[1]["objectId"], 999);
        assert!(res.body[1]["error"].is_string());
    }

    #[tokio::test]
    async fn latest_returns_the_most_recent_value() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;
        let res = app
            .submit(&json!([{"objectId": id, "token": token, "value": 7}]))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let latest = app
            .get_with_key(&format!("/objects/{id}/values/latest"), &admin)
            .await;

        assert_eq!(latest.status, 200, "{}", latest.text);
        let values = latest.body[0]["values"].as_array().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["value"], "7.0");
    }

    #[tokio::test]
    async fn value_without_timestamp_is_found_at_its_echoed_instant() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;
        let res = app
            .submit(&json!([{"objectId": id, "token": token, "value": 4}]))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let echoed = res.body[0]["timestamp"].as_str().unwrap().to_string();

        let found = app
            .get_with_key(
                &format!("{}?from={echoed}&to={echoed}", routes::object_values(id)),
                &admin,
            )
            .await;

        assert_eq!(found.status, 200, "{}", found.text);
        let values = found.body[0]["values"].as_array().unwrap();
        assert_eq!(values.len(), 1, "{}", found.text);
        assert_eq!(values[0]["timestamp"], echoed.as_str());
    }

    #[tokio::test]
    async fn sub_millisecond_timestamps_collide() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, token) = sensor(&app, &admin).await;

        let res = app
            .submit(&json!([
                value(id, &token, "2020-01-01T10:00:00.0001Z", json!(1)),
                value(id, &token, "2020-01-01T10:00:00.0002Z", json!(2)),
            ]))
            .await;

        assert_eq!(res.status, 400);
        assert!(res.text.contains("same timestamp"), "{}", res.text);
    }

    #[tokio::test]
    async fn unreadable_object_is_not_found() {
        let app = TestApp::spawn().await;
        let (_, id) = seeded(&app).await;
        let outsider = app.create_logged_in_user("mallory").await;

        let res = app
            .get_with_key(
                &format!("{}?from=2020-01-01T00:00:00.000Z", routes::object_values(id)),
                &outsider,
            )
            .await;

        assert_eq!(res.status, 404);
    }
}

mod stats {
    use super::*;

    const BACKENDS: [StatsBackend; 2] = [StatsBackend::Counters, StatsBackend::Locking];

    async fn submit_at(app: &TestApp, id: i64, token: &str, timestamps: &[&str]) {
        let body: Vec<Value> = timestamps
            .iter()
            .map(|ts| value(id, token, ts, json!(1)))
            .collect();
        let res = app.submit(&json!(body)).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn first_write_counts_without_a_sample_period() {
        for backend in BACKENDS {
            let app = TestApp::spawn_with_stats(backend).await;
            let admin = app.admin().await;
            let (id, token) = sensor(&app, &admin).await;

            submit_at(&app, id, &token, &["2020-01-01T10:00:00.000Z"]).await;
            let res = app.get_with_key(&routes::object_stats(id), &admin).await;

            assert_eq!(res.status, 200, "{backend:?}: {}", res.text);
            assert_eq!(res.body["nWrites"], 1, "{backend:?}");
            assert_eq!(res.body["nReads"], 0, "{backend:?}");
            assert_eq!(res.body["avgSamplePeriod"], 0.0, "{backend:?}");
            assert_eq!(res.body["lastTs"], "2020-01-01T10:00:00.000Z", "{backend:?}");
        }
    }

    #[tokio::test]
    async fn sample_period_is_the_mean_gap_between_writes() {
        for backend in BACKENDS {
            let app = TestApp::spawn_with_stats(backend).await;
            let admin = app.admin().await;
            let (id, token) = sensor(&app, &admin).await;

            submit_at(&app, id, &token, &["2020-01-01T10:00:00.000Z"]).await;
            submit_at(&app, id, &token, &["2020-01-01T10:01:00.000Z"]).await;
            let res = app.get_with_key(&routes::object_stats(id), &admin).await;

            assert_eq!(res.body["nWrites"], 2, "{backend:?}");
            assert_eq!(res.body["avgSamplePeriod"], 60000.0, "{backend:?}");
        }
    }

    #[tokio::test]
    async fn late_values_are_counted_without_moving_the_average() {
        for backend in BACKENDS {
            let app = TestApp::spawn_with_stats(backend).await;
            let admin = app.admin().await;
            let (id, token) = sensor(&app, &admin).await;

            submit_at(&app, id, &token, &["2020-01-01T10:00:00.000Z"]).await;
            submit_at(&app, id, &token, &["2020-01-01T10:01:00.000Z"]).await;
            submit_at(&app, id, &token, &["2020-01-01T09:00:00.000Z"]).await;
            let res = app.get_with_key(&routes::object_stats(id), &admin).await;

            assert_eq!(res.body["nWrites"], 3, "{backend:?}");
            assert_eq!(res.body["avgSamplePeriod"], 60000.0, "{backend:?}");
            assert_eq!(res.body["lastTs"], "2020-01-01T10:01:00.000Z", "{backend:?}");
        }
    }

    #[tokio::test]
    async fn a_batch_is_folded_in_timestamp_order() {
        for backend in BACKENDS {
            let app = TestApp::spawn_with_stats(backend).await;
            let admin = app.admin().await;
            let (id, token) = sensor(&app, &admin).await;

            // Out of order on purpose: gaps are 60 s then 120 s once sorted.
            submit_at(
                &app,
                id,
                &token,
                &[
                    "2020-01-01T10:03:00.000Z",
                    "2020-01-01T10:00:00.000Z",
                    "2020-01-01T10:01:00.000Z",
                ],
            )
            .await;
            let res = app.get_with_key(&routes::object_stats(id), &admin).await;

            assert_eq!(res.body["nWrites"], 3, "{backend:?}");
            assert_eq!(res.body["avgSamplePeriod"], 90000.0, "{backend:?}");
            assert_eq!(res.body["lastTs"], "2020-01-01T10:03:00.000Z", "{backend:?}");
        }
    }

    #[tokio::test]
    async fn reading_values_is_counted() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let (id, _) = sensor(&app, &admin).await;

        let read = app
            .get_with_key(
                &format!("{}?from=2020-01-01T00:00:00.000Z", routes::object_values(id)),
                &admin,
            )
            .await;
        assert_eq!(read.status, 200);
        let res = app.get_with_key(&routes::object_stats(id), &admin).await;

        assert_eq!(res.body["nReads"], 1);
        assert_eq!(res.body["nWrites"], 0);
    }
}

mod aggregations {
    use super::*;

    async fn rollup(app: &TestApp, id: i64, minutes: i32, ts: &str, mean: f64, std: Option<f64>) {
        let timestamp = dates::parse_iso(ts).unwrap();
        aggregation::ActiveModel {
            minutes: Set(minutes),
            object_id: Set(id),
            month: Set(month_key(&timestamp)),
            timestamp: Set(timestamp),
            last: Set(Some(2.0)),
            last_ts: Set(Some(timestamp.timestamp_millis() + 600_000)),
            min: Set(Some(1.0)),
            max: Set(Some(3.0)),
            sum: Set(Some(6.0)),
            mean: Set(Some(mean)),
            std: Set(std),
            count: Set(3),
            comment: Set(None),
        }
        .insert(&app.db)
        .await
        .expect("Failed to insert aggregation");
    }

    /// One hourly and two quarter rollups in January, one hourly in February.
    async fn seeded(app: &TestApp) -> (ApiKey, i64) {
        let admin = app.admin().await;
        let (id, _) = sensor(app, &admin).await;
        rollup(app, id, 60, "2020-01-01T10:00:00.000Z", 2.123_456_7, Some(0.5)).await;
        rollup(app, id, 60, "2020-02-01T00:00:00.000Z", 2.0, Some(f64::NAN)).await;
        rollup(app, id, 15, "2020-01-01T10:00:00.000Z", 1.0, None).await;
        rollup(app, id, 15, "2020-01-01T10:15:00.000Z", 1.5, None).await;
        (admin, id)
    }

    const RANGE: &str = "from=2020-01-01T00:00:00.000Z&to=2020-03-01T00:00:00.000Z";

    #[tokio::test]
    async fn hourly_is_the_default_granularity() {
        let app = TestApp::spawn().await;
        let (admin, id) = seeded(&app).await;

        let res = app
            .get_with_key(&format!("{}?{RANGE}", routes::object_aggregated(id)), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let rows = res.body[0]["values"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["timestamp"], "2020-01-01T10:00:00.000Z");
        assert_eq!(rows[0]["lastTimestamp"], "2020-01-01T10:10:00.000Z");
        assert_eq!(rows[0]["mean"], 2.12346);
        assert_eq!(rows[0]["std"], 0.5);
        assert_eq!(rows[0]["count"], 3);
        assert_eq!(rows[1]["timestamp"], "2020-02-01T00:00:00.000Z");
        assert!(rows[1]["std"].is_null(), "{}", res.text);
    }

    #[tokio::test]
    async fn quarters_only_return_quarter_rollups() {
        let app = TestApp::spawn().await;
        let (admin, id) = seeded(&app).await;

        let single = app
            .get_with_key(
                &format!("{}?{RANGE}&granularity=QUARTERS", routes::object_aggregated(id)),
                &admin,
            )
            .await;
        let multi = app
            .get_with_key(&format!("/values/quarters?ids={id}&{RANGE}"), &admin)
            .await;

        for res in [single, multi] {
            assert_eq!(res.status, 200, "{}", res.text);
            let means: Vec<f64> = res.body[0]["values"]
                .as_array()
                .unwrap()
                .iter()
                .map(|row| row["mean"].as_f64().unwrap())
                .collect();
            assert_eq!(means, [1.0, 1.5]);
        }
    }

    #[tokio::test]
    async fn hours_endpoint_serves_csv() {
        let app = TestApp::spawn().await;
        let (admin, id) = seeded(&app).await;
        let url = format!("http://{}/values/hours?ids={id}&{RANGE}", app.addr);

        let res = app
            .send(
                app.client
                    .get(url)
                    .header("bbuser", admin.user_id.to_string())
                    .header("bbtoken", &admin.secret)
                    .header("Accept", "text/csv"),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let lines: Vec<&str> = res.text.lines().collect();
        assert_eq!(
            lines[0],
            "object_id,timestamp,last,last_timestamp,min,max,sum,mean,std,count,comment"
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            format!("{id},2020-01-01T10:00:00.000Z,2,2020-01-01T10:10:00.000Z,1,3,6,2.12346,0.5,3,")
        );
    }

    #[tokio::test]
    async fn unknown_granularity_is_rejected() {
        let app = TestApp::spawn().await;
        let (admin, id) = seeded(&app).await;

        let res = app
            .get_with_key(
                &format!("{}?{RANGE}&granularity=days", routes::object_aggregated(id)),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.exception(), "WrongParamsException");
    }
}
