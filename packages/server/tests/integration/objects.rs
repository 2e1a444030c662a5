use serde_json::json;

use crate::common::{TestApp, routes};

mod creation {
    use super::*;

    #[tokio::test]
    async fn object_is_created_with_its_tags() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;

        let res = app
            .put_with_key(
                routes::OBJECTS,
                &json!({
                    "name": "  boiler temperature ",
                    "owner": group,
                    "unitSymbol": "°C",
                    "tags": ["heating", "basement"],
                }),
                &admin,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "boiler temperature");
        assert_eq!(res.body["owner"], group);
        assert_eq!(res.body["unitSymbol"], "°C");
        assert_eq!(res.body["disabled"], false);
        let mut tags: Vec<String> = serde_json::from_value(res.body["tags"].clone()).unwrap();
        tags.sort();
        assert_eq!(tags, ["basement", "heating"]);
    }

    #[tokio::test]
    async fn unknown_unit_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;

        let res = app
            .put_with_key(
                routes::OBJECTS,
                &json!({"name": "x", "owner": group, "unitSymbol": "furlong"}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.exception(), "WrongParamsException");
    }

    #[tokio::test]
    async fn owner_must_be_administered_by_the_caller() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let alice = app.create_user("alice", "password").await;
        app.add_member(group, alice, false).await;
        let key = app.login("alice", "password").await;

        let res = app
            .put_with_key(
                routes::OBJECTS,
                &json!({"name": "x", "owner": group, "unitSymbol": "V"}),
                &key,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn bulk_creation_is_all_or_nothing() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let lab = app.create_user_group(&admin, "lab").await;
        let office = app.create_user_group(&admin, "office").await;

        let empty = app
            .put_with_key(routes::OBJECTS_BULK, &json!([]), &admin)
            .await;
        assert_eq!(empty.status, 400);

        let mixed = app
            .put_with_key(
                routes::OBJECTS_BULK,
                &json!([
                    {"name": "a", "owner": lab, "unitSymbol": "V"},
                    {"name": "b", "owner": office, "unitSymbol": "V"},
                ]),
                &admin,
            )
            .await;
        assert_eq!(mixed.status, 400);

        let bad_unit = app
            .put_with_key(
                routes::OBJECTS_BULK,
                &json!([
                    {"name": "a", "owner": lab, "unitSymbol": "V"},
                    {"name": "b", "owner": lab, "unitSymbol": "nope"},
                ]),
                &admin,
            )
            .await;
        assert_eq!(bad_unit.status, 400);

        let listed = app.get_with_key(routes::OBJECTS, &admin).await;
        assert_eq!(listed.body.as_array().unwrap().len(), 0);

        let ok = app
            .put_with_key(
                routes::OBJECTS_BULK,
                &json!([
                    {"name": "a", "owner": lab, "unitSymbol": "V"},
                    {"name": "b", "owner": lab, "unitSymbol": "A"},
                ]),
                &admin,
            )
            .await;
        assert_eq!(ok.status, 200, "{}", ok.text);
        assert_eq!(ok.body.as_array().unwrap().len(), 2);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_tag_and_name() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        for (name, tag) in [("kitchen power", "power"), ("hall light", "light")] {
            let res = app
                .put_with_key(
                    routes::OBJECTS,
                    &json!({"name": name, "owner": group, "unitSymbol": "W", "tags": [tag]}),
                    &admin,
                )
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let by_tag = app
            .get_with_key(&format!("{}?tags=light", routes::OBJECTS), &admin)
            .await;
        assert_eq!(by_tag.body.as_array().unwrap().len(), 1);
        assert_eq!(by_tag.body[0]["name"], "hall light");

        let by_name = app
            .get_with_key(&format!("{}?search=kitchen", routes::OBJECTS), &admin)
            .await;
        assert_eq!(by_name.body.as_array().unwrap().len(), 1);
        assert_eq!(by_name.body[0]["name"], "kitchen power");
    }

    #[tokio::test]
    async fn objects_of_other_groups_are_invisible() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let id = app.create_object(&admin, group, "V").await;
        let outsider = app.create_logged_in_user("mallory").await;

        let list = app.get_with_key(routes::OBJECTS, &outsider).await;
        let one = app.get_with_key(&routes::object(id), &outsider).await;

        assert_eq!(list.body.as_array().unwrap().len(), 0);
        assert_eq!(one.status, 404);
        assert_eq!(one.exception(), "ItemNotFoundException");
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn edit_changes_only_given_fields() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let id = app.create_object(&admin, group, "V").await;

        let res = app
            .post_with_key(&routes::object(id), &json!({"description": "rack 3"}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "sensor");
        assert_eq!(res.body["description"], "rack 3");
    }

    #[tokio::test]
    async fn tags_are_added_and_removed_once() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let id = app.create_object(&admin, group, "V").await;

        let added = app
            .put_empty_with_key(&routes::object_tags(id, "a,b"), &admin)
            .await;
        assert_eq!(added.status, 200, "{}", added.text);
        let again = app
            .put_empty_with_key(&routes::object_tags(id, "a"), &admin)
            .await;
        assert_eq!(again.status, 304);

        let removed = app
            .delete_with_key(&routes::object_tags(id, "a"), &admin)
            .await;
        assert_eq!(removed.status, 200);
        let object = app.get_with_key(&routes::object(id), &admin).await;
        assert_eq!(object.body["tags"], json!(["b"]));
    }

    #[tokio::test]
    async fn disabling_drops_tokens_and_is_idempotent() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let id = app.create_object(&admin, group, "V").await;
        app.create_token(&admin, id).await;

        let disabled = app.post_empty_with_key(&routes::object_disable(id), &admin).await;
        assert_eq!(disabled.status, 200, "{}", disabled.text);
        let again = app.post_empty_with_key(&routes::object_disable(id), &admin).await;
        assert_eq!(again.status, 304);

        let tokens = app.get_with_key(&routes::object_tokens(id), &admin).await;
        assert_eq!(tokens.body.as_array().unwrap().len(), 0);

        let new_token = app
            .put_empty_with_key(&routes::object_tokens(id), &admin)
            .await;
        assert_eq!(new_token.status, 400);

        let enabled = app.post_empty_with_key(&routes::object_enable(id), &admin).await;
        assert_eq!(enabled.status, 200);
        let object = app.get_with_key(&routes::object(id), &admin).await;
        assert_eq!(object.body["disabled"], false);
    }

    #[tokio::test]
    async fn object_without_values_can_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let id = app.create_object(&admin, group, "V").await;
        app.create_token(&admin, id).await;

        let res = app.delete_with_key(&routes::object(id), &admin).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get_with_key(&routes::object(id), &admin).await;
        assert_eq!(res.status, 404);
    }
}

mod tokens {
    use super::*;

    #[tokio::test]
    async fn tokens_need_a_writable_key() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let id = app.create_object(&admin, group, "V").await;
        let token = app.create_token(&admin, id).await;
        let readonly = app
            .put_empty_with_key(routes::APIKEYS, &admin)
            .await
            .apikey();

        let listed = app.get_with_key(&routes::object_tokens(id), &admin).await;
        assert_eq!(listed.status, 200);
        assert_eq!(listed.body[0]["token"], token.as_str());
        assert_eq!(token.len(), 32);

        let denied = app.get_with_key(&routes::object_tokens(id), &readonly).await;
        assert_eq!(denied.status, 403);
    }
}

mod comments {
    use super::*;

    #[tokio::test]
    async fn comments_are_filtered_by_date() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let id = app.create_object(&admin, group, "V").await;
        let path = format!("/objects/{id}/comments");

        let res = app
            .put_with_key(
                &path,
                &json!({
                    "from": "2020-01-01T00:00:00.000Z",
                    "to": "2020-01-10T00:00:00.000Z",
                    "comment": "sensor replaced",
                }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["from"], "2020-01-01T00:00:00.000Z");

        let inside = app
            .get_with_key(&format!("{path}?forDate=2020-01-05T00:00:00.000Z"), &admin)
            .await;
        let outside = app
            .get_with_key(&format!("{path}?forDate=2020-02-05T00:00:00.000Z"), &admin)
            .await;
        assert_eq!(inside.body.as_array().unwrap().len(), 1);
        assert_eq!(outside.body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn comment_period_must_be_ordered() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let id = app.create_object(&admin, group, "V").await;

        let res = app
            .put_with_key(
                &format!("/objects/{id}/comments"),
                &json!({
                    "from": "2020-01-10T00:00:00.000Z",
                    "to": "2020-01-01T00:00:00.000Z",
                    "comment": "backwards",
                }),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
    }
}
