use serde_json::json;

use crate::common::{ApiKey, TestApp, routes};

async fn create_object_group(app: &TestApp, key: &ApiKey, owner: i32) -> i32 {
    let res = app
        .put_with_key(
            routes::OBJECT_GROUPS,
            &json!({"name": "floor 1", "description": "first floor", "owner": owner}),
            key,
        )
        .await;
    assert_eq!(res.status, 200, "create_object_group failed: {}", res.text);
    res.id() as i32
}

#[tokio::test]
async fn group_lists_its_objects_on_request() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let lab = app.create_user_group(&admin, "lab").await;
    let group = create_object_group(&app, &admin, lab).await;
    let object = app.create_object(&admin, lab, "V").await;

    let added = app
        .put_empty_with_key(&routes::object_group_object(group, object), &admin)
        .await;
    assert_eq!(added.status, 200, "{}", added.text);
    let again = app
        .put_empty_with_key(&routes::object_group_object(group, object), &admin)
        .await;
    assert_eq!(again.status, 304);

    let plain = app.get_with_key(&routes::object_group(group), &admin).await;
    assert_eq!(plain.status, 200);
    assert!(plain.body["objects"].is_null());

    let full = app
        .get_with_key(
            &format!("{}?withObjects=true", routes::object_group(group)),
            &admin,
        )
        .await;
    assert_eq!(full.body["objects"][0]["id"], object);

    let objects = app
        .get_with_key(&routes::object_group_objects(group), &admin)
        .await;
    assert_eq!(objects.body.as_array().unwrap().len(), 1);

    let groups_of_object = app
        .get_with_key(&format!("/objects/{object}/objectGroups"), &admin)
        .await;
    assert_eq!(groups_of_object.body[0]["id"], group);
}

#[tokio::test]
async fn granting_a_user_group_shares_the_objects() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let lab = app.create_user_group(&admin, "lab").await;
    let guests = app.create_user_group(&admin, "guests").await;
    let group = create_object_group(&app, &admin, lab).await;
    let object = app.create_object(&admin, lab, "V").await;
    app.put_empty_with_key(&routes::object_group_object(group, object), &admin)
        .await;
    let alice = app.create_user("alice", "password").await;
    app.add_member(guests, alice, false).await;
    let key = app.login("alice", "password").await;

    let before = app.get_with_key(&routes::object(object), &key).await;
    assert_eq!(before.status, 404);

    let granted = app
        .put_empty_with_key(&routes::object_group_permission(group, guests), &admin)
        .await;
    assert_eq!(granted.status, 200, "{}", granted.text);

    let read = app.get_with_key(&routes::object(object), &key).await;
    assert_eq!(read.status, 200, "{}", read.text);

    let write = app
        .post_with_key(&routes::object(object), &json!({"name": "mine"}), &key)
        .await;
    assert_eq!(write.status, 404, "shared objects are read-only");

    let permissions = app
        .get_with_key(&format!("{}/userGroups", routes::object_group(group)), &admin)
        .await;
    assert_eq!(permissions.body[0]["id"], guests);

    let revoked = app
        .delete_with_key(&routes::object_group_permission(group, guests), &admin)
        .await;
    assert_eq!(revoked.status, 200);
    let after = app.get_with_key(&routes::object(object), &key).await;
    assert_eq!(after.status, 404);
}

#[tokio::test]
async fn granting_to_an_unknown_user_group_is_not_found() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let lab = app.create_user_group(&admin, "lab").await;
    let group = create_object_group(&app, &admin, lab).await;

    let res = app
        .put_empty_with_key(&routes::object_group_permission(group, 9999), &admin)
        .await;

    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn readers_cannot_delete_the_group() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let lab = app.create_user_group(&admin, "lab").await;
    let group = create_object_group(&app, &admin, lab).await;
    let alice = app.create_user("alice", "password").await;
    app.add_member(lab, alice, false).await;
    let key = app.login("alice", "password").await;

    let res = app.delete_with_key(&routes::object_group(group), &key).await;
    assert_eq!(res.status, 403);

    let res = app.delete_with_key(&routes::object_group(group), &admin).await;
    assert_eq!(res.status, 200, "{}", res.text);
    let res = app.delete_with_key(&routes::object_group(group), &admin).await;
    assert_eq!(res.status, 304);
}
