use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn creator_becomes_admin_of_the_new_group() {
    let app = TestApp::spawn().await;
    let key = app.create_logged_in_user("alice").await;

    let group = app.create_user_group(&key, "lab").await;

    let res = app
        .get_with_key(&routes::member(group, key.user_id), &key)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["name"], "alice");
    assert_eq!(res.body["admin"], true);

    let res = app
        .get_with_key(&format!("{}?admin=true", routes::USER_GROUPS), &key)
        .await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["name"], "lab");
}

#[tokio::test]
async fn duplicate_group_name_is_rejected() {
    let app = TestApp::spawn().await;
    let key = app.admin().await;
    app.create_user_group(&key, "lab").await;

    let res = app
        .put_with_key(routes::USER_GROUPS, &json!({"name": "lab"}), &key)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.exception(), "DuplicateFieldException");
}

#[tokio::test]
async fn non_members_cannot_see_a_group() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let group = app.create_user_group(&admin, "lab").await;
    let outsider = app.create_logged_in_user("mallory").await;

    let res = app.get_with_key(&routes::user_group(group), &outsider).await;

    assert_eq!(res.status, 404);
}

mod membership {
    use super::*;

    #[tokio::test]
    async fn admin_can_add_promote_and_remove_members() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let bob = app.create_user("bob", "password").await;

        let added = app
            .put_empty_with_key(&routes::member(group, bob), &admin)
            .await;
        assert_eq!(added.status, 200, "{}", added.text);

        let again = app
            .put_empty_with_key(&routes::member(group, bob), &admin)
            .await;
        assert_eq!(again.status, 304);

        let promoted = app
            .put_empty_with_key(&format!("{}?admin=true", routes::member(group, bob)), &admin)
            .await;
        assert_eq!(promoted.status, 200);

        let members = app.get_with_key(&routes::members(group), &admin).await;
        let bob_entry = members
            .body
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["id"] == bob)
            .cloned()
            .expect("bob should be listed");
        assert_eq!(bob_entry["admin"], true);

        let removed = app.delete_with_key(&routes::member(group, bob), &admin).await;
        assert_eq!(removed.status, 200);
        let removed = app.delete_with_key(&routes::member(group, bob), &admin).await;
        assert_eq!(removed.status, 304);
    }

    #[tokio::test]
    async fn plain_members_cannot_manage_members() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let alice = app.create_user("alice", "password").await;
        let bob = app.create_user("bob", "password").await;
        app.add_member(group, alice, false).await;
        let key = app.login("alice", "password").await;

        let res = app.put_empty_with_key(&routes::member(group, bob), &key).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.exception(), "ForbiddenException");
    }

    #[tokio::test]
    async fn adding_an_unknown_user_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;

        let res = app
            .put_empty_with_key(&routes::member(group, 9999), &admin)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn root_membership_in_superadmin_group_cannot_change() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;

        let res = app.delete_with_key(&routes::member(1, 1), &admin).await;

        assert_eq!(res.status, 403);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn superadmin_group_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;

        let res = app.delete_with_key(&routes::user_group(1), &admin).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["details"], "Deleting SUPERADMIN group is forbidden.");
    }

    #[tokio::test]
    async fn group_owning_objects_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        app.create_object(&admin, group, "V").await;

        let res = app.delete_with_key(&routes::user_group(group), &admin).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.exception(), "WrongParamsException");
    }

    #[tokio::test]
    async fn empty_group_is_deleted_once() {
        let app = TestApp::spawn().await;
        let key = app.create_logged_in_user("alice").await;
        let group = app.create_user_group(&key, "lab").await;

        let first = app.delete_with_key(&routes::user_group(group), &key).await;
        let second = app.delete_with_key(&routes::user_group(group), &key).await;

        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(second.status, 304);
    }

    #[tokio::test]
    async fn only_admins_can_delete() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let alice = app.create_user("alice", "password").await;
        app.add_member(group, alice, false).await;
        let key = app.login("alice", "password").await;

        let res = app.delete_with_key(&routes::user_group(group), &key).await;

        assert_eq!(res.status, 403);
    }
}
