use serde_json::json;

use crate::common::{ADMIN_PASSWORD, ApiKey, TestApp, routes};

mod login {
    use super::*;

    #[tokio::test]
    async fn admin_can_login_and_receives_a_writable_key() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_key(
                routes::LOGIN,
                &json!({"username": "admin", "password": ADMIN_PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["userId"], 1);
        assert_eq!(res.body["readOnly"], false);
        assert_eq!(res.body["description"], "auto_login");
        assert_eq!(res.body["secret"].as_str().map(str::len), Some(32));
        assert!(res.body["expirationDate"].is_string());
    }

    #[tokio::test]
    async fn user_can_login_with_their_id_instead_of_their_name() {
        let app = TestApp::spawn().await;
        let id = app.create_user("alice", "password").await;

        let res = app
            .post_without_key(
                routes::LOGIN,
                &json!({"username": id.to_string(), "password": "password"}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["userId"], id);
    }

    #[tokio::test]
    async fn cannot_login_with_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_key(
                routes::LOGIN,
                &json!({"username": "admin", "password": "nope-nope"}),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.exception(), "ForbiddenException");
    }

    #[tokio::test]
    async fn cannot_login_with_unknown_user() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_key(
                routes::LOGIN,
                &json!({"username": "nobody", "password": "password"}),
            )
            .await;

        assert_eq!(res.status, 403);
    }
}

mod gate {
    use super::*;

    #[tokio::test]
    async fn protected_route_without_headers_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app.get_without_key(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.exception(), "UnauthorizedException");
    }

    #[tokio::test]
    async fn unknown_secret_is_rejected() {
        let app = TestApp::spawn().await;
        let key = ApiKey {
            user_id: 1,
            secret: "0".repeat(32),
            id: 0,
        };

        let res = app.get_with_key(routes::ME, &key).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.exception(), "BadApikeyException");
    }

    #[tokio::test]
    async fn non_numeric_user_header_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .send(
                app.client
                    .get(format!("http://{}{}", app.addr, routes::ME))
                    .header("bbuser", "admin")
                    .header("bbtoken", "whatever"),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.exception(), "BadApikeyException");
    }

    #[tokio::test]
    async fn basic_auth_is_accepted_in_place_of_headers() {
        let app = TestApp::spawn().await;
        let key = app.admin().await;

        let res = app
            .send(
                app.client
                    .get(format!("http://{}{}", app.addr, routes::ME))
                    .basic_auth(key.user_id, Some(&key.secret)),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "admin");
    }

    #[tokio::test]
    async fn public_routes_need_no_credentials() {
        let app = TestApp::spawn().await;

        let types = app.get_without_key(routes::TYPES).await;
        let units = app.get_without_key(routes::UNITS).await;

        assert_eq!(types.status, 200);
        assert!(types.body.as_array().unwrap().contains(&json!("float")));
        assert_eq!(units.status, 200);
        assert!(units.body.as_array().unwrap().iter().any(|u| u["symbol"] == "V"));
    }

    #[tokio::test]
    async fn unsecured_mode_runs_as_the_configured_user() {
        let app = TestApp::spawn_with(|config| {
            config.auth.unsecured = true;
            config.auth.unsecured_user = 1;
        })
        .await;

        let res = app.get_without_key(routes::ME).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], 1);
    }
}

mod logout {
    use super::*;

    #[tokio::test]
    async fn logout_revokes_the_key_used() {
        let app = TestApp::spawn().await;
        let key = app.admin().await;

        let res = app.post_empty_with_key(routes::LOGOUT, &key).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get_with_key(routes::ME, &key).await;
        assert_eq!(res.status, 403);
    }
}

mod users {
    use super::*;

    #[tokio::test]
    async fn me_describes_the_caller() {
        let app = TestApp::spawn().await;
        let key = app.create_logged_in_user("alice").await;

        let res = app.get_with_key(routes::ME, &key).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"], "alice");
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn group_admin_can_create_a_user_in_their_group() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;

        let res = app
            .put_with_key(
                &format!("{}?userGroupId={group}&admin=false", routes::USERS),
                &json!({"name": "bob", "password": "secret1", "email": "bob@example.org"}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let bob = res.id() as i32;

        let bob_key = app.login("bob", "secret1").await;
        let groups = app.get_with_key(routes::MY_GROUPS, &bob_key).await;
        assert_eq!(groups.status, 200);
        assert_eq!(groups.body[0]["id"], group);
        assert_eq!(groups.body[0]["admin"], false);
        assert_eq!(bob_key.user_id, bob);
    }

    #[tokio::test]
    async fn non_admin_cannot_create_users() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let group = app.create_user_group(&admin, "lab").await;
        let alice = app.create_user("alice", "password").await;
        app.add_member(group, alice, false).await;
        let key = app.login("alice", "password").await;

        let res = app
            .put_with_key(
                &format!("{}?userGroupId={group}", routes::USERS),
                &json!({"name": "bob", "password": "secret1"}),
                &key,
            )
            .await;

        assert_eq!(res.status, 404, "{}", res.text);
    }
}
