use ::common::Role;
use serde_json::json;

use crate::common::{PASSWORD, TestApp, TestResponse, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_as_a_buyer() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "asha@example.com", "password": PASSWORD, "display_name": "Asha"}),
            )
            .await;

        assert_eq!(res.status, 201);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["email"], "asha@example.com");
        assert_eq!(res.body["role"], "user");
    }

    #[tokio::test]
    async fn developer_flag_creates_a_seller_account() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "email": "dev@example.com",
                    "password": PASSWORD,
                    "display_name": "Dev",
                    "as_developer": true,
                }),
            )
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["role"], "developer");
    }

    #[tokio::test]
    async fn emails_are_unique_regardless_of_case() {
        let app = TestApp::spawn().await;

        let first = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "asha@example.com", "password": PASSWORD, "display_name": "Asha"}),
            )
            .await;
        assert_eq!(first.status, 201);

        let second = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "ASHA@example.com", "password": PASSWORD, "display_name": "Asha"}),
            )
            .await;
        assert_eq!(second.status, 409);
        assert_eq!(second.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn cannot_register_with_a_password_that_is_too_short() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "asha@example.com", "password": "short", "display_name": "Asha"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn cannot_register_with_an_invalid_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"email": "not-an-email", "password": PASSWORD, "display_name": "Asha"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn buyer_receives_token_with_purchase_permission_only() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("asha@example.com").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "asha@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["role"], "user");
        let perms = res.body["permissions"].as_array().unwrap();
        assert!(perms.contains(&json!("purchase:create")));
        assert!(!perms.contains(&json!("content:create")));
    }

    #[tokio::test]
    async fn cannot_login_with_wrong_password() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("asha@example.com").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "asha@example.com", "password": "wrongpassword"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn cannot_login_with_unknown_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nobody@example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }
}

mod request_validation {
    use super::*;

    #[tokio::test]
    async fn malformed_json_body_returns_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::REGISTER))
            .header("Content-Type", "application/json")
            .body("not valid json")
            .send()
            .await
            .expect("Failed to send request");

        let res = TestResponse::from_response(res).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_required_fields_returns_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::REGISTER, &json!({"email": "asha@example.com"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod authenticated_access {
    use super::*;

    #[tokio::test]
    async fn authenticated_user_can_retrieve_their_profile() {
        let app = TestApp::spawn().await;
        let user = app
            .create_user_with_role("dev@example.com", Role::Developer)
            .await;

        let res = app.get_with_token(routes::ME, &user.token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], user.id);
        assert_eq!(res.body["email"], "dev@example.com");
        assert_eq!(res.body["role"], "developer");
        assert!(
            res.body["permissions"]
                .as_array()
                .unwrap()
                .contains(&json!("payout:request"))
        );
    }

    #[tokio::test]
    async fn request_without_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn request_with_malformed_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not-a-valid-jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn request_with_non_bearer_auth_scheme_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .get(format!("http://{}{}", app.addr, routes::ME))
            .header("Authorization", "Basic abc123")
            .send()
            .await
            .expect("Failed to send request");

        let res = TestResponse::from_response(res).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod role_management {
    use super::*;

    #[tokio::test]
    async fn superadmin_can_promote_a_user_to_admin() {
        let app = TestApp::spawn().await;
        let root = app
            .create_user_with_role("root@example.com", Role::SuperAdmin)
            .await;
        let user = app.create_authenticated_user("asha@example.com").await;

        let res = app
            .patch_with_token(&routes::user_role(user.id), &json!({"role": "admin"}), &root.token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["role"], "admin");
    }

    #[tokio::test]
    async fn admin_cannot_grant_administrative_roles() {
        let app = TestApp::spawn().await;
        let admin = app
            .create_user_with_role("admin@example.com", Role::Admin)
            .await;
        let user = app.create_authenticated_user("asha@example.com").await;

        let promote = app
            .patch_with_token(&routes::user_role(user.id), &json!({"role": "admin"}), &admin.token)
            .await;
        assert_eq!(promote.status, 403);
        assert_eq!(promote.body["code"], "PERMISSION_DENIED");

        let seller = app
            .patch_with_token(
                &routes::user_role(user.id),
                &json!({"role": "developer"}),
                &admin.token,
            )
            .await;
        assert_eq!(seller.status, 200);
        assert_eq!(seller.body["role"], "developer");
    }

    #[tokio::test]
    async fn buyers_cannot_change_roles() {
        let app = TestApp::spawn().await;
        let user = app.create_authenticated_user("asha@example.com").await;
        let other = app.create_authenticated_user("ravi@example.com").await;

        let res = app
            .patch_with_token(
                &routes::user_role(other.id),
                &json!({"role": "developer"}),
                &user.token,
            )
            .await;

        assert_eq!(res.status, 403);
    }
}
