use ::common::Role;
use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

struct Marketplace {
    app: TestApp,
    admin: TestUser,
    developer: TestUser,
    buyer: TestUser,
}

async fn marketplace() -> Marketplace {
    let app = TestApp::spawn().await;
    let admin = app
        .create_user_with_role("admin@example.com", Role::Admin)
        .await;
    let developer = app
        .create_user_with_role("dev@example.com", Role::Developer)
        .await;
    let buyer = app.create_authenticated_user("buyer@example.com").await;
    Marketplace {
        app,
        admin,
        developer,
        buyer,
    }
}

mod viewing {
    use super::*;

    #[tokio::test]
    async fn anonymous_viewer_gets_a_preview_of_paid_items() {
        let m = marketplace().await;
        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;

        let res = m.app.get_without_token(&routes::content(id)).await;

        assert_eq!(res.status, 200);
        let item = &res.body["item"];
        assert_eq!(item["title"], "Animated Navbar");
        assert_eq!(item["code"], "// Full source code is available after purchase.");
        assert!(item["git_repo_url"].is_null());
        assert_eq!(
            item["dependencies"],
            json!(["react", "framer-motion", "clsx", "...more after purchase"])
        );
        assert_eq!(res.body["access"]["level"], "limited_access");
        assert_eq!(res.body["access"]["purchase_required"], true);
        assert_eq!(res.body["access"]["can_download"], false);
    }

    #[tokio::test]
    async fn owner_sees_everything_and_may_edit() {
        let m = marketplace().await;
        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;

        let res = m
            .app
            .get_with_token(&routes::content(id), &m.developer.token)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["item"]["code"].as_str().unwrap().contains("Navbar"));
        assert_eq!(res.body["item"]["git_repo_url"], "https://github.com/acme/navbar");
        assert_eq!(res.body["item"]["dependencies"].as_array().unwrap().len(), 5);
        assert_eq!(res.body["access"]["level"], "owner_access");
        assert_eq!(res.body["access"]["can_edit"], true);
    }

    #[tokio::test]
    async fn administrators_see_full_content_without_buying() {
        let m = marketplace().await;
        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;

        let res = m.app.get_with_token(&routes::content(id), &m.admin.token).await;

        assert_eq!(res.body["access"]["level"], "full_access");
        assert_eq!(res.body["access"]["reason"], "administrator");
        assert_eq!(res.body["item"]["git_repo_url"], "https://github.com/acme/navbar");
    }

    #[tokio::test]
    async fn buyer_sees_full_content_only_after_purchase() {
        let m = marketplace().await;
        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;

        let before = m.app.get_with_token(&routes::content(id), &m.buyer.token).await;
        assert_eq!(before.body["access"]["level"], "limited_access");

        m.app.buy(&m.buyer, id).await;

        let after = m.app.get_with_token(&routes::content(id), &m.buyer.token).await;
        assert_eq!(after.body["access"]["level"], "full_access");
        assert_eq!(after.body["access"]["reason"], "purchased");
        assert_eq!(after.body["access"]["can_download"], true);
        assert!(after.body["item"]["code"].as_str().unwrap().contains("Navbar"));
    }

    #[tokio::test]
    async fn free_items_are_fully_visible_to_everyone() {
        let m = marketplace().await;
        let res = m
            .app
            .post_with_token(
                routes::CONTENT,
                &json!({
                    "item_type": "template",
                    "title": "Starter Landing Page",
                    "category": "landing",
                    "plan_type": "free",
                    "price_inr": 499,
                    "code": "<main>Hello</main>",
                    "git_repo_url": "https://github.com/acme/landing",
                }),
                &m.admin.token,
            )
            .await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["price_inr"], 0);
        assert_eq!(res.body["approval_status"], "approved");
        let id = res.id();

        let view = m.app.get_without_token(&routes::content(id)).await;

        assert_eq!(view.body["access"]["level"], "full_access");
        assert_eq!(view.body["access"]["reason"], "free_content");
        assert_eq!(view.body["item"]["code"], "<main>Hello</main>");
    }

    #[tokio::test]
    async fn pending_items_are_hidden_from_everyone_but_owner_and_admins() {
        let m = marketplace().await;
        let res = m
            .app
            .post_with_token(
                routes::CONTENT,
                &json!({
                    "item_type": "component",
                    "title": "Pricing Table",
                    "category": "pricing",
                    "plan_type": "paid",
                    "price_inr": 799,
                }),
                &m.developer.token,
            )
            .await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["approval_status"], "pending");
        let id = res.id();

        assert_eq!(m.app.get_without_token(&routes::content(id)).await.status, 404);
        assert_eq!(
            m.app.get_with_token(&routes::content(id), &m.buyer.token).await.status,
            404
        );
        assert_eq!(
            m.app
                .get_with_token(&routes::content(id), &m.developer.token)
                .await
                .status,
            200
        );
        assert_eq!(
            m.app.get_with_token(&routes::content(id), &m.admin.token).await.status,
            200
        );
    }

    #[tokio::test]
    async fn unknown_item_returns_not_found() {
        let m = marketplace().await;

        let res = m.app.get_without_token(&routes::content(9999)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn catalogue_lists_only_approved_items_with_public_fields() {
        let m = marketplace().await;
        let listed = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;
        let pending = m
            .app
            .post_with_token(
                routes::CONTENT,
                &json!({
                    "item_type": "component",
                    "title": "Hidden Footer",
                    "category": "footer",
                    "plan_type": "paid",
                    "price_inr": 300,
                }),
                &m.developer.token,
            )
            .await;
        assert_eq!(pending.status, 201);

        let res = m.app.get_with_token(routes::CONTENT, &m.admin.token).await;

        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], listed);
        assert!(data[0].get("code").is_none());
        assert!(data[0].get("git_repo_url").is_none());
        assert_eq!(res.body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn search_matches_titles_case_insensitively() {
        let m = marketplace().await;
        m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;

        let hit = m
            .app
            .get_without_token(&format!("{}?search=NAVBAR", routes::CONTENT))
            .await;
        let miss = m
            .app
            .get_without_token(&format!("{}?search=footer", routes::CONTENT))
            .await;

        assert_eq!(hit.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(miss.body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn unknown_sort_field_is_rejected() {
        let m = marketplace().await;

        let res = m
            .app
            .get_without_token(&format!("{}?sort_by=code", routes::CONTENT))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod publishing {
    use super::*;

    #[tokio::test]
    async fn buyers_cannot_publish() {
        let m = marketplace().await;

        let res = m
            .app
            .post_with_token(
                routes::CONTENT,
                &json!({
                    "item_type": "component",
                    "title": "Card",
                    "category": "cards",
                    "plan_type": "paid",
                    "price_inr": 100,
                }),
                &m.buyer.token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn paid_items_need_a_price() {
        let m = marketplace().await;

        let res = m
            .app
            .post_with_token(
                routes::CONTENT,
                &json!({
                    "item_type": "component",
                    "title": "Card",
                    "category": "cards",
                    "plan_type": "paid",
                }),
                &m.developer.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn prices_above_the_cap_are_rejected() {
        let m = marketplace().await;

        let created = m
            .app
            .post_with_token(
                routes::CONTENT,
                &json!({
                    "item_type": "component",
                    "title": "Card",
                    "category": "cards",
                    "plan_type": "paid",
                    "price_inr": 5_000_000_000_000_000_000i64,
                }),
                &m.developer.token,
            )
            .await;
        assert_eq!(created.status, 400);
        assert_eq!(created.body["code"], "VALIDATION_ERROR");

        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;
        let edit = m
            .app
            .patch_with_token(
                &routes::content(id),
                &json!({"price_inr": i64::MAX}),
                &m.developer.token,
            )
            .await;
        assert_eq!(edit.status, 400);
    }

    #[tokio::test]
    async fn owner_can_edit_but_not_feature_their_item() {
        let m = marketplace().await;
        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;

        let edit = m
            .app
            .patch_with_token(
                &routes::content(id),
                &json!({"price_inr": 1200, "git_repo_url": null}),
                &m.developer.token,
            )
            .await;
        assert_eq!(edit.status, 200);
        assert_eq!(edit.body["price_inr"], 1200);
        assert!(edit.body["git_repo_url"].is_null());

        let feature = m
            .app
            .patch_with_token(&routes::content(id), &json!({"featured": true}), &m.developer.token)
            .await;
        assert_eq!(feature.status, 403);

        let by_admin = m
            .app
            .patch_with_token(&routes::content(id), &json!({"featured": true}), &m.admin.token)
            .await;
        assert_eq!(by_admin.status, 200);
        assert_eq!(by_admin.body["featured"], true);
    }

    #[tokio::test]
    async fn other_developers_cannot_edit_or_delete() {
        let m = marketplace().await;
        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;
        let rival = m
            .app
            .create_user_with_role("rival@example.com", Role::Developer)
            .await;

        let edit = m
            .app
            .patch_with_token(&routes::content(id), &json!({"title": "Mine now"}), &rival.token)
            .await;
        let delete = m.app.delete_with_token(&routes::content(id), &rival.token).await;

        assert_eq!(edit.status, 403);
        assert_eq!(delete.status, 403);
    }

    #[tokio::test]
    async fn deleted_items_leave_the_catalogue() {
        let m = marketplace().await;
        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;

        let res = m.app.delete_with_token(&routes::content(id), &m.developer.token).await;
        assert_eq!(res.status, 204);

        assert_eq!(m.app.get_without_token(&routes::content(id)).await.status, 404);
        let list = m.app.get_without_token(routes::CONTENT).await;
        assert!(list.body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_reviewers_can_approve() {
        let m = marketplace().await;
        let res = m
            .app
            .post_with_token(
                routes::CONTENT,
                &json!({
                    "item_type": "component",
                    "title": "Card",
                    "category": "cards",
                    "plan_type": "paid",
                    "price_inr": 100,
                }),
                &m.developer.token,
            )
            .await;
        let id = res.id();

        let own = m
            .app
            .post_with_token(&routes::content_approve(id), &json!({}), &m.developer.token)
            .await;
        assert_eq!(own.status, 403);

        let rejected = m
            .app
            .post_with_token(&routes::content_reject(id), &json!({}), &m.admin.token)
            .await;
        assert_eq!(rejected.status, 200);
        assert_eq!(rejected.body["approval_status"], "rejected");
    }
}

mod purchased_status {
    use super::*;

    #[tokio::test]
    async fn bulk_check_reflects_completed_purchases() {
        let m = marketplace().await;
        let bought = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;
        let other = m.app.publish_paid_item(&m.developer, &m.admin, 500).await;
        m.app.buy(&m.buyer, bought).await;
        let body = json!({"item_type": "component", "item_ids": [bought, other]});

        let buyer = m
            .app
            .post_with_token(routes::CONTENT_PURCHASED, &body, &m.buyer.token)
            .await;
        assert_eq!(buyer.status, 200);
        assert_eq!(buyer.body["purchased"][bought.to_string()], true);
        assert_eq!(buyer.body["purchased"][other.to_string()], false);

        let anonymous = m.app.post_without_token(routes::CONTENT_PURCHASED, &body).await;
        assert_eq!(anonymous.body["purchased"][bought.to_string()], false);

        let admin = m
            .app
            .post_with_token(routes::CONTENT_PURCHASED, &body, &m.admin.token)
            .await;
        assert_eq!(admin.body["purchased"][other.to_string()], true);
    }

    #[tokio::test]
    async fn downloads_are_recorded_only_for_buyers() {
        let m = marketplace().await;
        let id = m.app.publish_paid_item(&m.developer, &m.admin, 1000).await;

        let before = m
            .app
            .post_with_token(&routes::content_download(id), &json!({}), &m.buyer.token)
            .await;
        assert_eq!(before.status, 200);
        assert_eq!(before.body["recorded"], false);

        m.app.buy(&m.buyer, id).await;
        let after = m
            .app
            .post_with_token(&routes::content_download(id), &json!({}), &m.buyer.token)
            .await;
        assert_eq!(after.body["recorded"], true);

        let purchases = m.app.get_with_token(routes::PURCHASES, &m.buyer.token).await;
        assert_eq!(purchases.body["data"][0]["download_count"], 1);
    }
}
