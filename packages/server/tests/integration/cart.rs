use ::common::Role;
use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

struct Shop {
    app: TestApp,
    admin: TestUser,
    developer: TestUser,
    buyer: TestUser,
}

async fn shop() -> Shop {
    let app = TestApp::spawn().await;
    let admin = app
        .create_user_with_role("admin@example.com", Role::Admin)
        .await;
    let developer = app
        .create_user_with_role("dev@example.com", Role::Developer)
        .await;
    let buyer = app.create_authenticated_user("buyer@example.com").await;
    Shop {
        app,
        admin,
        developer,
        buyer,
    }
}

impl Shop {
    async fn add(&self, user: &TestUser, item_id: i32) -> crate::common::TestResponse {
        self.app
            .post_with_token(
                routes::CART_ITEMS,
                &json!({"item_type": "component", "item_id": item_id}),
                &user.token,
            )
            .await
    }
}

mod lines {
    use super::*;

    #[tokio::test]
    async fn paid_item_is_added_with_its_current_price() {
        let s = shop().await;
        let id = s.app.publish_paid_item(&s.developer, &s.admin, 1000).await;

        let res = s.add(&s.buyer, id).await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["price_snapshot"], 1000);

        let cart = s.app.get_with_token(routes::CART, &s.buyer.token).await;
        assert_eq!(cart.status, 200);
        assert_eq!(cart.body["items"].as_array().unwrap().len(), 1);
        assert_eq!(cart.body["summary"]["subtotal"], 1000);
        assert!(cart.body["summary"]["warnings"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_item_cannot_be_added_twice() {
        let s = shop().await;
        let id = s.app.publish_paid_item(&s.developer, &s.admin, 1000).await;

        assert_eq!(s.add(&s.buyer, id).await.status, 201);
        let again = s.add(&s.buyer, id).await;

        assert_eq!(again.status, 409);
        assert_eq!(again.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn free_own_and_owned_items_are_refused() {
        let s = shop().await;
        let paid = s.app.publish_paid_item(&s.developer, &s.admin, 1000).await;
        let free = s
            .app
            .post_with_token(
                routes::CONTENT,
                &json!({
                    "item_type": "component",
                    "title": "Free Badge",
                    "category": "badges",
                    "plan_type": "free",
                }),
                &s.admin.token,
            )
            .await
            .id();

        assert_eq!(s.add(&s.buyer, free).await.status, 400);
        assert_eq!(s.add(&s.developer, paid).await.status, 409);

        s.app.buy(&s.buyer, paid).await;
        assert_eq!(s.add(&s.buyer, paid).await.status, 409);
    }

    #[tokio::test]
    async fn lines_can_be_removed_and_the_cart_cleared() {
        let s = shop().await;
        let a = s.app.publish_paid_item(&s.developer, &s.admin, 1000).await;
        let b = s.app.publish_paid_item(&s.developer, &s.admin, 500).await;
        s.add(&s.buyer, a).await;
        s.add(&s.buyer, b).await;

        let removed = s
            .app
            .delete_with_token(&routes::cart_item("component", a), &s.buyer.token)
            .await;
        assert_eq!(removed.status, 204);
        let missing = s
            .app
            .delete_with_token(&routes::cart_item("component", a), &s.buyer.token)
            .await;
        assert_eq!(missing.status, 404);

        let cleared = s.app.delete_with_token(routes::CART, &s.buyer.token).await;
        assert_eq!(cleared.status, 204);
        let cart = s.app.get_with_token(routes::CART, &s.buyer.token).await;
        assert!(cart.body["items"].as_array().unwrap().is_empty());
    }
}

mod checkout {
    use super::*;

    #[tokio::test]
    async fn one_order_pays_every_seller_their_share() {
        let s = shop().await;
        let other_dev = s
            .app
            .create_user_with_role("dev2@example.com", Role::Developer)
            .await;
        let a = s.app.publish_paid_item(&s.developer, &s.admin, 1000).await;
        let b = s.app.publish_paid_item(&other_dev, &s.admin, 500).await;
        s.add(&s.buyer, a).await;
        s.add(&s.buyer, b).await;

        let res = s
            .app
            .post_with_token(routes::CART_CHECKOUT, &json!({}), &s.buyer.token)
            .await;
        assert_eq!(res.status, 201, "checkout failed: {}", res.text);
        assert_eq!(res.body["subtotal"], 1500);
        assert_eq!(res.body["order"]["amount_minor"], 150_000);
        assert_eq!(res.body["purchases"].as_array().unwrap().len(), 2);

        let cart = s.app.get_with_token(routes::CART, &s.buyer.token).await;
        assert!(cart.body["items"].as_array().unwrap().is_empty());

        let order_id = res.body["order"]["order_id"].as_str().unwrap();
        let verified = s.app.verify_order(&s.buyer, order_id, "pay_cart").await;
        assert_eq!(verified.status, 200);
        assert_eq!(verified.body.as_array().unwrap().len(), 2);

        let first = s.app.earnings(&s.developer).await;
        let second = s.app.earnings(&other_dev).await;
        assert_eq!(first["balances"]["available_balance"], 700);
        assert_eq!(second["balances"]["available_balance"], 350);
    }

    #[tokio::test]
    async fn lines_bought_elsewhere_are_skipped_with_a_warning() {
        let s = shop().await;
        let a = s.app.publish_paid_item(&s.developer, &s.admin, 1000).await;
        let b = s.app.publish_paid_item(&s.developer, &s.admin, 500).await;
        s.add(&s.buyer, a).await;
        s.add(&s.buyer, b).await;
        s.app.buy(&s.buyer, a).await;

        let res = s
            .app
            .post_with_token(routes::CART_CHECKOUT, &json!({}), &s.buyer.token)
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["subtotal"], 500);
        assert_eq!(res.body["purchases"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["warnings"][0]["item_id"], a);
        assert_eq!(res.body["warnings"][0]["reason"], "already_purchased");
    }

    #[tokio::test]
    async fn repriced_lines_are_charged_at_the_current_price() {
        let s = shop().await;
        let a = s.app.publish_paid_item(&s.developer, &s.admin, 1000).await;
        s.add(&s.buyer, a).await;
        let repriced = s
            .app
            .patch_with_token(&routes::content(a), &json!({"price_inr": 1200}), &s.developer.token)
            .await;
        assert_eq!(repriced.status, 200);

        let res = s
            .app
            .post_with_token(routes::CART_CHECKOUT, &json!({}), &s.buyer.token)
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["subtotal"], 1200);
        assert_eq!(res.body["warnings"][0]["reason"], "price_changed");
    }

    #[tokio::test]
    async fn nothing_payable_is_a_validation_error() {
        let s = shop().await;

        let res = s
            .app
            .post_with_token(routes::CART_CHECKOUT, &json!({}), &s.buyer.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}
