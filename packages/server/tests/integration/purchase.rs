use ::common::Role;
use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

struct Sale {
    app: TestApp,
    admin: TestUser,
    developer: TestUser,
    buyer: TestUser,
    item_id: i32,
}

async fn item_for_sale(price: i64) -> Sale {
    let app = TestApp::spawn().await;
    let admin = app
        .create_user_with_role("admin@example.com", Role::Admin)
        .await;
    let developer = app
        .create_user_with_role("dev@example.com", Role::Developer)
        .await;
    let buyer = app.create_authenticated_user("buyer@example.com").await;
    let item_id = app.publish_paid_item(&developer, &admin, price).await;
    Sale {
        app,
        admin,
        developer,
        buyer,
        item_id,
    }
}

mod ordering {
    use super::*;

    #[tokio::test]
    async fn order_is_opened_in_minor_units_with_a_pending_purchase() {
        let s = item_for_sale(1000).await;

        let res = s
            .app
            .post_with_token(
                routes::PURCHASE_ORDERS,
                &json!({"item_type": "component", "item_id": s.item_id}),
                &s.buyer.token,
            )
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["order"]["amount_minor"], 100_000);
        assert_eq!(res.body["order"]["currency"], "INR");
        assert_eq!(res.body["purchases"][0]["status"], "pending");
        assert_eq!(res.body["purchases"][0]["access_granted"], false);
    }

    #[tokio::test]
    async fn developers_cannot_buy_their_own_items() {
        let s = item_for_sale(1000).await;

        let res = s
            .app
            .post_with_token(
                routes::PURCHASE_ORDERS,
                &json!({"item_type": "component", "item_id": s.item_id}),
                &s.developer.token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn wrong_item_type_is_not_found() {
        let s = item_for_sale(1000).await;

        let res = s
            .app
            .post_with_token(
                routes::PURCHASE_ORDERS,
                &json!({"item_type": "template", "item_id": s.item_id}),
                &s.buyer.token,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn owned_items_cannot_be_ordered_again() {
        let s = item_for_sale(1000).await;
        s.app.buy(&s.buyer, s.item_id).await;

        let res = s
            .app
            .post_with_token(
                routes::PURCHASE_ORDERS,
                &json!({"item_type": "component", "item_id": s.item_id}),
                &s.buyer.token,
            )
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn withdrawn_items_cannot_be_ordered() {
        let s = item_for_sale(1000).await;
        let deleted = s
            .app
            .delete_with_token(&routes::content(s.item_id), &s.admin.token)
            .await;
        assert_eq!(deleted.status, 204);

        let res = s
            .app
            .post_with_token(
                routes::PURCHASE_ORDERS,
                &json!({"item_type": "component", "item_id": s.item_id}),
                &s.buyer.token,
            )
            .await;

        assert_eq!(res.status, 409);
    }
}

mod verification {
    use super::*;

    #[tokio::test]
    async fn verified_payment_credits_seventy_percent_to_the_developer() {
        let s = item_for_sale(1000).await;
        let order_id = s.app.open_order(&s.buyer, s.item_id).await;

        let res = s.app.verify_order(&s.buyer, &order_id, "pay_001").await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body[0]["status"], "completed");
        assert_eq!(res.body[0]["access_granted"], true);
        assert_eq!(res.body[0]["gateway_payment_id"], "pay_001");

        let earnings = s.app.earnings(&s.developer).await;
        assert_eq!(earnings["balances"]["total_earnings"], 700);
        assert_eq!(earnings["balances"]["available_balance"], 700);
        assert_eq!(earnings["balances"]["pending_balance"], 0);
        assert_eq!(earnings["sales"]["total_sales"], 1);
        assert_eq!(earnings["sales"]["component_sales"], 1);
        assert_eq!(earnings["sales"]["gross_sales"], 1000);
        assert_eq!(earnings["monthly"][0]["earnings"], 700);
    }

    #[tokio::test]
    async fn repeating_a_verification_never_credits_twice() {
        let s = item_for_sale(1000).await;
        let order_id = s.app.open_order(&s.buyer, s.item_id).await;

        let first = s.app.verify_order(&s.buyer, &order_id, "pay_001").await;
        let second = s.app.verify_order(&s.buyer, &order_id, "pay_001").await;

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 200);
        assert_eq!(first.body[0]["id"], second.body[0]["id"]);
        let earnings = s.app.earnings(&s.developer).await;
        assert_eq!(earnings["balances"]["total_earnings"], 700);
        assert_eq!(earnings["sales"]["total_sales"], 1);
    }

    #[tokio::test]
    async fn concurrent_verifications_credit_once() {
        let s = item_for_sale(1000).await;
        let order_id = s.app.open_order(&s.buyer, s.item_id).await;

        let (a, b) = tokio::join!(
            s.app.verify_order(&s.buyer, &order_id, "pay_001"),
            s.app.verify_order(&s.buyer, &order_id, "pay_001"),
        );

        assert_eq!(a.status, 200);
        assert_eq!(b.status, 200);
        let earnings = s.app.earnings(&s.developer).await;
        assert_eq!(earnings["balances"]["total_earnings"], 700);
    }

    #[tokio::test]
    async fn second_order_for_an_owned_item_is_refused_without_credit() {
        let s = item_for_sale(1000).await;
        let first = s.app.open_order(&s.buyer, s.item_id).await;
        let second = s.app.open_order(&s.buyer, s.item_id).await;

        let ok = s.app.verify_order(&s.buyer, &first, "pay_001").await;
        let dup = s.app.verify_order(&s.buyer, &second, "pay_002").await;

        assert_eq!(ok.status, 200);
        assert_eq!(dup.status, 409);
        assert_eq!(dup.body["code"], "CONFLICT");
        let earnings = s.app.earnings(&s.developer).await;
        assert_eq!(earnings["balances"]["total_earnings"], 700);

        let failed = s
            .app
            .get_with_token(&format!("{}?status=failed", routes::PURCHASES), &s.buyer.token)
            .await;
        assert_eq!(failed.body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_signature_fails_the_purchase() {
        let s = item_for_sale(1000).await;
        let order_id = s.app.open_order(&s.buyer, s.item_id).await;

        let res = s
            .app
            .post_with_token(
                routes::PURCHASE_VERIFY,
                &json!({
                    "order_id": order_id,
                    "payment_id": "pay_001",
                    "signature": "deadbeef",
                }),
                &s.buyer.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "PAYMENT_VERIFICATION_FAILED");

        let purchases = s.app.get_with_token(routes::PURCHASES, &s.buyer.token).await;
        assert_eq!(purchases.body["data"][0]["status"], "failed");
        let earnings = s.app.earnings(&s.developer).await;
        assert_eq!(earnings["balances"]["total_earnings"], 0);

        let retry = s.app.verify_order(&s.buyer, &order_id, "pay_001").await;
        assert_eq!(retry.status, 409);
    }

    #[tokio::test]
    async fn another_buyers_order_is_not_found() {
        let s = item_for_sale(1000).await;
        let order_id = s.app.open_order(&s.buyer, s.item_id).await;
        let thief = s.app.create_authenticated_user("thief@example.com").await;

        let res = s.app.verify_order(&thief, &order_id, "pay_001").await;

        assert_eq!(res.status, 404);
    }
}

mod earnings_access {
    use super::*;

    #[tokio::test]
    async fn buyers_have_no_earnings_dashboard() {
        let s = item_for_sale(1000).await;

        let res = s.app.get_with_token(routes::MY_EARNINGS, &s.buyer.token).await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn reviewers_can_read_any_developers_earnings() {
        let s = item_for_sale(1000).await;
        s.app.buy(&s.buyer, s.item_id).await;

        let res = s
            .app
            .get_with_token(&routes::earnings(s.developer.id), &s.admin.token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["developer_id"], s.developer.id);
        assert_eq!(res.body["balances"]["available_balance"], 700);

        let denied = s
            .app
            .get_with_token(&routes::earnings(s.developer.id), &s.developer.token)
            .await;
        assert_eq!(denied.status, 403);
    }
}
