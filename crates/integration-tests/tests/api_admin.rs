use axum::http::{Method, StatusCode};
use domains::Role;
use integration_tests::{id_of, serde_json::json, TestApp};

#[tokio::test]
async fn deleting_a_game_notifies_gm_and_booked_players() {
    let app = TestApp::new();
    let admin = app.signup_as(Role::Admin).await;
    let gm = app.signup_as(Role::Gm).await;
    let player = app.signup().await;
    let game = app.host_game(&gm, 4, 0).await;
    let game_id = id_of(&game);
    app.post("/api/bookings", &player, json!({ "game_id": game_id })).await;

    let uri = format!("/api/admin/games/{game_id}");
    let (status, _) = app.delete(&uri, &gm, Some(json!({ "reason": "spam" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.delete(&uri, &admin, Some(json!({ "reason": "Off-platform payments" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cancelled_bookings"], 1);

    let (status, _) = app.get(&format!("/api/games/{game_id}"), &player).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.notification_kinds(&gm).await.contains(&"game_deleted".to_string()));
    assert!(app.notification_kinds(&player).await.contains(&"game_cancelled".to_string()));

    let (_, bookings) = app.get("/api/bookings/mine", &player).await;
    assert_eq!(bookings["data"][0]["status"], "cancelled");
}

#[tokio::test]
async fn broadcast_reaches_the_chosen_audience() {
    let app = TestApp::new();
    let admin = app.signup_as(Role::Admin).await;
    let gm = app.signup_as(Role::Gm).await;
    let players = [app.signup().await, app.signup().await];

    let (status, body) = app
        .post(
            "/api/admin/notifications/broadcast",
            &admin,
            json!({ "title": "Maintenance", "message": "Back in ten", "audience": "gms" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recipients"], 1);
    assert!(app.notification_kinds(&gm).await.contains(&"announcement".to_string()));
    assert!(app.notification_kinds(&players[0]).await.is_empty());

    let (_, body) = app
        .post("/api/admin/notifications/broadcast", &admin, json!({ "title": "Hi", "message": "Welcome all" }))
        .await;
    assert_eq!(body["data"]["recipients"], 4);

    let (_, stats) = app.get("/api/admin/stats", &admin).await;
    assert_eq!(stats["data"]["users"], 4);
    assert_eq!(stats["data"]["players"], 2);
}

#[tokio::test]
async fn deactivation_locks_the_account_out() {
    let app = TestApp::new();
    let admin = app.signup_as(Role::Admin).await;
    let player = app.signup().await;

    let (status, _) = app
        .put(&format!("/api/admin/users/{}/status", admin.id), &admin, json!({ "is_active": false }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(&format!("/api/admin/users/{}/status", player.id), &admin, json!({ "is_active": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = app.get("/api/auth/me", &player).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({
                "email": format!("{}@example.com", player.username),
                "password": "correct-horse-battery",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn role_changes_take_effect_on_existing_tokens() {
    let app = TestApp::new();
    let admin = app.signup_as(Role::Admin).await;
    let player = app.signup().await;

    let (status, _) = app.post("/api/games", &player, integration_tests::game_input(4, 0)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(&format!("/api/admin/users/{}/role", player.id), &admin, json!({ "role": "gm" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/api/games", &player, integration_tests::game_input(4, 0)).await;
    assert_eq!(status, StatusCode::CREATED);
}
