use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use domains::{GameRepository, Role};
use integration_tests::{game_input, id_of, serde_json::json, TestApp};
use uuid::Uuid;

#[tokio::test]
async fn create_validates_hosts_and_input() {
    let app = TestApp::new();
    let gm = app.signup_as(Role::Gm).await;
    let player = app.signup().await;

    let (status, _) = app.post("/api/games", &player, game_input(4, 0)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut past = game_input(4, 0);
    past["scheduled_at"] = json!(Utc::now() - Duration::hours(1));
    let (status, body) = app.post("/api/games", &gm, past).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    for capacity in [0, 21] {
        let (status, _) = app.post("/api/games", &gm, game_input(capacity, 0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "capacity {capacity}");
    }

    let game = app.host_game(&gm, 20, 0).await;
    assert_eq!(game["status"], "scheduled");
    assert_eq!(game["booked_seats"], 0);
    assert_eq!(game["gm_id"], json!(gm.id));
}

#[tokio::test]
async fn listing_filters_by_system_and_open_seats() {
    let app = TestApp::new();
    let gm = app.signup_as(Role::Gm).await;
    let player = app.signup().await;

    let full = app.host_game(&gm, 1, 0).await;
    app.post("/api/bookings", &player, json!({ "game_id": id_of(&full) })).await;
    let mut cthulhu = game_input(5, 0);
    cthulhu["system"] = json!("Call of Cthulhu");
    app.post("/api/games", &gm, cthulhu).await;

    let (status, all) = app.request(Method::GET, "/api/games", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["data"]["total"], 2);

    let (_, open) = app.request(Method::GET, "/api/games?has_open_seats=true", None, None).await;
    assert_eq!(open["data"]["total"], 1);
    assert_eq!(open["data"]["items"][0]["system"], "Call of Cthulhu");

    let (_, by_system) = app.request(Method::GET, "/api/games?system=d%26d%205e", None, None).await;
    assert_eq!(by_system["data"]["items"][0]["id"], full["id"]);

    let (_, mine) = app.get("/api/games/mine", &gm).await;
    assert_eq!(mine["data"]["total"], 2);
}

#[tokio::test]
async fn gm_cancel_voids_bookings_and_notifies_players() {
    let app = TestApp::new();
    let gm = app.signup_as(Role::Gm).await;
    let other_gm = app.signup_as(Role::Gm).await;
    let player = app.signup().await;
    let game_id = id_of(&app.host_game(&gm, 4, 0).await);
    app.post("/api/bookings", &player, json!({ "game_id": game_id, "seats": 2 })).await;

    let uri = format!("/api/games/{game_id}");
    let (status, _) = app.delete(&uri, &other_gm, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.delete(&uri, &gm, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    let (status, _) = app.delete(&uri, &gm, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert!(app.notification_kinds(&player).await.contains(&"game_cancelled".to_string()));
    let (_, bookings) = app.get("/api/bookings/mine", &player).await;
    assert_eq!(bookings["data"][0]["status"], "cancelled");

    let (status, _) = app.post("/api/bookings", &player, json!({ "game_id": game_id })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn favorites_are_unique_and_only_for_gms() {
    let app = TestApp::new();
    let gm = app.signup_as(Role::Gm).await;
    let player = app.signup().await;
    let friend = app.signup().await;

    let uri = format!("/api/users/favorites/{}", gm.id);
    let (status, _) = app.post(&uri, &player, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post(&uri, &player, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post(&format!("/api/users/favorites/{}", friend.id), &player, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, favorites) = app.get("/api/users/favorites", &player).await;
    assert_eq!(favorites["data"][0]["id"], json!(gm.id));

    let (status, _) = app.delete(&uri, &player, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&uri, &player, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reviews_need_a_started_game_and_a_confirmed_seat() {
    let app = TestApp::new();
    let gm = app.signup_as(Role::Gm).await;
    let player = app.signup().await;
    let outsider = app.signup().await;
    let game_id = id_of(&app.host_game(&gm, 4, 0).await);
    app.post("/api/bookings", &player, json!({ "game_id": game_id })).await;

    let uri = format!("/api/games/{game_id}/reviews");
    let review = json!({ "rating": 5, "comment": "Fantastic pacing" });
    let (status, _) = app.post(&uri, &player, review.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "game has not started");

    let id: Uuid = game_id.parse().unwrap();
    let mut stored = app.ports.games.find_by_id(id).await.unwrap().unwrap();
    stored.scheduled_at = Utc::now() - Duration::hours(3);
    app.ports.games.update(stored).await.unwrap();

    let (status, _) = app.post(&uri, &outsider, review.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post(&uri, &player, json!({ "rating": 6 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&uri, &player, review.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post(&uri, &player, review).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, profile) = app.request(Method::GET, &format!("/api/users/{}", gm.id), None, None).await;
    assert_eq!(profile["data"]["stats"]["review_count"], 1);
    assert_eq!(profile["data"]["stats"]["average_rating"], 5.0);
    assert!(app.notification_kinds(&gm).await.contains(&"new_review".to_string()));

    let (_, reviews) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(reviews["data"].as_array().unwrap().len(), 1);
}
