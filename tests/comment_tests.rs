use actix_web::{http, test};
use serde_json::{json, Value};

mod common;
use common::{bearer, publish_video, register_and_login, try_setup_app};

#[actix_web::test]
async fn test_add_and_list_comments() {
    let Some(app) = try_setup_app().await else { return };

    let user = register_and_login(&app).await;
    let video = publish_video(&app, &user.access_token, "Commented video", "x").await;
    let video_id = video["id"].as_i64().unwrap();

    for i in 1..=3 {
        let req = test::TestRequest::post()
            .uri(&format!("/comment/{}", video_id))
            .insert_header(bearer(&user.access_token))
            .set_json(json!({ "content": format!("Comment number {}", i) }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 201, "Failed to post comment {}", i);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["content"], format!("Comment number {}", i));
        assert_eq!(body["data"]["videoId"].as_i64(), Some(video_id));
    }

    let req = test::TestRequest::get()
        .uri(&format!("/comment/{}", video_id))
        .insert_header(bearer(&user.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    let docs = body["data"]["docs"].as_array().unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(body["data"]["totalDocs"], 3);

    // Newest first.
    assert_eq!(docs[0]["content"], "Comment number 3");
    assert_eq!(docs[2]["content"], "Comment number 1");
    assert_eq!(docs[0]["owner"]["username"], user.username);
}

#[actix_web::test]
async fn test_comment_pagination_clamps() {
    let Some(app) = try_setup_app().await else { return };

    let user = register_and_login(&app).await;
    let video = publish_video(&app, &user.access_token, "Paginated comments", "x").await;
    let video_id = video["id"].as_i64().unwrap();

    for i in 1..=5 {
        let req = test::TestRequest::post()
            .uri(&format!("/comment/{}", video_id))
            .insert_header(bearer(&user.access_token))
            .set_json(json!({ "content": format!("c{}", i) }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 201);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/comment/{}?page=1&limit=2", video_id))
        .insert_header(bearer(&user.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["docs"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["totalDocs"], 5);
    assert_eq!(body["data"]["totalPages"], 3);
    assert_eq!(body["data"]["hasNextPage"], true);

    // Oversized limits fall back to the cap instead of dumping everything.
    let req = test::TestRequest::get()
        .uri(&format!("/comment/{}?page=1&limit=500", video_id))
        .insert_header(bearer(&user.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["limit"], 20);
}

#[actix_web::test]
async fn test_comment_requires_auth_and_video() {
    let Some(app) = try_setup_app().await else { return };

    let user = register_and_login(&app).await;
    let video = publish_video(&app, &user.access_token, "Video", "x").await;
    let video_id = video["id"].as_i64().unwrap();

    // No token.
    let req = test::TestRequest::post()
        .uri(&format!("/comment/{}", video_id))
        .set_json(json!({ "content": "anonymous" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);

    // Garbage token.
    let req = test::TestRequest::post()
        .uri(&format!("/comment/{}", video_id))
        .insert_header((http::header::AUTHORIZATION, "Bearer invalid.token.here"))
        .set_json(json!({ "content": "still anonymous" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);

    // Missing video.
    let req = test::TestRequest::post()
        .uri("/comment/999999999")
        .insert_header(bearer(&user.access_token))
        .set_json(json!({ "content": "into the void" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);

    // Blank content.
    let req = test::TestRequest::post()
        .uri(&format!("/comment/{}", video_id))
        .insert_header(bearer(&user.access_token))
        .set_json(json!({ "content": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_comment_ownership() {
    let Some(app) = try_setup_app().await else { return };

    let author = register_and_login(&app).await;
    let intruder = register_and_login(&app).await;
    let video = publish_video(&app, &author.access_token, "Video", "x").await;
    let video_id = video["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/comment/{}", video_id))
        .insert_header(bearer(&author.access_token))
        .set_json(json!({ "content": "original" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    let comment_id = body["data"]["id"].as_i64().unwrap();

    // Non-owner always gets 403, payload validity notwithstanding.
    let req = test::TestRequest::patch()
        .uri(&format!("/comment/comment/{}", comment_id))
        .insert_header(bearer(&intruder.access_token))
        .set_json(json!({ "content": "edited by someone else" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/comment/comment/{}", comment_id))
        .insert_header(bearer(&intruder.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);

    // Owner can edit and delete.
    let req = test::TestRequest::patch()
        .uri(&format!("/comment/comment/{}", comment_id))
        .insert_header(bearer(&author.access_token))
        .set_json(json!({ "content": "edited" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["content"], "edited");

    let req = test::TestRequest::delete()
        .uri(&format!("/comment/comment/{}", comment_id))
        .insert_header(bearer(&author.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::delete()
        .uri(&format!("/comment/comment/{}", comment_id))
        .insert_header(bearer(&author.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
}
