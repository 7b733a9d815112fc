use crate::helpers::{spawn_app, TestMember};

#[tokio::test]
async fn login_with_valid_credentials_returns_a_token_pair() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;

    // act
    let response = test_app.post_login(&member.email, &member.password).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("No refresh cookie set")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("refresh_token="));
    assert!(set_cookie.contains("HttpOnly"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["data"]["accessToken"].as_str().is_some());
    assert!(body["data"]["refreshToken"].as_str().is_some());
}

#[tokio::test]
async fn login_with_the_wrong_password_returns_401() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;

    // act
    let response = test_app.post_login(&member.email, "wrong-password").await;

    // assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_with_an_unknown_email_returns_401() {
    // arrange
    let test_app = spawn_app().await;

    // act
    let response = test_app
        .post_login("nobody@example.com", "whatever-password")
        .await;

    // assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn suspended_members_cannot_log_in() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member
        .store_with(&test_app.connection_pool, "MEMBER", "SUSPENDED", "PUBLIC")
        .await;

    // act
    let response = test_app.post_login(&member.email, &member.password).await;

    // assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn members_awaiting_deletion_cannot_log_in() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member
        .store_with(
            &test_app.connection_pool,
            "MEMBER",
            "WAITING_DELETED",
            "PUBLIC",
        )
        .await;

    // act
    let response = test_app.post_login(&member.email, &member.password).await;

    // assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn an_access_token_authenticates_protected_endpoints() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;

    // act
    let response = test_app
        .api_client
        .patch(&format!("{}/api/members/me/privacy", &test_app.address))
        .bearer_auth(&access_token)
        .json(&serde_json::json!({"visibility": "PRIVATE"}))
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn requests_without_a_token_are_rejected_with_401() {
    // arrange
    let test_app = spawn_app().await;

    // act
    let response = test_app
        .api_client
        .patch(&format!("{}/api/members/me/privacy", &test_app.address))
        .json(&serde_json::json!({"visibility": "PRIVATE"}))
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn a_logged_out_token_no_longer_authenticates() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;

    // act: log out with the token
    let response = test_app
        .api_client
        .post(&format!("{}/api/auth/logout", &test_app.address))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    // assert: the same token is now refused
    let response = test_app
        .api_client
        .patch(&format!("{}/api/members/me/privacy", &test_app.address))
        .bearer_auth(&access_token)
        .json(&serde_json::json!({"visibility": "PRIVATE"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn reissue_exchanges_the_refresh_cookie_for_a_new_access_token() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let response = test_app.post_login(&member.email, &member.password).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let refresh_token = body["data"]["refreshToken"].as_str().unwrap().to_string();

    // act: present the refresh token the way the cookie would carry it
    let response = test_app
        .api_client
        .post(&format!("{}/api/auth/reissue", &test_app.address))
        .header("Cookie", format!("refresh_token={}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["data"]["accessToken"].as_str().is_some());
    // reissue never returns a new refresh token
    assert!(body["data"].get("refreshToken").is_none());
}

#[tokio::test]
async fn reissue_without_the_cookie_returns_400() {
    // arrange
    let test_app = spawn_app().await;

    // act
    let response = test_app
        .api_client
        .post(&format!("{}/api/auth/reissue", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn reissue_with_a_garbage_token_returns_401() {
    // arrange
    let test_app = spawn_app().await;

    // act
    let response = test_app
        .api_client
        .post(&format!("{}/api/auth/reissue", &test_app.address))
        .header("Cookie", "refresh_token=not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn a_superseded_refresh_token_is_rejected() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;

    let response = test_app.post_login(&member.email, &member.password).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let old_refresh_token = body["data"]["refreshToken"].as_str().unwrap().to_string();

    // a second login rotates the stored refresh token
    // (sleep so the new token's timestamps differ from the old one's)
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let response = test_app.post_login(&member.email, &member.password).await;
    assert_eq!(200, response.status().as_u16());

    // act
    let response = test_app
        .api_client
        .post(&format!("{}/api/auth/reissue", &test_app.address))
        .header("Cookie", format!("refresh_token={}", old_refresh_token))
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(401, response.status().as_u16());
}
