use crate::helpers::{seed_follow, spawn_app, TestMember};

async fn post_block(
    test_app: &crate::helpers::TestApp,
    target_id: uuid::Uuid,
    access_token: &str,
) -> reqwest::Response {
    test_app
        .api_client
        .post(&format!("{}/api/block/{}", &test_app.address, target_id))
        .bearer_auth(access_token)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn blocking_a_member_severs_follows_in_both_directions() {
    // arrange
    let test_app = spawn_app().await;
    let blocker = TestMember::generate();
    blocker.store(&test_app.connection_pool).await;
    let target = TestMember::generate();
    target.store(&test_app.connection_pool).await;
    seed_follow(&test_app.connection_pool, blocker.id, target.id).await;
    seed_follow(&test_app.connection_pool, target.id, blocker.id).await;
    let access_token = test_app.login(&blocker).await;

    // act
    let response = post_block(&test_app, target.id, &access_token).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let blocks = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM blocks")
        .fetch_one(&test_app.connection_pool)
        .await
        .unwrap();
    assert_eq!(blocks.0, 1);
    let follows = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM follows")
        .fetch_one(&test_app.connection_pool)
        .await
        .unwrap();
    assert_eq!(follows.0, 0);
}

#[tokio::test]
async fn blocking_twice_returns_409() {
    // arrange
    let test_app = spawn_app().await;
    let blocker = TestMember::generate();
    blocker.store(&test_app.connection_pool).await;
    let target = TestMember::generate();
    target.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&blocker).await;
    assert_eq!(
        200,
        post_block(&test_app, target.id, &access_token)
            .await
            .status()
            .as_u16()
    );

    // act
    let response = post_block(&test_app, target.id, &access_token).await;

    // assert
    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn blocking_yourself_returns_400() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;

    // act
    let response = post_block(&test_app, member.id, &access_token).await;

    // assert
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn unblocking_removes_the_block() {
    // arrange
    let test_app = spawn_app().await;
    let blocker = TestMember::generate();
    blocker.store(&test_app.connection_pool).await;
    let target = TestMember::generate();
    target.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&blocker).await;
    assert_eq!(
        200,
        post_block(&test_app, target.id, &access_token)
            .await
            .status()
            .as_u16()
    );

    // act
    let response = test_app
        .api_client
        .delete(&format!("{}/api/block/{}", &test_app.address, target.id))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(200, response.status().as_u16());
    let blocks = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM blocks")
        .fetch_one(&test_app.connection_pool)
        .await
        .unwrap();
    assert_eq!(blocks.0, 0);
}

#[tokio::test]
async fn unblocking_a_member_you_have_not_blocked_returns_400() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let target = TestMember::generate();
    target.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;

    // act
    let response = test_app
        .api_client
        .delete(&format!("{}/api/block/{}", &test_app.address, target.id))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn the_block_list_names_blocked_members() {
    // arrange
    let test_app = spawn_app().await;
    let blocker = TestMember::generate();
    blocker.store(&test_app.connection_pool).await;
    let target = TestMember::generate();
    target.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&blocker).await;
    assert_eq!(
        200,
        post_block(&test_app, target.id, &access_token)
            .await
            .status()
            .as_u16()
    );

    // act
    let response = test_app
        .api_client
        .get(&format!("{}/api/block", &test_app.address))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    let members = body["data"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["nickname"], serde_json::json!(target.nickname));
}
