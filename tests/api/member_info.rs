use crate::helpers::{seed_block, seed_follow, spawn_app, TestMember};

#[tokio::test]
async fn members_can_read_their_own_profile() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;

    // act
    let response = test_app
        .get_member_info(member.id, Some(&access_token))
        .await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["nickname"], serde_json::json!(member.nickname));
    assert_eq!(body["data"]["followerCount"], serde_json::json!(0));
    assert_eq!(body["data"]["followingCount"], serde_json::json!(0));
    assert_eq!(body["data"]["genderCode"], serde_json::json!("FEMALE"));
}

#[tokio::test]
async fn public_profiles_are_visible_to_anonymous_viewers() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;

    // act
    let response = test_app.get_member_info(member.id, None).await;

    // assert
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn private_profiles_return_403() {
    // arrange
    let test_app = spawn_app().await;
    let target = TestMember::generate();
    target
        .store_with(&test_app.connection_pool, "MEMBER", "ACTIVE", "PRIVATE")
        .await;
    let viewer = TestMember::generate();
    viewer.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&viewer).await;

    // act + assert: anonymous and logged-in viewers are both rejected
    let response = test_app.get_member_info(target.id, None).await;
    assert_eq!(403, response.status().as_u16());
    let response = test_app
        .get_member_info(target.id, Some(&access_token))
        .await;
    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn follower_only_profiles_are_visible_to_followers_alone() {
    // arrange
    let test_app = spawn_app().await;
    let target = TestMember::generate();
    target
        .store_with(
            &test_app.connection_pool,
            "MEMBER",
            "ACTIVE",
            "FOLLOWER_ONLY",
        )
        .await;
    let follower = TestMember::generate();
    follower.store(&test_app.connection_pool).await;
    let stranger = TestMember::generate();
    stranger.store(&test_app.connection_pool).await;
    seed_follow(&test_app.connection_pool, follower.id, target.id).await;

    let follower_token = test_app.login(&follower).await;
    let stranger_token = test_app.login(&stranger).await;

    // act + assert
    let response = test_app
        .get_member_info(target.id, Some(&follower_token))
        .await;
    assert_eq!(200, response.status().as_u16());

    let response = test_app
        .get_member_info(target.id, Some(&stranger_token))
        .await;
    assert_eq!(403, response.status().as_u16());

    let response = test_app.get_member_info(target.id, None).await;
    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn a_block_in_either_direction_hides_the_profile() {
    // arrange
    let test_app = spawn_app().await;
    let target = TestMember::generate();
    target.store(&test_app.connection_pool).await;
    let blocked_viewer = TestMember::generate();
    blocked_viewer.store(&test_app.connection_pool).await;
    // the target blocked the viewer
    seed_block(&test_app.connection_pool, target.id, blocked_viewer.id).await;
    let access_token = test_app.login(&blocked_viewer).await;

    // act
    let response = test_app
        .get_member_info(target.id, Some(&access_token))
        .await;

    // assert
    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn unknown_members_return_404() {
    // arrange
    let test_app = spawn_app().await;

    // act
    let response = test_app.get_member_info(uuid::Uuid::new_v4(), None).await;

    // assert
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn follower_counts_reflect_the_follow_graph() {
    // arrange
    let test_app = spawn_app().await;
    let target = TestMember::generate();
    target.store(&test_app.connection_pool).await;
    let fan_a = TestMember::generate();
    fan_a.store(&test_app.connection_pool).await;
    let fan_b = TestMember::generate();
    fan_b.store(&test_app.connection_pool).await;
    seed_follow(&test_app.connection_pool, fan_a.id, target.id).await;
    seed_follow(&test_app.connection_pool, fan_b.id, target.id).await;
    seed_follow(&test_app.connection_pool, target.id, fan_a.id).await;

    // act
    let response = test_app.get_member_info(target.id, None).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["followerCount"], serde_json::json!(2));
    assert_eq!(body["data"]["followingCount"], serde_json::json!(1));
}
