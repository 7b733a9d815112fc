use crate::helpers::{spawn_app, TestApp, TestMember};

async fn post_image(
    test_app: &TestApp,
    access_token: &str,
    file_name: &str,
    represent: bool,
) -> reqwest::Response {
    test_app
        .api_client
        .post(&format!(
            "{}/api/members/me/profile-images",
            &test_app.address
        ))
        .bearer_auth(access_token)
        .json(&serde_json::json!({
            "imageUrl": format!("https://cdn.example.com/{}", file_name),
            "originName": "portrait.png",
            "fileName": file_name,
            "represent": represent,
        }))
        .send()
        .await
        .expect("Failed to execute request")
}

async fn list_images(test_app: &TestApp, member_id: uuid::Uuid) -> serde_json::Value {
    test_app
        .api_client
        .get(&format!(
            "{}/api/members/{}/profile-images",
            &test_app.address, member_id
        ))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn adding_an_image_makes_it_listable() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;

    // act
    let response = post_image(&test_app, &access_token, "a.png", false).await;

    // assert
    assert_eq!(201, response.status().as_u16());
    let body = list_images(&test_app, member.id).await;
    let images = body["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["fileName"], serde_json::json!("a.png"));
    assert_eq!(images[0]["represent"], serde_json::json!(false));
}

#[tokio::test]
async fn a_new_representative_image_demotes_the_previous_one() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;
    assert_eq!(
        201,
        post_image(&test_app, &access_token, "first.png", true)
            .await
            .status()
            .as_u16()
    );

    // act
    let response = post_image(&test_app, &access_token, "second.png", true).await;

    // assert
    assert_eq!(201, response.status().as_u16());
    let body = list_images(&test_app, member.id).await;
    let images = body["data"]["images"].as_array().unwrap();
    let represented: Vec<_> = images
        .iter()
        .filter(|image| image["represent"] == serde_json::json!(true))
        .collect();
    assert_eq!(represented.len(), 1);
    assert_eq!(represented[0]["fileName"], serde_json::json!("second.png"));
}

#[tokio::test]
async fn promoting_an_image_updates_the_representative() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;
    assert_eq!(
        201,
        post_image(&test_app, &access_token, "first.png", true)
            .await
            .status()
            .as_u16()
    );
    assert_eq!(
        201,
        post_image(&test_app, &access_token, "second.png", false)
            .await
            .status()
            .as_u16()
    );

    let body = list_images(&test_app, member.id).await;
    let second_id = body["data"]["images"]
        .as_array()
        .unwrap()
        .iter()
        .find(|image| image["fileName"] == serde_json::json!("second.png"))
        .unwrap()["profileImageId"]
        .as_str()
        .unwrap()
        .to_string();

    // act
    let response = test_app
        .api_client
        .patch(&format!(
            "{}/api/members/me/profile-images/{}",
            &test_app.address, second_id
        ))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(200, response.status().as_u16());
    let info = test_app.get_member_info(member.id, None).await;
    let info: serde_json::Value = info.json().await.unwrap();
    assert_eq!(info["data"]["fileName"], serde_json::json!("second.png"));
}

#[tokio::test]
async fn deleting_a_foreign_image_returns_404() {
    // arrange
    let test_app = spawn_app().await;
    let owner = TestMember::generate();
    owner.store(&test_app.connection_pool).await;
    let other = TestMember::generate();
    other.store(&test_app.connection_pool).await;
    let owner_token = test_app.login(&owner).await;
    assert_eq!(
        201,
        post_image(&test_app, &owner_token, "mine.png", false)
            .await
            .status()
            .as_u16()
    );
    let body = list_images(&test_app, owner.id).await;
    let image_id = body["data"]["images"].as_array().unwrap()[0]["profileImageId"]
        .as_str()
        .unwrap()
        .to_string();

    // act: someone else tries to delete it
    let other_token = test_app.login(&other).await;
    let response = test_app
        .api_client
        .delete(&format!(
            "{}/api/members/me/profile-images/{}",
            &test_app.address, image_id
        ))
        .bearer_auth(&other_token)
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(404, response.status().as_u16());

    // the owner can
    let response = test_app
        .api_client
        .delete(&format!(
            "{}/api/members/me/profile-images/{}",
            &test_app.address, image_id
        ))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn member_info_carries_the_representative_image() {
    // arrange
    let test_app = spawn_app().await;
    let member = TestMember::generate();
    member.store(&test_app.connection_pool).await;
    let access_token = test_app.login(&member).await;
    assert_eq!(
        201,
        post_image(&test_app, &access_token, "face.png", true)
            .await
            .status()
            .as_u16()
    );

    // act
    let response = test_app.get_member_info(member.id, None).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["fileName"], serde_json::json!("face.png"));
    assert_eq!(
        body["data"]["imageUrl"],
        serde_json::json!("https://cdn.example.com/face.png")
    );
    assert!(body["data"]["profileImageId"].as_str().is_some());
}

#[tokio::test]
async fn profile_images_of_private_members_are_guarded() {
    // arrange
    let test_app = spawn_app().await;
    let target = TestMember::generate();
    target
        .store_with(&test_app.connection_pool, "MEMBER", "ACTIVE", "PRIVATE")
        .await;

    // act
    let response = test_app
        .api_client
        .get(&format!(
            "{}/api/members/{}/profile-images",
            &test_app.address, target.id
        ))
        .send()
        .await
        .expect("Failed to execute request");

    // assert
    assert_eq!(403, response.status().as_u16());
}
