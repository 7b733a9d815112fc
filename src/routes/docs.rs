use utoipa::OpenApi;

/// The OpenAPI document served next to the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health_check::health_check,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::reissue,
        crate::routes::members::signup::signup,
        crate::routes::members::signup::check_nickname,
        crate::routes::members::signup::check_email,
        crate::routes::members::signup::verify_code,
        crate::routes::members::signup::resend_code,
        crate::routes::members::account::update_nickname,
        crate::routes::members::account::update_password,
        crate::routes::members::account::update_privacy,
        crate::routes::members::account::delete_member,
        crate::routes::members::account::cancel_delete,
        crate::routes::members::account::reset_password,
        crate::routes::members::info::member_info,
        crate::routes::follow::follow,
        crate::routes::follow::unfollow,
        crate::routes::follow::follower_list,
        crate::routes::follow::following_list,
        crate::routes::block::block_member,
        crate::routes::block::unblock_member,
        crate::routes::block::block_list,
        crate::routes::profile_images::add_profile_image,
        crate::routes::profile_images::profile_image_list,
        crate::routes::profile_images::delete_profile_image,
        crate::routes::profile_images::set_represent_image,
    ),
    components(schemas(
        crate::routes::auth::LoginRequest,
        crate::routes::auth::TokenResponse,
        crate::routes::members::signup::SignupRequest,
        crate::routes::members::signup::DuplicateCheckResponse,
        crate::routes::members::signup::CodeVerificationRequest,
        crate::routes::members::signup::CodeResendRequest,
        crate::routes::members::account::MemberIdResponse,
        crate::routes::members::account::NicknameUpdateRequest,
        crate::routes::members::account::PasswordUpdateRequest,
        crate::routes::members::account::PrivacyUpdateRequest,
        crate::routes::members::account::CancelDeleteRequest,
        crate::routes::members::account::PasswordResetRequest,
        crate::routes::members::info::MemberInfoResponse,
        crate::routes::follow::MemberListResponse,
        crate::routes::profile_images::ProfileImageRequest,
        crate::routes::profile_images::ProfileImageDto,
        crate::routes::profile_images::ProfileImageListResponse,
        crate::routes::MemberSummaryDto,
        crate::domain::Gender,
        crate::domain::Visibility,
        crate::error_handling::ErrorBody,
    )),
    tags(
        (name = "auth", description = "Login, logout and token reissue"),
        (name = "members", description = "Sign-up, verification and account management"),
        (name = "follow", description = "Follow graph"),
        (name = "block", description = "Blocking"),
        (name = "profile-images", description = "Profile image management"),
        (name = "ops", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;
