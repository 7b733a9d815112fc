use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::authentication::TokenIssuer;
use crate::email_client::EmailClient;
use crate::routes::docs::ApiDoc;
use crate::routes::{
    add_profile_image, block_list, block_member, cancel_delete, check_email, check_nickname,
    delete_member, delete_profile_image, follow, follower_list, following_list, health_check,
    login, logout, member_info, profile_image_list, reissue, resend_code, reset_password,
    set_represent_image, signup, unblock_member, unfollow, update_nickname, update_password,
    update_privacy, verify_code,
};

pub fn run(
    listener: TcpListener,
    connection_pool: PgPool,
    email_client: EmailClient,
    redis: ConnectionManager,
    token_issuer: TokenIssuer,
) -> Result<Server, std::io::Error> {
    let connection_pool = Data::new(connection_pool);
    let email_client = Data::new(email_client);
    let redis = Data::new(redis);
    let token_issuer = Data::new(token_issuer);
    let openapi = ApiDoc::openapi();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/auth")
                    .route("/login", web::post().to(login))
                    .route("/logout", web::post().to(logout))
                    .route("/reissue", web::post().to(reissue)),
            )
            .service(
                web::scope("/api/members")
                    .route("", web::post().to(signup))
                    .route("/check-nickname", web::get().to(check_nickname))
                    .route("/check-email", web::get().to(check_email))
                    .route("/code-verification", web::post().to(verify_code))
                    .route("/code-resend", web::post().to(resend_code))
                    .route("/reset-password", web::post().to(reset_password))
                    // literal `me` segments are registered ahead of `{member_id}`
                    .service(
                        web::resource("/me")
                            .route(web::patch().to(cancel_delete))
                            .route(web::delete().to(delete_member)),
                    )
                    .route("/me/nickname", web::patch().to(update_nickname))
                    .route("/me/password", web::patch().to(update_password))
                    .route("/me/privacy", web::patch().to(update_privacy))
                    .route("/me/profile-images", web::post().to(add_profile_image))
                    .service(
                        web::resource("/me/profile-images/{image_id}")
                            .route(web::delete().to(delete_profile_image))
                            .route(web::patch().to(set_represent_image)),
                    )
                    .route("/{member_id}", web::get().to(member_info))
                    .service(
                        web::resource("/{member_id}/follow")
                            .route(web::post().to(follow))
                            .route(web::delete().to(unfollow)),
                    )
                    .route("/{member_id}/follower", web::get().to(follower_list))
                    .route("/{member_id}/following", web::get().to(following_list))
                    .route(
                        "/{member_id}/profile-images",
                        web::get().to(profile_image_list),
                    ),
            )
            .service(
                web::scope("/api/block")
                    .route("", web::get().to(block_list))
                    .service(
                        web::resource("/{member_id}")
                            .route(web::post().to(block_member))
                            .route(web::delete().to(unblock_member)),
                    ),
            )
            .app_data(connection_pool.clone())
            .app_data(email_client.clone())
            .app_data(redis.clone())
            .app_data(token_issuer.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
