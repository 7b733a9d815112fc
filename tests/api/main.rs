mod auth;
mod block;
mod helpers;
mod member_info;
mod profile_images;
