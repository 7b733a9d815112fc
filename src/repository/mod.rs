pub mod blocks;
pub mod follows;
pub mod members;
pub mod profile_images;
