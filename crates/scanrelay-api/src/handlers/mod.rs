pub mod health;
pub mod object_url;
pub mod upload;
