pub mod oauth_api;
