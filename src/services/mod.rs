pub mod content_store;
pub mod media_store;
pub mod migrator;
pub mod site_service;
