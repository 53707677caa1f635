pub mod ad_service;
pub mod media_resolver;
pub mod object_key;
pub mod object_storage;
pub mod storage_service;
pub mod upload_service;
pub mod youtube;
