pub mod account_service;
pub mod directory_service;
pub mod profile_service;

pub use account_service::AccountService;
pub use directory_service::DirectoryService;
pub use profile_service::ProfileService;
