//! Configuration module

mod cms;

pub use cms::CmsConfig;
pub use cms::CorsConfig;
pub use cms::PaginationConfig;
pub use cms::ServerConfig;
pub use cms::SiteConfig;
