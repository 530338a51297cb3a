pub mod fetcher;
pub mod user_agent;

pub use fetcher::{BROWSER_HEADERS, DEFAULT_ALLOWED_DOMAIN, ReqwestFetcher};
pub use user_agent::{DEFAULT_ROTATE_EVERY, UserAgentRotator};
