pub mod constants;

pub use constants::CHROME_USER_AGENT;
