//! Data collectors filling the conversation state slots

pub mod fundamentals;
pub mod news;
pub mod technicals;

pub use fundamentals::ScreenerFundamentals;
pub use news::{GoogleCompanyNews, GoogleMarketNews};
pub use technicals::{YahooTechnicals, compute_technicals};
