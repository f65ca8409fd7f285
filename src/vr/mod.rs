pub mod audit;
pub mod config;
pub mod discord;
pub mod extract;
pub mod feed;
pub mod history;
pub mod paths;
pub mod pipeline;
pub mod population;
pub mod record;
pub mod stats;
pub mod store;
pub mod util;
pub mod warn;
