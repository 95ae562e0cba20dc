//! Timestamp normalization and the "last updated" resolver

mod normalize;
mod relative;
mod resolver;
mod strategies;

pub use normalize::{
    earliest_reasonable, is_reasonable, is_reasonable_at, normalize_timestamp,
    normalize_timestamp_at, parse_timestamp_at,
};
pub use relative::parse_relative_time;
pub use resolver::{FeedTimestampSource, Resolution, TimestampResolver};
pub use strategies::most_recent_page_date;

pub(crate) use strategies::{find_json_ld_key, meta_content, parse_json_ld};
