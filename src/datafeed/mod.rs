pub mod encoding;
pub mod fetcher;
pub mod normalizer;
pub mod xml_parser;

pub use fetcher::{FetchError, FileSource, HttpProtocol, HttpSource, RateSource};
pub use normalizer::{FeedNormalizer, NormalizeError, NormalizeStrategy};
pub use xml_parser::{FeedParser, ParseError, ParseStrategy};
