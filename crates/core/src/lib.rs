pub mod cache;
pub mod dom;
pub mod error;
pub mod extract;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod metadata;
pub mod postprocess;
pub mod preprocess;
pub mod reader;
pub mod settings;

pub use cache::{ArticleCache, DEFAULT_CACHE_CAPACITY};
#[doc(hidden)]
pub use dom::{EditPlan, serialize_document, serialize_fragment};
pub use error::{LegamError, Result};
pub use extract::{ContentExtractor, ExtractedArticle, ReadabilityExtractor};
#[cfg(feature = "fetch")]
pub use fetch::{DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT_SECS, FetchConfig, RawDocument, fetch_url};
pub use metadata::{Metadata, extract_metadata};
pub use postprocess::normalize_html;
pub use preprocess::presanitize;
pub use reader::{ParsedPage, ReadArticle, Reader};
pub use settings::{DisplaySettings, FontFamily, TextAlign};
