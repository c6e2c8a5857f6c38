pub mod caption;
pub mod error;
pub mod filter;
pub mod queue;
pub mod render;
pub mod repository;

pub use caption::{Caption, CaptionId, UserId};
pub use error::{QueueError, RepositoryError};
pub use filter::{CaptionField, FilterOptions, FilterValue, Operator};
pub use queue::{ModerationQueue, DEFAULT_PAGE_SIZE};
pub use render::{decode_image, encode_png, CaptionRenderer, FontRenderer, RenderError};
pub use repository::{CaptionRepository, InMemoryRepository, SqliteRepository};
