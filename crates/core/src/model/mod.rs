mod answer;
mod ids;
mod item;

pub use answer::{Answer, DifficultyRating, RatingError};
pub use ids::{ItemId, ParseIdError};
pub use item::{ItemError, SessionItem, SessionItemDraft, validate_items};
