pub mod photo;
pub mod sync;

pub use photo::{Photo, RemoteKey};
pub use sync::{classify, BannerState, PageRequest, SyncStatus};
