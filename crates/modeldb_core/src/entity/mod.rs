//! Entity types, proxies and the identity cache.

mod cache;
mod model;
mod proxy;

pub(crate) use cache::ProxyCache;
pub use model::{Attr, Entity, ListAttr};
pub use proxy::{EntityProxy, RowIdentity};
