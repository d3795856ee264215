mod interface;
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "async-tokio")]
mod timeout;

pub use interface::*;
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
#[cfg(feature = "memory")]
pub use memory::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use timeout::*;
