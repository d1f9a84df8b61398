mod async_conversion;
mod host_path_ext;
mod system_time_ext;

pub use async_conversion::{AsyncTryFrom, AsyncTryInto};
pub use host_path_ext::{HostPathExt, join_host_path};
pub use system_time_ext::SystemTimeExt;
