//! Custom Resource Definitions for the EasyHttp operator

mod easyhttp;

pub use easyhttp::{EasyHttp, EasyHttpSpec, EasyHttpStatus, DEFAULT_REPLICAS};
