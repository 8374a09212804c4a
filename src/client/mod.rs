//! 后台管理端客户端：HTTP 调用 + 权限矩阵编辑器状态。

pub mod editor;
pub mod error;
pub mod http;

pub use editor::{PermissionEditor, PermissionGrid, PermissionSource};
pub use error::{ClientError, ClientResult};
pub use http::AdminClient;
