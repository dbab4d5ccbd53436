// 身份模块
//
// 上传提交前需要当前登录用户的ID

mod types;

pub use types::{IdentityProvider, StaticIdentity, UserIdentity};
