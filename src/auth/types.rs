// 身份模块数据类型定义

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// 当前用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// 用户ID
    pub id: String,
    /// 昵称（显示名称）
    pub display_name: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }
}

/// 身份提供方
pub trait IdentityProvider: Send + Sync {
    /// 当前登录用户，未登录时为 None
    fn current_user(&self) -> Option<UserIdentity>;
}

/// 由调用方直接设置的身份
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<UserIdentity>>,
}

impl StaticIdentity {
    pub fn signed_in(id: impl Into<String>) -> Self {
        Self {
            user: RwLock::new(Some(UserIdentity::new(id))),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: UserIdentity) {
        *self.user.write() = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write() = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserIdentity> {
        self.user.read().clone()
    }
}
