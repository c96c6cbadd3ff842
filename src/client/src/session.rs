//! 客户端会话管理

use crate::{error::ClientError, storage::SessionStorage};
use estate_common::{keys, UserView};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// 已登录会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
}

/// 会话管理器
///
/// 内存中的会话与持久化存储保持一致：先写存储，成功后再替换内存状态。
/// 变化通过 `subscribe()` 返回的 watch 通道通知。
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<Option<Session>>,
    write_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            storage,
            state,
            write_lock: Mutex::new(()),
        }
    }

    /// 从存储恢复会话
    ///
    /// 读取失败或数据不完整时以未登录状态启动
    pub async fn init(&self) -> Option<Session> {
        let _guard = self.write_lock.lock().await;

        let restored = match self.load().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restore session, starting signed out");
                None
            }
        };

        if restored.is_some() {
            tracing::debug!("Session restored from storage");
        }
        self.state.send_replace(restored.clone());
        restored
    }

    async fn load(&self) -> Result<Option<Session>, ClientError> {
        let user = self.storage.get(keys::USER).await?;
        let access_token = self.storage.get(keys::ACCESS_TOKEN).await?;
        let refresh_token = self.storage.get(keys::REFRESH_TOKEN).await?;

        let (Some(user), Some(access_token), Some(refresh_token)) =
            (user, access_token, refresh_token)
        else {
            return Ok(None);
        };

        let user: UserView = serde_json::from_str(&user)
            .map_err(|e| ClientError::Storage(e.into()))?;

        Ok(Some(Session {
            user,
            access_token,
            refresh_token,
        }))
    }

    /// 登录：持久化后替换内存中的会话
    pub async fn login(&self, session: Session) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;

        let user = serde_json::to_string(&session.user)
            .map_err(|e| ClientError::Storage(e.into()))?;
        self.storage
            .set_many(&[
                (keys::USER, user),
                (keys::ACCESS_TOKEN, session.access_token.clone()),
                (keys::REFRESH_TOKEN, session.refresh_token.clone()),
            ])
            .await?;

        tracing::info!(user_id = %session.user.id, "Session saved");
        self.state.send_replace(Some(session));
        Ok(())
    }

    /// 登出：无论存储是否成功都清空内存中的会话
    pub async fn logout(&self) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;

        let was_signed_in = self.state.send_replace(None).is_some();
        if was_signed_in {
            tracing::info!("Session cleared");
        }

        self.storage.remove_many(&keys::ALL).await?;
        Ok(())
    }

    /// 刷新后更新访问令牌
    pub async fn set_access_token(&self, access_token: String) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;

        if self.state.borrow().is_none() {
            return Err(ClientError::Auth("Not signed in".to_string()));
        }

        self.storage
            .set_many(&[(keys::ACCESS_TOKEN, access_token.clone())])
            .await?;
        self.state.send_modify(|state| {
            if let Some(session) = state.as_mut() {
                session.access_token = access_token;
            }
        });
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|s| s.refresh_token.clone())
    }

    /// 订阅会话变化
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }
}
