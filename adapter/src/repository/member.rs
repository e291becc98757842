use std::collections::HashMap;

use async_trait::async_trait;
use kernel::model::{id::MemberId, member::Member};
use kernel::repository::member::MemberRepository;
use shared::error::{AppError, AppResult};
use tokio::sync::RwLock;

use super::contains_ignore_case;

#[derive(Default)]
pub struct InMemoryMemberRepository {
    rows: RwLock<HashMap<MemberId, Member>>,
}

impl InMemoryMemberRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn find_by_id(&self, id: MemberId) -> AppResult<Option<Member>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<Member>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Vec<Member>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|m| contains_ignore_case(&m.name, name))
            .cloned()
            .collect())
    }

    async fn create(&self, member: Member) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&member.id) {
            return Err(AppError::InvalidState(format!(
                "member {} already exists",
                member.id
            )));
        }
        rows.insert(member.id, member);
        Ok(())
    }

    async fn update(&self, member: Member) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&member.id) {
            return Err(AppError::not_found("member", member.id));
        }
        rows.insert(member.id, member);
        Ok(())
    }

    async fn delete(&self, id: MemberId) -> AppResult<()> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("member", id))
    }
}
