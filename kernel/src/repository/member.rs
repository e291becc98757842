use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{id::MemberId, member::Member};

#[mockall::automock]
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn find_by_id(&self, id: MemberId) -> AppResult<Option<Member>>;
    async fn find_all(&self) -> AppResult<Vec<Member>>;
    async fn find_by_name(&self, name: &str) -> AppResult<Vec<Member>>;
    async fn create(&self, member: Member) -> AppResult<()>;
    async fn update(&self, member: Member) -> AppResult<()>;
    async fn delete(&self, id: MemberId) -> AppResult<()>;
}
