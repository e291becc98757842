use super::super::id::MemberId;
use super::MemberKind;

#[derive(Debug, Clone)]
pub struct CreateMember {
    pub name: String,
    pub email: String,
    pub kind: MemberKind,
    /// When unset, the limit for the member class applies.
    pub max_borrow_limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct UpdateMember {
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
    pub kind: MemberKind,
    pub max_borrow_limit: u32,
}
