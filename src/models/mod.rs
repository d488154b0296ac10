pub mod family;
pub mod membership;
pub mod moment;
pub mod user;

pub use family::{
    CreateFamilyRequest, Family, FamilyAuthorityRequest, FamilyCreated, FamilyCreatedNickname,
    FamilyView, InviteCodeRequest, MyFamily, NewFamily, UpdateFamilyRequest,
};
pub use membership::{FamilyMember, MemberStatus, Membership};
pub use moment::Comment;
pub use user::User;
