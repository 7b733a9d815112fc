mod member;
mod member_email;
mod member_name;
mod new_member;
mod new_password;
mod nickname;

pub use member::{Activation, Gender, Member, Role, Visibility};
pub use member_email::MemberEmail;
pub use member_name::MemberName;
pub use new_member::NewMember;
pub use new_password::NewPassword;
pub use nickname::Nickname;
