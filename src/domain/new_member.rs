use chrono::NaiveDate;

use crate::domain::{Gender, MemberEmail, MemberName, NewPassword, Nickname};
use crate::routes::SignupRequest;

/// A fully validated sign-up request, ready to be persisted.
pub struct NewMember {
    pub name: MemberName,
    pub nickname: Nickname,
    pub email: MemberEmail,
    pub password: NewPassword,
    pub birth: NaiveDate,
    pub gender: Gender,
}

impl TryFrom<SignupRequest> for NewMember {
    type Error = String;

    fn try_from(request: SignupRequest) -> Result<Self, Self::Error> {
        let name = MemberName::parse(request.name)?;
        let nickname = Nickname::parse(request.nickname)?;
        let email = MemberEmail::parse(request.email)?;
        let password = NewPassword::parse(request.password)?;
        Ok(NewMember {
            name,
            nickname,
            email,
            password,
            birth: request.birth,
            gender: request.gender,
        })
    }
}
