use chrono::NaiveDate;
use secrecy::Secret;
use uuid::Uuid;

/// A member as loaded from storage. Column values that never leave the
/// persistence layer (audit timestamps, suspension counters) are not carried.
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub nickname: String,
    pub email: String,
    pub password_hash: Secret<String>,
    pub birth: NaiveDate,
    pub gender: Gender,
    pub role: Role,
    pub activation: Activation,
    pub visibility: Visibility,
}

/// Account privilege tier. New sign-ups start as `Guest` until the emailed
/// verification code is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Guest,
    Member,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

/// Account lifecycle state. `WaitingDeleted` accounts linger until the purge
/// worker removes them after the grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Activation {
    Active,
    Suspended,
    WaitingDeleted,
}

/// Who may read a member's profile surface (info, follower lists, images).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    FollowerOnly,
    Private,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GUEST" => Ok(Role::Guest),
            "MEMBER" => Ok(Role::Member),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("{} is not a valid role.", other)),
        }
    }
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
        }
    }

    /// Human-readable label paired with the wire code in profile responses.
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            other => Err(format!("{} is not a valid gender.", other)),
        }
    }
}

impl Activation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Active => "ACTIVE",
            Activation::Suspended => "SUSPENDED",
            Activation::WaitingDeleted => "WAITING_DELETED",
        }
    }
}

impl std::str::FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Activation::Active),
            "SUSPENDED" => Ok(Activation::Suspended),
            "WAITING_DELETED" => Ok(Activation::WaitingDeleted),
            other => Err(format!("{} is not a valid activation state.", other)),
        }
    }
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::FollowerOnly => "FOLLOWER_ONLY",
            Visibility::Private => "PRIVATE",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLIC" => Ok(Visibility::Public),
            "FOLLOWER_ONLY" => Ok(Visibility::FollowerOnly),
            "PRIVATE" => Ok(Visibility::Private),
            other => Err(format!("{} is not a valid visibility.", other)),
        }
    }
}
