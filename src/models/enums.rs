//! Shared domain enums
//!
//! Every enum here is stored as TEXT in PostgreSQL and serialized with the
//! same lowercase spelling in JSON.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Implements `as_str`, `Display`, `FromStr` and the SQLx text conversions
/// for a fieldless enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {} value: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub(crate) use text_enum;

// ---------------------------------------------------------------------------
// MembershipTier
// ---------------------------------------------------------------------------

/// Membership tier of a member, keys the loan and extension quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    Student,
    Professor,
    Professional,
    Anonymous,
}

text_enum!(MembershipTier {
    Student => "student",
    Professor => "professor",
    Professional => "professional",
    Anonymous => "anonymous",
});

// ---------------------------------------------------------------------------
// LoanType
// ---------------------------------------------------------------------------

/// Where the borrowed copy is used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    /// Taken home
    #[default]
    Home,
    /// Consulted on the premises
    OnSite,
}

text_enum!(LoanType {
    Home => "home",
    OnSite => "on_site",
});

// ---------------------------------------------------------------------------
// NotificationKind
// ---------------------------------------------------------------------------

/// Lifecycle events forwarded to the notification sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Loan due soon
    Reminder,
    /// Loan past its due date
    Late,
    /// Penalty issued on a late return
    Penalty,
    /// Reserved copy ready for pickup
    HoldReady,
}

text_enum!(NotificationKind {
    Reminder => "reminder",
    Late => "late",
    Penalty => "penalty",
    HoldReady => "hold_ready",
});
