use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ItemId);

/// Sales order ids arrive from the upstream inventory API as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalesOrderId(pub String);

impl SalesOrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    ConfirmationPending,
    Inactive,
}

impl ItemStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::ConfirmationPending, Self::Inactive];

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ConfirmationPending => "confirmation_pending",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Fulfilled,
    Confirmed,
    PartiallyShipped,
    Draft,
}

impl OrderStatus {
    pub const ALL: [Self; 4] = [
        Self::Fulfilled,
        Self::Confirmed,
        Self::PartiallyShipped,
        Self::Draft,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Fulfilled => "fulfilled",
            Self::Confirmed => "confirmed",
            Self::PartiallyShipped => "partially_shipped",
            Self::Draft => "draft",
        }
    }
}
