use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use market_common::{MinorUnits, Tokens};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------      Identifiers      -------------------------------------------------------
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// A marketplace user. Assigned locally when the account is created.
    UserId
);
string_id!(
    /// An audio sample in the catalog.
    SampleId
);
string_id!(
    /// A purchase record. Generated locally when the purchase is made.
    PurchaseId
);
string_id!(
    /// The opaque payment identifier issued by the payment gateway. It is never generated locally, since all later
    /// status lookups against the gateway are keyed on it.
    PaymentId
);

impl UserId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl SampleId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl PurchaseId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

//--------------------------------------     PaymentStatus     -------------------------------------------------------
/// The lifecycle of a payment. `Pending` is the only non-terminal state; a payment moves to `Succeeded` or `Canceled`
/// exactly once and never leaves that state again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Created at the gateway, waiting for the customer to confirm.
    Pending,
    /// The money has been captured. The owner's balance has been credited.
    Succeeded,
    /// The customer abandoned or the gateway rejected the payment.
    Canceled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment status: {0}")]
pub struct ConversionError(String);

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "succeeded" => Ok(Self::Succeeded),
            "canceled" => Ok(Self::Canceled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------      UserAccount      -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserAccount {
    pub id: UserId,
    pub login: String,
    /// The spendable token balance. Only ever changed by atomic increments in the database.
    pub tokens: Tokens,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------         Sample        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub title: String,
    pub author: String,
    /// The current price. A price of zero means the sample is free for everyone.
    pub price: Tokens,
    /// The object key of the audio file in the storage bucket.
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

impl Sample {
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

#[derive(Debug, Clone)]
pub struct NewSample {
    pub id: SampleId,
    pub title: String,
    pub author: String,
    pub price: Tokens,
    pub storage_key: String,
}

impl NewSample {
    pub fn new<T: Into<String>, K: Into<String>>(title: T, price: Tokens, storage_key: K) -> Self {
        Self {
            id: SampleId::random(),
            title: title.into(),
            author: String::default(),
            price,
            storage_key: storage_key.into(),
        }
    }

    pub fn with_author<S: Into<String>>(mut self, author: S) -> Self {
        self.author = author.into();
        self
    }
}

//--------------------------------------        Payment        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub status: PaymentStatus,
    pub description: String,
    /// The amount paid, in minor currency units
    pub amount: MinorUnits,
    /// When the gateway reported the payment as settled. `None` while the payment is pending.
    pub captured_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    /// The id the gateway assigned to the payment intent
    pub id: PaymentId,
    pub user_id: UserId,
    pub description: String,
    pub amount: MinorUnits,
    pub created_at: DateTime<Utc>,
}

impl NewPayment {
    pub fn new(id: PaymentId, user_id: UserId, amount: MinorUnits) -> Self {
        Self { id, user_id, description: String::default(), amount, created_at: Utc::now() }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

//--------------------------------------        Purchase       -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub sample_id: SampleId,
    /// The sample price at the time of purchase. Later price changes do not affect it.
    pub price: Tokens,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub sample_id: SampleId,
    pub price: Tokens,
    pub created_at: DateTime<Utc>,
}

impl NewPurchase {
    pub fn new(user_id: UserId, sample_id: SampleId, price: Tokens) -> Self {
        Self { id: PurchaseId::random(), user_id, sample_id, price, created_at: Utc::now() }
    }
}

/// A completed purchase, together with the sample and the links the buyer can use to fetch the audio.
#[derive(Debug, Clone, Serialize)]
pub struct PurchasedSample {
    pub purchase: Purchase,
    pub sample: Sample,
    pub download_url: String,
    pub listen_url: String,
}
