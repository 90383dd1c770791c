//! Status enums for various entities.
//!
//! Order statuses are persisted with their Portuguese labels (`Pago`,
//! `Aguardando`, `Cancelado`) because that is what the back office and the
//! external spreadsheet integration display.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Created as [`OrderStatus::Awaiting`]; later moved to `Paid` or
/// `Cancelled` by an admin or an out-of-band payment notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[serde(rename = "Pago")]
    Paid,
    #[default]
    #[serde(rename = "Aguardando")]
    Awaiting,
    #[serde(rename = "Cancelado")]
    Cancelled,
}

impl OrderStatus {
    /// The stored label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "Pago",
            Self::Awaiting => "Aguardando",
            Self::Cancelled => "Cancelado",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pago" => Ok(Self::Paid),
            "Aguardando" => Ok(Self::Awaiting),
            "Cancelado" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Delivery format of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookFormat {
    /// Ebook delivered by email, no shipping.
    Digital,
    /// Printed copy that must be shipped or picked up.
    Physical,
}

impl BookFormat {
    /// The stored label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Physical => "physical",
        }
    }
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digital" => Ok(Self::Digital),
            "physical" => Ok(Self::Physical),
            _ => Err(format!("invalid book format: {s}")),
        }
    }
}

/// Catalog visibility of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    Active,
    /// Promoted as an upcoming or recent launch.
    Launch,
    Inactive,
}

impl BookStatus {
    /// The stored label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Launch => "launch",
            Self::Inactive => "inactive",
        }
    }

    /// Whether the book can be shown and sold on the storefront.
    #[must_use]
    pub const fn is_listed(&self) -> bool {
        matches!(self, Self::Active | Self::Launch)
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "launch" => Ok(Self::Launch),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("invalid book status: {s}")),
        }
    }
}

/// Role stored on a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    /// Full access to the back office.
    Admin,
    /// Back-office access for day-to-day order handling.
    Secretary,
    #[default]
    Customer,
}

impl ProfileRole {
    /// Whether this role may use the back office.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::Secretary)
    }
}

impl std::fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Secretary => write!(f, "secretary"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

impl std::str::FromStr for ProfileRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "secretary" => Ok(Self::Secretary),
            "customer" => Ok(Self::Customer),
            _ => Err(format!("invalid profile role: {s}")),
        }
    }
}
