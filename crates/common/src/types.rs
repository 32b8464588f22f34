use serde::{Deserialize, Serialize};

/// Declares a database-assigned integer identifier.
///
/// Each identifier is a distinct type so a product id can never be passed
/// where an order id is expected.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row id.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row id, as bound into SQL.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id! {
    /// Identifier of a row in the `customers` table.
    CustomerId
}

row_id! {
    /// Identifier of a row in the `products` table.
    ProductId
}

row_id! {
    /// Identifier of a row in the `orders` table.
    OrderId
}
