//! # Kide API Client
//!
//! Rust client for the parts of the kide.app API a reservation agent needs:
//! reading a product (metadata and its variant list) and creating a
//! reservation for one variant.
//!
//! ## Example
//!
//! ```no_run
//! use salegate_kide::KideClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = KideClient::new("my-bearer-token");
//!
//!     let product = client.product("42").await?;
//!     println!("{} opens at {}", product.product.name, product.product.sale_start()?);
//!
//!     if let Some(variant) = product.variants.first() {
//!         let reserved = client.reserve(&variant.inventory_id, 1).await?;
//!         println!("Reserved {}", reserved.variant_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use client::{KideClient, DEFAULT_API_URL, DEFAULT_USER_AGENT};
pub use error::KideError;
pub use types::{ProductInfo, ProductModel, ReservationRequest, ReservedItem, VariantInfo};
