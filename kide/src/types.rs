//! Wire types for the kide API

use crate::error::KideError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope used by every kide response
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope<T> {
    /// Response payload
    pub model: T,
}

/// `GET /products/{id}` payload
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ProductModel {
    /// Product metadata
    pub product: ProductInfo,
    /// Purchasable variants in display order
    #[serde(default)]
    pub variants: Vec<VariantInfo>,
}

/// Product metadata
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    /// Product id
    #[serde(default)]
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// When the sale opens, RFC 3339 with offset
    #[serde(default)]
    pub date_sales_from: Option<String>,
}

impl ProductInfo {
    /// Parse the sale-start instant
    ///
    /// # Errors
    ///
    /// - [`KideError::MissingField`] if the product has no `dateSalesFrom`
    /// - [`KideError::InvalidTimestamp`] if it is not RFC 3339
    pub fn sale_start(&self) -> Result<DateTime<Utc>, KideError> {
        let raw = self
            .date_sales_from
            .as_deref()
            .ok_or(KideError::MissingField("dateSalesFrom"))?;

        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| KideError::InvalidTimestamp {
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }
}

/// One purchasable variant (ticket tier)
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VariantInfo {
    /// Inventory id used when reserving
    pub inventory_id: String,
    /// Display name
    pub name: String,
    /// Free-form description, may be null
    #[serde(default)]
    pub description: Option<String>,
    /// Most units one reservation may hold, zero when the listing omits it
    #[serde(rename = "productVariantMaximumReservableQuantity", default)]
    pub max_reservable_quantity: u32,
}

/// `POST /reservations` body
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    /// Reservations to create
    pub to_create: Vec<ReservationItem>,
    /// Reservations to cancel (always empty for the agent)
    pub to_cancel: Vec<ReservationItem>,
}

impl ReservationRequest {
    /// Request `quantity` units of a single inventory item
    #[must_use]
    pub fn single(inventory_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            to_create: vec![ReservationItem {
                inventory_id: inventory_id.into(),
                quantity,
                product_variant_user_form: None,
            }],
            to_cancel: Vec::new(),
        }
    }
}

/// One line of a reservation request
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationItem {
    /// Inventory id of the variant
    pub inventory_id: String,
    /// Units requested
    pub quantity: u32,
    /// Per-variant form answers; serialized as `null` when absent
    pub product_variant_user_form: Option<serde_json::Value>,
}

/// `POST /reservations` payload
#[derive(Clone, Debug, Deserialize)]
pub struct ReservationModel {
    /// Reservations held by the user after the request
    #[serde(default)]
    pub reservations: Vec<ReservedItem>,
}

/// A held reservation
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReservedItem {
    /// Name of the reserved variant
    pub variant_name: String,
    /// Units held, when the API reports it
    #[serde(default, alias = "reservedQuantity")]
    pub quantity: Option<u32>,
    /// Inventory id, when the API reports it
    #[serde(default)]
    pub inventory_id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_payload_parses() {
        let payload = json!({
            "model": {
                "product": {
                    "id": "42",
                    "name": "Wappu Sitsit",
                    "dateSalesFrom": "2025-04-01T12:00:00+03:00"
                },
                "variants": [
                    {
                        "inventoryId": "inv-a",
                        "name": "GA",
                        "description": null,
                        "productVariantMaximumReservableQuantity": 4
                    }
                ]
            }
        });

        let envelope: Envelope<ProductModel> = serde_json::from_value(payload).unwrap();
        let model = envelope.model;
        assert_eq!(model.product.name, "Wappu Sitsit");
        assert_eq!(model.variants.len(), 1);
        assert_eq!(model.variants[0].description, None);
        assert_eq!(model.variants[0].max_reservable_quantity, 4);
        assert_eq!(
            model.product.sale_start().unwrap().to_rfc3339(),
            "2025-04-01T09:00:00+00:00"
        );
    }

    #[test]
    fn test_missing_sale_start_is_reported() {
        let info = ProductInfo {
            id: None,
            name: "No date".into(),
            date_sales_from: None,
        };
        assert!(matches!(info.sale_start(), Err(KideError::MissingField("dateSalesFrom"))));
    }

    #[test]
    fn test_unparseable_sale_start_is_reported() {
        let info = ProductInfo {
            id: None,
            name: "Bad date".into(),
            date_sales_from: Some("next friday".into()),
        };
        assert!(matches!(info.sale_start(), Err(KideError::InvalidTimestamp { .. })));
    }

    #[test]
    fn test_reservation_request_shape() {
        let body = serde_json::to_value(ReservationRequest::single("inv-b", 2)).unwrap();
        assert_eq!(
            body,
            json!({
                "toCreate": [
                    { "inventoryId": "inv-b", "quantity": 2, "productVariantUserForm": null }
                ],
                "toCancel": []
            })
        );
    }
}
