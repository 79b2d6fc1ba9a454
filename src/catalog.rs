// SPDX-License-Identifier: GPL-3.0-only

//! Product catalog
//!
//! Products come from a JSON file of the form `{ "products": [...] }`, or
//! from the built-in default list when no catalog is configured.

use crate::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// A product to fit, dimensions in centimeters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub width_cm: f64,
    pub height_cm: f64,
    pub depth_cm: f64,
    /// Product may be turned so its depth faces the opening
    #[serde(default)]
    pub allow_rotate: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Ad-hoc product from raw dimensions
    pub fn with_dimensions(width_cm: f64, height_cm: f64, depth_cm: f64) -> Self {
        Self {
            id: "custom".to_string(),
            name: "Custom product".to_string(),
            category: "Custom".to_string(),
            width_cm,
            height_cm,
            depth_cm,
            allow_rotate: false,
            image_url: None,
        }
    }

    fn new(id: &str, name: &str, category: &str, dims: (f64, f64, f64)) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            width_cm: dims.0,
            height_cm: dims.1,
            depth_cm: dims.2,
            allow_rotate: false,
            image_url: None,
        }
    }

    /// TVs can be wall-mounted in placement mode
    pub fn can_mount_on_wall(&self) -> bool {
        self.category.eq_ignore_ascii_case("TV")
    }

    /// e.g. "60 x 85 x 60 cm"
    pub fn dimensions_text(&self) -> String {
        format!(
            "{} x {} x {} cm",
            self.width_cm as i64, self.height_cm as i64, self.depth_cm as i64
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    products: Vec<Product>,
}

/// Built-in catalog used when no catalog file is configured
pub fn default_products() -> Vec<Product> {
    let mut tv = Product::new("tv-65", "65\" OLED TV", "TV", (145.0, 83.0, 5.0));
    tv.allow_rotate = true;

    vec![
        Product::new("washer-1", "Front Load Washer", "Appliance", (60.0, 85.0, 60.0)),
        Product::new(
            "fridge-1",
            "French Door Refrigerator",
            "Appliance",
            (91.0, 178.0, 74.0),
        ),
        Product::new("sofa-1", "3-Seater Sofa", "Furniture", (220.0, 85.0, 95.0)),
        tv,
        Product::new("desk-1", "Standing Desk", "Furniture", (160.0, 72.0, 80.0)),
        Product::new("bookshelf-1", "Tall Bookshelf", "Furniture", (80.0, 200.0, 30.0)),
    ]
}

/// Parse catalog JSON
pub fn parse_catalog(contents: &str) -> Result<Vec<Product>, CatalogError> {
    serde_json::from_str::<CatalogFile>(contents)
        .map(|file| file.products)
        .map_err(|e| CatalogError::Parse(e.to_string()))
}

/// Load a catalog file
pub fn load_catalog(path: &Path) -> Result<Vec<Product>, CatalogError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
    let products = parse_catalog(&contents)?;
    debug!(path = %path.display(), count = products.len(), "Loaded product catalog");
    Ok(products)
}

/// Load `path` if given, otherwise the defaults. A missing or broken file
/// falls back to the defaults as well.
pub fn load_or_default(path: Option<&Path>) -> Vec<Product> {
    let Some(path) = path else {
        return default_products();
    };
    match load_catalog(path) {
        Ok(products) => products,
        Err(e) => {
            warn!(error = %e, "Falling back to built-in catalog");
            default_products()
        }
    }
}

/// Look up a product by id
pub fn find_product<'a>(products: &'a [Product], id: &str) -> Result<&'a Product, CatalogError> {
    products
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| CatalogError::UnknownProduct(id.to_string()))
}
