//! Indonesian administrative regions (wilayah).
//!
//! Builds the province > regency > district > village hierarchy from the
//! source tree, loads it into a [`RegionStore`](crate::modules::store::RegionStore)
//! and serves it read-only.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/provinces` | List all provinces |
//! | GET | `/api/regencies?provinceCode=` | List regencies of a province |
//! | GET | `/api/districts?regencyCode=` | List districts of a regency |
//! | GET | `/api/villages?districtCode=` | List villages of a district |
//! | GET | `/api/regions` | Filtered, paged listing |
//! | GET | `/api/regions/{kind}/{code}` | Get region by level and full code |
//! | GET | `/api/search?q=` | Paged name search |
//! | GET | `/api/hierarchy/{code}` | Region with its ancestors |
//! | GET | `/api/stats` | Region count per level |
//! | GET | `/health` | Store connectivity |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::RegionService;
